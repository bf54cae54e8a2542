//! Data returned by the music server and the content view state built from it.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

/// Server-assigned track identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub i64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A library track. Identity is `id`; the rest is display metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    /// Seconds, as reported by the scanner.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub cover_art: Option<String>,
    #[serde(default)]
    pub play_count: Option<u32>,
    #[serde(default)]
    pub date_added: Option<NaiveDateTime>,
}

impl Track {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().filter(|t| !t.is_empty()).unwrap_or("Unknown")
    }

    pub fn display_artist(&self) -> &str {
        self.artist
            .as_deref()
            .filter(|a| !a.is_empty())
            .unwrap_or("Unknown Artist")
    }
}

/// One page of `/tracks`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TrackPage {
    pub tracks: Vec<Track>,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "first_page")]
    pub pages: u32,
    #[serde(default)]
    pub total: u64,
}

fn first_page() -> u32 {
    1
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SearchResponse {
    pub tracks: Vec<Track>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct LibraryStats {
    #[serde(default)]
    pub total_tracks: u64,
    #[serde(default)]
    pub total_artists: u64,
    #[serde(default)]
    pub total_albums: u64,
    #[serde(default)]
    pub total_playlists: u64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PlaylistSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub track_count: u32,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PlaylistEntry {
    pub position: u32,
    pub track: Track,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PlaylistDetail {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tracks: Vec<PlaylistEntry>,
}

impl PlaylistDetail {
    pub fn track_list(&self) -> Vec<Track> {
        self.tracks.iter().map(|entry| entry.track.clone()).collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ScanProgress {
    #[serde(default)]
    pub scanned: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub current_file: Option<String>,
}

impl ScanProgress {
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.scanned >= self.total
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DownloadSource {
    YouTube,
    Spotify,
}

impl DownloadSource {
    /// Spotify links go to the Spotify downloader, everything else to YouTube.
    pub fn from_url(url: &str) -> Self {
        let lower = url.to_lowercase();
        if lower.starts_with("spotify:") || lower.contains("spotify.com") {
            DownloadSource::Spotify
        } else {
            DownloadSource::YouTube
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DownloadSource::YouTube => "YouTube",
            DownloadSource::Spotify => "Spotify",
        }
    }
}

/// A download job as reported by `/downloads`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct DownloadRecord {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Downloads {
    #[serde(default)]
    pub youtube: BTreeMap<String, DownloadRecord>,
    #[serde(default)]
    pub spotify: BTreeMap<String, DownloadRecord>,
}

impl Downloads {
    pub fn find(&self, source: DownloadSource, id: &str) -> Option<&DownloadRecord> {
        match source {
            DownloadSource::YouTube => self.youtube.get(id),
            DownloadSource::Spotify => self.spotify.get(id),
        }
    }

    /// All downloads, YouTube first, for the downloads list.
    pub fn entries(&self) -> Vec<DownloadEntry> {
        let youtube = self
            .youtube
            .iter()
            .map(|(id, record)| (DownloadSource::YouTube, id, record));
        let spotify = self
            .spotify
            .iter()
            .map(|(id, record)| (DownloadSource::Spotify, id, record));

        youtube
            .chain(spotify)
            .map(|(source, id, record)| DownloadEntry {
                id: id.clone(),
                source,
                record: record.clone(),
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DownloadEntry {
    pub id: String,
    pub source: DownloadSource,
    pub record: DownloadRecord,
}

/// Response of `POST /download/*`.
#[derive(Clone, Debug, Deserialize)]
pub struct DownloadStarted {
    #[serde(deserialize_with = "id_as_string")]
    pub download_id: String,
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "unexpected download id: {}",
            other
        ))),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ServerSettings {
    #[serde(default)]
    pub music_directories: Vec<String>,
}

/// Sort keys accepted by `/tracks?sort_by=`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Title,
    Artist,
    Album,
    DateAdded,
    PlayCount,
}

impl SortKey {
    pub fn as_param(self) -> &'static str {
        match self {
            SortKey::Title => "title",
            SortKey::Artist => "artist",
            SortKey::Album => "album",
            SortKey::DateAdded => "date_added",
            SortKey::PlayCount => "play_count",
        }
    }

    pub fn next(self) -> Self {
        match self {
            SortKey::Title => SortKey::Artist,
            SortKey::Artist => SortKey::Album,
            SortKey::Album => SortKey::DateAdded,
            SortKey::DateAdded => SortKey::PlayCount,
            SortKey::PlayCount => SortKey::Title,
        }
    }
}

/// Represents the current view in the main content area
#[derive(Clone, Debug, Default)]
pub enum ContentView {
    #[default]
    Empty,
    Library {
        tracks: Vec<Track>,
        page: u32,
        pages: u32,
        sort: SortKey,
        selected_index: usize,
    },
    SearchResults {
        query: String,
        tracks: Vec<Track>,
        selected_index: usize,
    },
    Playlists {
        playlists: Vec<PlaylistSummary>,
        selected_index: usize,
    },
    PlaylistDetail {
        detail: PlaylistDetail,
        selected_index: usize,
    },
    Downloads {
        entries: Vec<DownloadEntry>,
        selected_index: usize,
    },
    Settings {
        directories: Vec<String>,
        selected_index: usize,
    },
}

impl ContentView {
    pub fn len(&self) -> usize {
        match self {
            ContentView::Empty => 0,
            ContentView::Library { tracks, .. } | ContentView::SearchResults { tracks, .. } => {
                tracks.len()
            }
            ContentView::Playlists { playlists, .. } => playlists.len(),
            ContentView::PlaylistDetail { detail, .. } => detail.tracks.len(),
            ContentView::Downloads { entries, .. } => entries.len(),
            ContentView::Settings { directories, .. } => directories.len(),
        }
    }

    pub fn selected_index(&self) -> usize {
        match self {
            ContentView::Empty => 0,
            ContentView::Library { selected_index, .. }
            | ContentView::SearchResults { selected_index, .. }
            | ContentView::Playlists { selected_index, .. }
            | ContentView::PlaylistDetail { selected_index, .. }
            | ContentView::Downloads { selected_index, .. }
            | ContentView::Settings { selected_index, .. } => *selected_index,
        }
    }

    fn selected_index_mut(&mut self) -> Option<&mut usize> {
        match self {
            ContentView::Empty => None,
            ContentView::Library { selected_index, .. }
            | ContentView::SearchResults { selected_index, .. }
            | ContentView::Playlists { selected_index, .. }
            | ContentView::PlaylistDetail { selected_index, .. }
            | ContentView::Downloads { selected_index, .. }
            | ContentView::Settings { selected_index, .. } => Some(selected_index),
        }
    }

    pub fn move_up(&mut self) {
        if let Some(index) = self.selected_index_mut() {
            *index = index.saturating_sub(1);
        }
    }

    pub fn move_down(&mut self) {
        let len = self.len();
        if let Some(index) = self.selected_index_mut() {
            if *index + 1 < len {
                *index += 1;
            }
        }
    }

    /// Tracks shown by a track listing, in display order.
    pub fn tracks(&self) -> Option<Vec<Track>> {
        match self {
            ContentView::Library { tracks, .. } | ContentView::SearchResults { tracks, .. } => {
                Some(tracks.clone())
            }
            ContentView::PlaylistDetail { detail, .. } => Some(detail.track_list()),
            _ => None,
        }
    }

    pub fn selected_track(&self) -> Option<Track> {
        let index = self.selected_index();
        match self {
            ContentView::Library { tracks, .. } | ContentView::SearchResults { tracks, .. } => {
                tracks.get(index).cloned()
            }
            ContentView::PlaylistDetail { detail, .. } => {
                detail.tracks.get(index).map(|entry| entry.track.clone())
            }
            _ => None,
        }
    }
}

/// State for the main content area
#[derive(Clone, Debug, Default)]
pub struct ContentState {
    pub view: ContentView,
    pub navigation_stack: Vec<ContentView>,
    pub is_loading: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_parses_server_shape() {
        let json = r#"{
            "id": 12, "path": "/music/a.mp3", "title": "Song", "artist": null,
            "album": "LP", "duration": 215.5, "favorite": true, "cover_art": "",
            "play_count": 3, "date_added": "2024-03-01T10:20:30.123456",
            "last_played": null
        }"#;
        let track: Track = serde_json::from_str(json).unwrap();

        assert_eq!(track.id, TrackId(12));
        assert_eq!(track.display_title(), "Song");
        assert_eq!(track.display_artist(), "Unknown Artist");
        assert_eq!(track.duration, Some(215.5));
        assert!(track.favorite);
        assert!(track.cover_art.as_deref().unwrap_or_default().is_empty());
        assert!(track.date_added.is_some());
    }

    #[test]
    fn scan_complete_needs_a_known_total() {
        let idle = ScanProgress { scanned: 0, total: 0, current_file: None };
        let running = ScanProgress { scanned: 3, total: 10, current_file: None };
        let done = ScanProgress { scanned: 10, total: 10, current_file: None };

        assert!(!idle.is_complete());
        assert!(!running.is_complete());
        assert!(done.is_complete());
    }

    #[test]
    fn download_id_accepts_numbers_and_strings() {
        let numeric: DownloadStarted =
            serde_json::from_str(r#"{"success": true, "download_id": 7}"#).unwrap();
        let text: DownloadStarted =
            serde_json::from_str(r#"{"success": true, "download_id": "7"}"#).unwrap();

        assert_eq!(numeric.download_id, "7");
        assert_eq!(text.download_id, "7");
    }

    #[test]
    fn download_source_follows_url() {
        assert_eq!(
            DownloadSource::from_url("https://open.spotify.com/track/abc"),
            DownloadSource::Spotify
        );
        assert_eq!(DownloadSource::from_url("spotify:track:abc"), DownloadSource::Spotify);
        assert_eq!(
            DownloadSource::from_url("https://www.youtube.com/watch?v=x"),
            DownloadSource::YouTube
        );
    }

    #[test]
    fn downloads_list_youtube_before_spotify() {
        let json = r#"{
            "youtube": {"1": {"url": "yt", "status": "downloading", "progress": 40.0}},
            "spotify": {"1": {"url": "sp", "status": "completed", "progress": 100}}
        }"#;
        let downloads: Downloads = serde_json::from_str(json).unwrap();
        let entries = downloads.entries();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].source, DownloadSource::YouTube);
        assert_eq!(entries[1].record.status, "completed");
        assert!(downloads.find(DownloadSource::Spotify, "1").is_some());
        assert!(downloads.find(DownloadSource::Spotify, "2").is_none());
    }

    #[test]
    fn selection_stays_in_bounds() {
        let mut view = ContentView::Settings {
            directories: vec!["/a".into(), "/b".into()],
            selected_index: 0,
        };
        view.move_up();
        assert_eq!(view.selected_index(), 0);
        view.move_down();
        view.move_down();
        assert_eq!(view.selected_index(), 1);
    }
}
