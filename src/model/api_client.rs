//! Music server REST client (`/api`).

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::error::{ApiError, AppError};
use crate::{log_api_request, log_api_result};
use super::content::{
    DownloadSource, DownloadStarted, Downloads, LibraryStats, PlaylistDetail, PlaylistSummary,
    ScanProgress, SearchResponse, ServerSettings, SortKey, Track, TrackId, TrackPage,
};

/// Thin wrapper over the server's JSON API.
#[derive(Clone)]
pub struct MusicServerClient {
    http: Client,
    base_url: String,
}

impl MusicServerClient {
    /// `base_url` is the server root, e.g. `http://localhost:5000`.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ApiError::InvalidUrl(base_url));
        }

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("jukebox-rs/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, base_url })
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn send(request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(ApiError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            })
        }
    }

    async fn json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
        Self::send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn stats(&self) -> Result<LibraryStats, ApiError> {
        let result = Self::json(self.http.get(self.url("/stats"))).await;
        log_api_result!("stats", result);
        result
    }

    pub async fn tracks(&self, page: u32, per_page: u32, sort: SortKey) -> Result<TrackPage, ApiError> {
        log_api_request!("tracks", page, per_page, sort_by = sort.as_param());
        let request = self.http.get(self.url("/tracks")).query(&[
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
            ("sort_by", sort.as_param().to_string()),
        ]);
        let result = Self::json(request).await;
        log_api_result!("tracks", result);
        result
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Track>, ApiError> {
        log_api_request!("search", query);
        let request = self.http.get(self.url("/search")).query(&[("q", query)]);
        let result: Result<SearchResponse, ApiError> = Self::json(request).await;
        log_api_result!("search", result);
        result.map(|r| r.tracks)
    }

    /// Flip the favorite flag server side and return the updated track.
    pub async fn toggle_favorite(&self, track_id: TrackId) -> Result<Track, ApiError> {
        let url = self.url(&format!("/tracks/{}/favorite", track_id));
        let result = Self::json(self.http.post(url)).await;
        log_api_result!("toggle_favorite", result);
        result
    }

    /// Record a play. Callers do not wait on this for playback.
    pub async fn mark_played(&self, track_id: TrackId) -> Result<(), ApiError> {
        let url = self.url(&format!("/tracks/{}/play", track_id));
        Self::send(self.http.post(url)).await.map(|_| ())
    }

    pub async fn playlists(&self) -> Result<Vec<PlaylistSummary>, ApiError> {
        let result = Self::json(self.http.get(self.url("/playlists"))).await;
        log_api_result!("playlists", result);
        result
    }

    pub async fn playlist(&self, playlist_id: i64) -> Result<PlaylistDetail, ApiError> {
        let url = self.url(&format!("/playlists/{}", playlist_id));
        let result = Self::json(self.http.get(url)).await;
        log_api_result!("playlist", result);
        result
    }

    pub async fn create_playlist(&self, name: &str, description: &str) -> Result<PlaylistSummary, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Please enter a playlist name"));
        }

        log_api_request!("create_playlist", name);
        let request = self
            .http
            .post(self.url("/playlists"))
            .json(&json!({ "name": name, "description": description.trim() }));
        let result: Result<PlaylistSummary, ApiError> = Self::json(request).await;
        log_api_result!("create_playlist", result);
        Ok(result?)
    }

    pub async fn start_scan(&self) -> Result<(), ApiError> {
        let result = Self::send(self.http.post(self.url("/scan/start")).json(&json!({})))
            .await
            .map(|_| ());
        log_api_result!("start_scan", result);
        result
    }

    pub async fn scan_progress(&self) -> Result<ScanProgress, ApiError> {
        Self::json(self.http.get(self.url("/scan/progress"))).await
    }

    /// Enqueue a download. The source is picked from the URL.
    pub async fn start_download(
        &self,
        url: &str,
        format: &str,
        quality: u32,
    ) -> Result<(DownloadSource, String), AppError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AppError::validation("Please enter a URL to download"));
        }

        let source = DownloadSource::from_url(url);
        log_api_request!("start_download", source = source.label(), url);

        let request = match source {
            DownloadSource::YouTube => {
                let format = if format.trim().is_empty() { "mp3" } else { format.trim() };
                self.http
                    .post(self.url("/download/youtube"))
                    .json(&json!({ "url": url, "format": format, "quality": quality }))
            }
            DownloadSource::Spotify => self
                .http
                .post(self.url("/download/spotify"))
                .json(&json!({ "url": url })),
        };

        let result: Result<DownloadStarted, ApiError> = Self::json(request).await;
        log_api_result!("start_download", result);
        Ok((source, result?.download_id))
    }

    pub async fn downloads(&self) -> Result<Downloads, ApiError> {
        Self::json(self.http.get(self.url("/downloads"))).await
    }

    pub async fn settings(&self) -> Result<ServerSettings, ApiError> {
        let result = Self::json(self.http.get(self.url("/config"))).await;
        log_api_result!("settings", result);
        result
    }

    pub async fn add_directory(&self, directory: &str) -> Result<(), AppError> {
        let directory = Self::required_directory(directory)?;
        let request = self
            .http
            .post(self.url("/config/directories"))
            .json(&json!({ "directory": directory }));
        let result = Self::send(request).await.map(|_| ());
        log_api_result!("add_directory", result);
        Ok(result?)
    }

    pub async fn remove_directory(&self, directory: &str) -> Result<(), AppError> {
        let directory = Self::required_directory(directory)?;
        let request = self
            .http
            .delete(self.url("/config/directories"))
            .json(&json!({ "directory": directory }));
        let result = Self::send(request).await.map(|_| ());
        log_api_result!("remove_directory", result);
        Ok(result?)
    }

    fn required_directory(directory: &str) -> Result<&str, AppError> {
        let directory = directory.trim();
        if directory.is_empty() {
            Err(AppError::validation("Please enter a directory path"))
        } else {
            Ok(directory)
        }
    }
}

pub fn stream_url(base_url: &str, track_id: TrackId) -> String {
    format!("{}/api/tracks/{}/stream", base_url.trim_end_matches('/'), track_id)
}
