//! Main application model with state management

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::Theme;
use crate::jobs::JobStatus;
use super::api_client::MusicServerClient;
use super::content::{
    ContentState, ContentView, DownloadEntry, LibraryStats, PlaylistDetail, PlaylistSummary,
    SortKey, Track, TrackPage,
};
use super::playback::{PlaybackInfo, PlaybackSession};
use super::types::{ActiveSection, Notice, NoticeLevel, Prompt, PromptKind, UiState};

/// Main application model containing all state
pub struct AppModel {
    client: MusicServerClient,
    session: Arc<Mutex<PlaybackSession>>,
    pub ui_state: Arc<Mutex<UiState>>,
    pub content_state: Arc<Mutex<ContentState>>,
    pub should_quit: Arc<Mutex<bool>>,
}

impl AppModel {
    pub fn new(client: MusicServerClient, session: PlaybackSession, theme: Theme) -> Self {
        let ui_state = UiState {
            theme,
            server_url: client.base_url().to_string(),
            ..UiState::default()
        };

        Self {
            client,
            session: Arc::new(Mutex::new(session)),
            ui_state: Arc::new(Mutex::new(ui_state)),
            content_state: Arc::new(Mutex::new(ContentState::default())),
            should_quit: Arc::new(Mutex::new(false)),
        }
    }

    pub fn client(&self) -> MusicServerClient {
        self.client.clone()
    }

    /// The playback session. Lock it only for synchronous transitions.
    pub fn session(&self) -> Arc<Mutex<PlaybackSession>> {
        self.session.clone()
    }

    pub async fn get_playback_info(&self) -> PlaybackInfo {
        self.session.lock().await.info()
    }

    pub async fn should_quit(&self) -> bool {
        *self.should_quit.lock().await
    }

    pub async fn set_should_quit(&self, quit: bool) {
        *self.should_quit.lock().await = quit;
    }

    // ========================================================================
    // UI State
    // ========================================================================

    pub async fn get_ui_state(&self) -> UiState {
        self.ui_state.lock().await.clone()
    }

    pub async fn active_section(&self) -> ActiveSection {
        self.ui_state.lock().await.active_section
    }

    pub async fn cycle_section_forward(&self) -> ActiveSection {
        let mut state = self.ui_state.lock().await;
        state.active_section = state.active_section.next();
        state.active_section
    }

    pub async fn cycle_section_backward(&self) -> ActiveSection {
        let mut state = self.ui_state.lock().await;
        state.active_section = state.active_section.prev();
        state.active_section
    }

    pub async fn set_active_section(&self, section: ActiveSection) {
        self.ui_state.lock().await.active_section = section;
    }

    pub async fn search_query(&self) -> String {
        self.ui_state.lock().await.search_query.clone()
    }

    pub async fn append_to_search(&self, c: char) {
        self.ui_state.lock().await.search_query.push(c);
    }

    pub async fn backspace_search(&self) {
        self.ui_state.lock().await.search_query.pop();
    }

    pub async fn clear_search(&self) {
        self.ui_state.lock().await.search_query.clear();
    }

    pub async fn set_stats(&self, stats: LibraryStats) {
        self.ui_state.lock().await.stats = stats;
    }

    pub async fn set_scan_status(&self, status: Option<JobStatus>) {
        self.ui_state.lock().await.scan_status = status;
    }

    pub async fn toggle_theme(&self) -> Theme {
        let mut state = self.ui_state.lock().await;
        state.theme = state.theme.toggled();
        state.theme
    }

    // ========================================================================
    // Notices
    // ========================================================================

    pub async fn set_error(&self, message: String) {
        self.ui_state.lock().await.notice = Some(Notice::error(message));
    }

    /// Informational notice. Never replaces an error that is still shown.
    pub async fn set_info(&self, message: String) {
        let mut state = self.ui_state.lock().await;
        if state.notice.as_ref().is_some_and(|n| n.level == NoticeLevel::Error) {
            return;
        }
        state.notice = Some(Notice::info(message));
    }

    pub async fn clear_notice(&self) {
        self.ui_state.lock().await.notice = None;
    }

    pub async fn has_error(&self) -> bool {
        self.ui_state
            .lock()
            .await
            .notice
            .as_ref()
            .is_some_and(|n| n.level == NoticeLevel::Error)
    }

    /// Drop info notices older than their TTL. Errors wait for the user.
    pub async fn clear_expired_notices(&self) {
        let mut state = self.ui_state.lock().await;
        if state.notice.as_ref().is_some_and(Notice::is_expired) {
            state.notice = None;
        }
    }

    // ========================================================================
    // Prompts & popups
    // ========================================================================

    pub async fn open_prompt(&self, kind: PromptKind) {
        self.ui_state.lock().await.prompt = Some(Prompt::new(kind));
    }

    pub async fn close_prompt(&self) -> Option<Prompt> {
        self.ui_state.lock().await.prompt.take()
    }

    pub async fn is_prompt_open(&self) -> bool {
        self.ui_state.lock().await.prompt.is_some()
    }

    pub async fn prompt_push_char(&self, c: char) {
        if let Some(prompt) = self.ui_state.lock().await.prompt.as_mut() {
            prompt.push_char(c);
        }
    }

    pub async fn prompt_backspace(&self) {
        if let Some(prompt) = self.ui_state.lock().await.prompt.as_mut() {
            prompt.backspace();
        }
    }

    pub async fn prompt_next_field(&self) {
        if let Some(prompt) = self.ui_state.lock().await.prompt.as_mut() {
            prompt.next_field();
        }
    }

    pub async fn show_help_popup(&self) {
        self.ui_state.lock().await.show_help_popup = true;
    }

    pub async fn hide_help_popup(&self) {
        self.ui_state.lock().await.show_help_popup = false;
    }

    pub async fn is_help_popup_open(&self) -> bool {
        self.ui_state.lock().await.show_help_popup
    }

    // ========================================================================
    // Content
    // ========================================================================

    pub async fn get_content_state(&self) -> ContentState {
        self.content_state.lock().await.clone()
    }

    pub async fn set_loading(&self, loading: bool) {
        self.content_state.lock().await.is_loading = loading;
    }

    /// Top-level views reset the back stack.
    async fn set_root_view(&self, view: ContentView) {
        let mut state = self.content_state.lock().await;
        state.navigation_stack.clear();
        state.view = view;
        state.is_loading = false;
    }

    pub async fn set_library(&self, page: TrackPage, sort: SortKey) {
        let mut state = self.content_state.lock().await;
        let selected_index = match &state.view {
            ContentView::Library { page: current, sort: current_sort, selected_index, .. }
                if *current == page.page && *current_sort == sort =>
            {
                (*selected_index).min(page.tracks.len().saturating_sub(1))
            }
            _ => 0,
        };
        state.navigation_stack.clear();
        state.view = ContentView::Library {
            tracks: page.tracks,
            page: page.page.max(1),
            pages: page.pages.max(1),
            sort,
            selected_index,
        };
        state.is_loading = false;
    }

    pub async fn set_search_results(&self, query: String, tracks: Vec<Track>) {
        self.set_root_view(ContentView::SearchResults {
            query,
            tracks,
            selected_index: 0,
        })
        .await;
    }

    pub async fn set_playlists(&self, playlists: Vec<PlaylistSummary>) {
        self.set_root_view(ContentView::Playlists {
            playlists,
            selected_index: 0,
        })
        .await;
    }

    pub async fn set_playlist_detail(&self, detail: PlaylistDetail) {
        let mut state = self.content_state.lock().await;

        if !matches!(state.view, ContentView::Empty) {
            let previous_view = state.view.clone();
            state.navigation_stack.push(previous_view);
        }
        state.view = ContentView::PlaylistDetail {
            detail,
            selected_index: 0,
        };
        state.is_loading = false;
    }

    /// Refreshes keep the selection when the list is already shown.
    pub async fn set_downloads(&self, entries: Vec<DownloadEntry>) {
        let mut state = self.content_state.lock().await;
        let selected_index = match &state.view {
            ContentView::Downloads { selected_index, .. } => {
                (*selected_index).min(entries.len().saturating_sub(1))
            }
            _ => 0,
        };
        state.navigation_stack.clear();
        state.view = ContentView::Downloads {
            entries,
            selected_index,
        };
        state.is_loading = false;
    }

    pub async fn set_settings(&self, directories: Vec<String>) {
        let mut state = self.content_state.lock().await;
        let selected_index = match &state.view {
            ContentView::Settings { selected_index, .. } => {
                (*selected_index).min(directories.len().saturating_sub(1))
            }
            _ => 0,
        };
        state.navigation_stack.clear();
        state.view = ContentView::Settings {
            directories,
            selected_index,
        };
        state.is_loading = false;
    }

    /// Pop the back stack. Returns false when already at the root.
    pub async fn navigate_back(&self) -> bool {
        let mut state = self.content_state.lock().await;
        match state.navigation_stack.pop() {
            Some(previous) => {
                state.view = previous;
                true
            }
            None => false,
        }
    }

    pub async fn move_selection_up(&self) {
        self.content_state.lock().await.view.move_up();
    }

    pub async fn move_selection_down(&self) {
        self.content_state.lock().await.view.move_down();
    }

    pub async fn selected_track(&self) -> Option<Track> {
        self.content_state.lock().await.view.selected_track()
    }

    /// Visible tracks and the selected row, for queueing a whole listing.
    pub async fn visible_tracks(&self) -> Option<(Vec<Track>, usize)> {
        let state = self.content_state.lock().await;
        let tracks = state.view.tracks()?;
        Some((tracks, state.view.selected_index()))
    }

    pub async fn selected_playlist(&self) -> Option<PlaylistSummary> {
        let state = self.content_state.lock().await;
        match &state.view {
            ContentView::Playlists { playlists, selected_index } => playlists.get(*selected_index).cloned(),
            _ => None,
        }
    }

    pub async fn selected_directory(&self) -> Option<String> {
        let state = self.content_state.lock().await;
        match &state.view {
            ContentView::Settings { directories, selected_index } => directories.get(*selected_index).cloned(),
            _ => None,
        }
    }

    /// Page and sort of the library listing, if it is shown.
    pub async fn library_position(&self) -> Option<(u32, u32, SortKey)> {
        match &self.content_state.lock().await.view {
            ContentView::Library { page, pages, sort, .. } => Some((*page, *pages, *sort)),
            _ => None,
        }
    }

    /// Replace a track everywhere it is shown, e.g. after a favorite toggle.
    pub async fn update_track(&self, updated: Track) {
        let mut state = self.content_state.lock().await;
        let replace = |tracks: &mut Vec<Track>| {
            for track in tracks.iter_mut().filter(|t| t.id == updated.id) {
                *track = updated.clone();
            }
        };
        match &mut state.view {
            ContentView::Library { tracks, .. } | ContentView::SearchResults { tracks, .. } => replace(tracks),
            ContentView::PlaylistDetail { detail, .. } => {
                for entry in detail.tracks.iter_mut().filter(|e| e.track.id == updated.id) {
                    entry.track = updated.clone();
                }
            }
            _ => {}
        }
    }
}
