//! Navigation-related controller methods (library, search, playlists, settings)

use crate::error::AppError;
use crate::model::{ActiveSection, SortKey};
use super::AppController;

impl AppController {
    /// Load whatever the newly focused section shows.
    pub async fn enter_section(&self, section: ActiveSection) {
        match section {
            ActiveSection::Library => self.reload_library().await,
            ActiveSection::Playlists => self.load_playlists().await,
            ActiveSection::Downloads => self.load_downloads().await,
            ActiveSection::Settings => self.load_settings().await,
            ActiveSection::Search => {}
        }
    }

    pub async fn load_stats(&self) {
        let client = self.model.lock().await.client();
        match client.stats().await {
            Ok(stats) => {
                tracing::debug!(tracks = stats.total_tracks, "Library stats loaded");
                self.model.lock().await.set_stats(stats).await;
            }
            Err(e) => self.report_error("Loading stats", &AppError::from(e)).await,
        }
    }

    pub async fn load_library(&self, page: u32, sort: SortKey) {
        let model = self.model.lock().await;
        model.set_loading(true).await;
        let client = model.client();
        drop(model);

        match client.tracks(page.max(1), self.page_size, sort).await {
            Ok(track_page) => {
                tracing::info!(
                    page = track_page.page,
                    pages = track_page.pages,
                    tracks = track_page.tracks.len(),
                    sort = sort.as_param(),
                    "Library page loaded"
                );
                self.model.lock().await.set_library(track_page, sort).await;
            }
            Err(e) => {
                self.model.lock().await.set_loading(false).await;
                self.report_error("Loading library", &AppError::from(e)).await;
            }
        }
    }

    /// Reload the page being shown, or the first page.
    pub async fn reload_library(&self) {
        let position = self.model.lock().await.library_position().await;
        let (page, sort) = position
            .map(|(page, _, sort)| (page, sort))
            .unwrap_or((1, SortKey::default()));
        self.load_library(page, sort).await;
    }

    pub async fn next_page(&self) {
        let position = self.model.lock().await.library_position().await;
        if let Some((page, pages, sort)) = position {
            if page < pages {
                self.load_library(page + 1, sort).await;
            }
        }
    }

    pub async fn previous_page(&self) {
        let position = self.model.lock().await.library_position().await;
        if let Some((page, _, sort)) = position {
            if page > 1 {
                self.load_library(page - 1, sort).await;
            }
        }
    }

    /// Next sort key, back to the first page.
    pub async fn cycle_sort(&self) {
        let position = self.model.lock().await.library_position().await;
        if let Some((_, _, sort)) = position {
            self.load_library(1, sort.next()).await;
        }
    }

    /// An empty query goes back to the library listing.
    pub async fn perform_search(&self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            self.model.lock().await.set_active_section(ActiveSection::Library).await;
            self.load_library(1, SortKey::default()).await;
            return;
        }

        tracing::debug!(query, "Performing search");
        let model = self.model.lock().await;
        model.set_loading(true).await;
        let client = model.client();
        drop(model);

        match client.search(query).await {
            Ok(tracks) => {
                tracing::info!(query, tracks = tracks.len(), "Search completed successfully");
                self.model
                    .lock()
                    .await
                    .set_search_results(query.to_string(), tracks)
                    .await;
            }
            Err(e) => {
                tracing::error!(query, error = %e, "Search failed");
                self.model.lock().await.set_loading(false).await;
                self.report_error("Search", &AppError::from(e)).await;
            }
        }
    }

    pub async fn toggle_favorite(&self) {
        let model = self.model.lock().await;
        let Some(track) = model.selected_track().await else {
            return;
        };
        let client = model.client();
        drop(model);

        match client.toggle_favorite(track.id).await {
            Ok(updated) => {
                tracing::info!(track_id = %updated.id, favorite = updated.favorite, "Favorite toggled");
                self.model.lock().await.update_track(updated).await;
            }
            Err(e) => self.report_error("Toggling favorite", &AppError::from(e)).await,
        }
    }

    pub async fn load_playlists(&self) {
        let model = self.model.lock().await;
        model.set_loading(true).await;
        let client = model.client();
        drop(model);

        match client.playlists().await {
            Ok(playlists) => {
                tracing::debug!(count = playlists.len(), "Playlists loaded");
                self.model.lock().await.set_playlists(playlists).await;
            }
            Err(e) => {
                self.model.lock().await.set_loading(false).await;
                self.report_error("Loading playlists", &AppError::from(e)).await;
            }
        }
    }

    pub async fn open_selected_playlist(&self) {
        let model = self.model.lock().await;
        let Some(playlist) = model.selected_playlist().await else {
            return;
        };
        model.set_loading(true).await;
        let client = model.client();
        drop(model);

        match client.playlist(playlist.id).await {
            Ok(detail) => {
                tracing::info!(playlist_id = detail.id, tracks = detail.tracks.len(), "Playlist opened");
                self.model.lock().await.set_playlist_detail(detail).await;
            }
            Err(e) => {
                self.model.lock().await.set_loading(false).await;
                self.report_error("Opening playlist", &AppError::from(e)).await;
            }
        }
    }

    pub async fn create_playlist(&self, name: &str, description: &str) {
        let client = self.model.lock().await.client();

        match client.create_playlist(name, description).await {
            Ok(playlist) => {
                tracing::info!(playlist_id = playlist.id, name = %playlist.name, "Playlist created");
                self.model
                    .lock()
                    .await
                    .set_info(format!("Playlist \"{}\" created", playlist.name))
                    .await;
                self.load_playlists().await;
            }
            Err(e) => self.report_error("Creating playlist", &e).await,
        }
    }

    pub async fn load_downloads(&self) {
        let client = self.model.lock().await.client();
        match client.downloads().await {
            Ok(downloads) => {
                self.model.lock().await.set_downloads(downloads.entries()).await;
            }
            Err(e) => self.report_error("Loading downloads", &AppError::from(e)).await,
        }
    }

    pub async fn load_settings(&self) {
        let client = self.model.lock().await.client();
        match client.settings().await {
            Ok(settings) => {
                self.model
                    .lock()
                    .await
                    .set_settings(settings.music_directories)
                    .await;
            }
            Err(e) => self.report_error("Loading settings", &AppError::from(e)).await,
        }
    }

    pub async fn add_directory(&self, directory: &str) {
        let client = self.model.lock().await.client();
        match client.add_directory(directory).await {
            Ok(()) => {
                tracing::info!(directory = directory.trim(), "Music directory added");
                self.load_settings().await;
            }
            Err(e) => self.report_error("Adding directory", &e).await,
        }
    }

    pub async fn remove_selected_directory(&self) {
        let model = self.model.lock().await;
        let Some(directory) = model.selected_directory().await else {
            return;
        };
        let client = model.client();
        drop(model);

        match client.remove_directory(&directory).await {
            Ok(()) => {
                tracing::info!(directory, "Music directory removed");
                self.load_settings().await;
            }
            Err(e) => self.report_error("Removing directory", &e).await,
        }
    }

    /// Flip the theme and remember it.
    pub async fn toggle_theme(&self) {
        let theme = self.model.lock().await.toggle_theme().await;

        let mut config = self.config.lock().await;
        config.theme = theme;
        if let Err(e) = config.save() {
            drop(config);
            self.report_error("Saving settings", &e).await;
        }
    }

    /// Reload after a scan finished.
    pub(crate) async fn refresh_library_and_stats(&self) {
        futures::join!(self.load_stats(), self.reload_library());
    }
}
