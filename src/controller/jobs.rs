//! Scan and download polling

use crate::error::{ApiError, AppError};
use crate::jobs::{
    download_status, scan_status, JobHandle, JobKind, JobState, JobStatus, PollHandle,
};
use crate::model::{ActiveSection, DownloadSource};
use super::AppController;

const DEFAULT_QUALITY: u32 = 320;

impl AppController {
    /// Start a library scan. Refused while a scan is still being polled.
    pub async fn start_scan(&self) {
        let mut slot = self.scan_poll.lock().await;
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            tracing::debug!("Scan already running, ignoring request");
            self.model
                .lock()
                .await
                .set_info("A library scan is already running".to_string())
                .await;
            return;
        }

        let client = self.model.lock().await.client();
        let fetch_client = client.clone();
        let controller = self.clone();

        let started = self
            .poller
            .start(
                JobKind::Scan,
                || async move { client.start_scan().await.map(|_| JobHandle::scan()) },
                move |_| {
                    let client = fetch_client.clone();
                    async move { client.scan_progress().await.map(|p| scan_status(&p)) }
                },
                move |status| {
                    tokio::spawn(async move { controller.on_scan_finished(status).await });
                },
            )
            .await;

        match started {
            Ok(handle) => {
                let model = self.model.lock().await;
                model.set_scan_status(handle.latest()).await;
                model.set_info("Library scan started".to_string()).await;
                drop(model);

                self.forward_scan_progress(&handle);
                *slot = Some(handle);
            }
            Err(e) => {
                drop(slot);
                self.report_error("Starting scan", &AppError::from(e)).await;
            }
        }
    }

    /// Mirror poll observations into the header while the scan runs.
    fn forward_scan_progress(&self, handle: &PollHandle) {
        let mut status = handle.subscribe();
        let model = self.model.clone();

        tokio::spawn(async move {
            while status.changed().await.is_ok() {
                let latest = status.borrow_and_update().clone();
                model.lock().await.set_scan_status(latest).await;
            }
        });
    }

    async fn on_scan_finished(&self, status: JobStatus) {
        {
            let model = self.model.lock().await;
            model.set_scan_status(Some(status.clone())).await;
            match status.state {
                JobState::Failed => model.set_error("Library scan failed".to_string()).await,
                _ => model.set_info("Library scan complete".to_string()).await,
            }
        }
        self.refresh_library_and_stats().await;
    }

    /// Submit a download and track it until the server reports it done.
    pub async fn start_download(&self, url: &str, format: &str, quality: &str) {
        let quality = match quality.trim() {
            "" => DEFAULT_QUALITY,
            value => match value.parse::<u32>() {
                Ok(quality) => quality,
                Err(_) => {
                    let error = AppError::validation("Quality must be a number, e.g. 320");
                    self.report_error("Starting download", &error).await;
                    return;
                }
            },
        };

        let client = self.model.lock().await.client();
        let fetch_client = client.clone();
        let controller = self.clone();
        let url = url.to_string();
        let format = format.to_string();

        let started = self
            .poller
            .start(
                JobKind::Download,
                || async move {
                    let (source, id) = client.start_download(&url, &format, quality).await?;
                    Ok::<_, AppError>(JobHandle::download(source, id))
                },
                move |job| {
                    let client = fetch_client.clone();
                    async move {
                        let downloads = client.downloads().await?;
                        let id = job.id.unwrap_or_default();
                        let source = job.source.unwrap_or(DownloadSource::YouTube);
                        Ok::<_, ApiError>(download_status(&id, downloads.find(source, &id)))
                    }
                },
                move |status| {
                    tokio::spawn(async move { controller.on_download_finished(status).await });
                },
            )
            .await;

        match started {
            Ok(handle) => {
                let source = handle.job().source.map(DownloadSource::label).unwrap_or("Download");
                self.model
                    .lock()
                    .await
                    .set_info(format!("{} download started", source))
                    .await;

                let mut polls = self.download_polls.lock().await;
                polls.retain(|handle| !handle.is_finished());
                polls.push(handle);
                drop(polls);

                self.refresh_downloads_if_visible().await;
            }
            Err(e) => self.report_error("Starting download", &e).await,
        }
    }

    async fn on_download_finished(&self, status: JobStatus) {
        let id = status.id.clone().unwrap_or_default();
        {
            let model = self.model.lock().await;
            match status.state {
                JobState::Failed => {
                    let reason = status.detail.unwrap_or_else(|| "unknown error".to_string());
                    model.set_error(format!("Download {} failed: {}", id, reason)).await;
                }
                _ => {
                    let name = status.detail.unwrap_or(id);
                    model.set_info(format!("Downloaded {}", name)).await;
                }
            }
        }
        self.refresh_downloads_if_visible().await;
    }

    async fn refresh_downloads_if_visible(&self) {
        let section = self.model.lock().await.active_section().await;
        if section == ActiveSection::Downloads {
            self.load_downloads().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::controller::test_support::{controller_for, eventually};
    use crate::model::NoticeLevel;

    async fn requests_to(server: &MockServer, endpoint: &str) -> usize {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == endpoint)
            .count()
    }

    async fn mount_scan(server: &MockServer, scanned: u64, total: u64) {
        Mock::given(method("POST"))
            .and(path("/api/scan/start"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/scan/progress"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "scanned": scanned, "total": total })),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn second_scan_is_refused_while_the_first_runs() {
        let server = MockServer::start().await;
        mount_scan(&server, 3, 10).await;
        let controller = controller_for(&server.uri());

        controller.start_scan().await;
        let server_ref = &server;
        eventually("a progress poll", move || async move {
            requests_to(server_ref, "/api/scan/progress").await > 0
        })
        .await;
        controller.start_scan().await;

        assert_eq!(requests_to(&server, "/api/scan/start").await, 1);
        let ui = controller.model.lock().await.get_ui_state().await;
        assert_eq!(
            ui.notice.map(|n| n.message),
            Some("A library scan is already running".to_string())
        );

        controller.shutdown().await;
    }

    #[tokio::test]
    async fn finished_scan_reloads_stats_and_library() {
        let server = MockServer::start().await;
        mount_scan(&server, 10, 10).await;
        Mock::given(method("GET"))
            .and(path("/api/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_tracks": 1, "total_artists": 1, "total_albums": 1, "total_playlists": 0
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/tracks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tracks": [{ "id": 1, "title": "Under Pressure", "artist": "Queen" }],
                "page": 1, "pages": 1, "total": 1
            })))
            .mount(&server)
            .await;
        let controller = controller_for(&server.uri());

        controller.start_scan().await;

        let server_ref = &server;
        eventually("the library reload", move || async move {
            requests_to(server_ref, "/api/stats").await > 0
                && requests_to(server_ref, "/api/tracks").await > 0
        })
        .await;
        let controller_ref = &controller;
        eventually("the reloaded page", move || async move {
            let model = controller_ref.model.lock().await;
            model.get_ui_state().await.stats.total_tracks == 1
                && model.get_content_state().await.view.len() == 1
        })
        .await;
    }

    #[tokio::test]
    async fn failed_download_raises_an_error_notice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/download/youtube"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "download_id": 7 })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/downloads"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "youtube": {
                    "7": { "url": "https://youtu.be/x", "status": "error", "error": "Video unavailable" }
                },
                "spotify": {}
            })))
            .mount(&server)
            .await;
        let controller = controller_for(&server.uri());

        controller.start_download("https://youtu.be/x", "mp3", "320").await;

        let controller_ref = &controller;
        eventually("the failure notice", move || async move {
            controller_ref.model.lock().await.has_error().await
        })
        .await;
        let notice = controller.model.lock().await.get_ui_state().await.notice.unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "Download 7 failed: Video unavailable");
    }

    #[tokio::test]
    async fn non_numeric_quality_is_rejected_without_a_request() {
        let server = MockServer::start().await;
        let controller = controller_for(&server.uri());

        controller.start_download("https://youtu.be/x", "mp3", "abc").await;

        let notice = controller.model.lock().await.get_ui_state().await.notice.unwrap();
        assert_eq!(notice.message, "Quality must be a number, e.g. 320");
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
