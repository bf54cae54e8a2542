//! Controller module - Application logic and event handling
//!
//! This module contains the application controller that handles user input,
//! coordinates between the model and view, and drives the playback session.
//! It is organized into submodules by responsibility:
//!
//! - `input`: Key event handling
//! - `playback`: Playback control methods
//! - `navigation`: Library/playlist/search/settings navigation
//! - `jobs`: Scan and download polling
//! - `player_events`: Transport event listener

mod input;
mod playback;
mod navigation;
mod jobs;
mod player_events;

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::error::{ApiError, AppError};
use crate::jobs::{JobPoller, PollHandle, PollPolicy};
use crate::model::{AppModel, SessionEffect};

#[derive(Clone)]
pub struct AppController {
    pub(crate) model: Arc<Mutex<AppModel>>,
    pub(crate) config: Arc<Mutex<AppConfig>>,
    poller: JobPoller,
    scan_poll: Arc<Mutex<Option<PollHandle>>>,
    download_polls: Arc<Mutex<Vec<PollHandle>>>,
    page_size: u32,
}

impl AppController {
    pub fn new(model: Arc<Mutex<AppModel>>, config: AppConfig) -> Self {
        let poller = JobPoller::new(
            config.poll_interval(),
            PollPolicy {
                timeout: config.poll_timeout(),
                max_failures: config.max_poll_failures,
            },
        );

        Self {
            model,
            page_size: config.page_size.max(1),
            config: Arc::new(Mutex::new(config)),
            poller,
            scan_poll: Arc::new(Mutex::new(None)),
            download_polls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Carry out what a session transition asked for.
    pub(crate) async fn apply_effect(&self, effect: Option<SessionEffect>) {
        match effect {
            Some(SessionEffect::MarkPlayed(track_id)) => {
                let client = self.model.lock().await.client();
                tokio::spawn(async move {
                    if let Err(e) = client.mark_played(track_id).await {
                        tracing::warn!(track_id = %track_id, error = %e, "Failed to record play");
                    }
                });
            }
            Some(SessionEffect::Notice(message)) => {
                self.model.lock().await.set_error(message).await;
            }
            None => {}
        }
    }

    pub(crate) async fn report_error(&self, context: &str, error: &AppError) {
        match error {
            e if e.is_validation() => tracing::debug!(error = %e, "{} rejected", context),
            AppError::Network(api) => {
                tracing::error!(error = %api, status = ?api.status_code(), "{} failed", context)
            }
            e => tracing::error!(error = %e, "{} failed", context),
        }
        let model = self.model.lock().await;
        model.set_error(Self::format_error(error)).await;
    }

    pub(crate) fn format_error(error: &AppError) -> String {
        match error {
            AppError::Validation(message) => message.clone(),
            AppError::Network(api) => match api {
                ApiError::Status { status: 404, .. } => "Not found on the server.".to_string(),
                ApiError::Status { status, reason } if *status >= 500 => {
                    format!("Server error ({} {}). Try again later.", status, reason)
                }
                ApiError::Status { status, reason } => format!("Request rejected: {} {}", status, reason),
                ApiError::Transport(e) if e.is_timeout() => {
                    "The music server took too long to respond.".to_string()
                }
                ApiError::Transport(e) if e.is_connect() => {
                    "Cannot reach the music server. Is it running?".to_string()
                }
                ApiError::Decode(_) => "Unexpected response from the music server.".to_string(),
                other => format!("Error: {}", other),
            },
            other => format!("Error: {}", other),
        }
    }

    /// Stop every background poll and the audio output.
    pub async fn shutdown(&self) {
        let mut handles: Vec<PollHandle> = self.download_polls.lock().await.drain(..).collect();
        handles.extend(self.scan_poll.lock().await.take());
        for handle in handles {
            handle.cancel();
            let outcome = handle.join().await;
            tracing::debug!(?outcome, "Poll stopped");
        }

        let session = self.model.lock().await.session();
        session.lock().await.stop();
        tracing::info!("Controller shut down");
    }
}
