//! Playback control methods

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::model::{PlaybackSession, SessionEffect, SEEK_STEP_SECS, VOLUME_STEP};
use super::AppController;

impl AppController {
    async fn session(&self) -> Arc<Mutex<PlaybackSession>> {
        self.model.lock().await.session()
    }

    /// Run one session transition and apply whatever it asks for.
    async fn with_session<F>(&self, transition: F)
    where
        F: FnOnce(&mut PlaybackSession) -> Option<SessionEffect>,
    {
        let session = self.session().await;
        let effect = {
            let mut session = session.lock().await;
            transition(&mut session)
        };
        self.apply_effect(effect).await;
    }

    /// Play only the selected track.
    pub async fn play_selected(&self) {
        let selected = self.model.lock().await.selected_track().await;
        if let Some(track) = selected {
            tracing::debug!(track_id = %track.id, "Playing selected track");
            self.with_session(|session| session.play(track)).await;
        }
    }

    /// Queue the whole visible listing, starting at the selection.
    pub async fn play_all_from_selection(&self) {
        let visible = self.model.lock().await.visible_tracks().await;
        if let Some((tracks, index)) = visible {
            tracing::debug!(queue_len = tracks.len(), index, "Queueing visible tracks");
            self.with_session(|session| session.play_from(tracks, index)).await;
        }
    }

    pub async fn toggle_playback(&self) {
        self.with_session(PlaybackSession::toggle_play_pause).await;
    }

    pub async fn next_track(&self) {
        tracing::debug!("Skipping to next track");
        self.with_session(PlaybackSession::play_next).await;
    }

    pub async fn previous_track(&self) {
        self.with_session(PlaybackSession::play_previous).await;
    }

    pub async fn toggle_shuffle(&self) {
        self.with_session(|session| {
            let shuffle = session.toggle_shuffle();
            tracing::info!(shuffle, mode = ?session.queue().shuffle_mode(), "Shuffle toggled");
            None
        })
        .await;
    }

    pub async fn toggle_repeat(&self) {
        self.with_session(|session| {
            let repeat = session.toggle_repeat();
            tracing::info!(repeat, "Repeat toggled");
            None
        })
        .await;
    }

    pub async fn volume_up(&self) {
        self.with_session(|session| {
            session.change_volume(VOLUME_STEP);
            None
        })
        .await;
    }

    pub async fn volume_down(&self) {
        self.with_session(|session| {
            session.change_volume(-VOLUME_STEP);
            None
        })
        .await;
    }

    pub async fn toggle_mute(&self) {
        self.with_session(|session| {
            session.toggle_mute();
            None
        })
        .await;
    }

    pub async fn seek_forward(&self) {
        self.with_session(|session| {
            session.seek_by(SEEK_STEP_SECS);
            None
        })
        .await;
    }

    pub async fn seek_backward(&self) {
        self.with_session(|session| {
            session.seek_by(-SEEK_STEP_SECS);
            None
        })
        .await;
    }

    /// Digit keys: `3` seeks to 30% of the track.
    pub async fn seek_to_digit(&self, digit: u32) {
        let percent = f64::from(digit.min(9)) * 10.0;
        self.with_session(|session| {
            session.seek_percent(percent);
            None
        })
        .await;
    }
}
