//! Playback session: the player state machine over a [`MediaTransport`].

use std::sync::Arc;

use crate::audio::{LoadGeneration, MediaTransport, TransportEvent, TransportEventKind};
use crate::config::{DEFAULT_VOLUME, ShuffleMode};
use super::api_client::stream_url;
use super::content::{Track, TrackId};
use super::queue::{PreviousStep, QueueController};

/// Seconds moved by a relative seek.
pub const SEEK_STEP_SECS: f64 = 5.0;
pub const VOLUME_STEP: f32 = 0.05;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Loading,
    Playing,
    Paused,
    Ended,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VolumeIcon {
    Muted,
    Low,
    High,
}

impl VolumeIcon {
    pub fn for_volume(volume: f32) -> Self {
        if volume <= 0.0 {
            VolumeIcon::Muted
        } else if volume < 0.5 {
            VolumeIcon::Low
        } else {
            VolumeIcon::High
        }
    }
}

/// User-facing playback flags. Position and duration are not stored here;
/// they are always read from the transport.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackState {
    pub current_track: Option<Track>,
    pub is_playing: bool,
    pub shuffle: bool,
    pub repeat: bool,
    pub volume: f32,
    pub previous_volume: Option<f32>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_track: None,
            is_playing: false,
            shuffle: false,
            repeat: false,
            volume: DEFAULT_VOLUME,
            previous_volume: None,
        }
    }
}

/// Work the session asks its owner to do outside the state machine.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEffect {
    /// Record a play on the server. Fire and forget.
    MarkPlayed(TrackId),
    /// Show a blocking error notice.
    Notice(String),
}

/// Snapshot handed to the view.
#[derive(Clone, Debug)]
pub struct PlaybackInfo {
    pub track: Option<Track>,
    pub player_state: PlayerState,
    pub is_playing: bool,
    pub position_secs: f64,
    pub duration_secs: Option<f64>,
    pub shuffle: bool,
    pub shuffle_mode: ShuffleMode,
    pub repeat: bool,
    pub volume: f32,
    pub volume_icon: VolumeIcon,
    /// 1-based position and queue length.
    pub queue_position: Option<(usize, usize)>,
}

impl Default for PlaybackInfo {
    fn default() -> Self {
        Self {
            track: None,
            player_state: PlayerState::Idle,
            is_playing: false,
            position_secs: 0.0,
            duration_secs: None,
            shuffle: false,
            shuffle_mode: ShuffleMode::default(),
            repeat: false,
            volume: DEFAULT_VOLUME,
            volume_icon: VolumeIcon::for_volume(DEFAULT_VOLUME),
            queue_position: None,
        }
    }
}

impl PlaybackInfo {
    pub fn progress_ratio(&self) -> f64 {
        match self.duration_secs {
            Some(duration) if duration > 0.0 => (self.position_secs / duration).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }
}

/// Owns the queue and is the only writer to the transport.
pub struct PlaybackSession {
    transport: Arc<dyn MediaTransport>,
    queue: QueueController,
    generation: LoadGeneration,
    player: PlayerState,
    state: PlaybackState,
    server_url: String,
}

impl PlaybackSession {
    pub fn new(
        transport: Arc<dyn MediaTransport>,
        server_url: impl Into<String>,
        volume: f32,
        shuffle_mode: ShuffleMode,
    ) -> Self {
        let mut session = Self {
            transport,
            queue: QueueController::new(shuffle_mode),
            generation: LoadGeneration::default(),
            player: PlayerState::Idle,
            state: PlaybackState::default(),
            server_url: server_url.into(),
        };
        session.set_volume(volume);
        session
    }

    #[cfg(test)]
    pub fn player_state(&self) -> PlayerState {
        self.player
    }

    #[cfg(test)]
    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn queue(&self) -> &QueueController {
        &self.queue
    }

    #[cfg(test)]
    pub fn generation(&self) -> LoadGeneration {
        self.generation
    }

    /// Play a single track, replacing the queue with it.
    pub fn play(&mut self, track: Track) -> Option<SessionEffect> {
        self.play_from(vec![track], 0)
    }

    /// Replace the queue with `tracks` and start at `index`.
    pub fn play_from(&mut self, tracks: Vec<Track>, index: usize) -> Option<SessionEffect> {
        if index >= tracks.len() {
            return None;
        }
        self.queue.replace(tracks, index);
        self.begin_load()
    }

    /// Load whatever the queue currently points at under a fresh generation.
    fn begin_load(&mut self) -> Option<SessionEffect> {
        let track = self.queue.current()?.clone();

        self.generation = self.generation.next();
        self.player = PlayerState::Loading;
        self.state.is_playing = false;

        let url = stream_url(&self.server_url, track.id);
        tracing::info!(
            track_id = %track.id,
            title = %track.display_title(),
            generation = self.generation.value(),
            "Loading track"
        );
        self.transport.load(self.generation, &url);

        let id = track.id;
        self.state.current_track = Some(track);
        Some(SessionEffect::MarkPlayed(id))
    }

    pub fn handle_transport_event(&mut self, event: TransportEvent) -> Option<SessionEffect> {
        if event.generation != self.generation {
            tracing::debug!(
                event_generation = event.generation.value(),
                current_generation = self.generation.value(),
                "Ignoring superseded transport event"
            );
            return None;
        }

        match event.kind {
            TransportEventKind::Loaded { duration } => {
                if self.player == PlayerState::Loading {
                    tracing::debug!(?duration, "Track loaded");
                    self.player = PlayerState::Playing;
                    self.state.is_playing = true;
                }
                None
            }
            TransportEventKind::TimeUpdate { .. } => None,
            TransportEventKind::Ended => {
                if self.player != PlayerState::Playing {
                    return None;
                }
                self.player = PlayerState::Ended;
                self.state.is_playing = false;

                match self.queue.peek_next() {
                    Some(index) => {
                        self.queue.jump_to(index);
                        self.begin_load()
                    }
                    None => {
                        tracing::debug!("Queue finished");
                        self.player = PlayerState::Idle;
                        None
                    }
                }
            }
            TransportEventKind::Error { message } => {
                tracing::error!(error = %message, generation = self.generation.value(), "Playback failed");
                self.player = PlayerState::Idle;
                self.state.is_playing = false;
                Some(SessionEffect::Notice(format!("Playback failed: {}", message)))
            }
        }
    }

    /// Pause/resume. From `Idle` with a track still shown, reload it.
    /// Ignored while a load is in flight.
    pub fn toggle_play_pause(&mut self) -> Option<SessionEffect> {
        match self.player {
            PlayerState::Playing => {
                self.transport.pause();
                self.player = PlayerState::Paused;
                self.state.is_playing = false;
                None
            }
            PlayerState::Paused => {
                self.transport.play();
                self.player = PlayerState::Playing;
                self.state.is_playing = true;
                None
            }
            PlayerState::Idle | PlayerState::Ended => self.begin_load(),
            PlayerState::Loading => None,
        }
    }

    pub fn play_next(&mut self) -> Option<SessionEffect> {
        let index = self.queue.peek_next()?;
        self.queue.jump_to(index);
        self.begin_load()
    }

    pub fn play_previous(&mut self) -> Option<SessionEffect> {
        let elapsed = self.transport.current_time();
        match self.queue.peek_previous(elapsed)? {
            PreviousStep::Restart => {
                self.transport.seek(0.0);
                None
            }
            PreviousStep::Move(index) => {
                self.queue.jump_to(index);
                self.begin_load()
            }
        }
    }

    /// Seek to `percent` (0..=100) of the track. No-op until the duration is known.
    pub fn seek_percent(&mut self, percent: f64) {
        let Some(duration) = self.known_duration() else {
            return;
        };
        if percent.is_nan() {
            return;
        }
        self.transport.seek(percent.clamp(0.0, 100.0) / 100.0 * duration);
    }

    /// Seek relative to the current position, within the track.
    pub fn seek_by(&mut self, delta_secs: f64) {
        if !matches!(self.player, PlayerState::Playing | PlayerState::Paused) || delta_secs.is_nan() {
            return;
        }
        let mut target = (self.transport.current_time() + delta_secs).max(0.0);
        if let Some(duration) = self.known_duration() {
            target = target.min(duration);
        }
        self.transport.seek(target);
    }

    fn known_duration(&self) -> Option<f64> {
        self.transport
            .duration()
            .filter(|d| d.is_finite() && *d > 0.0)
    }

    /// Clamp to `[0, 1]`. NaN is ignored.
    pub fn set_volume(&mut self, volume: f32) {
        if volume.is_nan() {
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        self.state.volume = volume;
        self.transport.set_volume(volume);
    }

    pub fn change_volume(&mut self, delta: f32) {
        self.set_volume(self.state.volume + delta);
    }

    pub fn toggle_mute(&mut self) {
        if self.state.volume > 0.0 {
            self.state.previous_volume = Some(self.state.volume);
            self.set_volume(0.0);
        } else {
            let restored = self.state.previous_volume.take().unwrap_or(DEFAULT_VOLUME);
            self.set_volume(restored);
        }
    }

    pub fn volume_icon(&self) -> VolumeIcon {
        VolumeIcon::for_volume(self.state.volume)
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.state.shuffle = self.queue.toggle_shuffle();
        self.state.shuffle
    }

    pub fn toggle_repeat(&mut self) -> bool {
        self.state.repeat = self.queue.toggle_repeat();
        self.state.repeat
    }

    /// Stop output and abandon any pending load, e.g. on quit.
    pub fn stop(&mut self) {
        self.transport.stop();
        self.generation = self.generation.next();
        self.player = PlayerState::Idle;
        self.state.is_playing = false;
    }

    pub fn info(&self) -> PlaybackInfo {
        PlaybackInfo {
            track: self.state.current_track.clone(),
            player_state: self.player,
            is_playing: self.state.is_playing,
            position_secs: self.transport.current_time(),
            duration_secs: self.transport.duration(),
            shuffle: self.state.shuffle,
            shuffle_mode: self.queue.shuffle_mode(),
            repeat: self.state.repeat,
            volume: self.state.volume,
            volume_icon: self.volume_icon(),
            queue_position: self.queue.index().map(|i| (i + 1, self.queue.len())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        Load(LoadGeneration, String),
        Play,
        Pause,
        Seek(f64),
        Volume(f32),
        Stop,
    }

    #[derive(Default)]
    struct FakeTransport {
        calls: Mutex<Vec<Call>>,
        position: Mutex<f64>,
        duration: Mutex<Option<f64>>,
    }

    impl FakeTransport {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn loads(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::Load(_, url) => Some(url),
                    _ => None,
                })
                .collect()
        }

        fn set_position(&self, secs: f64) {
            *self.position.lock().unwrap() = secs;
        }

        fn set_duration(&self, secs: Option<f64>) {
            *self.duration.lock().unwrap() = secs;
        }
    }

    impl MediaTransport for FakeTransport {
        fn load(&self, generation: LoadGeneration, url: &str) {
            self.calls.lock().unwrap().push(Call::Load(generation, url.to_string()));
        }
        fn play(&self) {
            self.calls.lock().unwrap().push(Call::Play);
        }
        fn pause(&self) {
            self.calls.lock().unwrap().push(Call::Pause);
        }
        fn seek(&self, position_secs: f64) {
            self.calls.lock().unwrap().push(Call::Seek(position_secs));
        }
        fn stop(&self) {
            self.calls.lock().unwrap().push(Call::Stop);
        }
        fn set_volume(&self, volume: f32) {
            self.calls.lock().unwrap().push(Call::Volume(volume));
        }
        fn current_time(&self) -> f64 {
            *self.position.lock().unwrap()
        }
        fn duration(&self) -> Option<f64> {
            *self.duration.lock().unwrap()
        }
    }

    const SERVER: &str = "http://music.local";

    fn track(id: i64) -> Track {
        Track {
            id: TrackId(id),
            title: Some(format!("Track {}", id)),
            artist: Some("Artist".into()),
            album: None,
            duration: Some(200.0),
            favorite: false,
            cover_art: None,
            play_count: None,
            date_added: None,
        }
    }

    fn session() -> (PlaybackSession, Arc<FakeTransport>) {
        let transport = Arc::new(FakeTransport::default());
        let session = PlaybackSession::new(transport.clone(), SERVER, 0.7, ShuffleMode::Indicator);
        (session, transport)
    }

    fn loaded(session: &mut PlaybackSession) {
        let generation = session.generation();
        session.handle_transport_event(TransportEvent::new(
            generation,
            TransportEventKind::Loaded { duration: Some(200.0) },
        ));
    }

    fn ended(session: &mut PlaybackSession) -> Option<SessionEffect> {
        let generation = session.generation();
        session.handle_transport_event(TransportEvent::new(generation, TransportEventKind::Ended))
    }

    #[test]
    fn play_loads_stream_and_marks_played() {
        let (mut session, transport) = session();

        let effect = session.play(track(7));

        assert_eq!(effect, Some(SessionEffect::MarkPlayed(TrackId(7))));
        assert_eq!(session.player_state(), PlayerState::Loading);
        assert_eq!(transport.loads(), vec![format!("{}/api/tracks/7/stream", SERVER)]);
        assert_eq!(session.queue().len(), 1);

        loaded(&mut session);
        assert_eq!(session.player_state(), PlayerState::Playing);
        assert!(session.state().is_playing);
    }

    #[test]
    fn next_advances_then_stops_at_the_end() {
        let (mut session, transport) = session();
        session.play_from(vec![track(1), track(2), track(3)], 1);
        loaded(&mut session);

        assert_eq!(session.play_next(), Some(SessionEffect::MarkPlayed(TrackId(3))));
        assert_eq!(session.queue().index(), Some(2));
        loaded(&mut session);

        assert_eq!(session.play_next(), None);
        assert_eq!(session.queue().index(), Some(2));

        assert_eq!(ended(&mut session), None);
        assert_eq!(session.player_state(), PlayerState::Idle);
        assert!(!session.state().is_playing);
        assert_eq!(session.state().current_track.as_ref().map(|t| t.id), Some(TrackId(3)));
        assert_eq!(transport.loads().len(), 2);
    }

    #[test]
    fn ended_with_repeat_wraps_to_start() {
        let (mut session, _) = session();
        session.play_from(vec![track(1), track(2)], 1);
        session.toggle_repeat();
        loaded(&mut session);

        assert_eq!(ended(&mut session), Some(SessionEffect::MarkPlayed(TrackId(1))));
        assert_eq!(session.player_state(), PlayerState::Loading);
    }

    #[test]
    fn ended_only_counts_while_playing() {
        let (mut session, _) = session();
        session.play_from(vec![track(1), track(2)], 0);
        loaded(&mut session);
        session.toggle_play_pause();

        assert_eq!(ended(&mut session), None);
        assert_eq!(session.player_state(), PlayerState::Paused);
        assert_eq!(session.queue().index(), Some(0));
    }

    #[test]
    fn superseded_load_events_are_ignored() {
        let (mut session, _) = session();
        session.play(track(1));
        let stale = session.generation();
        session.play(track(2));

        session.handle_transport_event(TransportEvent::new(
            stale,
            TransportEventKind::Loaded { duration: Some(10.0) },
        ));
        assert_eq!(session.player_state(), PlayerState::Loading);

        let effect = session.handle_transport_event(TransportEvent::new(
            stale,
            TransportEventKind::Error { message: "gone".into() },
        ));
        assert_eq!(effect, None);
        assert_eq!(session.player_state(), PlayerState::Loading);
        assert_eq!(session.state().current_track.as_ref().map(|t| t.id), Some(TrackId(2)));
    }

    #[test]
    fn load_error_goes_idle_without_advancing() {
        let (mut session, transport) = session();
        session.play_from(vec![track(1), track(2), track(3)], 0);

        let generation = session.generation();
        let effect = session.handle_transport_event(TransportEvent::new(
            generation,
            TransportEventKind::Error { message: "decode".into() },
        ));

        assert!(matches!(effect, Some(SessionEffect::Notice(_))));
        assert_eq!(session.player_state(), PlayerState::Idle);
        assert_eq!(session.queue().index(), Some(0));
        assert_eq!(transport.loads().len(), 1);
    }

    #[test]
    fn toggle_from_idle_reloads_current_track() {
        let (mut session, transport) = session();
        session.play(track(4));
        loaded(&mut session);
        ended(&mut session);
        assert_eq!(session.player_state(), PlayerState::Idle);

        assert_eq!(session.toggle_play_pause(), Some(SessionEffect::MarkPlayed(TrackId(4))));
        assert_eq!(transport.loads().len(), 2);
    }

    #[test]
    fn pause_and_resume_drive_the_transport() {
        let (mut session, transport) = session();
        session.play(track(1));
        loaded(&mut session);

        session.toggle_play_pause();
        session.toggle_play_pause();

        let calls = transport.calls();
        assert_eq!(&calls[calls.len() - 2..], &[Call::Pause, Call::Play]);
        assert_eq!(session.player_state(), PlayerState::Playing);
    }

    #[test]
    fn previous_restarts_after_three_seconds() {
        let (mut session, transport) = session();
        session.play_from(vec![track(1), track(2)], 1);
        loaded(&mut session);

        transport.set_position(12.0);
        assert_eq!(session.play_previous(), None);
        assert_eq!(transport.calls().last(), Some(&Call::Seek(0.0)));
        assert_eq!(session.queue().index(), Some(1));

        transport.set_position(1.0);
        assert_eq!(session.play_previous(), Some(SessionEffect::MarkPlayed(TrackId(1))));
        assert_eq!(session.queue().index(), Some(0));
    }

    #[test]
    fn seek_needs_a_known_duration() {
        let (mut session, transport) = session();
        session.play(track(1));
        loaded(&mut session);

        transport.set_duration(None);
        session.seek_percent(50.0);
        transport.set_duration(Some(f64::NAN));
        session.seek_percent(50.0);
        assert!(!transport.calls().iter().any(|c| matches!(c, Call::Seek(_))));

        transport.set_duration(Some(200.0));
        session.seek_percent(25.0);
        assert_eq!(transport.calls().last(), Some(&Call::Seek(50.0)));
    }

    #[test]
    fn relative_seek_stays_inside_the_track() {
        let (mut session, transport) = session();
        session.play(track(1));
        loaded(&mut session);
        transport.set_duration(Some(200.0));

        transport.set_position(2.0);
        session.seek_by(-SEEK_STEP_SECS);
        assert_eq!(transport.calls().last(), Some(&Call::Seek(0.0)));

        transport.set_position(198.0);
        session.seek_by(SEEK_STEP_SECS);
        assert_eq!(transport.calls().last(), Some(&Call::Seek(200.0)));
    }

    #[test]
    fn volume_is_clamped() {
        let (mut session, transport) = session();

        session.set_volume(-1.0);
        assert_eq!(session.state().volume, 0.0);
        session.set_volume(2.0);
        assert_eq!(session.state().volume, 1.0);
        session.set_volume(f32::NAN);
        assert_eq!(session.state().volume, 1.0);
        assert_eq!(transport.calls().last(), Some(&Call::Volume(1.0)));
    }

    #[test]
    fn mute_round_trip_restores_volume() {
        let (mut session, _) = session();
        session.set_volume(0.35);

        session.toggle_mute();
        assert_eq!(session.state().volume, 0.0);
        assert_eq!(session.volume_icon(), VolumeIcon::Muted);

        session.toggle_mute();
        assert_eq!(session.state().volume, 0.35);
        assert_eq!(session.volume_icon(), VolumeIcon::Low);
    }

    #[test]
    fn unmute_without_memory_uses_default() {
        let (mut session, _) = session();
        session.set_volume(0.0);
        session.toggle_mute();
        assert_eq!(session.state().volume, DEFAULT_VOLUME);
        assert_eq!(session.volume_icon(), VolumeIcon::High);
    }

    #[test]
    fn play_from_out_of_range_is_ignored() {
        let (mut session, transport) = session();
        assert_eq!(session.play_from(vec![track(1)], 3), None);
        assert_eq!(session.player_state(), PlayerState::Idle);
        assert!(transport.loads().is_empty());
    }

    #[test]
    fn info_reads_position_from_the_transport() {
        let (mut session, transport) = session();
        session.play_from(vec![track(1), track(2)], 1);
        loaded(&mut session);
        transport.set_position(50.0);
        transport.set_duration(Some(200.0));

        let info = session.info();
        assert_eq!(info.position_secs, 50.0);
        assert_eq!(info.progress_ratio(), 0.25);
        assert_eq!(info.queue_position, Some((2, 2)));
    }

    #[test]
    fn unknown_transport_duration_is_not_filled_from_metadata() {
        let (mut session, transport) = session();
        session.play(track(1));
        loaded(&mut session);
        transport.set_duration(None);
        transport.set_position(50.0);

        let info = session.info();
        assert_eq!(info.duration_secs, None);
        assert_eq!(info.progress_ratio(), 0.0);

        session.seek_percent(50.0);
        assert!(!transport.calls().iter().any(|c| matches!(c, Call::Seek(_))));
    }

    #[test]
    fn stop_abandons_the_pending_load() {
        let (mut session, transport) = session();
        session.play(track(1));
        let pending = session.generation();
        session.stop();

        assert_eq!(transport.calls().last(), Some(&Call::Stop));
        assert_eq!(session.player_state(), PlayerState::Idle);

        let effect = session.handle_transport_event(TransportEvent::new(
            pending,
            TransportEventKind::Loaded { duration: Some(200.0) },
        ));
        assert!(effect.is_none());
        assert_eq!(session.player_state(), PlayerState::Idle);
    }
}
