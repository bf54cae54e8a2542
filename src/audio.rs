//! Audio output: the [`MediaTransport`] seam and its rodio implementation.
//!
//! A transport owns one output device. Loads are tagged with a
//! [`LoadGeneration`]; every event it emits carries the generation of the
//! load that produced it so the session can drop stale completions.

use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{ApiError, AppError};

const WATCH_INTERVAL: Duration = Duration::from_millis(250);
/// Watcher ticks between two `TimeUpdate` events.
const TIME_UPDATE_EVERY: u32 = 4;

/// Monotonic token identifying one `load` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadGeneration(u64);

impl LoadGeneration {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TransportEventKind {
    Loaded { duration: Option<f64> },
    TimeUpdate { position: f64 },
    Ended,
    Error { message: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct TransportEvent {
    pub generation: LoadGeneration,
    pub kind: TransportEventKind,
}

impl TransportEvent {
    pub fn new(generation: LoadGeneration, kind: TransportEventKind) -> Self {
        Self { generation, kind }
    }
}

pub type TransportEvents = mpsc::UnboundedReceiver<TransportEvent>;

/// A single audio output. Only the playback session drives it; everyone else
/// reads `current_time`/`duration` through the session projection.
pub trait MediaTransport: Send + Sync {
    /// Replace the current source. Playback starts once the stream is open.
    fn load(&self, generation: LoadGeneration, url: &str);
    fn play(&self);
    fn pause(&self);
    fn seek(&self, position_secs: f64);
    fn set_volume(&self, volume: f32);
    /// Drop the current source and abandon any load still in flight.
    fn stop(&self);
    /// Seconds into the loaded source, 0 when nothing is loaded.
    fn current_time(&self) -> f64;
    /// Known once the source reported `Loaded` with a duration.
    fn duration(&self) -> Option<f64>;
}

struct OutputState {
    generation: LoadGeneration,
    sink: Option<Arc<Sink>>,
    duration: Option<Duration>,
    volume: f32,
    paused: bool,
    cancel: CancellationToken,
}

/// Streams tracks over HTTP and plays them through rodio.
pub struct RodioTransport {
    http: reqwest::Client,
    output: Option<OutputStreamHandle>,
    events: mpsc::UnboundedSender<TransportEvent>,
    runtime: tokio::runtime::Handle,
    state: Arc<Mutex<OutputState>>,
}

impl RodioTransport {
    /// Open the default output device. Without one the transport still
    /// works, but every load fails with a playback error.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(http: reqwest::Client, volume: f32) -> (Self, TransportEvents) {
        let output = match open_default_output() {
            Ok(handle) => {
                tracing::info!("Audio output opened");
                Some(handle)
            }
            Err(e) => {
                tracing::error!(error = %e, "No audio output available");
                None
            }
        };
        Self::with_output(http, output, volume)
    }

    pub fn with_output(
        http: reqwest::Client,
        output: Option<OutputStreamHandle>,
        volume: f32,
    ) -> (Self, TransportEvents) {
        let (events, rx) = mpsc::unbounded_channel();
        let transport = Self {
            http,
            output,
            events,
            runtime: tokio::runtime::Handle::current(),
            state: Arc::new(Mutex::new(OutputState {
                generation: LoadGeneration::default(),
                sink: None,
                duration: None,
                volume,
                paused: false,
                cancel: CancellationToken::new(),
            })),
        };
        (transport, rx)
    }

    fn lock_state(&self) -> MutexGuard<'_, OutputState> {
        lock(&self.state)
    }
}

impl MediaTransport for RodioTransport {
    fn load(&self, generation: LoadGeneration, url: &str) {
        let cancel = {
            let mut state = self.lock_state();
            state.cancel.cancel();
            if let Some(sink) = state.sink.take() {
                sink.stop();
            }
            state.generation = generation;
            state.duration = None;
            state.paused = false;
            state.cancel = CancellationToken::new();
            state.cancel.clone()
        };

        tracing::debug!(generation = generation.value(), url, "Loading stream");

        let Some(output) = self.output.clone() else {
            let _ = self.events.send(TransportEvent::new(
                generation,
                TransportEventKind::Error {
                    message: "No audio output device".to_string(),
                },
            ));
            return;
        };

        let http = self.http.clone();
        let events = self.events.clone();
        let state = self.state.clone();
        let url = url.to_string();

        self.runtime.spawn(async move {
            let fetched = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(generation = generation.value(), "Stream load superseded");
                    return;
                }
                result = fetch_stream(&http, &url) => result,
            };

            let opened = fetched
                .map_err(|e| e.to_string())
                .and_then(|bytes| open_sink(&output, bytes));

            let (sink, duration) = match opened {
                Ok(opened) => opened,
                Err(message) => {
                    tracing::warn!(generation = generation.value(), error = %message, "Stream load failed");
                    if lock(&state).generation == generation && !cancel.is_cancelled() {
                        let _ = events.send(TransportEvent::new(
                            generation,
                            TransportEventKind::Error { message },
                        ));
                    }
                    return;
                }
            };

            {
                let mut guard = lock(&state);
                if guard.generation != generation || cancel.is_cancelled() {
                    sink.stop();
                    return;
                }
                sink.set_volume(guard.volume);
                if !guard.paused {
                    sink.play();
                }
                guard.sink = Some(sink.clone());
                guard.duration = duration;
            }

            let _ = events.send(TransportEvent::new(
                generation,
                TransportEventKind::Loaded {
                    duration: duration.map(|d| d.as_secs_f64()),
                },
            ));

            watch_sink(sink, generation, cancel, events).await;
        });
    }

    fn play(&self) {
        let mut state = self.lock_state();
        state.paused = false;
        if let Some(sink) = &state.sink {
            sink.play();
        }
    }

    fn pause(&self) {
        let mut state = self.lock_state();
        state.paused = true;
        if let Some(sink) = &state.sink {
            sink.pause();
        }
    }

    fn seek(&self, position_secs: f64) {
        let state = self.lock_state();
        if let Some(sink) = &state.sink {
            let target = Duration::from_secs_f64(position_secs.max(0.0));
            if let Err(e) = sink.try_seek(target) {
                tracing::warn!(error = %e, position_secs, "Seek failed");
            }
        }
    }

    fn set_volume(&self, volume: f32) {
        let mut state = self.lock_state();
        state.volume = volume;
        if let Some(sink) = &state.sink {
            sink.set_volume(volume);
        }
    }

    fn stop(&self) {
        let mut state = self.lock_state();
        state.cancel.cancel();
        if let Some(sink) = state.sink.take() {
            sink.stop();
        }
        state.duration = None;
        tracing::debug!(generation = state.generation.value(), "Transport stopped");
    }

    fn current_time(&self) -> f64 {
        self.lock_state()
            .sink
            .as_ref()
            .map(|sink| sink.get_pos().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.lock_state().duration.map(|d| d.as_secs_f64())
    }
}

fn lock(state: &Mutex<OutputState>) -> MutexGuard<'_, OutputState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn fetch_stream(http: &reqwest::Client, url: &str) -> Result<Vec<u8>, ApiError> {
    let response = http.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        });
    }
    Ok(response.bytes().await?.to_vec())
}

/// Decode `bytes` into a paused sink. Returns the sink and the source length
/// when the container reports one.
fn open_sink(
    output: &OutputStreamHandle,
    bytes: Vec<u8>,
) -> Result<(Arc<Sink>, Option<Duration>), String> {
    let source = Decoder::new(Cursor::new(bytes)).map_err(|e| format!("Cannot decode stream: {}", e))?;
    let duration = source.total_duration();

    let sink = Sink::try_new(output).map_err(|e| format!("Cannot open audio sink: {}", e))?;
    sink.pause();
    sink.append(source);
    Ok((Arc::new(sink), duration))
}

async fn watch_sink(
    sink: Arc<Sink>,
    generation: LoadGeneration,
    cancel: CancellationToken,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let mut ticker = tokio::time::interval(WATCH_INTERVAL);
    let mut ticks: u32 = 0;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        if sink.empty() {
            tracing::debug!(generation = generation.value(), "Stream drained");
            let _ = events.send(TransportEvent::new(generation, TransportEventKind::Ended));
            return;
        }

        ticks = ticks.wrapping_add(1);
        if ticks % TIME_UPDATE_EVERY == 0 && !sink.is_paused() {
            let position = sink.get_pos().as_secs_f64();
            let _ = events.send(TransportEvent::new(
                generation,
                TransportEventKind::TimeUpdate { position },
            ));
        }
    }
}

/// The output stream is not `Send`, so it lives on its own thread for the
/// life of the process and only the handle comes back.
fn open_default_output() -> Result<OutputStreamHandle, AppError> {
    let (tx, rx) = std::sync::mpsc::channel();

    std::thread::Builder::new()
        .name("audio-output".to_string())
        .spawn(move || match OutputStream::try_default() {
            Ok((stream, handle)) => {
                if tx.send(Ok(handle)).is_err() {
                    return;
                }
                let _stream = stream;
                loop {
                    std::thread::park();
                }
            }
            Err(e) => {
                let _ = tx.send(Err(e.to_string()));
            }
        })?;

    rx.recv()
        .map_err(|_| AppError::Playback("audio output thread exited".to_string()))?
        .map_err(AppError::Playback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generations_increase() {
        let first = LoadGeneration::default();
        let second = first.next();
        assert!(second > first);
        assert_eq!(second.value(), first.value() + 1);
    }

    #[tokio::test]
    async fn load_without_output_reports_error_for_that_generation() {
        let (transport, mut events) = RodioTransport::with_output(reqwest::Client::new(), None, 0.7);
        let generation = LoadGeneration::default().next();

        transport.load(generation, "http://localhost:1/api/tracks/1/stream");

        let event = events.recv().await.unwrap();
        assert_eq!(event.generation, generation);
        assert!(matches!(event.kind, TransportEventKind::Error { .. }));
        assert_eq!(transport.current_time(), 0.0);
        assert_eq!(transport.duration(), None);
    }

    #[tokio::test]
    async fn volume_and_pause_are_remembered_without_a_sink() {
        let (transport, _events) = RodioTransport::with_output(reqwest::Client::new(), None, 0.7);

        transport.set_volume(0.25);
        transport.pause();

        let state = transport.lock_state();
        assert_eq!(state.volume, 0.25);
        assert!(state.paused);
    }
    #[tokio::test]
    async fn stop_cancels_the_load_in_flight() {
        let (transport, _events) = RodioTransport::with_output(reqwest::Client::new(), None, 0.7);
        transport.load(LoadGeneration::default().next(), "http://localhost:1/api/tracks/1/stream");
        let pending = transport.lock_state().cancel.clone();
        assert!(!pending.is_cancelled());

        transport.stop();

        assert!(pending.is_cancelled());
        assert!(transport.lock_state().sink.is_none());
        assert_eq!(transport.duration(), None);
    }
}
