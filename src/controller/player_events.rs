//! Transport event listener

use crate::audio::{TransportEventKind, TransportEvents};
use super::AppController;

impl AppController {
    /// Feed transport events into the playback session until the app quits
    /// or the transport goes away.
    pub fn start_transport_event_listener(&self, mut events: TransportEvents) {
        let controller = self.clone();
        tracing::info!("Starting transport event listener");

        tokio::spawn(async move {
            let session = controller.model.lock().await.session();

            while let Some(event) = events.recv().await {
                if controller.model.lock().await.should_quit().await {
                    tracing::debug!("Transport event listener shutting down");
                    break;
                }

                match &event.kind {
                    TransportEventKind::TimeUpdate { position } => {
                        tracing::trace!(generation = event.generation.value(), position, "Transport time update");
                    }
                    kind => {
                        tracing::debug!(generation = event.generation.value(), ?kind, "Transport event");
                    }
                }

                let effect = session.lock().await.handle_transport_event(event);
                controller.apply_effect(effect).await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use crate::audio::{TransportEvent, TransportEventKind};
    use crate::controller::test_support::{controller_for, eventually};
    use crate::model::{PlayerState, Track};

    #[tokio::test]
    async fn listener_drives_the_session_and_skips_stale_events() {
        let controller = controller_for("http://127.0.0.1:9");
        let (tx, rx) = mpsc::unbounded_channel();
        controller.start_transport_event_listener(rx);

        let track: Track = serde_json::from_value(serde_json::json!({ "id": 1, "title": "Heroes" })).unwrap();
        let session = controller.model.lock().await.session();
        let stale = session.lock().await.generation();
        session.lock().await.play(track);
        let current = session.lock().await.generation();

        tx.send(TransportEvent::new(stale, TransportEventKind::Error { message: "old".into() }))
            .unwrap();
        tx.send(TransportEvent::new(current, TransportEventKind::Loaded { duration: Some(180.0) }))
            .unwrap();

        let controller_ref = &controller;
        eventually("the session to start playing", move || async move {
            let model = controller_ref.model.lock().await;
            model.get_playback_info().await.player_state == PlayerState::Playing
        })
        .await;
        assert!(!controller.model.lock().await.has_error().await);
    }
}
