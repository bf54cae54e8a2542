mod audio;
mod config;
mod controller;
mod error;
mod jobs;
mod logging;
mod model;
mod view;

use std::io;
use std::sync::Arc;
use anyhow::Result;
use std::time::Duration;
use tokio::sync::Mutex;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use view::AppView;
use audio::RodioTransport;
use config::AppConfig;
use controller::AppController;
use model::{AppModel, MusicServerClient, PlaybackSession, SortKey};

const FRAME_INTERVAL: Duration = Duration::from_millis(50);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    if let Err(e) = logging::init_logging() {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    tracing::info!("=== Jukebox-RS Client Starting ===");

    let config = AppConfig::load()?;
    tracing::info!(server_url = %config.server_url, theme = ?config.theme, "Configuration loaded");

    let client = MusicServerClient::new(&config.server_url)?;

    let (transport, transport_events) = RodioTransport::new(client.http().clone(), config.default_volume);
    let session = PlaybackSession::new(
        Arc::new(transport),
        client.base_url(),
        config.default_volume,
        config.shuffle_mode,
    );

    let model = Arc::new(Mutex::new(AppModel::new(client, session, config.theme)));
    let controller = AppController::new(model.clone(), config);

    controller.start_transport_event_listener(transport_events);

    tracing::info!("Starting TUI...");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let controller_for_init = controller.clone();
    tokio::spawn(async move {
        futures::join!(
            controller_for_init.load_stats(),
            controller_for_init.load_library(1, SortKey::default()),
        );
    });

    let res = run_app(&mut terminal, model, controller.clone()).await;

    controller.shutdown().await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = ?err, "Application error");
    }

    tracing::info!("Jukebox-RS Client shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    model: Arc<Mutex<AppModel>>,
    controller: AppController,
) -> io::Result<()> {
    loop {
        let (playback, ui_state, content_state, should_quit) = {
            let model_guard = model.lock().await;

            model_guard.clear_expired_notices().await;

            (
                model_guard.get_playback_info().await,
                model_guard.get_ui_state().await,
                model_guard.get_content_state().await,
                model_guard.should_quit().await,
            )
        };

        if should_quit {
            break;
        }

        terminal.draw(|f| {
            AppView::render(f, &playback, &ui_state, &content_state);
        })?;

        // Never block here: background tasks share this thread.
        if event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    let _ = controller.handle_key_event(key).await;
                }
            }
        } else {
            tokio::time::sleep(FRAME_INTERVAL).await;
        }
    }

    Ok(())
}
