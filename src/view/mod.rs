//! View module - UI rendering
//!
//! This module handles all UI rendering for the application using ratatui.
//! It is organized into submodules by component type:
//!
//! - `utils`: Palette, formatting and scrollable lists
//! - `layout`: Main layout structure (top bar, sidebar)
//! - `content`: Main content area rendering
//! - `progress`: Now-playing bar
//! - `overlays`: Modal overlays (notices, prompts, help)

mod utils;
mod layout;
mod content;
mod progress;
mod overlays;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use crate::model::{ContentState, PlaybackInfo, UiState};
use utils::Palette;

pub struct AppView;

impl AppView {
    pub fn render(frame: &mut Frame, playback: &PlaybackInfo, ui_state: &UiState, content_state: &ContentState) {
        let palette = Palette::for_theme(ui_state.theme);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Search bar + library stats
                Constraint::Min(0),    // Sidebar + content
                Constraint::Length(3), // Now playing
            ])
            .split(frame.area());

        layout::render_top_bar(frame, chunks[0], ui_state, &palette);

        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(20),
                Constraint::Percentage(80),
            ])
            .split(chunks[1]);

        layout::render_sidebar(frame, main_chunks[0], ui_state, &palette);

        let playing = playback.track.as_ref().map(|track| track.id);
        content::render_main_content(frame, main_chunks[1], ui_state, content_state, playing, &palette);

        progress::render_progress_bar(frame, chunks[2], playback, &palette);

        if let Some(prompt) = &ui_state.prompt {
            overlays::render_prompt(frame, prompt, &palette);
        }

        if ui_state.show_help_popup {
            overlays::render_help_popup(frame, &palette);
        }

        // Notices go last so errors stay visible above everything else
        if let Some(notice) = &ui_state.notice {
            overlays::render_notice(frame, notice, &palette);
        }
    }
}
