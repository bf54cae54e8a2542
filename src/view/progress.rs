//! Progress bar rendering

use ratatui::{
    layout::Rect,
    style::Style,
    text::Line,
    widgets::{Block, Borders, Gauge},
    Frame,
};

use crate::config::ShuffleMode;
use crate::model::{PlaybackInfo, PlayerState, VolumeIcon};
use super::utils::{format_duration, Palette};

pub fn render_progress_bar(frame: &mut Frame, area: Rect, playback: &PlaybackInfo, palette: &Palette) {
    let status_text = match &playback.track {
        None => " No track playing".to_string(),
        Some(track) => {
            let icon = match playback.player_state {
                PlayerState::Loading => "…",
                PlayerState::Playing => "▶",
                _ => "⏸",
            };
            let album = track
                .album
                .as_deref()
                .filter(|a| !a.is_empty())
                .map(|a| format!(" ({})", a))
                .unwrap_or_default();
            format!(" {} {} | {}{}", icon, track.display_title(), track.display_artist(), album)
        }
    };

    let shuffle_text = match (playback.shuffle, playback.shuffle_mode) {
        (false, _) => "Shuffle: Off",
        (true, ShuffleMode::Indicator) => "Shuffle: On",
        (true, ShuffleMode::Permute) => "Shuffle: On (mixed)",
    };
    let repeat_text = if playback.repeat { "Repeat: On" } else { "Repeat: Off" };
    let volume_icon = match playback.volume_icon {
        VolumeIcon::Muted => "🔇",
        VolumeIcon::Low => "🔉",
        VolumeIcon::High => "🔊",
    };
    let volume_text = format!("{} {:.0}%", volume_icon, playback.volume * 100.0);
    let queue_text = playback
        .queue_position
        .map(|(position, len)| format!(" | {}/{}", position, len))
        .unwrap_or_default();

    let time_str = format!(
        "{} / {}",
        format_duration(playback.position_secs),
        playback
            .duration_secs
            .map(format_duration)
            .unwrap_or_else(|| "--:--".to_string())
    );

    let title = format!("{} ", status_text);
    let controls_info = format!(" {} | {} | {}{} ", shuffle_text, repeat_text, volume_text, queue_text);

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .title_bottom(Line::from(controls_info).right_aligned())
                .border_style(palette.border(playback.is_playing)),
        )
        .gauge_style(Style::default().fg(palette.accent))
        .ratio(playback.progress_ratio())
        .label(time_str);

    frame.render_widget(gauge, area);
}
