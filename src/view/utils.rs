//! Utility functions for rendering UI components

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, List, ListItem, ListState},
    Frame,
};

use crate::config::Theme;

/// Colours for one theme.
#[derive(Clone, Copy, Debug)]
pub struct Palette {
    pub text: Color,
    pub dim: Color,
    pub accent: Color,
    pub playing: Color,
    pub header: Color,
    pub error: Color,
    pub warning: Color,
    pub popup_bg: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                text: Color::White,
                dim: Color::DarkGray,
                accent: Color::Green,
                playing: Color::Cyan,
                header: Color::Cyan,
                error: Color::Red,
                warning: Color::Yellow,
                popup_bg: Color::Black,
            },
            Theme::Light => Self {
                text: Color::Black,
                dim: Color::Gray,
                accent: Color::Blue,
                playing: Color::Magenta,
                header: Color::Blue,
                error: Color::Red,
                warning: Color::Rgb(180, 120, 0),
                popup_bg: Color::White,
            },
        }
    }

    pub fn border(&self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.accent)
        } else {
            Style::default().fg(self.dim)
        }
    }

    /// Row style for list entries.
    pub fn row(&self, selected: bool, focused: bool, playing: bool) -> Style {
        if selected && focused {
            Style::default().fg(self.accent).add_modifier(Modifier::BOLD)
        } else if playing {
            Style::default().fg(self.playing).add_modifier(Modifier::BOLD)
        } else if selected {
            Style::default().fg(self.text).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.text)
        }
    }

    pub fn header_row(&self) -> Style {
        Style::default().fg(self.header).add_modifier(Modifier::BOLD)
    }
}

pub fn render_scrollable_list(
    frame: &mut Frame,
    area: Rect,
    items: Vec<ListItem>,
    selected_index: usize,
    block: Block,
) {
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default()); // Highlight handled by item styles

    let mut list_state = ListState::default();
    list_state.select(Some(selected_index));

    frame.render_stateful_widget(list, area, &mut list_state);
}

/// `m:ss`, or `h:mm:ss` past the hour. Negative and non-finite input reads as zero.
pub fn format_duration(secs: f64) -> String {
    let total_seconds = if secs.is_finite() && secs > 0.0 { secs as u64 } else { 0 };
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Calculate width needed for index column (log10(n) + padding)
pub fn calculate_num_width(item_count: usize) -> usize {
    if item_count == 0 {
        2
    } else {
        let digits = (item_count as f64).log10().floor() as usize + 1;
        digits + 1
    }
}

pub fn truncate_string(s: &str, max_width: usize) -> String {
    if s.chars().count() > max_width {
        let truncated: String = s.chars().take(max_width.saturating_sub(3)).collect();
        format!("{:<width$}", format!("{}...", truncated), width = max_width)
    } else {
        format!("{:<width$}", s, width = max_width)
    }
}

/// Centered popup of at most `width` x `height`, kept inside `area`.
pub fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4)).max(1);
    let height = height.min(area.height.saturating_sub(2)).max(1);
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_format_as_clock() {
        assert_eq!(format_duration(0.0), "0:00");
        assert_eq!(format_duration(215.7), "3:35");
        assert_eq!(format_duration(3725.0), "1:02:05");
        assert_eq!(format_duration(f64::NAN), "0:00");
        assert_eq!(format_duration(-4.0), "0:00");
    }

    #[test]
    fn long_strings_are_truncated_to_width() {
        assert_eq!(truncate_string("Bohemian Rhapsody", 10), "Bohemia...");
        assert_eq!(truncate_string("Song", 6), "Song  ");
    }

    #[test]
    fn popup_fits_small_terminals() {
        let area = Rect::new(0, 0, 20, 8);
        let popup = centered_rect(area, 60, 30);
        assert!(popup.width <= 16);
        assert!(popup.height <= 6);
        assert!(popup.x + popup.width <= area.width);
    }
}
