//! Layout rendering (top bar, sidebar)

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, List, ListItem, ListState, Padding, Paragraph},
    Frame,
};

use crate::jobs::{JobState, JobStatus};
use crate::model::{ActiveSection, UiState};
use super::utils::Palette;

pub fn render_top_bar(frame: &mut Frame, area: Rect, ui_state: &UiState, palette: &Palette) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),     // Search input
            Constraint::Length(44), // Library stats / scan
        ])
        .split(area);

    let searching = ui_state.active_section == ActiveSection::Search;
    let (search_text, search_style) = if ui_state.search_query.is_empty() && !searching {
        ("Press / to search...".to_string(), Style::default().fg(palette.dim))
    } else if searching {
        (format!("{}▏", ui_state.search_query), Style::default().fg(palette.accent))
    } else {
        (ui_state.search_query.clone(), Style::default().fg(palette.text))
    };

    let search = Paragraph::new(search_text).style(search_style).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Search ")
            .padding(Padding::horizontal(1))
            .border_style(palette.border(searching)),
    );
    frame.render_widget(search, chunks[0]);

    let (status_text, status_style) = match &ui_state.scan_status {
        Some(status) if !status.is_terminal() => (
            scan_label(status),
            Style::default().fg(palette.warning),
        ),
        _ => (
            format!(
                "{} tracks · {} artists · {} albums",
                ui_state.stats.total_tracks, ui_state.stats.total_artists, ui_state.stats.total_albums
            ),
            Style::default().fg(palette.header),
        ),
    };

    let stats = Paragraph::new(status_text).style(status_style).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", ui_state.server_url))
            .border_style(palette.border(false)),
    );
    frame.render_widget(stats, chunks[1]);
}

fn scan_label(status: &JobStatus) -> String {
    match (status.state, status.progress) {
        (JobState::Pending, _) => "Scan starting...".to_string(),
        (_, Some(progress)) => format!("Scanning {:.0}%", progress),
        _ => "Scanning...".to_string(),
    }
}

pub fn render_sidebar(frame: &mut Frame, area: Rect, ui_state: &UiState, palette: &Palette) {
    let items: Vec<ListItem> = ActiveSection::NAVIGABLE
        .iter()
        .map(|section| {
            let active = *section == ui_state.active_section;
            let style = if active {
                Style::default().fg(palette.accent).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(palette.text)
            };
            let marker = if active { "▸ " } else { "  " };
            ListItem::new(format!("{}{}", marker, section.title())).style(style)
        })
        .collect();

    let selected = ActiveSection::NAVIGABLE
        .iter()
        .position(|section| *section == ui_state.active_section);

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Browse ")
                .padding(Padding::horizontal(1))
                .border_style(palette.border(false)),
        )
        .highlight_style(Style::default());

    let mut list_state = ListState::default();
    list_state.select(selected);

    frame.render_stateful_widget(list, area, &mut list_state);
}
