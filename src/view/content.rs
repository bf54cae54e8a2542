//! Main content area rendering (track listings, playlists, downloads, settings)

use ratatui::{
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, ListItem, Padding, Paragraph},
    Frame,
};

use crate::model::{
    ActiveSection, ContentState, ContentView, DownloadEntry, PlaylistDetail, PlaylistSummary,
    Track, TrackId, UiState,
};
use super::utils::{calculate_num_width, format_duration, render_scrollable_list, truncate_string, Palette};

pub fn render_main_content(
    frame: &mut Frame,
    area: Rect,
    ui_state: &UiState,
    content_state: &ContentState,
    playing: Option<TrackId>,
    palette: &Palette,
) {
    let is_focused = ui_state.active_section != ActiveSection::Search;
    let border_style = palette.border(is_focused);

    if content_state.is_loading {
        let loading = Paragraph::new("Loading...")
            .style(Style::default().fg(palette.warning))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {} ", ui_state.active_section.title()))
                    .border_style(border_style),
            );
        frame.render_widget(loading, area);
        return;
    }

    let content_width = area.width.saturating_sub(4) as usize;
    let block = |title: String| {
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .padding(Padding::horizontal(1))
            .border_style(border_style)
    };

    match &content_state.view {
        ContentView::Empty => {
            let content = Paragraph::new(
                "Nothing loaded yet\n\nUse Tab to switch sections\nPress / to search the library\nPress h for all key bindings",
            )
            .style(Style::default().fg(palette.dim))
            .block(block(String::new()));
            frame.render_widget(content, area);
        }
        ContentView::Library { tracks, page, pages, sort, selected_index } => {
            let title = format!(" Library · page {}/{} · sorted by {} ", page, pages, sort.as_param());
            let items = track_items(tracks, *selected_index, is_focused, playing, content_width, palette);
            render_scrollable_list(frame, area, items, *selected_index + 1, block(title));
        }
        ContentView::SearchResults { query, tracks, selected_index } => {
            let title = format!(" Results for \"{}\" ({}) ", query, tracks.len());
            if tracks.is_empty() {
                let empty = Paragraph::new("No tracks found")
                    .style(Style::default().fg(palette.dim))
                    .block(block(title));
                frame.render_widget(empty, area);
                return;
            }
            let items = track_items(tracks, *selected_index, is_focused, playing, content_width, palette);
            render_scrollable_list(frame, area, items, *selected_index + 1, block(title));
        }
        ContentView::Playlists { playlists, selected_index } => {
            let title = format!(" Playlists ({}) · c to create ", playlists.len());
            let items = playlist_items(playlists, *selected_index, is_focused, content_width, palette);
            render_scrollable_list(frame, area, items, *selected_index + 1, block(title));
        }
        ContentView::PlaylistDetail { detail, selected_index } => {
            render_playlist_detail(frame, area, detail, *selected_index, is_focused, playing, palette);
        }
        ContentView::Downloads { entries, selected_index } => {
            let title = format!(" Downloads ({}) · d to add ", entries.len());
            let items = download_items(entries, *selected_index, is_focused, content_width, palette);
            render_scrollable_list(frame, area, items, *selected_index + 1, block(title));
        }
        ContentView::Settings { directories, selected_index } => {
            let title = format!(" Music directories ({}) · i add · Del remove · t theme ", directories.len());
            let items: Vec<ListItem> = if directories.is_empty() {
                vec![ListItem::new("No music directories configured").style(Style::default().fg(palette.dim))]
            } else {
                directories
                    .iter()
                    .enumerate()
                    .map(|(i, directory)| {
                        let style = palette.row(i == *selected_index, is_focused, false);
                        ListItem::new(truncate_string(directory, content_width)).style(style)
                    })
                    .collect()
            };
            render_scrollable_list(frame, area, items, *selected_index, block(title));
        }
    }
}

/// Header row plus one row per track. The selected row is offset by one.
fn track_items(
    tracks: &[Track],
    selected_index: usize,
    is_focused: bool,
    playing: Option<TrackId>,
    content_width: usize,
    palette: &Palette,
) -> Vec<ListItem<'static>> {
    let num_width = calculate_num_width(tracks.len());
    let favorite_width = 2;
    let duration_width = 8;
    let fixed_width = 1 + num_width + 3 + favorite_width + 3 + 3 + 3 + duration_width;
    let remaining_width = content_width.saturating_sub(fixed_width);
    let title_width = (remaining_width * 55) / 100;
    let artist_width = remaining_width.saturating_sub(title_width);

    let mut items: Vec<ListItem<'static>> = vec![
        ListItem::new(format!(
            " {:<num_width$}   {}   {:<title_width$}   {:<artist_width$}   {}",
            "#", "  ", "Title", "Artist", "Duration",
            num_width = num_width,
            title_width = title_width,
            artist_width = artist_width
        ))
        .style(palette.header_row()),
    ];

    items.extend(tracks.iter().enumerate().map(|(i, track)| {
        let is_playing = playing == Some(track.id);
        let style = palette.row(i == selected_index, is_focused, is_playing);

        let favorite = if track.favorite { "♥ " } else { "  " };
        let playing_indicator = if is_playing { "▶" } else { " " };
        let track_num = format!("{}{:<num_width$}", playing_indicator, i + 1, num_width = num_width);
        let duration = track.duration.map(format_duration).unwrap_or_else(|| "--:--".to_string());

        ListItem::new(format!(
            "{}   {}   {}   {}   {}",
            track_num,
            favorite,
            truncate_string(track.display_title(), title_width),
            truncate_string(track.display_artist(), artist_width),
            duration
        ))
        .style(style)
    }));
    items
}

fn playlist_items(
    playlists: &[PlaylistSummary],
    selected_index: usize,
    is_focused: bool,
    content_width: usize,
    palette: &Palette,
) -> Vec<ListItem<'static>> {
    let count_width = 8;
    let date_width = 10;
    let name_width = content_width.saturating_sub(count_width + date_width + 7);

    let mut items: Vec<ListItem<'static>> = vec![
        ListItem::new(format!(
            " {:<name_width$}   {:>count_width$}   {}",
            "Name", "Tracks", "Created",
            name_width = name_width,
            count_width = count_width
        ))
        .style(palette.header_row()),
    ];

    items.extend(playlists.iter().enumerate().map(|(i, playlist)| {
        let created = playlist
            .created_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        ListItem::new(format!(
            " {}   {:>count_width$}   {}",
            truncate_string(&playlist.name, name_width),
            playlist.track_count,
            created,
            count_width = count_width
        ))
        .style(palette.row(i == selected_index, is_focused, false))
    }));
    items
}

fn render_playlist_detail(
    frame: &mut Frame,
    area: Rect,
    detail: &PlaylistDetail,
    selected_index: usize,
    is_focused: bool,
    playing: Option<TrackId>,
    palette: &Palette,
) {
    let title = match detail.description.as_deref().filter(|d| !d.is_empty()) {
        Some(description) => format!(" {} · {} · Esc back ", detail.name, description),
        None => format!(" {} · Esc back ", detail.name),
    };

    let content_width = area.width.saturating_sub(4) as usize;
    let items = track_items(&detail.track_list(), selected_index, is_focused, playing, content_width, palette);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .padding(Padding::horizontal(1))
        .border_style(palette.border(is_focused));
    render_scrollable_list(frame, area, items, selected_index + 1, block);
}

fn download_items(
    entries: &[DownloadEntry],
    selected_index: usize,
    is_focused: bool,
    content_width: usize,
    palette: &Palette,
) -> Vec<ListItem<'static>> {
    let source_width = 8;
    let status_width = 12;
    let progress_width = 6;
    let url_width = content_width.saturating_sub(source_width + status_width + progress_width + 10);

    let mut items: Vec<ListItem<'static>> = vec![
        ListItem::new(format!(
            " {:<source_width$}   {:<url_width$}   {:<status_width$}   {}",
            "Type", "URL", "Status", "Done",
            source_width = source_width,
            url_width = url_width,
            status_width = status_width
        ))
        .style(palette.header_row()),
    ];

    items.extend(entries.iter().enumerate().map(|(i, entry)| {
        let mut style = palette.row(i == selected_index, is_focused, false);
        if entry.record.status == "error" {
            style = style.fg(palette.error);
        }
        let progress = entry
            .record
            .progress
            .map(|p| format!("{:.0}%", p))
            .unwrap_or_else(|| "-".to_string());

        ListItem::new(format!(
            " {:<source_width$}   {}   {}   {}",
            entry.source.label(),
            truncate_string(&entry.record.url, url_width),
            truncate_string(&entry.record.status, status_width),
            progress,
            source_width = source_width
        ))
        .style(style)
    }));
    items
}
