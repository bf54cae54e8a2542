//! Overlay rendering (notices, prompts, help popup)

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::model::{Notice, NoticeLevel, Prompt};
use super::utils::{centered_rect, Palette};

pub fn render_notice(frame: &mut Frame, notice: &Notice, palette: &Palette) {
    let area = frame.area();

    let popup_width = 52.min(area.width.saturating_sub(4));
    let inner_width = popup_width.saturating_sub(4).max(1) as usize;
    let line_count = notice.message.chars().count().div_ceil(inner_width).max(1) as u16;

    let (title, color) = match notice.level {
        NoticeLevel::Error => (" Error (Esc to dismiss) ", palette.error),
        NoticeLevel::Info => (" Info ", palette.accent),
    };

    let popup_area = match notice.level {
        NoticeLevel::Error => centered_rect(area, popup_width, line_count + 2),
        // Info notices sit in the bottom right corner and do not block input
        NoticeLevel::Info => {
            let height = (line_count + 2).min(area.height);
            Rect {
                x: area.width.saturating_sub(popup_width + 1),
                y: area.height.saturating_sub(height + 3),
                width: popup_width,
                height,
            }
        }
    };

    frame.render_widget(Clear, popup_area);

    let widget = Paragraph::new(notice.message.clone())
        .style(Style::default().fg(color))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(title)
                .title_style(Style::default().fg(color).add_modifier(Modifier::BOLD))
                .style(Style::default().bg(palette.popup_bg)),
        );

    frame.render_widget(widget, popup_area);
}

pub fn render_prompt(frame: &mut Frame, prompt: &Prompt, palette: &Palette) {
    let height = prompt.fields.len() as u16 + 4;
    let popup_area = centered_rect(frame.area(), 60, height);

    frame.render_widget(Clear, popup_area);

    let label_width = prompt.fields.iter().map(|f| f.label.len()).max().unwrap_or(0);
    let mut lines: Vec<Line> = prompt
        .fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let active = i == prompt.active_field;
            let value_style = if active {
                Style::default().fg(palette.accent).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(palette.text)
            };
            let cursor = if active { "▏" } else { "" };
            Line::from(vec![
                Span::styled(
                    format!("{:>width$}: ", field.label, width = label_width),
                    Style::default().fg(palette.header),
                ),
                Span::styled(format!("{}{}", field.value, cursor), value_style),
            ])
        })
        .collect();

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Tab next field · Enter submit · Esc cancel",
        Style::default().fg(palette.dim),
    )));

    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.header))
            .title(prompt.title())
            .title_style(Style::default().fg(palette.header).add_modifier(Modifier::BOLD))
            .style(Style::default().bg(palette.popup_bg)),
    );

    frame.render_widget(widget, popup_area);
}

pub fn render_help_popup(frame: &mut Frame, palette: &Palette) {
    let keybindings = [
        ("", "── Navigation ──"),
        ("Tab / Shift+Tab", "Cycle sections"),
        ("↑ / ↓", "Move selection"),
        ("Enter", "Play track / open playlist"),
        ("Esc", "Go back / dismiss"),
        ("/", "Search"),
        ("[ / ]", "Previous / next page"),
        ("O", "Cycle sort order"),
        ("", ""),
        ("", "── Playback ──"),
        ("A", "Play all from selection"),
        ("Space", "Play / Pause"),
        ("N / P", "Next / previous track"),
        ("S", "Toggle shuffle"),
        ("R", "Toggle repeat"),
        ("+ / -", "Volume up / down"),
        ("M", "Mute / unmute"),
        (", / .", "Seek -5s / +5s"),
        ("0-9", "Seek to 0%-90%"),
        ("", ""),
        ("", "── Library ──"),
        ("F", "Toggle favorite"),
        ("U", "Scan library"),
        ("C", "New playlist"),
        ("D", "New download"),
        ("I / Delete", "Add / remove directory"),
        ("", ""),
        ("", "── General ──"),
        ("T", "Toggle theme"),
        ("H", "Toggle this help"),
        ("Q", "Quit"),
    ];

    let popup_area = centered_rect(frame.area(), 62, keybindings.len() as u16 + 2);
    frame.render_widget(Clear, popup_area);

    let lines: Vec<Line> = keybindings
        .iter()
        .map(|(key, desc)| {
            if key.is_empty() {
                Line::from(Span::styled(
                    format!("{:^38}", desc),
                    Style::default().fg(palette.warning).add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(vec![
                    Span::styled(
                        format!("{:>18}", key),
                        Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw("  "),
                    Span::styled(desc.to_string(), Style::default().fg(palette.text)),
                ])
            }
        })
        .collect();

    let help_text = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.header))
                .title(" Help (H or Esc to close) ")
                .title_style(Style::default().fg(palette.header).add_modifier(Modifier::BOLD))
                .style(Style::default().bg(palette.popup_bg)),
        )
        .style(Style::default().bg(palette.popup_bg));

    frame.render_widget(help_text, popup_area);
}
