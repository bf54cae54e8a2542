//! Key event handling

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::model::{ActiveSection, PromptKind};
use super::AppController;

impl AppController {
    pub async fn handle_key_event(&self, key: KeyEvent) -> Result<()> {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        let model = self.model.lock().await;

        // Error notices block every other interaction
        if model.has_error().await {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                model.clear_notice().await;
            }
            return Ok(());
        }

        if model.is_help_popup_open().await {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('h') | KeyCode::Char('H')) {
                model.hide_help_popup().await;
            }
            return Ok(());
        }

        if model.is_prompt_open().await {
            match key.code {
                KeyCode::Esc => {
                    model.close_prompt().await;
                }
                KeyCode::Tab | KeyCode::BackTab => model.prompt_next_field().await,
                KeyCode::Backspace => model.prompt_backspace().await,
                KeyCode::Enter => {
                    let prompt = model.close_prompt().await;
                    drop(model);
                    if let Some(prompt) = prompt {
                        match prompt.kind {
                            PromptKind::CreatePlaylist => {
                                self.create_playlist(prompt.value(0), prompt.value(1)).await;
                            }
                            PromptKind::AddDownload => {
                                self.start_download(prompt.value(0), prompt.value(1), prompt.value(2))
                                    .await;
                            }
                            PromptKind::AddDirectory => self.add_directory(prompt.value(0)).await,
                        }
                    }
                }
                KeyCode::Char(c) => model.prompt_push_char(c).await,
                _ => {}
            }
            return Ok(());
        }

        let section = model.active_section().await;

        // Tab cycling works everywhere, including while typing a search
        let next_section = match key.code {
            KeyCode::BackTab => Some(model.cycle_section_backward().await),
            KeyCode::Tab if key.modifiers.contains(KeyModifiers::SHIFT) => {
                Some(model.cycle_section_backward().await)
            }
            KeyCode::Tab => Some(model.cycle_section_forward().await),
            _ => None,
        };
        if let Some(next_section) = next_section {
            drop(model);
            self.enter_section(next_section).await;
            return Ok(());
        }

        // Search section captures typing
        if section == ActiveSection::Search {
            match key.code {
                KeyCode::Enter => {
                    let query = model.search_query().await;
                    drop(model);
                    self.perform_search(&query).await;
                    return Ok(());
                }
                KeyCode::Esc => {
                    model.clear_search().await;
                    model.set_active_section(ActiveSection::Library).await;
                    return Ok(());
                }
                KeyCode::Backspace => {
                    model.backspace_search().await;
                    return Ok(());
                }
                KeyCode::Char(c) => {
                    if (c == 'q' || c == 'Q') && key.modifiers.contains(KeyModifiers::CONTROL) {
                        model.set_should_quit(true).await;
                        return Ok(());
                    }
                    model.append_to_search(c).await;
                    return Ok(());
                }
                _ => {}
            }
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                model.set_should_quit(true).await;
            }
            KeyCode::Up => model.move_selection_up().await,
            KeyCode::Down => model.move_selection_down().await,
            KeyCode::Esc | KeyCode::Backspace => {
                model.navigate_back().await;
            }
            KeyCode::Enter => {
                drop(model);
                match section {
                    ActiveSection::Playlists => {
                        if self.model.lock().await.selected_playlist().await.is_some() {
                            self.open_selected_playlist().await;
                        } else {
                            self.play_selected().await;
                        }
                    }
                    _ => self.play_selected().await,
                }
            }
            KeyCode::Char('a') | KeyCode::Char('A') => {
                drop(model);
                self.play_all_from_selection().await;
            }
            KeyCode::Char(' ') => {
                drop(model);
                self.toggle_playback().await;
            }
            KeyCode::Char('n') | KeyCode::Char('N') => {
                drop(model);
                self.next_track().await;
            }
            KeyCode::Char('p') | KeyCode::Char('P') => {
                drop(model);
                self.previous_track().await;
            }
            KeyCode::Char('s') | KeyCode::Char('S') => {
                drop(model);
                self.toggle_shuffle().await;
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                drop(model);
                self.toggle_repeat().await;
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                drop(model);
                self.volume_up().await;
            }
            KeyCode::Char('-') => {
                drop(model);
                self.volume_down().await;
            }
            KeyCode::Char('m') | KeyCode::Char('M') => {
                drop(model);
                self.toggle_mute().await;
            }
            KeyCode::Char(',') => {
                drop(model);
                self.seek_backward().await;
            }
            KeyCode::Char('.') => {
                drop(model);
                self.seek_forward().await;
            }
            KeyCode::Char(c) if c.is_ascii_digit() => {
                drop(model);
                if let Some(digit) = c.to_digit(10) {
                    self.seek_to_digit(digit).await;
                }
            }
            KeyCode::Char('/') => {
                model.set_active_section(ActiveSection::Search).await;
            }
            KeyCode::Char('[') => {
                drop(model);
                self.previous_page().await;
            }
            KeyCode::Char(']') => {
                drop(model);
                self.next_page().await;
            }
            KeyCode::Char('o') | KeyCode::Char('O') => {
                drop(model);
                self.cycle_sort().await;
            }
            KeyCode::Char('f') | KeyCode::Char('F') => {
                drop(model);
                self.toggle_favorite().await;
            }
            KeyCode::Char('u') | KeyCode::Char('U') => {
                drop(model);
                self.start_scan().await;
            }
            KeyCode::Char('c') | KeyCode::Char('C') => {
                model.open_prompt(PromptKind::CreatePlaylist).await;
            }
            KeyCode::Char('d') | KeyCode::Char('D') => {
                model.open_prompt(PromptKind::AddDownload).await;
            }
            KeyCode::Char('i') | KeyCode::Char('I') => {
                if section == ActiveSection::Settings {
                    model.open_prompt(PromptKind::AddDirectory).await;
                }
            }
            KeyCode::Delete => {
                if section == ActiveSection::Settings {
                    drop(model);
                    self.remove_selected_directory().await;
                }
            }
            KeyCode::Char('t') | KeyCode::Char('T') => {
                drop(model);
                self.toggle_theme().await;
            }
            KeyCode::Char('h') | KeyCode::Char('H') => {
                model.show_help_popup().await;
            }
            _ => {}
        }
        Ok(())
    }
}
