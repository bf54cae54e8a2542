//! Core type definitions for the application

use std::time::{Duration, Instant};

use crate::config::Theme;
use crate::jobs::JobStatus;
use super::content::LibraryStats;

/// How long an informational notice stays on screen.
pub const INFO_NOTICE_TTL: Duration = Duration::from_secs(5);

/// Which section of the UI is currently active/focused
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActiveSection {
    Search,
    Library,
    Playlists,
    Downloads,
    Settings,
}

impl ActiveSection {
    pub fn next(self) -> Self {
        match self {
            ActiveSection::Search => ActiveSection::Library,
            ActiveSection::Library => ActiveSection::Playlists,
            ActiveSection::Playlists => ActiveSection::Downloads,
            ActiveSection::Downloads => ActiveSection::Settings,
            ActiveSection::Settings => ActiveSection::Search,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            ActiveSection::Search => ActiveSection::Settings,
            ActiveSection::Library => ActiveSection::Search,
            ActiveSection::Playlists => ActiveSection::Library,
            ActiveSection::Downloads => ActiveSection::Playlists,
            ActiveSection::Settings => ActiveSection::Downloads,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ActiveSection::Search => "Search",
            ActiveSection::Library => "Library",
            ActiveSection::Playlists => "Playlists",
            ActiveSection::Downloads => "Downloads",
            ActiveSection::Settings => "Settings",
        }
    }

    /// Sections listed in the sidebar, in order.
    pub const NAVIGABLE: [ActiveSection; 4] = [
        ActiveSection::Library,
        ActiveSection::Playlists,
        ActiveSection::Downloads,
        ActiveSection::Settings,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Error,
    Info,
}

/// A message shown in an overlay. Errors block input until dismissed.
#[derive(Clone, Debug)]
pub struct Notice {
    pub message: String,
    pub level: NoticeLevel,
    pub raised_at: Instant,
}

impl Notice {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NoticeLevel::Error,
            raised_at: Instant::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NoticeLevel::Info,
            raised_at: Instant::now(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.level == NoticeLevel::Info && self.raised_at.elapsed() >= INFO_NOTICE_TTL
    }
}

/// What a text prompt collects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptKind {
    CreatePlaylist,
    AddDownload,
    AddDirectory,
}

#[derive(Clone, Debug)]
pub struct PromptField {
    pub label: &'static str,
    pub value: String,
}

impl PromptField {
    fn new(label: &'static str, value: &str) -> Self {
        Self {
            label,
            value: value.to_string(),
        }
    }
}

/// A modal text form.
#[derive(Clone, Debug)]
pub struct Prompt {
    pub kind: PromptKind,
    pub fields: Vec<PromptField>,
    pub active_field: usize,
}

impl Prompt {
    pub fn new(kind: PromptKind) -> Self {
        let fields = match kind {
            PromptKind::CreatePlaylist => vec![
                PromptField::new("Name", ""),
                PromptField::new("Description", ""),
            ],
            PromptKind::AddDownload => vec![
                PromptField::new("URL", ""),
                PromptField::new("Format", "mp3"),
                PromptField::new("Quality", "320"),
            ],
            PromptKind::AddDirectory => vec![PromptField::new("Directory", "")],
        };
        Self {
            kind,
            fields,
            active_field: 0,
        }
    }

    pub fn title(&self) -> &'static str {
        match self.kind {
            PromptKind::CreatePlaylist => " New Playlist ",
            PromptKind::AddDownload => " New Download ",
            PromptKind::AddDirectory => " Add Music Directory ",
        }
    }

    pub fn push_char(&mut self, c: char) {
        if let Some(field) = self.fields.get_mut(self.active_field) {
            field.value.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(field) = self.fields.get_mut(self.active_field) {
            field.value.pop();
        }
    }

    pub fn next_field(&mut self) {
        self.active_field = (self.active_field + 1) % self.fields.len().max(1);
    }

    pub fn value(&self, index: usize) -> &str {
        self.fields.get(index).map(|f| f.value.as_str()).unwrap_or("")
    }
}

/// UI state for the application
#[derive(Clone)]
pub struct UiState {
    pub active_section: ActiveSection,
    pub search_query: String,
    pub stats: LibraryStats,
    pub scan_status: Option<JobStatus>,
    pub notice: Option<Notice>,
    pub prompt: Option<Prompt>,
    pub show_help_popup: bool,
    pub theme: Theme,
    pub server_url: String,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            active_section: ActiveSection::Library,
            search_query: String::new(),
            stats: LibraryStats::default(),
            scan_status: None,
            notice: None,
            prompt: None,
            show_help_popup: false,
            theme: Theme::Dark,
            server_url: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_cycle_round_trips() {
        let mut section = ActiveSection::Library;
        for _ in 0..5 {
            section = section.next();
        }
        assert_eq!(section, ActiveSection::Library);
        assert_eq!(ActiveSection::Search.prev(), ActiveSection::Settings);
    }

    #[test]
    fn errors_never_expire_on_their_own() {
        let mut notice = Notice::error("boom");
        notice.raised_at = Instant::now() - Duration::from_secs(60);
        assert!(!notice.is_expired());

        let mut info = Notice::info("started");
        info.raised_at = Instant::now() - Duration::from_secs(60);
        assert!(info.is_expired());
    }

    #[test]
    fn download_prompt_has_defaults_and_cycles_fields() {
        let mut prompt = Prompt::new(PromptKind::AddDownload);
        assert_eq!(prompt.value(1), "mp3");
        assert_eq!(prompt.value(2), "320");

        prompt.push_char('x');
        prompt.next_field();
        prompt.backspace();
        assert_eq!(prompt.value(0), "x");
        assert_eq!(prompt.value(1), "mp");

        prompt.next_field();
        prompt.next_field();
        assert_eq!(prompt.active_field, 0);
    }
}
