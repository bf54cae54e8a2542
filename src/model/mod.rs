//! Model module - Application state and data types
//!
//! Submodules by responsibility:
//!
//! - `types`: UI enums, notices, prompts and `UiState`
//! - `content`: server data and the content view state built from it
//! - `queue`: play queue and the next/previous policy
//! - `playback`: the playback session state machine
//! - `api_client`: music server REST client
//! - `app_model`: main application model with state management methods

mod types;
pub mod content;
pub mod queue;
mod playback;
mod api_client;
mod app_model;

pub use types::{ActiveSection, Notice, NoticeLevel, Prompt, PromptKind, UiState};

pub use playback::{
    PlaybackInfo, PlaybackSession, PlayerState, SessionEffect, VolumeIcon, SEEK_STEP_SECS,
    VOLUME_STEP,
};

pub use content::{
    ContentState, ContentView, DownloadEntry, DownloadSource, PlaylistDetail, PlaylistSummary,
    SortKey, Track, TrackId,
};

pub use api_client::MusicServerClient;

pub use app_model::AppModel;
