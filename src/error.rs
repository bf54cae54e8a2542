//! Error types shared by the API client, the playback session and the controller.

use thiserror::Error;

/// Failure talking to the music server.
///
/// A non-2xx response is reported as [`ApiError::Status`] and its body is
/// never inspected.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("API error: {reason}")]
    Status { status: u16, reason: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to parse response: {0}")]
    Decode(String),

    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Application level error taxonomy.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Network(#[from] ApiError),

    #[error("Playback failed: {0}")]
    Playback(String),

    #[error("{0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
