//! Client settings persisted as JSON under `.cache/`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

const SETTINGS_FILE: &str = ".cache/settings.json";
const SERVER_URL_ENV: &str = "JUKEBOX_SERVER_URL";

pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";
pub const DEFAULT_VOLUME: f32 = 0.7;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

/// What the shuffle toggle does to the play queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShuffleMode {
    /// Flag is shown in the player bar, play order is untouched.
    #[default]
    Indicator,
    /// Upcoming tracks are put in random order.
    Permute,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server_url: String,
    pub theme: Theme,
    pub default_volume: f32,
    pub page_size: u32,
    pub poll_interval_ms: u64,
    pub poll_timeout_secs: Option<u64>,
    pub max_poll_failures: Option<u32>,
    pub shuffle_mode: ShuffleMode,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            theme: Theme::Dark,
            default_volume: DEFAULT_VOLUME,
            page_size: 50,
            poll_interval_ms: 1000,
            poll_timeout_secs: Some(3600),
            max_poll_failures: None,
            shuffle_mode: ShuffleMode::Indicator,
        }
    }
}

impl AppConfig {
    /// Load settings from the default location, then apply the environment
    /// and command line overrides for the server URL.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(Path::new(SETTINGS_FILE))?;

        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            config.server_url = url;
        }
        if let Some(url) = std::env::args().nth(1) {
            config.server_url = url;
        }

        config.server_url = normalize_server_url(&config.server_url)?;
        config.default_volume = config.default_volume.clamp(0.0, 1.0);
        Ok(config)
    }

    /// Read settings from `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&PathBuf::from(SETTINGS_FILE))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn poll_timeout(&self) -> Option<Duration> {
        self.poll_timeout_secs.map(Duration::from_secs)
    }
}

/// Validate a server URL and strip trailing slashes.
pub fn normalize_server_url(url: &str) -> Result<String> {
    let url = url.trim();
    if url.is_empty() {
        return Err(AppError::Config("server URL cannot be empty".into()));
    }

    let url = url.trim_end_matches('/').to_string();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(AppError::Config(
            "server URL must start with http:// or https://".into(),
        ));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn theme_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let config = AppConfig {
            theme: Theme::Light,
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.theme, Theme::Light);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "shuffle_mode": "permute", "poll_timeout_secs": null }"#).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.shuffle_mode, ShuffleMode::Permute);
        assert_eq!(loaded.poll_timeout(), None);
        assert_eq!(loaded.page_size, 50);
        assert_eq!(loaded.server_url, DEFAULT_SERVER_URL);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(AppConfig::load_from(&path), Err(AppError::Config(_))));
    }

    #[test]
    fn server_url_is_normalized() {
        assert_eq!(
            normalize_server_url("http://music.local:5000/").unwrap(),
            "http://music.local:5000"
        );
        assert!(normalize_server_url("").is_err());
        assert!(normalize_server_url("ftp://music.local").is_err());
        assert!(normalize_server_url("music.local").is_err());
    }
}
