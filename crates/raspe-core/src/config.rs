//! Configuration management for raspe.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration.
///
/// This is loaded from `~/.config/raspe/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Pagination, pacing and retry settings
    pub harvest: HarvestConfig,
    /// HTTP transport settings
    pub http: HttpConfig,
    /// Browser automation settings
    pub browser: BrowserConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, falling back to defaults if it is missing.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            tracing::debug!("Loading config from {}", path.display());
            let contents = fs::read_to_string(path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `RASPE_PACING_MS`: Override the pause before each page fetch
    /// - `RASPE_MAX_ATTEMPTS`: Override the per-page attempt budget
    /// - `RASPE_RETAIN_ARTIFACTS`: Keep downloaded payloads (true/false)
    /// - `RASPE_HEADLESS`: Override browser headless mode (true/false)
    /// - `RASPE_DOWNLOAD_DIR`: Root directory for harvest sessions
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup. Unparseable values are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(ms) = lookup("RASPE_PACING_MS").and_then(|v| v.parse().ok()) {
            self.harvest.pacing_ms = ms;
            tracing::debug!("Override harvest.pacing_ms from env: {}", ms);
        }

        if let Some(attempts) = lookup("RASPE_MAX_ATTEMPTS").and_then(|v| v.parse().ok()) {
            self.harvest.max_attempts = attempts;
            tracing::debug!("Override harvest.max_attempts from env: {}", attempts);
        }

        if let Some(retain) = lookup("RASPE_RETAIN_ARTIFACTS").and_then(|v| v.parse().ok()) {
            self.harvest.retain_artifacts = retain;
            tracing::debug!("Override harvest.retain_artifacts from env: {}", retain);
        }

        if let Some(headless) = lookup("RASPE_HEADLESS").and_then(|v| v.parse().ok()) {
            self.browser.headless = headless;
            tracing::debug!("Override browser.headless from env: {}", headless);
        }

        if let Some(dir) = lookup("RASPE_DOWNLOAD_DIR").filter(|v| !v.is_empty()) {
            tracing::debug!("Override harvest.download_dir from env: {}", dir);
            self.harvest.download_dir = Some(PathBuf::from(dir));
        }
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<PathBuf> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let config_dir = path.parent().ok_or_else(|| ConfigError::InvalidValue {
            field: "config_path".to_string(),
            reason: "no parent directory".to_string(),
        })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", path.display());
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Render as pretty TOML.
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/raspe/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("br", "raspe", "raspe").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Pagination, pacing and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Pause before every page fetch, in milliseconds
    pub pacing_ms: u64,
    /// Attempts per page before giving up
    pub max_attempts: u32,
    /// Base of the exponential backoff, in seconds
    pub backoff_base_secs: u64,
    /// Keep session directories after rows are extracted
    pub retain_artifacts: bool,
    /// Root directory for session storage (system temp dir when unset)
    pub download_dir: Option<PathBuf>,
}

impl HarvestConfig {
    /// Pacing interval as a [`Duration`].
    #[must_use]
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    /// Resolved root directory for harvest sessions.
    #[must_use]
    pub fn download_root(&self) -> PathBuf {
        self.download_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("raspe"))
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            pacing_ms: 2000,
            max_attempts: 3,
            backoff_base_secs: 1,
            retain_artifacts: false,
            download_dir: None,
        }
    }
}

/// HTTP transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Read timeout in seconds
    pub read_timeout_secs: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            read_timeout_secs: 30,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Hard limit for an anti-bot challenge to clear, in seconds
    pub challenge_timeout_secs: u64,
    /// Challenge polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// Wait for a selector to appear, in seconds
    pub element_timeout_secs: u64,
    /// Settle time after navigation, in milliseconds
    pub page_load_wait_ms: u64,
    /// Settle time after switching result pages, in milliseconds
    pub between_pages_wait_ms: u64,
    /// Upper bound on pages walked per search
    pub max_pages: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            challenge_timeout_secs: 60,
            poll_interval_ms: 1000,
            element_timeout_secs: 15,
            page_load_wait_ms: 2000,
            between_pages_wait_ms: 3000,
            max_pages: 100,
        }
    }
}
