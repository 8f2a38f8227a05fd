//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/agentmeter/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/agentmeter/` (~/.config/agentmeter/)
//! - State/Logs: `$XDG_STATE_HOME/agentmeter/` (~/.local/state/agentmeter/)
//!
//! The OpenCode database itself lives under `$XDG_DATA_HOME/opencode/` and is
//! only ever read.

use crate::catalog::BillingType;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Env var overriding the OpenCode database path.
pub const DB_PATH_ENV: &str = "OPENCODE_DB_PATH";

/// Env var overriding the Codex home directory.
pub const CODEX_HOME_ENV: &str = "CODEX_HOME";

/// Env var overriding the ChatGPT backend base URL.
pub const BASE_URL_ENV: &str = "CODEX_CHATGPT_BASE_URL";

const DEFAULT_BASE_URL: &str = "https://chatgpt.com/backend-api";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Non-empty value of an env var.
fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Record store location
    #[serde(default)]
    pub store: StoreConfig,

    /// Usage oracle (Codex rate limits)
    #[serde(default)]
    pub usage: UsageConfig,

    /// Per-provider overrides of the built-in catalog
    #[serde(default)]
    pub providers: HashMap<String, ProviderOverride>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Record store configuration
#[derive(Debug, Deserialize, Default)]
pub struct StoreConfig {
    /// Path to the OpenCode SQLite database
    pub database_path: Option<PathBuf>,
}

/// Usage oracle configuration
#[derive(Debug, Deserialize, Clone)]
pub struct UsageConfig {
    /// Enable/disable fetching the usage snapshot
    #[serde(default = "default_usage_enabled")]
    pub enabled: bool,

    /// Directory holding `auth.json` (default: `$CODEX_HOME` or `~/.codex`)
    pub codex_home: Option<PathBuf>,

    /// Backend base URL (default: `$CODEX_CHATGPT_BASE_URL` or the public endpoint)
    pub base_url: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_usage_timeout")]
    pub timeout_secs: u64,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            enabled: default_usage_enabled(),
            codex_home: None,
            base_url: None,
            timeout_secs: default_usage_timeout(),
        }
    }
}

impl UsageConfig {
    /// Resolved Codex home directory.
    pub fn codex_home(&self) -> PathBuf {
        if let Some(path) = &self.codex_home {
            return path.clone();
        }
        env_nonempty(CODEX_HOME_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| home_dir().join(".codex"))
    }

    /// Resolved backend base URL, without a trailing slash.
    pub fn base_url(&self) -> String {
        let url = self
            .base_url
            .clone()
            .or_else(|| env_nonempty(BASE_URL_ENV))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        url.trim_end_matches('/').to_string()
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(Error::Config(
                "usage.timeout_secs must be greater than 0".to_string(),
            ));
        }
        let url = self.base_url();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "usage.base_url must be an http(s) URL, got {:?}",
                url
            )));
        }
        Ok(())
    }
}

fn default_usage_enabled() -> bool {
    true
}

fn default_usage_timeout() -> u64 {
    10
}

/// Override for one provider in the built-in catalog
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProviderOverride {
    /// `"billing"` or `"account"`
    pub billing_type: Option<BillingType>,
    /// Display name
    pub name: Option<String>,
    /// Messages allowed per day (account-type providers)
    pub daily_message_limit: Option<u64>,
    /// Messages allowed per week (account-type providers)
    pub weekly_message_limit: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.usage.validate()?;
        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/agentmeter/config.toml` (~/.config/agentmeter/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("agentmeter").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/agentmeter/` (~/.local/state/agentmeter/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("agentmeter")
    }

    /// Returns the default OpenCode database path
    ///
    /// `$XDG_DATA_HOME/opencode/opencode.db` (~/.local/share/opencode/opencode.db)
    pub fn default_database_path() -> PathBuf {
        xdg_data_home().join("opencode").join("opencode.db")
    }

    /// Resolved OpenCode database path.
    ///
    /// `$OPENCODE_DB_PATH` wins over `[store] database_path`, which wins over
    /// the XDG default.
    pub fn database_path(&self) -> PathBuf {
        env_nonempty(DB_PATH_ENV)
            .map(PathBuf::from)
            .or_else(|| self.store.database_path.clone())
            .unwrap_or_else(Self::default_database_path)
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path behavior
    /// before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
