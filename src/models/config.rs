//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote listing endpoint settings
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Local store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Pagination settings
    #[serde(default)]
    pub paging: PagingConfig,

    /// Shared state lifecycle settings
    #[serde(default)]
    pub state: StateConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// A missing file is a configuration error rather than an I/O error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AppError::config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.remote.user_agent.trim().is_empty() {
            return Err(AppError::validation("remote.user_agent is empty"));
        }
        if self.remote.timeout_secs == 0 {
            return Err(AppError::validation("remote.timeout_secs must be > 0"));
        }
        self.remote.base_url()?;
        if self.paging.page_size == 0 {
            return Err(AppError::validation("paging.page_size must be > 0"));
        }
        if self.store.db_file.trim().is_empty() {
            return Err(AppError::validation("store.db_file is empty"));
        }
        Ok(())
    }
}

/// Remote listing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL the `posts` endpoints are resolved against
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl RemoteConfig {
    /// Parsed base URL, with a trailing slash so relative joins keep the path.
    pub fn base_url(&self) -> Result<Url> {
        let raw = self.base_url.trim();
        if raw.ends_with('/') {
            Ok(Url::parse(raw)?)
        } else {
            Ok(Url::parse(&format!("{raw}/"))?)
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Local store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file
    #[serde(default = "defaults::db_file")]
    pub db_file: String,
}

impl StoreConfig {
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.db_file)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_file: defaults::db_file(),
        }
    }
}

/// Pagination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagingConfig {
    /// Items requested per page
    #[serde(default = "defaults::page_size")]
    pub page_size: usize,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: defaults::page_size(),
        }
    }
}

/// Shared state lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// How long a shared stream keeps running after its last subscriber left
    #[serde(default = "defaults::keep_alive")]
    pub keep_alive_ms: u64,
}

impl StateConfig {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_millis(self.keep_alive_ms)
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            keep_alive_ms: defaults::keep_alive(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log filter when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

/// Display strings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LocaleConfig {
    #[serde(default)]
    pub messages: Messages,
}

impl LocaleConfig {
    /// Load locale strings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load locale strings or return defaults if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::debug!("Locale load failed from {:?}: {}", path.as_ref(), e);
            Self::default()
        })
    }
}

/// Message strings. `{placeholders}` are replaced by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Messages {
    #[serde(default = "defaults::missing_title")]
    pub missing_title: String,
    #[serde(default = "defaults::missing_body")]
    pub missing_body: String,
    #[serde(default = "defaults::loading")]
    pub loading: String,
    #[serde(default = "defaults::load_error")]
    pub load_error: String,
    #[serde(default = "defaults::stale_data")]
    pub stale_data: String,
    #[serde(default = "defaults::no_results")]
    pub no_results: String,
    #[serde(default = "defaults::end_of_results")]
    pub end_of_results: String,
    #[serde(default = "defaults::favorite_marker")]
    pub favorite_marker: String,
    #[serde(default = "defaults::favorite_added")]
    pub favorite_added: String,
    #[serde(default = "defaults::favorite_removed")]
    pub favorite_removed: String,
    #[serde(default = "defaults::no_favorites")]
    pub no_favorites: String,
    #[serde(default = "defaults::no_hints")]
    pub no_hints: String,
    #[serde(default = "defaults::hints_cleared")]
    pub hints_cleared: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            missing_title: defaults::missing_title(),
            missing_body: defaults::missing_body(),
            loading: defaults::loading(),
            load_error: defaults::load_error(),
            stale_data: defaults::stale_data(),
            no_results: defaults::no_results(),
            end_of_results: defaults::end_of_results(),
            favorite_marker: defaults::favorite_marker(),
            favorite_added: defaults::favorite_added(),
            favorite_removed: defaults::favorite_removed(),
            no_favorites: defaults::no_favorites(),
            no_hints: defaults::no_hints(),
            hints_cleared: defaults::hints_cleared(),
        }
    }
}

mod defaults {
    // Remote defaults
    pub fn base_url() -> String {
        "http://localhost:3000/".into()
    }
    pub fn user_agent() -> String {
        concat!("posts/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Store defaults
    pub fn db_file() -> String {
        "posts.db".into()
    }

    // Paging defaults
    pub fn page_size() -> usize {
        24
    }

    // State defaults
    pub fn keep_alive() -> u64 {
        5000
    }

    pub fn log_level() -> String {
        "info".into()
    }

    // Message defaults
    pub fn missing_title() -> String {
        "(no title)".into()
    }
    pub fn missing_body() -> String {
        "(no content)".into()
    }
    pub fn loading() -> String {
        "Loading...".into()
    }
    pub fn load_error() -> String {
        "Could not load: {error}".into()
    }
    pub fn stale_data() -> String {
        "Showing saved copy".into()
    }
    pub fn no_results() -> String {
        "No posts found".into()
    }
    pub fn end_of_results() -> String {
        "End of results ({count} posts)".into()
    }
    pub fn favorite_marker() -> String {
        "★".into()
    }
    pub fn favorite_added() -> String {
        "Added post {id} to favorites".into()
    }
    pub fn favorite_removed() -> String {
        "Removed post {id} from favorites".into()
    }
    pub fn no_favorites() -> String {
        "No favorites yet".into()
    }
    pub fn no_hints() -> String {
        "No recent searches".into()
    }
    pub fn hints_cleared() -> String {
        "Search history cleared".into()
    }
}
