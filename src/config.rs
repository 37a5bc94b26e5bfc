//! Configuration module for tagwatch.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::{Result, TagwatchError};

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file. Empty means in-memory.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/tagwatch.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// What the collector does when a source fails to fetch a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceErrorPolicy {
    /// Log the failure and keep going; fail the cycle only if every source failed.
    #[default]
    Continue,
    /// End the cycle (and a looping run) on the first failed fetch.
    Abort,
}

/// Collector configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Tags to collect.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Seconds between collection cycles.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Milliseconds `stop()` waits for the poll loop to exit.
    #[serde(default = "default_stop_grace")]
    pub stop_grace_ms: u64,
    /// Failure policy for source fetch errors.
    #[serde(default)]
    pub on_source_error: SourceErrorPolicy,
}

/// Longest accepted poll interval (one week).
pub const MAX_POLL_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

fn default_poll_interval() -> u64 {
    60
}

fn default_stop_grace() -> u64 {
    1000
}

impl CollectorConfig {
    /// Poll interval as a `Duration`.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Stop grace period as a `Duration`.
    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            poll_interval_secs: default_poll_interval(),
            stop_grace_ms: default_stop_grace(),
            on_source_error: SourceErrorPolicy::default(),
        }
    }
}

/// Kind of feed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Mastodon hashtag timeline API.
    Mastodon,
    /// Per-tag RSS feed published by the server.
    Rss,
    /// Local JSON file of statuses.
    File,
}

/// A configured feed source.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Source kind.
    pub kind: SourceKind,
    /// Server host or base URL (mastodon and rss sources).
    #[serde(default)]
    pub server: String,
    /// Access token for authenticated requests.
    #[serde(default)]
    pub access_token: Option<String>,
    /// File path (file sources).
    #[serde(default)]
    pub path: Option<String>,
}

impl SourceConfig {
    /// Anonymous mastodon source for the given server.
    pub fn mastodon(server: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::Mastodon,
            server: server.into(),
            access_token: None,
            path: None,
        }
    }

    /// File source reading the given path.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::File,
            server: String::new(),
            access_token: None,
            path: Some(path.into()),
        }
    }
}

/// Report configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Trailing window in hours.
    #[serde(default = "default_window_hours")]
    pub window_hours: u64,
}

/// Longest accepted report window (one hundred years).
pub const MAX_WINDOW_HOURS: u64 = 100 * 366 * 24;

fn default_window_hours() -> u64 {
    48
}

impl ReportConfig {
    /// Trailing window as a `chrono::Duration`.
    ///
    /// Values above [`MAX_WINDOW_HOURS`] are rejected by
    /// [`Config::validate`] and clamped here.
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.window_hours.min(MAX_WINDOW_HOURS) as i64)
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            window_hours: default_window_hours(),
        }
    }
}

/// HTTP fetch configuration shared by remote sources.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Read timeout in seconds.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum records taken from one fetch.
    #[serde(default = "default_max_items")]
    pub max_items_per_fetch: usize,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    20
}

fn default_total_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_items() -> usize {
    40
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            total_timeout_secs: default_total_timeout(),
            max_redirects: default_max_redirects(),
            max_items_per_fetch: default_max_items(),
        }
    }
}

/// Stats web server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Host address to bind.
    #[serde(default = "default_web_host")]
    pub host: String,
    /// Port number (0 picks a free port).
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// Milliseconds `shutdown()` waits for in-flight requests.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_ms: u64,
}

fn default_web_host() -> String {
    "127.0.0.1".to_string()
}

fn default_web_port() -> u16 {
    8080
}

fn default_shutdown_grace() -> u64 {
    1000
}

impl WebConfig {
    /// Shutdown grace period as a `Duration`.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            shutdown_grace_ms: default_shutdown_grace(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file. Empty logs to the console only.
    #[serde(default)]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: String::new(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Collector configuration.
    #[serde(default)]
    pub collector: CollectorConfig,
    /// Feed sources, visited in this order.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    /// Report configuration.
    #[serde(default)]
    pub report: ReportConfig,
    /// HTTP fetch configuration.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Stats web server configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(TagwatchError::Io)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| TagwatchError::Validation(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `TAGWATCH_DB_PATH`: database path
    /// - `TAGWATCH_LOG_LEVEL`: log level
    /// - `TAGWATCH_ACCESS_TOKEN`: token for mastodon sources that have none
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("TAGWATCH_DB_PATH") {
            self.database.path = path;
        }

        if let Ok(level) = std::env::var("TAGWATCH_LOG_LEVEL") {
            if !level.is_empty() {
                self.logging.level = level;
            }
        }

        if let Ok(token) = std::env::var("TAGWATCH_ACCESS_TOKEN") {
            if !token.is_empty() {
                for source in &mut self.sources {
                    if source.kind == SourceKind::Mastodon && source.access_token.is_none() {
                        source.access_token = Some(token.clone());
                    }
                }
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.collector.poll_interval_secs == 0 {
            return Err(TagwatchError::Config(
                "collector.poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.collector.poll_interval_secs > MAX_POLL_INTERVAL_SECS {
            return Err(TagwatchError::Config(format!(
                "collector.poll_interval_secs must be at most {}",
                MAX_POLL_INTERVAL_SECS
            )));
        }
        if self.report.window_hours == 0 {
            return Err(TagwatchError::Config(
                "report.window_hours must be greater than zero".to_string(),
            ));
        }
        if self.report.window_hours > MAX_WINDOW_HOURS {
            return Err(TagwatchError::Config(format!(
                "report.window_hours must be at most {}",
                MAX_WINDOW_HOURS
            )));
        }
        for (i, source) in self.sources.iter().enumerate() {
            match source.kind {
                SourceKind::File => {
                    if source.path.as_deref().map_or(true, str::is_empty) {
                        return Err(TagwatchError::Config(format!(
                            "sources[{i}]: file source requires a path"
                        )));
                    }
                }
                SourceKind::Mastodon | SourceKind::Rss => {
                    if source.server.is_empty() {
                        return Err(TagwatchError::Config(format!(
                            "sources[{i}]: server is required"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
