//! Service configuration from `feedsift.toml`.
//!
//! The config file is optional. A missing file yields `Config::default()`.
//! Unknown keys are ignored by serde but logged, since they are usually typos.
//! The `PORT` environment variable overrides the file's `port`; command-line
//! flags are applied on top by the binary.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::server::OutputFormat;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// A value parsed but is out of range, or an override could not be parsed.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// Top-level service configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the HTTP listener binds to.
    pub bind_address: String,

    /// TCP port for the HTTP listener.
    pub port: u16,

    /// Output used when a request has no `format` parameter.
    pub default_format: OutputFormat,

    /// Budget for a single upstream fetch attempt, in seconds.
    pub fetch_timeout_secs: u64,

    /// Largest upstream body accepted, in bytes.
    pub max_feed_bytes: usize,

    /// Retries after the first attempt for 429/5xx/truncated responses,
    /// at most [`Config::MAX_RETRIES`].
    pub max_retries: u32,

    /// First retry delay in milliseconds; doubles per retry.
    pub retry_base_delay_ms: u64,

    /// Allow feed URLs that resolve to loopback or private addresses.
    pub allow_private_hosts: bool,

    /// `User-Agent` sent upstream.
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3015,
            default_format: OutputFormat::Summary,
            fetch_timeout_secs: 30,
            max_feed_bytes: 10 * 1024 * 1024,
            max_retries: 2,
            retry_base_delay_ms: 1000,
            allow_private_hosts: false,
            user_agent: concat!("feedsift/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Upper bound for `max_retries`; the backoff doubles per retry.
    pub const MAX_RETRIES: u32 = 10;

    const KNOWN_KEYS: [&'static str; 9] = [
        "bind_address",
        "port",
        "default_format",
        "fetch_timeout_secs",
        "max_feed_bytes",
        "max_retries",
        "retry_base_delay_ms",
        "allow_private_hosts",
        "user_agent",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    /// - Zero timeout or size limit, or more than [`Config::MAX_RETRIES`]
    ///   retries → `Err(ConfigError::Invalid)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // SEC-014: Check file size before reading to prevent memory exhaustion
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        let config = Self::from_toml(&content)?;
        tracing::info!(
            path = %path.display(),
            port = config.port,
            default_format = %config.default_format,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parses TOML content; blank content yields defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!("Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides from the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// `PORT` replaces `port`; an empty value is ignored.
    pub fn apply_env_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("PORT").filter(|v| !v.trim().is_empty()) {
            self.port = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT is not a valid port: {:?}", raw)))?;
            tracing::debug!(port = self.port, "PORT environment variable overrides config");
        }
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "fetch_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.max_feed_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_feed_bytes must be greater than 0".into(),
            ));
        }
        if self.max_retries > Self::MAX_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "max_retries must be at most {}",
                Self::MAX_RETRIES
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
