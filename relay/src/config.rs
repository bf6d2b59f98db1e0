//! Configuration loading for jvc-relay.
//!
//! Configuration is loaded from a TOML file (default: `relay.toml`) or
//! assembled from command-line flags; the merged value is immutable for
//! the server's lifetime and shared read-only across sessions.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for jvc-relay.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Client-facing listener configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Upstream projector configuration.
    pub device: DeviceConfig,
    /// Per-session timeout and retry policy.
    #[serde(default)]
    pub session: SessionConfig,
    /// HTTP endpoints configuration.
    #[serde(default)]
    pub http: HttpConfig,
}

/// Client-facing listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for client connections (default: 127.0.0.1:20554).
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

/// Upstream projector configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Projector hostname or IP address.
    pub host: String,
    /// Projector control port (default: 20554).
    #[serde(default = "default_device_port")]
    pub port: u16,
}

/// Per-session timeout and retry policy.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Timeout for every network operation, in seconds (default: 2).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Handshake attempts to allow beyond the first (default: 0).
    #[serde(default)]
    pub retries: u32,
    /// Seconds to wait between handshake attempts (default: 5).
    #[serde(default = "default_retry_wait_secs")]
    pub retry_wait_secs: u64,
}

/// HTTP endpoints configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Enable the health/metrics HTTP server (default: false).
    #[serde(default)]
    pub enabled: bool,
    /// Bind address for the HTTP server (default: 127.0.0.1:8080).
    #[serde(default = "default_http_bind")]
    pub bind_address: String,
}

// Default value functions
fn default_bind_address() -> String {
    "127.0.0.1:20554".to_string()
}

fn default_device_port() -> u16 {
    20554
}

fn default_timeout_secs() -> u64 {
    2
}

fn default_retry_wait_secs() -> u64 {
    5
}

fn default_http_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retries: 0,
            retry_wait_secs: default_retry_wait_secs(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: default_http_bind(),
        }
    }
}

impl DeviceConfig {
    /// Device address in `host:port` form, used for connecting and logging.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl SessionConfig {
    /// Operation timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Wait between handshake attempts as a [`Duration`].
    pub fn retry_wait(&self) -> Duration {
        Duration::from_secs(self.retry_wait_secs)
    }
}

impl Config {
    /// Minimal configuration for the given projector host; everything else
    /// takes its default.
    pub fn for_device(host: impl Into<String>) -> Self {
        Self {
            server: ServerConfig::default(),
            device: DeviceConfig {
                host: host.into(),
                port: default_device_port(),
            },
            session: SessionConfig::default(),
            http: HttpConfig::default(),
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Check requirements that serde defaults cannot express.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty device host or a zero operation
    /// timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.host.is_empty() {
            return Err(ConfigError::Invalid {
                reason: "device host must not be empty (pass it as an argument or set [device] host)"
                    .to_string(),
            });
        }
        if self.session.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                reason: "session timeout must be at least 1 second".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// Configuration value rejected by validation.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// What was wrong.
        reason: String,
    },
}
