//! Server configuration resolved from the environment.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::chat::DEFAULT_CAT_FACT_URL;

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default database location, relative to the working directory.
pub const DEFAULT_DB_PATH: &str = "data/conversation.db";

/// Default directory holding the built front-end.
pub const DEFAULT_STATIC_DIR: &str = "dist-src";

/// Default timeout for outbound HTTP calls, in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable holds a value that cannot be parsed.
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue {
        /// Variable name.
        name: &'static str,
        /// Raw value found.
        value: String,
    },
    /// A field is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// The cat-facts endpoint is not a URL.
    #[error("invalid cat fact URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Runtime configuration for the chat server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// TCP port to listen on (all interfaces).
    pub port: u16,
    /// `SQLite` database file.
    pub database_path: PathBuf,
    /// Directory served for non-API paths.
    pub static_dir: PathBuf,
    /// Endpoint queried for cat facts.
    pub cat_fact_url: String,
    /// Timeout applied to outbound HTTP calls.
    pub http_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_path: PathBuf::from(DEFAULT_DB_PATH),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            cat_fact_url: DEFAULT_CAT_FACT_URL.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl ServerConfig {
    /// Create a config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from process environment variables.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `ECHO_CHAT_PORT` (or `PORT`) | `port` |
    /// | `ECHO_CHAT_DB_PATH` | `database_path` |
    /// | `ECHO_CHAT_STATIC_DIR` | `static_dir` |
    /// | `ECHO_CHAT_CAT_FACT_URL` | `cat_fact_url` |
    /// | `ECHO_CHAT_HTTP_TIMEOUT_SECS` | `http_timeout` |
    ///
    /// # Errors
    /// Returns an error if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    /// Returns an error if a variable is set to an unusable value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let port_var = ["ECHO_CHAT_PORT", "PORT"]
            .into_iter()
            .find_map(|name| lookup(name).map(|value| (name, value)));
        if let Some((name, value)) = port_var {
            config.port = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { name, value })?;
        }

        if let Some(path) = lookup("ECHO_CHAT_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("ECHO_CHAT_STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup("ECHO_CHAT_CAT_FACT_URL") {
            config.cat_fact_url = url;
        }
        if let Some(value) = lookup("ECHO_CHAT_HTTP_TIMEOUT_SECS") {
            let secs: u64 = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    name: "ECHO_CHAT_HTTP_TIMEOUT_SECS",
                    value,
                })?;
            config.http_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the listening port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the database file.
    #[must_use]
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    /// Set the static asset directory.
    #[must_use]
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = dir.into();
        self
    }

    /// Set the cat-facts endpoint.
    #[must_use]
    pub fn with_cat_fact_url(mut self, url: impl Into<String>) -> Self {
        self.cat_fact_url = url.into();
        self
    }

    /// Set the outbound HTTP timeout.
    #[must_use]
    pub const fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "http_timeout must be > 0".to_string(),
            ));
        }

        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "database_path must not be empty".to_string(),
            ));
        }

        Url::parse(&self.cat_fact_url)?;
        Ok(())
    }
}
