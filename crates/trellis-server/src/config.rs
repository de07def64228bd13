//! Engine configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML document,
//! then `TRELLIS_*` environment variables.
//!
//! | Key | Env var | Default |
//! |-----|---------|---------|
//! | `max_body_bytes` | `TRELLIS_MAX_BODY_BYTES` | 4 MiB |
//! | `shutdown_timeout_secs` | `TRELLIS_SHUTDOWN_TIMEOUT_SECS` | 30 |
//! | `keep_alive` | `TRELLIS_KEEP_ALIVE` | `true` |
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use trellis_server::EngineConfig;
//!
//! let config = EngineConfig::builder()
//!     .max_body_bytes(1024)
//!     .shutdown_timeout(Duration::from_secs(5))
//!     .build();
//!
//! assert_eq!(config.max_body_bytes(), 1024);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Default request body limit (4 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Default graceful shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Prefix of the environment variables read by [`EngineConfig::load`].
pub const ENV_PREFIX: &str = "TRELLIS_";

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    max_body_bytes: usize,
    shutdown_timeout_secs: u64,
    keep_alive: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            keep_alive: true,
        }
    }
}

impl EngineConfig {
    /// Returns a builder seeded with the defaults.
    #[must_use]
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Largest accepted request body; larger bodies get 413.
    #[must_use]
    pub const fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// How long shutdown waits for open connections.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Whether HTTP/1.1 keep-alive is enabled.
    #[must_use]
    pub const fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Parses a TOML document. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] for malformed input or unknown keys.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, or
    /// [`ConfigError::Toml`] if it is not valid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Loads defaults, then `path` when given, then the process environment.
    ///
    /// # Errors
    ///
    /// Propagates file, TOML and environment parsing errors.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_vars(std::env::vars())?;
        Ok(config)
    }

    /// Applies `TRELLIS_*` overrides from `vars`; other names are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] when a recognised variable has an
    /// unparseable value.
    pub fn apply_env_vars<I, K, V>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in vars {
            let name = name.as_ref();
            let Some(key) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.as_ref().trim();
            let invalid = |reason| ConfigError::Env {
                var: name.to_string(),
                reason,
            };

            match key {
                "MAX_BODY_BYTES" => {
                    self.max_body_bytes = value
                        .parse()
                        .map_err(|_| invalid("expected a byte count"))?;
                }
                "SHUTDOWN_TIMEOUT_SECS" => {
                    self.shutdown_timeout_secs = value
                        .parse()
                        .map_err(|_| invalid("expected a number of seconds"))?;
                }
                "KEEP_ALIVE" => {
                    self.keep_alive =
                        parse_bool(value).ok_or_else(|| invalid("expected a boolean"))?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Sets the request body limit.
    #[must_use]
    pub fn max_body_bytes(mut self, bytes: usize) -> Self {
        self.config.max_body_bytes = bytes;
        self
    }

    /// Sets the graceful shutdown timeout, truncated to whole seconds.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout_secs = timeout.as_secs();
        self
    }

    /// Enables or disables keep-alive.
    #[must_use]
    pub fn keep_alive(mut self, enabled: bool) -> Self {
        self.config.keep_alive = enabled;
        self
    }

    /// Finishes the configuration.
    #[must_use]
    pub fn build(self) -> EngineConfig {
        self.config
    }
}
