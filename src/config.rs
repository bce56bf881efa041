//! Configuration for the catalog controller and clients.
//!
//! Values are layered: command-line flags over `KCP_CATALOG_*` environment
//! variables over a TOML file over built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use catalog_core::MalformedSchemaPolicy;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CliError, Result};

pub const ENV_STATE: &str = "KCP_CATALOG_STATE";
pub const ENV_BIND_TIMEOUT: &str = "KCP_CATALOG_BIND_TIMEOUT";
pub const ENV_POLL_INTERVAL_MS: &str = "KCP_CATALOG_POLL_INTERVAL_MS";
pub const ENV_SCHEMA_POLICY: &str = "KCP_CATALOG_SCHEMA_POLICY";
pub const ENV_MAX_CONSECUTIVE_ERRORS: &str = "KCP_CATALOG_MAX_CONSECUTIVE_ERRORS";

/// Configuration shared by every subcommand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// YAML state file the store is loaded from and persisted to.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    /// How long `bind` waits for created bindings to become bound.
    #[serde(with = "duration_secs", default = "default_bind_timeout")]
    pub bind_timeout: Duration,

    /// How often `bind` polls binding phases while waiting.
    #[serde(with = "duration_millis", default = "default_poll_interval")]
    pub poll_interval: Duration,

    /// Handling of schema identifiers that do not parse.
    #[serde(default)]
    pub schema_policy: MalformedSchemaPolicy,

    /// Failures in a row after which the watching controller gives up.
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            bind_timeout: default_bind_timeout(),
            poll_interval: default_poll_interval(),
            schema_policy: MalformedSchemaPolicy::default(),
            max_consecutive_errors: default_max_consecutive_errors(),
        }
    }
}

impl CatalogConfig {
    /// Defaults, or the given file, with environment overrides applied.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Config` if the file cannot be read or parsed.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(config.with_env_from(|key| std::env::var(key).ok()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Config` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| CliError::config(path, e.to_string()))?;
        toml::from_str(&content)
            .map_err(|e| CliError::config(path, format!("Failed to parse config: {e}")))
    }

    /// Apply overrides looked up through `var`. Unparseable values are
    /// ignored with a warning.
    #[must_use]
    pub fn with_env_from(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = var(ENV_STATE) {
            self.state_path = PathBuf::from(path);
        }

        if let Some(value) = var(ENV_BIND_TIMEOUT) {
            match value.parse() {
                Ok(secs) => self.bind_timeout = Duration::from_secs(secs),
                Err(_) => warn!(var = ENV_BIND_TIMEOUT, value = %value, "Ignoring invalid value"),
            }
        }

        if let Some(value) = var(ENV_POLL_INTERVAL_MS) {
            match value.parse() {
                Ok(millis) => self.poll_interval = Duration::from_millis(millis),
                Err(_) => warn!(var = ENV_POLL_INTERVAL_MS, value = %value, "Ignoring invalid value"),
            }
        }

        if let Some(value) = var(ENV_SCHEMA_POLICY) {
            match value.parse() {
                Ok(policy) => self.schema_policy = policy,
                Err(_) => warn!(var = ENV_SCHEMA_POLICY, value = %value, "Ignoring invalid value"),
            }
        }

        if let Some(value) = var(ENV_MAX_CONSECUTIVE_ERRORS) {
            match value.parse() {
                Ok(max) => self.max_consecutive_errors = max,
                Err(_) => {
                    warn!(var = ENV_MAX_CONSECUTIVE_ERRORS, value = %value, "Ignoring invalid value");
                }
            }
        }

        self
    }

    /// Set the state file.
    #[must_use]
    pub fn state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = path.into();
        self
    }

    /// Set the bind timeout.
    #[must_use]
    pub const fn bind_timeout(mut self, timeout: Duration) -> Self {
        self.bind_timeout = timeout;
        self
    }

    /// Set the bind poll interval.
    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

fn default_state_path() -> PathBuf {
    PathBuf::from(".kcp-catalog.yaml")
}

const fn default_bind_timeout() -> Duration {
    Duration::from_secs(30)
}

const fn default_poll_interval() -> Duration {
    Duration::from_millis(500)
}

const fn default_max_consecutive_errors() -> usize {
    10
}

/// Serialization helper for Duration as seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Serialization helper for Duration as milliseconds.
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
