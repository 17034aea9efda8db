//! Editor configuration.
//!
//! Loaded via the `config` crate from environment variables prefixed with
//! `WIREFLOW`, using `__` as the nesting separator, e.g.
//! `WIREFLOW__LOG__POLL_INTERVAL_MS=1000`.

use serde::Deserialize;
use std::time::Duration;

/// Top-level editor configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditorConfig {
    /// Execution log streaming.
    #[serde(default)]
    pub log: LogStreamConfig,
}

/// Execution log polling and buffering.
#[derive(Debug, Clone, Deserialize)]
pub struct LogStreamConfig {
    /// Interval between log polls while executing, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Number of most recent entries requested per poll.
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,

    /// Maximum entries kept in the log buffer.
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Upper bound on an execution with no completion signal, in seconds.
    #[serde(default = "default_max_execution_secs")]
    pub max_execution_secs: u64,
}

fn default_poll_interval_ms() -> u64 {
    3000
}

fn default_fetch_limit() -> usize {
    50
}

fn default_buffer_capacity() -> usize {
    50
}

fn default_max_execution_secs() -> u64 {
    120
}

impl Default for LogStreamConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            fetch_limit: default_fetch_limit(),
            buffer_capacity: default_buffer_capacity(),
            max_execution_secs: default_max_execution_secs(),
        }
    }
}

impl LogStreamConfig {
    /// Poll interval as a duration. Zero is raised to one millisecond.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    #[must_use]
    pub fn max_execution(&self) -> Duration {
        Duration::from_secs(self.max_execution_secs)
    }
}

impl EditorConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(
            config::Environment::with_prefix("WIREFLOW")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
    }

    fn from_source<S>(source: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_vars(vars: &[(&str, &str)]) -> Result<EditorConfig, config::ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        EditorConfig::from_source(
            config::Environment::with_prefix("WIREFLOW")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(Some(map)),
        )
    }

    #[test]
    fn log_config_has_correct_defaults() {
        let config = LogStreamConfig::default();
        assert_eq!(config.poll_interval_ms, 3000);
        assert_eq!(config.fetch_limit, 50);
        assert_eq!(config.buffer_capacity, 50);
        assert_eq!(config.max_execution_secs, 120);
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = from_vars(&[]).expect("load");
        assert_eq!(config.log.poll_interval(), Duration::from_secs(3));
        assert_eq!(config.log.max_execution(), Duration::from_secs(120));
    }

    #[test]
    fn environment_overrides_nested_fields() {
        let config = from_vars(&[
            ("WIREFLOW__LOG__POLL_INTERVAL_MS", "500"),
            ("WIREFLOW__LOG__BUFFER_CAPACITY", "200"),
        ])
        .expect("load");
        assert_eq!(config.log.poll_interval_ms, 500);
        assert_eq!(config.log.buffer_capacity, 200);
        assert_eq!(config.log.fetch_limit, 50);
    }

    #[test]
    fn unparsable_value_is_an_error() {
        assert!(from_vars(&[("WIREFLOW__LOG__FETCH_LIMIT", "lots")]).is_err());
    }

    #[test]
    fn zero_interval_is_raised() {
        let config = LogStreamConfig {
            poll_interval_ms: 0,
            ..LogStreamConfig::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
    }
}
