//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `fermhub.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use fermhub_domain::control::ControlTiming;
use fermhub_domain::error::ValidationError;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Controller timing shared by every chamber.
    pub control: ControlTiming,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
    /// How long a connection waits on a locked database, in seconds.
    pub busy_timeout_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `fermhub.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is unusable.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("fermhub.toml")?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("FERMHUB_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = var("FERMHUB_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "database url must not be empty".to_string(),
            ));
        }
        self.control.validate()?;
        Ok(())
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:fermhub.db?mode=rwc".to_string(),
            busy_timeout_secs: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "fermhubd=info,fermhub_app=info,fermhub_adapter_storage_sqlite_sqlx=info"
                .to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Unusable controller timing.
    #[error("invalid control timing")]
    Timing(#[from] ValidationError),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.database.url, "sqlite:fermhub.db?mode=rwc");
        assert_eq!(config.control, ControlTiming::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.control.hysteresis_cycle(), Duration::from_secs(10));
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [database]
            url = 'sqlite:test.db'
            busy_timeout_secs = 15

            [logging]
            filter = 'debug'

            [control]
            chilling_cycle_secs = 900
            heating_cycle_secs = 300
            chilling_minimum_secs = 300
            heating_minimum_secs = 5
            hysteresis_cycle_secs = 5
            chiller_cooldown_secs = 420
            error_backoff_secs = 3
            readings_interval_secs = 30
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.database.url, "sqlite:test.db");
        assert_eq!(config.database.busy_timeout_secs, 15);
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.control.chilling_cycle(), Duration::from_secs(900));
        assert_eq!(config.control.chiller_cooldown(), Duration::from_secs(420));
        assert_eq!(config.control.error_backoff(), Duration::from_secs(3));
        assert_eq!(config.control.readings_interval(), Duration::from_secs(30));
    }

    #[test]
    fn should_parse_partial_control_section_with_defaults() {
        let toml = "
            [control]
            chiller_cooldown_secs = 300
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.control.chiller_cooldown_secs, 300);
        assert_eq!(config.control.heating_minimum_secs, 10);
        assert_eq!(config.database.url, "sqlite:fermhub.db?mode=rwc");
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.database_url(), "sqlite:fermhub.db?mode=rwc");
    }

    #[test]
    fn should_let_rust_log_win_over_fermhub_log() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("FERMHUB_DATABASE_URL", "sqlite::memory:"),
            ("FERMHUB_LOG", "info"),
            ("RUST_LOG", "trace"),
        ]);
        let mut config = Config::default();
        config.apply_env_overrides(|key| env.get(key).map(ToString::to_string));
        assert_eq!(config.database_url(), "sqlite::memory:");
        assert_eq!(config.logging.filter, "trace");
    }

    #[test]
    fn should_reject_zero_cycle_period() {
        let mut config = Config::default();
        config.control.hysteresis_cycle_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Timing(_))));
    }

    #[test]
    fn should_reject_empty_database_url() {
        let mut config = Config::default();
        config.database.url = String::new();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
