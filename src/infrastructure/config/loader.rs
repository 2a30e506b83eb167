use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project-local configuration directory.
pub const CONFIG_DIR: &str = ".streamtool";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid poll_interval_ms: {0}. Must be positive")]
    InvalidPollInterval(u64),

    #[error("Invalid checker timeout_ms: {timeout}. Must be at least poll_interval_ms ({poll})")]
    InvalidCheckerTimeout { timeout: u64, poll: u64 },

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error("Invalid max_retries: {0}. Cannot be 0")]
    InvalidMaxRetries(u32),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid timezone: {0}. Use local, utc or an offset such as +02:00")]
    InvalidTimezone(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .streamtool/config.yaml
    /// 3. .streamtool/local.yaml (optional local overrides)
    /// 4. Legacy connection variables (STREAMS_REST_URL, CP4D_URL,
    ///    STREAMS_INSTANCE_ID, STREAMS_USERNAME, STREAMS_PASSWORD)
    /// 5. STREAMTOOL_* variables, `__` separating nested keys
    pub fn load() -> Result<Config> {
        Self::load_from_dir(Path::new(CONFIG_DIR))
    }

    /// Same as [`ConfigLoader::load`], reading the YAML files from `dir`.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Config> {
        let dir = dir.as_ref();
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")));

        Self::finish(figment).context(format!(
            "Failed to extract configuration from {}",
            dir.display()
        ))
    }

    /// Load configuration from a specific file
    ///
    /// Environment variables still override the file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Configuration file {} does not exist", path.display());
        }
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path));

        Self::finish(figment).context(format!("Failed to load config from {}", path.display()))
    }

    fn finish(figment: Figment) -> Result<Config> {
        let config: Config = Self::with_env(figment).extract()?;
        Self::validate(&config)?;
        Ok(config)
    }

    fn with_env(figment: Figment) -> Figment {
        figment
            // CP4D_URL wins over STREAMS_REST_URL when both are set
            .merge(
                Env::raw()
                    .only(&["STREAMS_REST_URL"])
                    .map(|_| "instance.endpoint".into()),
            )
            .merge(
                Env::raw()
                    .only(&["CP4D_URL"])
                    .map(|_| "instance.endpoint".into()),
            )
            .merge(
                Env::raw()
                    .only(&["STREAMS_INSTANCE_ID", "STREAMS_USERNAME", "STREAMS_PASSWORD"])
                    .map(|key| {
                        if key.as_str().eq_ignore_ascii_case("STREAMS_INSTANCE_ID") {
                            "instance.id".into()
                        } else if key.as_str().eq_ignore_ascii_case("STREAMS_USERNAME") {
                            "instance.username".into()
                        } else {
                            "instance.password".into()
                        }
                    }),
            )
            .merge(Env::prefixed("STREAMTOOL_").split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let checker = &config.checker;
        if checker.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval(checker.poll_interval_ms));
        }
        if checker.timeout_ms < checker.poll_interval_ms {
            return Err(ConfigError::InvalidCheckerTimeout {
                timeout: checker.timeout_ms,
                poll: checker.poll_interval_ms,
            });
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(
                config.logging.rotation.clone(),
            ));
        }

        if config.retry.max_retries == 0 {
            return Err(ConfigError::InvalidMaxRetries(config.retry.max_retries));
        }

        if config.retry.initial_backoff_ms >= config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        config
            .display
            .resolve_timezone()
            .map_err(ConfigError::InvalidTimezone)?;

        if config.instance.timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "instance.timeout_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
