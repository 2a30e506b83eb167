use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

/// Main configuration structure for streamtool
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Connection to the Streams instance
    #[serde(default)]
    pub instance: InstanceConfig,

    /// Retry policy for REST reads
    #[serde(default)]
    pub retry: RetryConfig,

    /// Condition checker timing
    #[serde(default)]
    pub checker: CheckerConfig,

    /// Date and time presentation
    #[serde(default)]
    pub display: DisplayConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Streams instance connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InstanceConfig {
    /// Base URL of the deployment, e.g. `https://cp4d:31843`
    #[serde(default)]
    pub endpoint: String,

    /// Instance identifier
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,

    #[serde(default, deserialize_with = "lenient_optional_string")]
    pub username: Option<String>,

    #[serde(default, deserialize_with = "lenient_optional_string")]
    pub password: Option<String>,

    /// Bearer token, used instead of username/password when set
    #[serde(default)]
    pub token: Option<String>,

    /// Verify TLS certificates
    #[serde(default = "default_true")]
    pub verify_ssl: bool,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

/// Scalar read from YAML or the environment, where `12345` parses as a number.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<Scalar> for String {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Str(s) => s,
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Scalar::deserialize(deserializer).map(String::from)
}

fn lenient_optional_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(String::from))
}

const fn default_true() -> bool {
    true
}

const fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            id: String::new(),
            username: None,
            password: None,
            token: None,
            verify_ssl: true,
            timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    500
}

const fn default_max_backoff_ms() -> u64 {
    8_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Condition checker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CheckerConfig {
    /// Delay between polls in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Time without progress before giving up, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Extra consecutive all-valid polls required before passing
    #[serde(default = "default_stability_checks")]
    pub stability_checks: u32,
}

const fn default_poll_interval_ms() -> u64 {
    500
}

const fn default_timeout_ms() -> u64 {
    10_000
}

const fn default_stability_checks() -> u32 {
    2
}

impl CheckerConfig {
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_ms: default_timeout_ms(),
            stability_checks: default_stability_checks(),
        }
    }
}

/// Date and time presentation for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DisplayConfig {
    /// `local`, `utc`, or a fixed offset such as `+02:00`
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// strftime pattern for application configuration timestamps
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

/// Resolved form of [`DisplayConfig::timezone`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayTimezone {
    Local,
    Utc,
    Fixed(chrono::FixedOffset),
}

impl DisplayConfig {
    /// Parse the configured timezone.
    pub fn resolve_timezone(&self) -> Result<DisplayTimezone, String> {
        match self.timezone.trim().to_ascii_lowercase().as_str() {
            "local" | "" => Ok(DisplayTimezone::Local),
            "utc" | "z" => Ok(DisplayTimezone::Utc),
            other => other
                .parse::<chrono::FixedOffset>()
                .map(DisplayTimezone::Fixed)
                .map_err(|_| self.timezone.clone()),
        }
    }
}

fn default_timezone() -> String {
    "local".to_string()
}

fn default_date_format() -> String {
    "%x %X %Z".to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            date_format: default_date_format(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
