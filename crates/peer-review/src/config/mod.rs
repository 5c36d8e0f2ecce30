use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::workflows::review::policy::{AssignmentStrategy, ReviewPolicy, MAX_REVIEW_DAYS};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the review service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub review: ReviewPolicy,
    pub oracle: Option<OracleConfig>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let format = match env::var("APP_LOG_FORMAT") {
            Ok(value) if value.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        };

        let review = load_review_policy()?;
        let oracle = load_oracle(review.oracle_timeout);

        if review.default_strategy == AssignmentStrategy::Oracle && oracle.is_none() {
            return Err(ConfigError::OracleEndpointMissing);
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, format },
            review,
            oracle,
        })
    }
}

fn load_review_policy() -> Result<ReviewPolicy, ConfigError> {
    let defaults = ReviewPolicy::default();

    let default_strategy = match env::var("REVIEW_STRATEGY") {
        Ok(raw) => AssignmentStrategy::from_str(&raw)
            .map_err(|_| ConfigError::InvalidStrategy(raw.clone()))?,
        Err(_) => defaults.default_strategy,
    };

    Ok(ReviewPolicy {
        max_active_reviews: numeric("REVIEW_MAX_ACTIVE", defaults.max_active_reviews)?,
        review_window_days: review_window_days(defaults.review_window_days)?,
        min_topic_papers: numeric("REVIEW_MIN_TOPIC_PAPERS", defaults.min_topic_papers)?,
        required_reviews: numeric("REVIEW_QUORUM", defaults.required_reviews)?,
        required_accepts: numeric("REVIEW_REQUIRED_ACCEPTS", defaults.required_accepts)?,
        default_strategy,
        evaluation_workers: numeric("REVIEW_WORKERS", defaults.evaluation_workers)?.max(1),
        oracle_timeout: Duration::from_secs(numeric(
            "ORACLE_TIMEOUT_SECS",
            defaults.oracle_timeout.as_secs(),
        )?),
    })
}

fn load_oracle(timeout: Duration) -> Option<OracleConfig> {
    let endpoint = env::var("ORACLE_URL")
        .ok()
        .filter(|value| !value.trim().is_empty())?;
    let api_key = env::var("ORACLE_API_KEY")
        .ok()
        .filter(|value| !value.trim().is_empty());

    Some(OracleConfig {
        endpoint,
        api_key,
        timeout,
    })
}

fn review_window_days(default: u32) -> Result<u32, ConfigError> {
    let days = numeric("REVIEW_WINDOW_DAYS", default)?;
    if days == 0 || days > MAX_REVIEW_DAYS {
        return Err(ConfigError::OutOfRange {
            key: "REVIEW_WINDOW_DAYS",
            value: days.to_string(),
            max: MAX_REVIEW_DAYS,
        });
    }
    Ok(days)
}

fn numeric<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

/// Connection settings for the external scoring oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
    InvalidStrategy(String),
    OutOfRange {
        key: &'static str,
        value: String,
        max: u32,
    },
    OracleEndpointMissing,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be a non-negative integer, got '{value}'")
            }
            ConfigError::OutOfRange { key, value, max } => {
                write!(f, "{key} must be between 1 and {max}, got '{value}'")
            }
            ConfigError::InvalidStrategy(value) => write!(
                f,
                "REVIEW_STRATEGY must be 'deterministic' or 'oracle', got '{value}'"
            ),
            ConfigError::OracleEndpointMissing => {
                write!(f, "REVIEW_STRATEGY=oracle requires ORACLE_URL")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
