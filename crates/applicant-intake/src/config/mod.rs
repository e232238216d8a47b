use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::intake::ValidationPolicy;

const DEFAULT_RESOLVER_TIMEOUT_MS: u64 = 2000;
const DEFAULT_RESOLVER_ATTEMPTS: u32 = 2;
const DEFAULT_MIN_AGE: u32 = 20;
const DEFAULT_MAX_AGE: u32 = 60;

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

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub store: StoreConfig,
    pub resolver: ResolverConfig,
    pub intake: IntakeConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment =
            AppEnvironment::from_str(&var("APP_ENV").unwrap_or_else(|| "development".to_string()));

        let host = var("APP_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = var("APP_PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = var("APP_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let store = StoreConfig {
            target: StoreTarget::parse(&var("STORE_TARGET").unwrap_or_else(|| "memory".to_string()))?,
        };

        let resolver = ResolverConfig {
            endpoint: var("RESOLVER_ENDPOINT").map(validate_endpoint).transpose()?,
            timeout: Duration::from_millis(parse_positive(
                "RESOLVER_TIMEOUT_MS",
                DEFAULT_RESOLVER_TIMEOUT_MS,
            )?),
            attempts: parse_positive("RESOLVER_ATTEMPTS", DEFAULT_RESOLVER_ATTEMPTS)?,
        };

        let intake = IntakeConfig {
            min_age: parse_age("APPLICANT_MIN_AGE", DEFAULT_MIN_AGE)?,
            max_age: parse_age("APPLICANT_MAX_AGE", DEFAULT_MAX_AGE)?,
        };
        if intake.min_age > intake.max_age {
            return Err(ConfigError::InvertedAgeRange {
                min_age: intake.min_age,
                max_age: intake.max_age,
            });
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                ansi: environment == AppEnvironment::Development,
            },
            store,
            resolver,
            intake,
        })
    }
}

/// Unset and blank variables are treated the same.
fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_positive<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(raw) = var(key) else {
        return Ok(default);
    };
    match raw.parse::<T>() {
        Ok(value) if value > T::default() => Ok(value),
        _ => Err(ConfigError::InvalidNumber { key, value: raw }),
    }
}

fn parse_age(key: &'static str, default: u32) -> Result<u32, ConfigError> {
    let Some(raw) = var(key) else {
        return Ok(default);
    };
    match raw.parse::<u32>() {
        Ok(age) if age <= 150 => Ok(age),
        _ => Err(ConfigError::InvalidNumber { key, value: raw }),
    }
}

fn validate_endpoint(value: String) -> Result<String, ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(value)
    } else {
        Err(ConfigError::InvalidEndpoint { value })
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub ansi: bool,
}

/// Backing store selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreTarget {
    /// In-process store; the name only labels logs.
    Memory { name: String },
}

impl StoreTarget {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.split_once(':') {
            None if value.eq_ignore_ascii_case("memory") => Ok(StoreTarget::Memory {
                name: "memory".to_string(),
            }),
            Some((scheme, name)) if scheme.eq_ignore_ascii_case("memory") && !name.is_empty() => {
                Ok(StoreTarget::Memory {
                    name: name.to_string(),
                })
            }
            _ => Err(ConfigError::UnsupportedStore {
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub target: StoreTarget,
}

/// Country resolver settings. Without an endpoint the built-in table is used.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub endpoint: Option<String>,
    pub timeout: Duration,
    pub attempts: u32,
}

#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub min_age: u32,
    pub max_age: u32,
}

impl IntakeConfig {
    pub fn policy(&self) -> ValidationPolicy {
        ValidationPolicy::new(self.min_age, self.max_age)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
    InvalidEndpoint { value: String },
    UnsupportedStore { value: String },
    InvertedAgeRange { min_age: u32, max_age: u32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} has an out-of-range value '{value}'")
            }
            ConfigError::InvalidEndpoint { value } => {
                write!(f, "RESOLVER_ENDPOINT must be an http(s) URL, got '{value}'")
            }
            ConfigError::UnsupportedStore { value } => write!(
                f,
                "STORE_TARGET '{value}' is not supported (expected 'memory' or 'memory:<name>')"
            ),
            ConfigError::InvertedAgeRange { min_age, max_age } => write!(
                f,
                "APPLICANT_MIN_AGE ({min_age}) must not exceed APPLICANT_MAX_AGE ({max_age})"
            ),
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
