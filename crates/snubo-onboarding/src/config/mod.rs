use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::workflows::verification::{
    IdType, IdTypeRegistry, DEFAULT_EVENT_BUFFER, DEFAULT_IDLE_TIMEOUT,
};

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
    pub verification: VerificationConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            verification: VerificationConfig::from_env()?,
        })
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Knobs for the identity verification flow and its simulated OTP gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationConfig {
    pub otp_latency: Duration,
    pub demo_otp_code: String,
    pub enabled_id_types: Vec<IdType>,
    pub event_buffer: usize,
    pub session_idle_timeout: Duration,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            otp_latency: Duration::from_millis(1500),
            demo_otp_code: "123456".to_string(),
            enabled_id_types: IdType::ordered().to_vec(),
            event_buffer: DEFAULT_EVENT_BUFFER,
            session_idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

impl VerificationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let otp_latency = match env::var("APP_OTP_LATENCY_MS") {
            Ok(raw) => Duration::from_millis(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidLatency(raw))?,
            ),
            Err(_) => defaults.otp_latency,
        };

        let demo_otp_code = match env::var("APP_DEMO_OTP_CODE") {
            Ok(raw) => parse_otp_code(&raw)?,
            Err(_) => defaults.demo_otp_code,
        };

        let enabled_id_types = match env::var("APP_ID_TYPES") {
            Ok(raw) => parse_id_types(&raw)?,
            Err(_) => defaults.enabled_id_types,
        };

        let event_buffer = match env::var("APP_EVENT_BUFFER") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(value) if value > 0 => value,
                _ => return Err(ConfigError::InvalidEventBuffer(raw)),
            },
            Err(_) => defaults.event_buffer,
        };

        let session_idle_timeout = match env::var("APP_SESSION_IDLE_SECS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(ConfigError::InvalidIdleTimeout(raw)),
            },
            Err(_) => defaults.session_idle_timeout,
        };

        Ok(Self {
            otp_latency,
            demo_otp_code,
            enabled_id_types,
            event_buffer,
            session_idle_timeout,
        })
    }

    /// ID-type registry for the configured market.
    pub fn registry(&self) -> IdTypeRegistry {
        IdTypeRegistry::standard().restricted_to(&self.enabled_id_types)
    }
}

fn parse_otp_code(raw: &str) -> Result<String, ConfigError> {
    let code = raw.trim();
    if code.len() == 6 && code.chars().all(|c| c.is_ascii_digit()) {
        Ok(code.to_string())
    } else {
        Err(ConfigError::InvalidOtpCode)
    }
}

fn parse_id_types(raw: &str) -> Result<Vec<IdType>, ConfigError> {
    let mut enabled = Vec::new();
    for key in raw.split(',').map(str::trim).filter(|key| !key.is_empty()) {
        let id_type =
            IdType::from_key(key).ok_or_else(|| ConfigError::UnknownIdType(key.to_string()))?;
        if !enabled.contains(&id_type) {
            enabled.push(id_type);
        }
    }

    if enabled.is_empty() {
        return Err(ConfigError::NoIdTypes);
    }
    Ok(enabled)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLatency(String),
    InvalidOtpCode,
    UnknownIdType(String),
    NoIdTypes,
    InvalidEventBuffer(String),
    InvalidIdleTimeout(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLatency(raw) => write!(
                f,
                "APP_OTP_LATENCY_MS must be a whole number of milliseconds, got '{raw}'"
            ),
            ConfigError::InvalidOtpCode => {
                write!(f, "APP_DEMO_OTP_CODE must be exactly 6 digits")
            }
            ConfigError::UnknownIdType(key) => write!(
                f,
                "APP_ID_TYPES contains unknown id type '{key}' (expected aadhar, driving_license, voter_id or passport)"
            ),
            ConfigError::NoIdTypes => write!(f, "APP_ID_TYPES must enable at least one id type"),
            ConfigError::InvalidEventBuffer(raw) => write!(
                f,
                "APP_EVENT_BUFFER must be a positive integer, got '{raw}'"
            ),
            ConfigError::InvalidIdleTimeout(raw) => write!(
                f,
                "APP_SESSION_IDLE_SECS must be a positive number of seconds, got '{raw}'"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidLatency(_)
            | ConfigError::InvalidOtpCode
            | ConfigError::UnknownIdType(_)
            | ConfigError::NoIdTypes
            | ConfigError::InvalidEventBuffer(_)
            | ConfigError::InvalidIdleTimeout(_) => None,
        }
    }
}
