use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::workflows::pipeline::gating::DEFAULT_CONSENT_MIN_APPROVALS;
use crate::workflows::pipeline::EventNamePolicy;

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
    pub pipeline: PipelineConfig,
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

        let consent_min_approvals = match env::var("PIPELINE_CONSENT_MIN_APPROVALS") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|value| *value >= 1)
                .ok_or(ConfigError::InvalidConsentThreshold)?,
            Err(_) => DEFAULT_CONSENT_MIN_APPROVALS,
        };

        let event_names = match env::var("PIPELINE_EVENT_NAMES") {
            Ok(raw) => raw
                .parse::<EventNamePolicy>()
                .map_err(|_| ConfigError::InvalidEventNamePolicy { value: raw })?,
            Err(_) => EventNamePolicy::default(),
        };

        let feedback_base_url = env::var("PIPELINE_FEEDBACK_BASE_URL")
            .unwrap_or_else(|_| format!("http://{host}:{port}/feedback"));

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            pipeline: PipelineConfig {
                consent_min_approvals,
                event_names,
                feedback_base_url,
            },
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

/// Product dials for the candidate pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Approved rounds required before consent collection unlocks.
    pub consent_min_approvals: usize,
    pub event_names: EventNamePolicy,
    /// Interviewers receive `{feedback_base_url}/{event_id}`.
    pub feedback_base_url: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            consent_min_approvals: DEFAULT_CONSENT_MIN_APPROVALS,
            event_names: EventNamePolicy::default(),
            feedback_base_url: "http://127.0.0.1:3000/feedback".to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidConsentThreshold,
    InvalidEventNamePolicy { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidConsentThreshold => write!(
                f,
                "PIPELINE_CONSENT_MIN_APPROVALS must be a whole number of at least 1"
            ),
            ConfigError::InvalidEventNamePolicy { value } => write!(
                f,
                "PIPELINE_EVENT_NAMES must be 'permissive' or 'strict' (found '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidConsentThreshold
            | ConfigError::InvalidEventNamePolicy { .. } => None,
        }
    }
}
