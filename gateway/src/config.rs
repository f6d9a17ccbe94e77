//! Gateway configuration
//!
//! Every setting comes from a `TELEMETRY_GATEWAY_*` environment variable
//! with a default that works for local development.

use crate::error::{GatewayError, Result};
use crate::publisher::DEFAULT_PUBLISH_CONCURRENCY;
use std::net::SocketAddr;
use std::str::FromStr;

/// gRPC listen address
pub const ENV_GRPC_ADDR: &str = "TELEMETRY_GATEWAY_GRPC_ADDR";
/// Metrics/health HTTP listen address
pub const ENV_METRICS_ADDR: &str = "TELEMETRY_GATEWAY_METRICS_ADDR";
/// Default tracing filter when `RUST_LOG` is unset
pub const ENV_LOG_LEVEL: &str = "TELEMETRY_GATEWAY_LOG_LEVEL";
/// `json` or `pretty`
pub const ENV_LOG_FORMAT: &str = "TELEMETRY_GATEWAY_LOG_FORMAT";
/// In-flight publishes per events batch
pub const ENV_PUBLISH_CONCURRENCY: &str = "TELEMETRY_GATEWAY_PUBLISH_CONCURRENCY";
/// Retries per publish before an event is reported failed; 0 disables retry
pub const ENV_PUBLISH_RETRY_ATTEMPTS: &str = "TELEMETRY_GATEWAY_PUBLISH_RETRY_ATTEMPTS";
/// Largest inbound frame accepted, in bytes
pub const ENV_MAX_MESSAGE_SIZE: &str = "TELEMETRY_GATEWAY_MAX_MESSAGE_SIZE";
/// Pretty-print published payloads on stdout
pub const ENV_STDOUT_PRETTY: &str = "TELEMETRY_GATEWAY_STDOUT_PRETTY";

/// Default largest inbound frame; exporters send at most 1 MiB
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human-readable
    Pretty,
}

impl FromStr for LogFormat {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(GatewayError::Config(format!(
                "{ENV_LOG_FORMAT}: unknown log format {other:?}"
            ))),
        }
    }
}

/// Gateway settings
#[derive(Debug, Clone)]
pub struct Config {
    /// gRPC listen address
    pub grpc_addr: SocketAddr,
    /// Metrics/health listen address
    pub metrics_addr: SocketAddr,
    /// Tracing filter directive
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
    /// In-flight publishes per events batch
    pub publish_concurrency: usize,
    /// Retries per publish, 0 for none
    pub publish_retry_attempts: u32,
    /// Largest inbound frame, in bytes
    pub max_message_size: usize,
    /// Pretty-print stdout payloads
    pub stdout_pretty: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grpc_addr: SocketAddr::from(([0, 0, 0, 0], 10085)),
            metrics_addr: SocketAddr::from(([0, 0, 0, 0], 9090)),
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            publish_concurrency: DEFAULT_PUBLISH_CONCURRENCY,
            publish_retry_attempts: 0,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            stdout_pretty: false,
        }
    }
}

impl Config {
    /// Loads configuration from the process environment.
    #[allow(clippy::result_large_err)]
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`; unset variables keep defaults.
    #[allow(clippy::result_large_err)]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let log_format = match get(ENV_LOG_FORMAT) {
            Some(v) => v.parse()?,
            None => defaults.log_format,
        };

        let publish_concurrency =
            parse_or(get(ENV_PUBLISH_CONCURRENCY), ENV_PUBLISH_CONCURRENCY, defaults.publish_concurrency)?;
        let publish_retry_attempts = parse_or(
            get(ENV_PUBLISH_RETRY_ATTEMPTS),
            ENV_PUBLISH_RETRY_ATTEMPTS,
            defaults.publish_retry_attempts,
        )?;
        let max_message_size =
            parse_or(get(ENV_MAX_MESSAGE_SIZE), ENV_MAX_MESSAGE_SIZE, defaults.max_message_size)?;

        for (key, zero) in [
            (ENV_PUBLISH_CONCURRENCY, publish_concurrency == 0),
            (ENV_MAX_MESSAGE_SIZE, max_message_size == 0),
        ] {
            if zero {
                return Err(GatewayError::Config(format!("{key}: must be greater than zero")));
            }
        }

        Ok(Self {
            grpc_addr: parse_or(get(ENV_GRPC_ADDR), ENV_GRPC_ADDR, defaults.grpc_addr)?,
            metrics_addr: parse_or(get(ENV_METRICS_ADDR), ENV_METRICS_ADDR, defaults.metrics_addr)?,
            log_level: get(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_format,
            publish_concurrency,
            publish_retry_attempts,
            max_message_size,
            stdout_pretty: parse_or(get(ENV_STDOUT_PRETTY), ENV_STDOUT_PRETTY, defaults.stdout_pretty)?,
        })
    }
}

#[allow(clippy::result_large_err)]
fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|e| GatewayError::Config(format!("{key}: {e}"))),
    }
}
