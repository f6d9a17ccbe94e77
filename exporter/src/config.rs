//! Exporter configuration from environment variables

use crate::client::DEFAULT_MAX_MESSAGE_SIZE;
use crate::error::ConfigError;
use crate::redaction::Allowlist;
use std::str::FromStr;
use std::time::Duration;

/// Gateway address, e.g. "http://telemetry-gateway:10085"
pub const ENV_GATEWAY_ADDR: &str = "TELEMETRY_EXPORT_GATEWAY_ADDR";
/// Maximum encoded size of one events frame, in bytes
pub const ENV_MAX_MESSAGE_SIZE: &str = "TELEMETRY_EXPORT_MAX_MESSAGE_SIZE";
/// Maximum events per export call
pub const ENV_BATCH_SIZE: &str = "TELEMETRY_EXPORT_BATCH_SIZE";
/// Seconds between exports
pub const ENV_INTERVAL_SECS: &str = "TELEMETRY_EXPORT_INTERVAL_SECS";
/// Per-export timeout in seconds
pub const ENV_TIMEOUT_SECS: &str = "TELEMETRY_EXPORT_TIMEOUT_SECS";
/// Disables redaction; only for the gateway operator's own instance
pub const ENV_UNREDACTED: &str = "TELEMETRY_EXPORT_UNREDACTED";
/// Comma-separated `feature::action::key[::key...]` allowlist additions
pub const ENV_ADDITIONAL_ALLOWED_EVENTS: &str = "TELEMETRY_EXPORT_ADDITIONAL_ALLOWED_EVENTS";

const DEFAULT_BATCH_SIZE: usize = 5000;
const DEFAULT_INTERVAL_SECS: u64 = 60;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Exporter settings.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Gateway address
    pub gateway_addr: String,
    /// Maximum encoded size of one events frame
    pub max_message_size: usize,
    /// Maximum events per export call
    pub batch_size: usize,
    /// Time between exports
    pub interval: Duration,
    /// Per-export timeout
    pub timeout: Duration,
    /// Whether redaction is disabled
    pub unredacted: bool,
    /// Built-in allowlist plus validated additions
    pub allowlist: Allowlist,
}

impl ExporterConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which returns a variable's value
    /// if it is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let gateway_addr = lookup(ENV_GATEWAY_ADDR)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(ENV_GATEWAY_ADDR))?;

        let max_message_size = parse_positive(&lookup, ENV_MAX_MESSAGE_SIZE, DEFAULT_MAX_MESSAGE_SIZE)?;
        let batch_size = parse_positive(&lookup, ENV_BATCH_SIZE, DEFAULT_BATCH_SIZE)?;
        let interval = parse_positive(&lookup, ENV_INTERVAL_SECS, DEFAULT_INTERVAL_SECS)?;
        let timeout = parse_positive(&lookup, ENV_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS)?;

        let unredacted = match lookup(ENV_UNREDACTED).as_deref().map(str::trim) {
            None | Some("") => false,
            Some(v) => v.parse::<bool>().map_err(|_| ConfigError::Invalid {
                key: ENV_UNREDACTED,
                reason: format!("expected true or false, got {v:?}"),
            })?,
        };

        let allowlist =
            Allowlist::builtin_with_additional(&lookup(ENV_ADDITIONAL_ALLOWED_EVENTS).unwrap_or_default())?;

        Ok(Self {
            gateway_addr,
            max_message_size,
            batch_size,
            interval: Duration::from_secs(interval),
            timeout: Duration::from_secs(timeout),
            unredacted,
            allowlist,
        })
    }
}

fn parse_positive<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let value = raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })?;
    if value <= T::default() {
        return Err(ConfigError::Invalid {
            key,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            ExporterConfig::from_lookup(lookup(&[(ENV_GATEWAY_ADDR, "http://gw:10085")])).unwrap();
        assert_eq!(config.gateway_addr, "http://gw:10085");
        assert_eq!(config.max_message_size, 1024 * 1024);
        assert_eq!(config.batch_size, 5000);
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(!config.unredacted);
        assert_eq!(config.allowlist.len(), Allowlist::builtin().unwrap().len());
    }

    #[test]
    fn test_gateway_addr_required() {
        assert_eq!(
            ExporterConfig::from_lookup(lookup(&[])).unwrap_err(),
            ConfigError::Missing(ENV_GATEWAY_ADDR)
        );
    }

    #[test]
    fn test_rejects_zero_and_garbage() {
        let err = ExporterConfig::from_lookup(lookup(&[
            (ENV_GATEWAY_ADDR, "http://gw"),
            (ENV_BATCH_SIZE, "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: ENV_BATCH_SIZE, .. }));

        let err = ExporterConfig::from_lookup(lookup(&[
            (ENV_GATEWAY_ADDR, "http://gw"),
            (ENV_UNREDACTED, "yes"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: ENV_UNREDACTED, .. }));
    }

    #[test]
    fn test_additional_allowlist_validated_at_startup() {
        let config = ExporterConfig::from_lookup(lookup(&[
            (ENV_GATEWAY_ADDR, "http://gw"),
            (ENV_ADDITIONAL_ALLOWED_EVENTS, "search::submit::mode"),
        ]))
        .unwrap();
        assert!(config.allowlist.allowed_keys("search", "submit").is_some());

        let err = ExporterConfig::from_lookup(lookup(&[
            (ENV_GATEWAY_ADDR, "http://gw"),
            (ENV_ADDITIONAL_ALLOWED_EVENTS, "search::submit"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Allowlist(_)));
    }

    #[test]
    fn test_unredacted_setting_drives_policy() {
        use crate::redaction::{RedactionLevel, RedactionPolicy};
        use telemetry_gateway_core::proto::Event;

        let event = Event {
            feature: "search".into(),
            action: "submit".into(),
            ..Default::default()
        };

        let redacted = ExporterConfig::from_lookup(lookup(&[(ENV_GATEWAY_ADDR, "http://gw")])).unwrap();
        assert_eq!(RedactionPolicy::from_config(&redacted).level_for(&event), RedactionLevel::All);

        let allowlisted = ExporterConfig::from_lookup(lookup(&[
            (ENV_GATEWAY_ADDR, "http://gw"),
            (ENV_ADDITIONAL_ALLOWED_EVENTS, "search::submit::mode"),
        ]))
        .unwrap();
        assert_eq!(
            RedactionPolicy::from_config(&allowlisted).level_for(&event),
            RedactionLevel::Allowlisted
        );

        let unredacted = ExporterConfig::from_lookup(lookup(&[
            (ENV_GATEWAY_ADDR, "http://gw"),
            (ENV_UNREDACTED, "true"),
        ]))
        .unwrap();
        assert_eq!(
            RedactionPolicy::from_config(&unredacted).level_for(&event),
            RedactionLevel::None
        );
    }
}
