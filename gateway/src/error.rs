//! Error types for the telemetry gateway

use thiserror::Error;

// Re-export PluginError from telemetry-gateway-core
pub use telemetry_gateway_core::PluginError;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Main error type for the gateway
#[derive(Error, Debug)]
#[allow(clippy::result_large_err)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Metrics error
    #[error("metrics error: {0}")]
    Metrics(String),

    /// Shutdown requested
    #[error("shutdown requested")]
    Shutdown,

    /// Stream metadata failed validation
    #[error("invalid metadata: {0}")]
    Validation(String),

    /// Frames arrived out of order or malformed
    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Serialization(err.to_string())
    }
}

impl From<GatewayError> for tonic::Status {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Config(msg) => tonic::Status::invalid_argument(msg),
            GatewayError::Serialization(msg) => {
                tonic::Status::internal(format!("serialization: {msg}"))
            }
            GatewayError::Metrics(msg) => tonic::Status::internal(format!("metrics: {msg}")),
            GatewayError::Shutdown => tonic::Status::unavailable("shutting down"),
            GatewayError::Validation(msg) => tonic::Status::invalid_argument(msg),
            GatewayError::Protocol(msg) => tonic::Status::invalid_argument(msg),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_is_serialization() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: GatewayError = json_err.into();
        assert!(matches!(err, GatewayError::Serialization(_)));
    }

    #[test]
    fn test_shutdown_is_unavailable() {
        let status: tonic::Status = GatewayError::Shutdown.into();
        assert_eq!(status.code(), tonic::Code::Unavailable);
    }

    #[test]
    fn test_config_and_metrics_codes() {
        let status: tonic::Status = GatewayError::Config("bad port".into()).into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
        let status: tonic::Status = GatewayError::Metrics("registry".into()).into();
        assert_eq!(status.code(), tonic::Code::Internal);
    }

    #[test]
    fn test_protocol_and_validation_are_invalid_argument() {
        let status: tonic::Status = GatewayError::Protocol("metadata sent twice".into()).into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
        assert_eq!(status.message(), "metadata sent twice");

        let status: tonic::Status = GatewayError::Validation("empty instance ID".into()).into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[test]
    fn test_serialization_is_internal() {
        let status: tonic::Status = GatewayError::Serialization("bad".into()).into();
        assert_eq!(status.code(), tonic::Code::Internal);
    }
}
