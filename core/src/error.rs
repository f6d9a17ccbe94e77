//! Error types for message-bus plugins

use thiserror::Error;

/// Error type for topic operations
///
/// Returned by [`Topic`](crate::Topic) implementations and carried in
/// per-event publish results. It is `Clone` so a single failure can be
/// recorded in a result slot and logged without moving it.
///
/// # Example
///
/// ```
/// use telemetry_gateway_core::PluginError;
///
/// fn publish() -> Result<(), PluginError> {
///     Err(PluginError::Publish("quota exceeded".to_string()))
/// }
///
/// match publish() {
///     Err(PluginError::Publish(msg)) => assert_eq!(msg, "quota exceeded"),
///     other => unreachable!("{other:?}"),
/// }
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PluginError {
    /// Initialization failed
    ///
    /// Examples: invalid topic name, missing credentials.
    #[error("initialization failed: {0}")]
    Init(String),

    /// Encoding the outbound payload failed
    #[error("encode failed: {0}")]
    Encode(String),

    /// Publish failed
    ///
    /// The message bus rejected or timed out on a single message.
    #[error("publish failed: {0}")]
    Publish(String),

    /// Connection error
    #[error("connection error: {0}")]
    Connection(String),

    /// Not ready
    ///
    /// Transient state during startup or recovery.
    #[error("plugin not ready")]
    NotReady,

    /// The publish was abandoned because its context was cancelled
    #[error("cancelled")]
    Cancelled,

    /// Shutdown error
    #[error("shutdown error: {0}")]
    Shutdown(String),
}

impl PluginError {
    /// Whether retrying the same message could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PluginError::Publish(_) | PluginError::Connection(_) | PluginError::NotReady
        )
    }
}
