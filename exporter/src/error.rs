//! Error types for the exporter

use thiserror::Error;

/// Maximum length of an event feature or action.
pub const MAX_NAME_LEN: usize = 64;

/// An event could not be built from the caller's input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Feature does not match `[a-z][a-zA-Z.-]*` or exceeds the length limit
    #[error("invalid feature {0:?}: must match [a-z][a-zA-Z.-]* and be at most {MAX_NAME_LEN} characters")]
    InvalidFeature(String),

    /// Action does not match `[a-z][a-zA-Z.-]*` or exceeds the length limit
    #[error("invalid action {0:?}: must match [a-z][a-zA-Z.-]* and be at most {MAX_NAME_LEN} characters")]
    InvalidAction(String),
}

/// An allowlist entry was rejected at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllowlistError {
    /// Entry has an empty feature or action
    #[error("allowlist entry {0:?} must have a non-empty feature and action")]
    MissingEventName(String),

    /// Entry does not name any private metadata key
    #[error("allowlist entry {0:?} must allow at least one private metadata key")]
    NoAllowedKeys(String),

    /// Entry could not be parsed from its `feature::action::key` form
    #[error("malformed allowlist entry {0:?}: expected feature::action::key[::key...]")]
    Malformed(String),
}

/// Chunking failed.
///
/// `E` is the error type of the chunk sink; sink failures abort the whole
/// `send`/`flush` call.
#[derive(Error, Debug)]
pub enum ChunkError<E> {
    /// A single event does not fit in one wire message
    #[error("event {event_id} is {size} bytes when framed, exceeding the {limit} byte message limit")]
    EventTooLarge {
        /// ID of the offending event
        event_id: String,
        /// Framed size of the event on its own
        size: usize,
        /// Configured maximum message size
        limit: usize,
    },

    /// The chunk sink rejected a chunk
    #[error("chunk delivery failed: {0}")]
    Sink(E),
}

/// The exporting instance's identifier could not be resolved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// The site ID is empty
    #[error("instance ID is empty")]
    EmptyInstanceId,

    /// The global state store failed
    #[error("failed to read global state: {0}")]
    GlobalState(String),
}

/// An export call failed.
///
/// Carries the IDs the gateway did acknowledge before the failure, so a
/// failed export never discards partial success.
#[derive(Error, Debug)]
#[error("export request {request_id}: {kind}")]
pub struct ExportError {
    /// Request ID sent in the stream metadata
    pub request_id: String,
    /// IDs of events the gateway reported as published
    pub succeeded: Vec<String>,
    /// What went wrong
    #[source]
    pub kind: ExportErrorKind,
}

/// Cause of an [`ExportError`].
#[derive(Error, Debug)]
pub enum ExportErrorKind {
    /// Identifier resolution failed before the stream was opened
    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    /// The stream could not be opened
    #[error("failed to open stream: {0}")]
    Open(tonic::Status),

    /// A single event exceeds the maximum message size
    #[error("event {event_id} is {size} bytes, exceeding the {limit} byte message limit")]
    EventTooLarge {
        /// ID of the offending event
        event_id: String,
        /// Framed size of the event
        size: usize,
        /// Configured maximum message size
        limit: usize,
    },

    /// The gateway stopped accepting frames
    #[error("failed to send events: {0}")]
    Send(String),

    /// Receiving a response frame failed
    #[error("failed to receive response: {0}")]
    Recv(tonic::Status),

    /// The stream ended with fewer acknowledgements than events sent
    #[error("{succeeded} of {sent} events were acknowledged")]
    Incomplete {
        /// Number of events sent
        sent: usize,
        /// Number of events acknowledged
        succeeded: usize,
    },

    /// The caller cancelled the export
    #[error("export cancelled")]
    Cancelled,

    /// The export did not finish before its deadline
    #[error("export deadline exceeded")]
    DeadlineExceeded,
}

impl ExportError {
    /// Whether the failure happened before anything could have been published.
    pub fn is_total(&self) -> bool {
        self.succeeded.is_empty()
    }
}

/// Exporter configuration could not be loaded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset
    #[error("{0} must be set")]
    Missing(&'static str),

    /// A variable holds an unusable value
    #[error("invalid {key}: {reason}")]
    Invalid {
        /// Variable name
        key: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// An additional allowlist entry is invalid
    #[error(transparent)]
    Allowlist(#[from] AllowlistError),
}
