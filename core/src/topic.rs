//! Topic trait for message-bus plugins
//!
//! A [`Topic`] is the gateway's only view of the downstream message bus: an
//! opaque handle that accepts one message at a time. The publisher shares a
//! single handle across all of its in-flight publishes.

use crate::error::PluginError;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;

/// A single message bound for the bus.
///
/// `data` is the JSON payload; `attributes` are routing hints the bus exposes
/// to subscribers without decoding the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicMessage {
    /// Serialized payload.
    pub data: Bytes,
    /// Routing attributes, sorted by key.
    pub attributes: BTreeMap<String, String>,
}

impl TopicMessage {
    /// Creates a message with no attributes.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Adds an attribute, replacing any previous value.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Topic trait - publishes messages to a message bus
///
/// # Implementation Requirements
///
/// - Must be `Send + Sync`: one handle is used concurrently by every publish worker
/// - `publish` handles exactly one message and reports its own outcome
/// - `health` should be lightweight
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use telemetry_gateway_core::{PluginError, Topic, TopicMessage};
///
/// struct DiscardTopic;
///
/// #[async_trait]
/// impl Topic for DiscardTopic {
///     fn name(&self) -> &'static str {
///         "discard"
///     }
///
///     async fn publish(&self, _message: &TopicMessage) -> Result<(), PluginError> {
///         Ok(())
///     }
///
///     async fn health(&self) -> bool {
///         true
///     }
/// }
/// ```
#[async_trait]
pub trait Topic: Send + Sync {
    /// Short name for logging, e.g. "stdout" or "pubsub".
    fn name(&self) -> &'static str;

    /// Publish one message.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The bus accepted the message
    /// * `Err(PluginError)` - The message was not published
    async fn publish(&self, message: &TopicMessage) -> Result<(), PluginError>;

    /// Check if the bus is accepting messages.
    async fn health(&self) -> bool;

    /// Graceful shutdown. Flush anything buffered and release connections.
    ///
    /// The default implementation returns `Ok(())`.
    async fn shutdown(&self) -> Result<(), PluginError> {
        Ok(())
    }
}
