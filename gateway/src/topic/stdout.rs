//! Stdout topic for development
//!
//! Writes one line per published message. Useful for running the gateway
//! without a message bus.

use crate::error::PluginError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::value::RawValue;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use telemetry_gateway_core::{Topic, TopicMessage};

/// Stdout topic - prints messages for debugging
pub struct StdoutTopic {
    /// Pretty print attributes and payload
    pretty: bool,
    /// Count of messages published
    published_count: AtomicU64,
}

#[derive(Serialize)]
struct Line<'a> {
    attributes: &'a BTreeMap<String, String>,
    data: &'a RawValue,
}

impl StdoutTopic {
    /// Create a StdoutTopic writing compact JSON lines
    pub fn new() -> Self {
        Self {
            pretty: false,
            published_count: AtomicU64::new(0),
        }
    }

    /// Create a StdoutTopic with pretty printing
    pub fn pretty() -> Self {
        Self {
            pretty: true,
            published_count: AtomicU64::new(0),
        }
    }

    /// Get total messages published
    pub fn published_count(&self) -> u64 {
        self.published_count.load(Ordering::Relaxed)
    }

    fn render(&self, message: &TopicMessage) -> Result<String, PluginError> {
        let data: &RawValue = serde_json::from_slice(&message.data)
            .map_err(|e| PluginError::Encode(format!("payload is not JSON: {e}")))?;
        let line = Line {
            attributes: &message.attributes,
            data,
        };
        let rendered = if self.pretty {
            serde_json::to_string_pretty(&line)
        } else {
            serde_json::to_string(&line)
        };
        rendered.map_err(|e| PluginError::Encode(e.to_string()))
    }
}

impl Default for StdoutTopic {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Topic for StdoutTopic {
    fn name(&self) -> &'static str {
        "stdout"
    }

    async fn publish(&self, message: &TopicMessage) -> Result<(), PluginError> {
        use std::io::Write;

        let line = self.render(message)?;
        writeln!(std::io::stdout().lock(), "{line}")
            .map_err(|e| PluginError::Publish(format!("stdout write failed: {e}")))?;
        self.published_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn health(&self) -> bool {
        true
    }
}
