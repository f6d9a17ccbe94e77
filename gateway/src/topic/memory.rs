//! In-process topic
//!
//! Records every published message. A failure rule can reject selected
//! messages, which makes partial-failure batches reproducible.

use crate::error::PluginError;
use async_trait::async_trait;
use parking_lot::Mutex;
use telemetry_gateway_core::{Topic, TopicMessage};

type FailureRule = Box<dyn Fn(&TopicMessage) -> Option<PluginError> + Send + Sync>;

/// Topic that keeps published messages in memory
#[derive(Default)]
pub struct MemoryTopic {
    messages: Mutex<Vec<TopicMessage>>,
    fail_when: Option<FailureRule>,
}

impl MemoryTopic {
    /// Creates a topic that accepts every message
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects a message with the returned error whenever `rule` yields one
    pub fn failing_when<F>(rule: F) -> Self
    where
        F: Fn(&TopicMessage) -> Option<PluginError> + Send + Sync + 'static,
    {
        Self {
            messages: Mutex::new(Vec::new()),
            fail_when: Some(Box::new(rule)),
        }
    }

    /// Messages accepted so far, in completion order
    pub fn messages(&self) -> Vec<TopicMessage> {
        self.messages.lock().clone()
    }

    /// Number of messages accepted
    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    /// Whether no message has been accepted
    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

#[async_trait]
impl Topic for MemoryTopic {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn publish(&self, message: &TopicMessage) -> Result<(), PluginError> {
        if let Some(err) = self.fail_when.as_ref().and_then(|rule| rule(message)) {
            return Err(err);
        }
        self.messages.lock().push(message.clone());
        Ok(())
    }

    async fn health(&self) -> bool {
        true
    }
}
