//! Concurrent per-stream event publisher
//!
//! One [`StreamPublisher`] is created per stream, once metadata has been
//! validated. Each event becomes one topic message whose payload pairs the
//! stream metadata with the event, both as JSON, and whose attributes let
//! subscribers route without decoding the payload.
//!
//! Publishes run as owned tasks with bounded concurrency and may complete
//! in any order; results are written back by input position so the
//! returned slice lines up with the input.

use crate::error::{GatewayError, PluginError};
use serde::Serialize;
use serde_json::value::RawValue;
use std::collections::BTreeMap;
use std::sync::Arc;
use telemetry_gateway_core::attributes;
use telemetry_gateway_core::{Event, RecordEventsRequestMetadata, Topic, TopicMessage};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Default number of in-flight publishes per batch
pub const DEFAULT_PUBLISH_CONCURRENCY: usize = 250;

/// Outcome of publishing one event
#[derive(Debug, Clone, PartialEq)]
pub struct PublishEventResult {
    /// ID of the event
    pub event_id: String,
    /// `None` if the event was published
    pub publish_error: Option<PluginError>,
}

impl PublishEventResult {
    /// A successful publish
    pub fn succeeded(event_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            publish_error: None,
        }
    }

    /// A failed publish
    pub fn failed(event_id: impl Into<String>, err: PluginError) -> Self {
        Self {
            event_id: event_id.into(),
            publish_error: Some(err),
        }
    }

    /// Whether the event was published
    pub fn is_ok(&self) -> bool {
        self.publish_error.is_none()
    }
}

#[derive(Serialize)]
struct Payload<'a> {
    metadata: &'a RawValue,
    event: &'a RawValue,
}

/// State shared by every publish task of one stream
struct PublishContext {
    topic: Arc<dyn Topic>,
    metadata: Box<RawValue>,
    source: &'static str,
}

impl PublishContext {
    async fn publish_one(&self, event: &Event, cancel: &CancellationToken) -> PublishEventResult {
        if cancel.is_cancelled() {
            return PublishEventResult::failed(event.id.clone(), PluginError::Cancelled);
        }

        let message = match self.message_for(event) {
            Ok(m) => m,
            Err(e) => return PublishEventResult::failed(event.id.clone(), e),
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PluginError::Cancelled),
            r = self.topic.publish(&message) => r,
        };

        match outcome {
            Ok(()) => PublishEventResult::succeeded(event.id.clone()),
            Err(e) => PublishEventResult::failed(event.id.clone(), e),
        }
    }

    fn message_for(&self, event: &Event) -> Result<TopicMessage, PluginError> {
        let event_json = serde_json::value::to_raw_value(event)
            .map_err(|e| PluginError::Encode(format!("event {}: {e}", event.id)))?;
        let data = serde_json::to_vec(&Payload {
            metadata: &self.metadata,
            event: &event_json,
        })
        .map_err(|e| PluginError::Encode(format!("event {}: {e}", event.id)))?;

        Ok(TopicMessage {
            data: data.into(),
            attributes: event_attributes(self.source, event),
        })
    }
}

/// Publishes a stream's events to a topic
pub struct StreamPublisher {
    ctx: Arc<PublishContext>,
    concurrency: usize,
}

impl StreamPublisher {
    /// Creates a publisher for one stream.
    ///
    /// `metadata` is serialized once here and embedded verbatim in every
    /// payload. `concurrency` is clamped to at least 1.
    pub fn new(
        topic: Arc<dyn Topic>,
        metadata: &RecordEventsRequestMetadata,
        source: &'static str,
        concurrency: usize,
    ) -> Result<Self, GatewayError> {
        let metadata = serde_json::value::to_raw_value(metadata)?;
        Ok(Self {
            ctx: Arc::new(PublishContext {
                topic,
                metadata,
                source,
            }),
            concurrency: concurrency.max(1),
        })
    }

    /// `publisher.source` attribute value for this stream
    pub fn source(&self) -> &'static str {
        self.ctx.source
    }

    /// Publishes every event and returns one result per event, in input order.
    ///
    /// At most `concurrency` publishes are in flight; each runs as its own
    /// task. Once `cancel` fires no new publish starts and in-flight ones are
    /// abandoned. Every abandoned or unstarted event is reported with
    /// [`PluginError::Cancelled`]. Dropping the returned future aborts all
    /// outstanding publishes.
    pub async fn publish(
        &self,
        events: &[Event],
        cancel: &CancellationToken,
    ) -> Vec<PublishEventResult> {
        let mut slots: Vec<Option<PublishEventResult>> = vec![None; events.len()];
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (i, event) in events.iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => break,
                },
            };

            let ctx = Arc::clone(&self.ctx);
            let event = event.clone();
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let _permit = permit;
                (i, ctx.publish_one(&event, &cancel).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((i, result)) => slots[i] = Some(result),
                Err(e) => warn!(error = %e, "publish task failed"),
            }
        }

        let cancelled = cancel.is_cancelled();
        slots
            .into_iter()
            .zip(events)
            .map(|(slot, event)| {
                slot.unwrap_or_else(|| {
                    let err = if cancelled {
                        PluginError::Cancelled
                    } else {
                        PluginError::Publish("publish task aborted".to_string())
                    };
                    PublishEventResult::failed(event.id.clone(), err)
                })
            })
            .collect()
    }
}

/// Routing attributes for one event.
///
/// Integer metadata keys starting with `recordsPrivateMetadata` are surfaced
/// as `event.<key>`, `"true"` when the value is non-zero.
pub fn event_attributes(source: &str, event: &Event) -> BTreeMap<String, String> {
    let mut attrs = BTreeMap::new();
    attrs.insert(attributes::PUBLISHER_SOURCE.to_string(), source.to_string());
    attrs.insert(attributes::EVENT_FEATURE.to_string(), event.feature.clone());
    attrs.insert(attributes::EVENT_ACTION.to_string(), event.action.clone());

    let has_private = event
        .parameters
        .as_ref()
        .and_then(|p| p.private_metadata.as_ref())
        .is_some_and(|s| !s.fields.is_empty());
    attrs.insert(
        attributes::EVENT_HAS_PRIVATE_METADATA.to_string(),
        attributes::bool_value(has_private).to_string(),
    );

    if let Some(params) = &event.parameters {
        for (key, value) in &params.metadata {
            if key.starts_with(attributes::RECORDS_PRIVATE_METADATA_PREFIX) {
                attrs.insert(
                    attributes::event_flag_key(key),
                    attributes::bool_value(*value != 0).to_string(),
                );
            }
        }
    }

    attrs
}
