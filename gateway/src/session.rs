//! Per-stream ingestion state machine
//!
//! A stream starts in `AwaitMetadata`. The first frame must be metadata;
//! once it validates, the session moves to `Ready` and every following
//! frame must be an events batch. Any other ordering ends the stream with
//! `InvalidArgument` before anything is published.

use crate::error::{GatewayError, Result};
use crate::license::LicenseVerifier;
use crate::metrics::Metrics;
use crate::publisher::StreamPublisher;
use crate::summary::{summarize, ResultCategory};
use std::sync::Arc;
use std::time::Instant;
use telemetry_gateway_core::attributes;
use telemetry_gateway_core::proto::record_events_request::Payload;
use telemetry_gateway_core::proto::{identifier, Identifier};
use telemetry_gateway_core::{
    Event, RecordEventsRequest, RecordEventsRequestMetadata, RecordEventsResponse, Topic,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Validated identity of the exporting instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceIdentity {
    /// `publisher.source` attribute value
    pub source: &'static str,
    /// Instance site ID, empty if a licensed instance did not report one
    pub instance_id: String,
}

/// Validates a stream's identifier.
///
/// Licensed instances must present a key that `verifier` accepts;
/// unlicensed instances must report a non-empty instance ID.
pub fn validate_identifier(
    identifier: Option<&Identifier>,
    verifier: &dyn LicenseVerifier,
) -> Result<InstanceIdentity> {
    match identifier.and_then(|i| i.identifier.as_ref()) {
        Some(identifier::Identifier::LicensedInstance(licensed)) => {
            verifier
                .verify(&licensed.license_key)
                .map_err(|e| GatewayError::Validation(format!("invalid license key: {e}")))?;
            Ok(InstanceIdentity {
                source: attributes::SOURCE_LICENSED_INSTANCE,
                instance_id: licensed.instance_id.clone(),
            })
        }
        Some(identifier::Identifier::UnlicensedInstance(unlicensed)) => {
            if unlicensed.instance_id.trim().is_empty() {
                return Err(GatewayError::Validation(
                    "instance ID is required for unlicensed instances".to_string(),
                ));
            }
            Ok(InstanceIdentity {
                source: attributes::SOURCE_UNLICENSED_INSTANCE,
                instance_id: unlicensed.instance_id.clone(),
            })
        }
        None => Err(GatewayError::Validation(
            "unknown or missing identifier".to_string(),
        )),
    }
}

struct Ready {
    request_id: String,
    identity: InstanceIdentity,
    publisher: StreamPublisher,
}

enum SessionState {
    AwaitMetadata,
    Ready(Box<Ready>),
}

/// State of one RecordEvents stream
pub struct IngestSession {
    state: SessionState,
    topic: Arc<dyn Topic>,
    verifier: Arc<dyn LicenseVerifier>,
    concurrency: usize,
    cancel: CancellationToken,
    events_processed: u64,
}

impl IngestSession {
    /// Creates a session awaiting metadata.
    ///
    /// `cancel` bounds every publish the session issues.
    pub fn new(
        topic: Arc<dyn Topic>,
        verifier: Arc<dyn LicenseVerifier>,
        concurrency: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            state: SessionState::AwaitMetadata,
            topic,
            verifier,
            concurrency,
            cancel,
            events_processed: 0,
        }
    }

    /// Events handled so far, published or not
    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// Request ID from the stream's metadata, once received
    pub fn request_id(&self) -> Option<&str> {
        match &self.state {
            SessionState::Ready(ready) => Some(&ready.request_id),
            SessionState::AwaitMetadata => None,
        }
    }

    /// Handles one inbound frame.
    ///
    /// Returns the response for an events frame, `None` for metadata. Any
    /// error ends the stream.
    pub async fn handle(
        &mut self,
        request: RecordEventsRequest,
    ) -> Result<Option<RecordEventsResponse>> {
        let ready = matches!(self.state, SessionState::Ready(_));
        match (request.payload, ready) {
            (None, _) => Err(GatewayError::Protocol(
                "request payload is required".to_string(),
            )),
            (Some(Payload::Metadata(metadata)), false) => {
                self.accept_metadata(metadata)?;
                Ok(None)
            }
            (Some(Payload::Metadata(_)), true) => Err(GatewayError::Protocol(
                "received metadata more than once".to_string(),
            )),
            (Some(Payload::Events(_)), false) => Err(
                GatewayError::Protocol("received events before metadata".to_string()),
            ),
            (Some(Payload::Events(payload)), true) => {
                self.dispatch(payload.events).await.map(Some)
            }
        }
    }

    fn accept_metadata(&mut self, metadata: RecordEventsRequestMetadata) -> Result<()> {
        let identity = validate_identifier(metadata.identifier.as_ref(), self.verifier.as_ref())?;
        let publisher = StreamPublisher::new(
            self.topic.clone(),
            &metadata,
            identity.source,
            self.concurrency,
        )?;

        info!(
            request_id = %metadata.request_id,
            source = identity.source,
            instance_id = %identity.instance_id,
            "stream metadata accepted"
        );

        self.state = SessionState::Ready(Box::new(Ready {
            request_id: metadata.request_id,
            identity,
            publisher,
        }));
        Ok(())
    }

    async fn dispatch(&mut self, events: Vec<Event>) -> Result<RecordEventsResponse> {
        let SessionState::Ready(ready) = &self.state else {
            return Err(GatewayError::Protocol(
                "received events before metadata".to_string(),
            ));
        };

        let count = events.len() as u64;
        let source = ready.identity.source;
        if let Some(m) = Metrics::get() {
            m.record_received(source, count);
        }

        let start = Instant::now();
        let results = ready.publisher.publish(&events, &self.cancel).await;
        let elapsed = start.elapsed();

        let summary = summarize(results);
        self.events_processed += count;

        if let Some(m) = Metrics::get() {
            m.record_publish_duration(elapsed.as_secs_f64());
            m.record_published(
                source,
                summary.succeeded_events.len() as u64,
                summary.failed_events.len() as u64,
            );
            m.record_batch(summary.category.as_str());
        }

        match summary.category {
            ResultCategory::Success => info!(
                request_id = %ready.request_id,
                source,
                submitted = count,
                duration_ms = elapsed.as_millis() as u64,
                "{}", summary.message
            ),
            ResultCategory::PartialFailure => warn!(
                request_id = %ready.request_id,
                source,
                submitted = count,
                succeeded = summary.succeeded_events.len(),
                failed = summary.failed_events.len(),
                errors = %summary.errors_field(),
                "{}", summary.message
            ),
            ResultCategory::CompleteFailure => error!(
                request_id = %ready.request_id,
                source,
                submitted = count,
                failed = summary.failed_events.len(),
                errors = %summary.errors_field(),
                "{}", summary.message
            ),
        }

        Ok(RecordEventsResponse {
            succeeded_events: summary.succeeded_events,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::PluginError;
    use crate::license::FormatLicenseVerifier;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use telemetry_gateway_core::proto::record_events_request::EventsPayload;
    use telemetry_gateway_core::TopicMessage;

    #[derive(Default)]
    struct CountingTopic {
        published: Mutex<usize>,
    }

    #[async_trait]
    impl Topic for CountingTopic {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn publish(&self, _message: &TopicMessage) -> std::result::Result<(), PluginError> {
            *self.published.lock() += 1;
            Ok(())
        }

        async fn health(&self) -> bool {
            true
        }
    }

    fn session(topic: Arc<CountingTopic>) -> IngestSession {
        IngestSession::new(
            topic,
            Arc::new(FormatLicenseVerifier),
            8,
            CancellationToken::new(),
        )
    }

    fn unlicensed(instance_id: &str) -> Identifier {
        Identifier {
            identifier: Some(identifier::Identifier::UnlicensedInstance(
                identifier::UnlicensedInstance {
                    instance_id: instance_id.to_string(),
                },
            )),
        }
    }

    fn licensed(key: &str) -> Identifier {
        Identifier {
            identifier: Some(identifier::Identifier::LicensedInstance(
                identifier::LicensedInstance {
                    license_key: key.to_string(),
                    instance_id: "site-1".to_string(),
                },
            )),
        }
    }

    fn metadata_frame(identifier: Identifier) -> RecordEventsRequest {
        RecordEventsRequest {
            payload: Some(Payload::Metadata(RecordEventsRequestMetadata {
                request_id: "req-1".to_string(),
                identifier: Some(identifier),
            })),
        }
    }

    fn events_frame(n: usize) -> RecordEventsRequest {
        RecordEventsRequest {
            payload: Some(Payload::Events(EventsPayload {
                events: (0..n)
                    .map(|i| Event {
                        id: format!("e{i}"),
                        feature: "search".to_string(),
                        action: "view".to_string(),
                        ..Default::default()
                    })
                    .collect(),
            })),
        }
    }

    // ==========================================================================
    // Identifier validation
    // ==========================================================================

    #[test]
    fn test_validate_unlicensed() {
        let id = validate_identifier(Some(&unlicensed("site-1")), &FormatLicenseVerifier).unwrap();
        assert_eq!(id.source, attributes::SOURCE_UNLICENSED_INSTANCE);
        assert_eq!(id.instance_id, "site-1");
    }

    #[test]
    fn test_validate_licensed() {
        let id = validate_identifier(Some(&licensed("abc.def")), &FormatLicenseVerifier).unwrap();
        assert_eq!(id.source, attributes::SOURCE_LICENSED_INSTANCE);
    }

    #[test]
    fn test_validate_rejects_bad_identifiers() {
        let v = FormatLicenseVerifier;
        assert!(matches!(
            validate_identifier(Some(&unlicensed("")), &v),
            Err(GatewayError::Validation(_))
        ));
        assert!(matches!(
            validate_identifier(Some(&licensed("")), &v),
            Err(GatewayError::Validation(_))
        ));
        assert!(matches!(
            validate_identifier(Some(&Identifier { identifier: None }), &v),
            Err(GatewayError::Validation(_))
        ));
        assert!(matches!(
            validate_identifier(None, &v),
            Err(GatewayError::Validation(_))
        ));
    }

    // ==========================================================================
    // Frame ordering
    // ==========================================================================

    #[tokio::test]
    async fn test_metadata_then_events() {
        let topic = Arc::new(CountingTopic::default());
        let mut s = session(topic.clone());

        assert_eq!(s.handle(metadata_frame(unlicensed("site-1"))).await.unwrap(), None);
        assert_eq!(s.request_id(), Some("req-1"));

        let resp = s.handle(events_frame(3)).await.unwrap().unwrap();
        assert_eq!(resp.succeeded_events, vec!["e0", "e1", "e2"]);
        assert_eq!(s.events_processed(), 3);
        assert_eq!(*topic.published.lock(), 3);
    }

    #[tokio::test]
    async fn test_events_before_metadata() {
        let topic = Arc::new(CountingTopic::default());
        let mut s = session(topic.clone());

        let err = s.handle(events_frame(2)).await.unwrap_err();
        assert!(matches!(err, GatewayError::Protocol(_)));
        assert_eq!(*topic.published.lock(), 0);
    }

    #[tokio::test]
    async fn test_metadata_twice() {
        let mut s = session(Arc::new(CountingTopic::default()));
        s.handle(metadata_frame(unlicensed("site-1"))).await.unwrap();

        let err = s
            .handle(metadata_frame(unlicensed("site-1")))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_missing_payload() {
        let mut s = session(Arc::new(CountingTopic::default()));
        let err = s
            .handle(RecordEventsRequest { payload: None })
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_empty_events_frame_gets_empty_response() {
        let mut s = session(Arc::new(CountingTopic::default()));
        s.handle(metadata_frame(unlicensed("site-1"))).await.unwrap();

        let resp = s.handle(events_frame(0)).await.unwrap().unwrap();
        assert!(resp.succeeded_events.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_session_runs_on_spawned_task() {
        let topic = Arc::new(CountingTopic::default());
        let mut s = session(topic.clone());

        let resp = tokio::spawn(async move {
            s.handle(metadata_frame(unlicensed("site-1"))).await.unwrap();
            s.handle(events_frame(3)).await.unwrap()
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(resp.succeeded_events, vec!["e0", "e1", "e2"]);
        assert_eq!(*topic.published.lock(), 3);
    }
}
