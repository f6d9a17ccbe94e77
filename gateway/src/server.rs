//! gRPC ingestion server
//!
//! Implements `TelemetryGatewayService`. Each RecordEvents stream gets its
//! own task running an [`IngestSession`]; responses flow back through a
//! bounded channel. The session's publishes are cancelled when the client
//! goes away or the gateway shuts down.

use crate::error::GatewayError;
use crate::license::{FormatLicenseVerifier, LicenseVerifier};
use crate::metrics::Metrics;
use crate::publisher::DEFAULT_PUBLISH_CONCURRENCY;
use crate::session::IngestSession;
use crate::config::DEFAULT_MAX_MESSAGE_SIZE;
use std::sync::Arc;
use telemetry_gateway_core::proto::telemetry_gateway_service_server::{
    TelemetryGatewayService, TelemetryGatewayServiceServer,
};
use telemetry_gateway_core::{RecordEventsRequest, RecordEventsResponse, Topic};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, info, warn};

/// Responses buffered per stream before the session waits on the client
const RESPONSE_BUFFER: usize = 16;

/// RecordEvents service implementation
pub struct GatewayService {
    topic: Arc<dyn Topic>,
    verifier: Arc<dyn LicenseVerifier>,
    publish_concurrency: usize,
    max_message_size: usize,
    shutdown: CancellationToken,
}

impl GatewayService {
    /// Creates a service publishing to `topic`
    pub fn new(topic: Arc<dyn Topic>) -> Self {
        Self {
            topic,
            verifier: Arc::new(FormatLicenseVerifier),
            publish_concurrency: DEFAULT_PUBLISH_CONCURRENCY,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            shutdown: CancellationToken::new(),
        }
    }

    /// Replaces the license verifier
    pub fn with_license_verifier(mut self, verifier: Arc<dyn LicenseVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    /// Sets in-flight publishes per events batch
    pub fn with_publish_concurrency(mut self, concurrency: usize) -> Self {
        self.publish_concurrency = concurrency.max(1);
        self
    }

    /// Sets the largest inbound frame accepted
    pub fn with_max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = bytes;
        self
    }

    /// Cancelling `token` abandons every stream's in-flight publishes
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Wraps the service for `tonic::transport::Server::add_service`
    pub fn into_server(self) -> TelemetryGatewayServiceServer<Self> {
        let max = self.max_message_size;
        TelemetryGatewayServiceServer::new(self).max_decoding_message_size(max)
    }
}

#[tonic::async_trait]
impl TelemetryGatewayService for GatewayService {
    type RecordEventsStream = ReceiverStream<Result<RecordEventsResponse, Status>>;

    async fn record_events(
        &self,
        request: Request<Streaming<RecordEventsRequest>>,
    ) -> Result<Response<Self::RecordEventsStream>, Status> {
        let remote = request.remote_addr();
        let mut inbound = request.into_inner();
        let (tx, rx) = mpsc::channel(RESPONSE_BUFFER);

        let cancel = self.shutdown.child_token();
        let mut session = IngestSession::new(
            Arc::clone(&self.topic),
            Arc::clone(&self.verifier),
            self.publish_concurrency,
            cancel.clone(),
        );

        if let Some(m) = Metrics::get() {
            m.inc_streams();
        }
        debug!(?remote, "stream opened");

        tokio::spawn(async move {
            // Client gone: abandon in-flight publishes
            let guard = {
                let tx = tx.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    tx.closed().await;
                    cancel.cancel();
                })
            };

            loop {
                let frame = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        let _ = tx.send(Err(GatewayError::Shutdown.into())).await;
                        break;
                    }
                    frame = inbound.message() => frame,
                };

                match frame {
                    Ok(Some(req)) => match session.handle(req).await {
                        Ok(Some(resp)) => {
                            if tx.send(Ok(resp)).await.is_err() {
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!(
                                request_id = session.request_id().unwrap_or_default(),
                                error = %e,
                                "rejecting stream"
                            );
                            let _ = tx.send(Err(e.into())).await;
                            break;
                        }
                    },
                    Ok(None) => break,
                    Err(status) => {
                        debug!(error = %status, "client stream error");
                        break;
                    }
                }
            }

            guard.abort();
            if let Some(m) = Metrics::get() {
                m.end_stream(session.events_processed());
            }
            info!(
                request_id = session.request_id().unwrap_or_default(),
                events_processed = session.events_processed(),
                "stream closed"
            );
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
