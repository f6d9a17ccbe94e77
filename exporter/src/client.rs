//! Exporter client
//!
//! [`Exporter::export`] owns one `RecordEvents` stream per call:
//!
//! ```text
//! Idle → StreamOpened → MetadataSent → Streaming(chunk)* → HalfClosed → Draining → Done
//! ```
//!
//! The metadata frame is queued before the stream is opened so it is always
//! the first frame on the wire. Event chunks are sent while responses are
//! drained concurrently, so neither side stalls on flow control. Dropping the
//! sender after the last chunk half-closes the stream; only receive errors
//! matter after that.
//!
//! Whatever happens, the IDs acknowledged so far are returned: either as the
//! `Ok` value or inside [`ExportError::succeeded`].

use crate::chunk::{ChunkSink, Chunker};
use crate::config::ExporterConfig;
use crate::error::{ChunkError, ExportError, ExportErrorKind};
use crate::identifier::{resolve_identifier, GlobalStateStore, SiteConfigQuerier};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use telemetry_gateway_core::proto::record_events_request::{EventsPayload, Payload};
use telemetry_gateway_core::proto::telemetry_gateway_service_client::TelemetryGatewayServiceClient;
use telemetry_gateway_core::proto::{
    Event, RecordEventsRequest, RecordEventsRequestMetadata, RecordEventsResponse,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::{Channel, Endpoint};
use tonic::{Status, Streaming};
use tracing::debug;

/// Default maximum size of one events frame (1 MiB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Default connect timeout (10 seconds)
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Frames buffered between the chunker and the transport
const STREAM_BUFFER: usize = 4;

/// Exports a batch of events and returns the IDs the gateway published.
#[async_trait]
pub trait BatchExporter: Send + Sync {
    /// Exports `events`. See [`Exporter::export`] for the result contract.
    async fn export_batch(
        &self,
        events: Vec<Event>,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ExportError>;
}

/// Streams events to the telemetry gateway.
///
/// Cheap to clone; every export call opens its own stream.
#[derive(Debug, Clone)]
pub struct Exporter {
    client: TelemetryGatewayServiceClient<Channel>,
    max_message_size: usize,
    timeout: Option<Duration>,
}

impl Exporter {
    /// Connects to the gateway at `addr`, e.g. "http://gateway:10085".
    pub async fn connect(addr: impl Into<String>) -> Result<Self, tonic::transport::Error> {
        let channel = Endpoint::new(addr.into())?
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .connect()
            .await?;
        Ok(Self::new(channel))
    }

    /// Creates an exporter that connects on first use.
    pub fn connect_lazy(addr: impl Into<String>) -> Result<Self, tonic::transport::Error> {
        let channel = Endpoint::new(addr.into())?
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .connect_lazy();
        Ok(Self::new(channel))
    }

    /// Creates a lazily connecting exporter from exporter settings.
    pub fn from_config(config: &ExporterConfig) -> Result<Self, tonic::transport::Error> {
        Ok(Self::connect_lazy(config.gateway_addr.clone())?
            .with_max_message_size(config.max_message_size)
            .with_timeout(config.timeout))
    }

    /// Creates an exporter over an existing channel.
    pub fn new(channel: Channel) -> Self {
        Self {
            client: TelemetryGatewayServiceClient::new(channel),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            timeout: None,
        }
    }

    /// Sets the maximum encoded size of one events frame.
    #[must_use]
    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    /// Bounds each export call by `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Exports `events` on a new stream.
    ///
    /// Returns every acknowledged ID on success. Fails when the stream cannot
    /// be opened, an event is too large, sending or receiving fails, the call
    /// is cancelled or times out, or fewer events were acknowledged than sent.
    /// The error carries the IDs acknowledged before the failure.
    pub async fn export(
        &self,
        metadata: RecordEventsRequestMetadata,
        events: Vec<Event>,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ExportError> {
        let request_id = metadata.request_id.clone();
        let fail = |succeeded: Vec<String>, kind: ExportErrorKind| ExportError {
            request_id: request_id.clone(),
            succeeded,
            kind,
        };
        if events.is_empty() {
            return Ok(Vec::new());
        }
        let sent = events.len();

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        tx.try_send(RecordEventsRequest {
            payload: Some(Payload::Metadata(metadata)),
        })
        .map_err(|_| fail(Vec::new(), ExportErrorKind::Send("request channel closed".into())))?;

        let timeout = self.timeout;
        let deadline = async move {
            match timeout {
                Some(t) => tokio::time::sleep(t).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);

        let mut client = self.client.clone();
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(fail(Vec::new(), ExportErrorKind::Cancelled)),
            _ = &mut deadline => return Err(fail(Vec::new(), ExportErrorKind::DeadlineExceeded)),
            res = client.record_events(ReceiverStream::new(rx)) => {
                res.map_err(|status| fail(Vec::new(), ExportErrorKind::Open(status)))?
            }
        };
        debug!(request_id = %request_id, events = sent, "Export stream opened");

        let mut inbound = response.into_inner();
        let mut succeeded = Vec::with_capacity(sent);
        let send_side = send_chunks(tx, events, self.max_message_size, &request_id);
        let recv_side = drain(&mut inbound, &mut succeeded);

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Outcome::Cancelled,
            _ = &mut deadline => Outcome::DeadlineExceeded,
            (send, recv) = async { tokio::join!(send_side, recv_side) } => Outcome::Finished { send, recv },
        };

        match outcome {
            Outcome::Cancelled => Err(fail(succeeded, ExportErrorKind::Cancelled)),
            Outcome::DeadlineExceeded => Err(fail(succeeded, ExportErrorKind::DeadlineExceeded)),
            Outcome::Finished { send, recv } => {
                if let Err(status) = recv {
                    return Err(fail(succeeded, ExportErrorKind::Recv(status)));
                }
                if let Err(err) = send {
                    let kind = match err {
                        ChunkError::EventTooLarge {
                            event_id,
                            size,
                            limit,
                        } => ExportErrorKind::EventTooLarge {
                            event_id,
                            size,
                            limit,
                        },
                        ChunkError::Sink(e) => ExportErrorKind::Send(e.to_string()),
                    };
                    return Err(fail(succeeded, kind));
                }
                if succeeded.len() < sent {
                    let acked = succeeded.len();
                    return Err(fail(
                        succeeded,
                        ExportErrorKind::Incomplete {
                            sent,
                            succeeded: acked,
                        },
                    ));
                }
                debug!(request_id = %request_id, succeeded = succeeded.len(), "Export complete");
                Ok(succeeded)
            }
        }
    }
}

enum Outcome {
    Cancelled,
    DeadlineExceeded,
    Finished {
        send: Result<(), ChunkError<StreamClosed>>,
        recv: Result<(), Status>,
    },
}

/// The gateway stopped reading the request stream.
#[derive(Error, Debug)]
#[error("request stream closed by gateway")]
pub struct StreamClosed;

struct StreamSink {
    tx: mpsc::Sender<RecordEventsRequest>,
    chunks: usize,
}

#[async_trait]
impl ChunkSink for StreamSink {
    type Error = StreamClosed;

    async fn deliver(&mut self, events: Vec<Event>) -> Result<(), StreamClosed> {
        self.chunks += 1;
        self.tx
            .send(RecordEventsRequest {
                payload: Some(Payload::Events(EventsPayload { events })),
            })
            .await
            .map_err(|_| StreamClosed)
    }
}

async fn send_chunks(
    tx: mpsc::Sender<RecordEventsRequest>,
    events: Vec<Event>,
    max_message_size: usize,
    request_id: &str,
) -> Result<(), ChunkError<StreamClosed>> {
    let mut chunker = Chunker::new(StreamSink { tx, chunks: 0 }, max_message_size);
    chunker.send(events).await?;
    chunker.flush().await?;
    // Dropping the sink half-closes the stream.
    let sink = chunker.into_sink();
    debug!(request_id = %request_id, chunks = sink.chunks, "All chunks sent");
    Ok(())
}

async fn drain(
    inbound: &mut Streaming<RecordEventsResponse>,
    succeeded: &mut Vec<String>,
) -> Result<(), Status> {
    while let Some(response) = inbound.message().await? {
        succeeded.extend(response.succeeded_events);
    }
    Ok(())
}

/// Exports on behalf of this instance, resolving its identifier per call.
pub struct InstanceExporter {
    exporter: Exporter,
    site_config: Arc<dyn SiteConfigQuerier>,
    global_state: Arc<dyn GlobalStateStore>,
}

impl InstanceExporter {
    /// Creates an instance exporter.
    pub fn new(
        exporter: Exporter,
        site_config: Arc<dyn SiteConfigQuerier>,
        global_state: Arc<dyn GlobalStateStore>,
    ) -> Self {
        Self {
            exporter,
            site_config,
            global_state,
        }
    }
}

#[async_trait]
impl BatchExporter for InstanceExporter {
    async fn export_batch(
        &self,
        events: Vec<Event>,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ExportError> {
        let request_id = uuid::Uuid::now_v7().to_string();
        let identifier = resolve_identifier(self.site_config.as_ref(), self.global_state.as_ref())
            .await
            .map_err(|e| ExportError {
                request_id: request_id.clone(),
                succeeded: Vec::new(),
                kind: e.into(),
            })?;

        let metadata = RecordEventsRequestMetadata {
            request_id,
            identifier: Some(identifier),
        };
        self.exporter.export(metadata, events, cancel).await
    }
}
