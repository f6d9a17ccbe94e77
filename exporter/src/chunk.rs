//! Size-bounded chunking of events into wire messages
//!
//! The [`Chunker`] accumulates events and hands them to a [`ChunkSink`] in
//! groups whose encoded `RecordEventsRequest` never exceeds the configured
//! maximum message size. Events are never split or reordered. A chunk is
//! delivered and awaited before the next one is assembled.

use crate::error::ChunkError;
use async_trait::async_trait;
use prost::Message as _;
use prost::encoding::{encoded_len_varint, key_len};
use telemetry_gateway_core::proto::Event;

/// Field number of `EventsPayload.events`.
const EVENTS_FIELD: u32 = 1;

/// Field number of `RecordEventsRequest.events`.
const PAYLOAD_EVENTS_FIELD: u32 = 2;

/// Receives completed chunks.
#[async_trait]
pub trait ChunkSink: Send {
    /// Error returned when a chunk cannot be delivered.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Delivers one chunk. Chunks are never empty.
    async fn deliver(&mut self, events: Vec<Event>) -> Result<(), Self::Error>;
}

/// Groups events into chunks no larger than `max_message_size` bytes.
pub struct Chunker<S> {
    sink: S,
    max_message_size: usize,
    pending: Vec<Event>,
    /// Encoded length of `EventsPayload` holding `pending`.
    pending_len: usize,
}

impl<S: ChunkSink> Chunker<S> {
    /// Creates a chunker delivering to `sink`.
    pub fn new(sink: S, max_message_size: usize) -> Self {
        Self {
            sink,
            max_message_size,
            pending: Vec::new(),
            pending_len: 0,
        }
    }

    /// Adds events in order, delivering every chunk that fills up.
    ///
    /// An event too large for an empty chunk fails the call; chunks already
    /// delivered are unaffected.
    pub async fn send(
        &mut self,
        events: impl IntoIterator<Item = Event> + Send,
    ) -> Result<(), ChunkError<S::Error>> {
        for event in events {
            let framed = framed_len(event.encoded_len());
            let alone = request_len(framed);
            if alone > self.max_message_size {
                return Err(ChunkError::EventTooLarge {
                    event_id: event.id,
                    size: alone,
                    limit: self.max_message_size,
                });
            }
            if request_len(self.pending_len + framed) > self.max_message_size {
                self.flush().await?;
            }
            self.pending_len += framed;
            self.pending.push(event);
        }
        Ok(())
    }

    /// Delivers any pending events as a final chunk.
    pub async fn flush(&mut self) -> Result<(), ChunkError<S::Error>> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let chunk = std::mem::take(&mut self.pending);
        self.pending_len = 0;
        self.sink.deliver(chunk).await.map_err(ChunkError::Sink)
    }

    /// Consumes the chunker, returning the sink. Pending events are dropped.
    pub fn into_sink(self) -> S {
        self.sink
    }
}

/// Length of one event inside `EventsPayload`, including its tag and length prefix.
fn framed_len(event_len: usize) -> usize {
    key_len(EVENTS_FIELD) + encoded_len_varint(event_len as u64) + event_len
}

/// Length of a `RecordEventsRequest` whose events payload is `payload_len` bytes.
fn request_len(payload_len: usize) -> usize {
    key_len(PAYLOAD_EVENTS_FIELD) + encoded_len_varint(payload_len as u64) + payload_len
}
