//! telemetry-exporter - Client side of the telemetry export pipeline
//!
//! ```text
//! EventBuilder ──► RedactionPolicy ──► ExportQueue ──► ExportWorker ──► Exporter ──► gateway
//! ```
//!
//! - [`EventBuilder`] fills IDs, timestamps and context into new events
//! - [`RedactionPolicy`] strips private metadata before anything is queued
//! - [`Chunker`] splits a batch into frames under the gateway's message limit
//! - [`Exporter`] streams one batch over `RecordEvents` and collects acknowledgements
//! - [`ExportWorker`] exports on an interval and re-queues unacknowledged events

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]

pub mod builder;
pub mod chunk;
pub mod client;
pub mod config;
pub mod error;
pub mod identifier;
pub mod queue;
pub mod redaction;

pub use builder::{ClientInfo, Clock, EventBuilder, EventInput, IdGenerator, RecordingContext};
pub use chunk::{ChunkSink, Chunker};
pub use client::{BatchExporter, Exporter, InstanceExporter};
pub use config::ExporterConfig;
pub use error::{
    AllowlistError, BuildError, ChunkError, ConfigError, ExportError, ExportErrorKind,
    IdentifierError,
};
pub use identifier::{resolve_identifier, GlobalStateStore, SiteConfigQuerier};
pub use queue::{ExportQueue, ExportReport, ExportWorker, Recorder};
pub use redaction::{Allowlist, AllowlistEntry, RedactionLevel, RedactionPolicy};
