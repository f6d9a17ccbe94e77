//! telemetry-gateway-core - Shared types for the telemetry export pipeline
//!
//! This crate holds what both ends of the pipeline agree on:
//!
//! - [`proto`] - the `telemetrygateway.v1` wire schema and its tonic client/server
//! - [`Topic`] trait - async interface to the downstream message bus
//! - [`PluginError`] - error type for topic operations
//! - [`attributes`] - reserved message attribute keys
//! - [`json`] - JSON rendering for protobuf well-known types
//!
//! The exporter depends on the wire schema only; the gateway additionally
//! implements and consumes [`Topic`]. Keeping both here lets either side be
//! built without the other.

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]
#![warn(missing_docs)]

/// Reserved attribute keys for published messages
pub mod attributes;
mod error;
pub mod json;
mod topic;

// Proto types generated from telemetrygateway/v1/telemetrygateway.proto
pub mod proto {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::derive_partial_eq_without_eq)]
    #![allow(missing_docs)]

    include!("proto/telemetrygateway.v1.rs");
}

pub use error::PluginError;
pub use proto::{Event, RecordEventsRequest, RecordEventsRequestMetadata, RecordEventsResponse};
pub use topic::{Topic, TopicMessage};
