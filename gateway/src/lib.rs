//! Telemetry gateway - receives exported events and publishes them
//!
//! Instances stream events over `TelemetryGatewayService.RecordEvents`. For
//! each stream the gateway validates the metadata frame, then publishes every
//! event in every following batch to a message-bus [`Topic`] and answers
//! each batch with the IDs that made it.
//!
//! ```text
//! RecordEvents stream ──► IngestSession ──► StreamPublisher ──► Topic
//!                              │                    │
//!                              ▼                    ▼
//!                        license check        summarize ──► response + log
//! ```

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]

pub mod config;
pub mod error;
pub mod license;
pub mod metrics;
pub mod metrics_server;
pub mod publisher;
pub mod server;
pub mod session;
pub mod summary;
pub mod topic;

pub use config::{Config, LogFormat};
pub use error::{GatewayError, PluginError, Result};
pub use license::{FormatLicenseVerifier, LicenseError, LicenseVerifier};
pub use publisher::{PublishEventResult, StreamPublisher};
pub use server::GatewayService;
pub use session::{IngestSession, InstanceIdentity};
pub use summary::{summarize, BatchSummary, ResultCategory};
pub use telemetry_gateway_core::{Topic, TopicMessage};
pub use topic::{MemoryTopic, RetryPolicy, RetryTopic, StdoutTopic};
