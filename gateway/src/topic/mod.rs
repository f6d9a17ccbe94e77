//! Topic implementations
//!
//! The message bus itself is an external collaborator; these are the
//! gateway's own [`Topic`]s: a stdout topic for development, an in-memory
//! topic for tests and embedding, and a retrying wrapper around any other.

pub mod memory;
pub mod retry;
pub mod stdout;

pub use memory::MemoryTopic;
pub use retry::{RetryPolicy, RetryTopic};
pub use stdout::StdoutTopic;
pub use telemetry_gateway_core::{Topic, TopicMessage};
