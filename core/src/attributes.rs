//! Reserved attribute keys attached to published messages.
//!
//! Attributes ride alongside the payload so subscribers can filter without
//! decoding the JSON body.

/// Which identifier variant the exporting instance used.
pub const PUBLISHER_SOURCE: &str = "publisher.source";

/// The event's feature.
pub const EVENT_FEATURE: &str = "event.feature";

/// The event's action.
pub const EVENT_ACTION: &str = "event.action";

/// `"true"` when the event carries a non-empty private metadata struct.
pub const EVENT_HAS_PRIVATE_METADATA: &str = "event.hasPrivateMetadata";

/// Prefix applied to surfaced metadata keys, e.g. `event.recordsPrivateMetadataTranscript`.
pub const EVENT_PREFIX: &str = "event.";

/// Metadata keys with this prefix flag that sensitive data exists.
pub const RECORDS_PRIVATE_METADATA_PREFIX: &str = "recordsPrivateMetadata";

/// `publisher.source` value for licensed instances.
pub const SOURCE_LICENSED_INSTANCE: &str = "licensed_instance";

/// `publisher.source` value for unlicensed instances.
pub const SOURCE_UNLICENSED_INSTANCE: &str = "unlicensed_instance";

/// Attribute key for a surfaced metadata flag.
pub fn event_flag_key(metadata_key: &str) -> String {
    format!("{EVENT_PREFIX}{metadata_key}")
}

/// Renders a boolean attribute value.
pub fn bool_value(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}
