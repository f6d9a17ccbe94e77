//! JSON rendering for protobuf well-known types.
//!
//! The generated messages derive `serde::Serialize`; these helpers are wired in
//! via `#[serde(with = ...)]` so `Timestamp` renders as RFC 3339 and `Struct`
//! renders as a plain JSON object, matching the canonical protobuf JSON mapping.

use prost_types::value::Kind;
use prost_types::{Struct, Value};
use serde_json::{Map, Number};

/// Converts a protobuf `Struct` into a JSON object.
pub fn struct_to_json(s: &Struct) -> serde_json::Value {
    let map: Map<String, serde_json::Value> = s
        .fields
        .iter()
        .map(|(k, v)| (k.clone(), value_to_json(v)))
        .collect();
    serde_json::Value::Object(map)
}

/// Converts a protobuf `Value` into JSON. Non-finite numbers become `null`.
pub fn value_to_json(v: &Value) -> serde_json::Value {
    match &v.kind {
        None | Some(Kind::NullValue(_)) => serde_json::Value::Null,
        Some(Kind::NumberValue(n)) => Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Some(Kind::StringValue(s)) => serde_json::Value::String(s.clone()),
        Some(Kind::BoolValue(b)) => serde_json::Value::Bool(*b),
        Some(Kind::StructValue(s)) => struct_to_json(s),
        Some(Kind::ListValue(l)) => {
            serde_json::Value::Array(l.values.iter().map(value_to_json).collect())
        }
    }
}

/// Builds a protobuf `Value` from JSON. Used when recording events from
/// loosely typed callers.
pub fn json_to_value(v: &serde_json::Value) -> Value {
    let kind = match v {
        serde_json::Value::Null => Kind::NullValue(0),
        serde_json::Value::Bool(b) => Kind::BoolValue(*b),
        serde_json::Value::Number(n) => Kind::NumberValue(n.as_f64().unwrap_or_default()),
        serde_json::Value::String(s) => Kind::StringValue(s.clone()),
        serde_json::Value::Array(items) => Kind::ListValue(prost_types::ListValue {
            values: items.iter().map(json_to_value).collect(),
        }),
        serde_json::Value::Object(map) => Kind::StructValue(Struct {
            fields: map
                .iter()
                .map(|(k, v)| (k.clone(), json_to_value(v)))
                .collect(),
        }),
    };
    Value { kind: Some(kind) }
}

/// `#[serde(with)]` adapter for `Option<prost_types::Timestamp>`.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat};
    use prost_types::Timestamp;
    use serde::{Serialize, Serializer};

    /// Renders the timestamp as RFC 3339 with nanosecond precision, or `null`
    /// when absent or out of range.
    pub fn serialize<S: Serializer>(ts: &Option<Timestamp>, ser: S) -> Result<S::Ok, S::Error> {
        to_rfc3339(ts.as_ref()).serialize(ser)
    }

    pub(crate) fn to_rfc3339(ts: Option<&Timestamp>) -> Option<String> {
        let ts = ts?;
        let nanos = u32::try_from(ts.nanos).ok()?;
        DateTime::from_timestamp(ts.seconds, nanos)
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

/// `#[serde(with)]` adapter for `Option<prost_types::Struct>`.
pub mod private_metadata {
    use prost_types::Struct;
    use serde::{Serialize, Serializer};

    /// Renders the struct as a JSON object.
    pub fn serialize<S: Serializer>(s: &Option<Struct>, ser: S) -> Result<S::Ok, S::Error> {
        s.as_ref().map(super::struct_to_json).serialize(ser)
    }
}
