//! Event construction
//!
//! [`EventBuilder`] turns a feature/action pair plus caller parameters into a
//! wire [`Event`], filling ID, timestamp and contextual fields from a
//! [`RecordingContext`]. Contextual fields are omitted entirely when the
//! context has nothing for them, never sent as zero values.
//!
//! Clock and ID generation are injected so identical inputs always build
//! identical events.

use crate::error::{BuildError, MAX_NAME_LEN};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use telemetry_gateway_core::proto::{
    event_interaction, event_source, Event, EventFeatureFlags, EventInteraction,
    EventMarketingTracking, EventParameters, EventSource, EventUser,
};

#[allow(clippy::expect_used)]
static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-zA-Z.\-]*$").expect("name pattern is valid"));

/// Source of event timestamps.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;
}

impl<F> Clock for F
where
    F: Fn() -> DateTime<Utc> + Send + Sync,
{
    fn now(&self) -> DateTime<Utc> {
        self()
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Source of event IDs. IDs must be globally unique and should be time-ordered.
pub trait IdGenerator: Send + Sync {
    /// Next ID.
    fn next_id(&self) -> String;
}

impl<F> IdGenerator for F
where
    F: Fn() -> String + Send + Sync,
{
    fn next_id(&self) -> String {
        self()
    }
}

/// UUIDv7 IDs: random, but sortable by creation time.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV7;

impl IdGenerator for UuidV7 {
    fn next_id(&self) -> String {
        uuid::Uuid::now_v7().to_string()
    }
}

/// Ambient request state an event is recorded under.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingContext {
    /// Authenticated user, if any. Non-positive IDs are treated as absent.
    pub user_id: Option<i64>,
    /// Anonymous user cookie, if any.
    pub anonymous_user_id: Option<String>,
    /// Trace the recording request belongs to.
    pub trace_id: Option<String>,
    /// Client-side interaction ID.
    pub interaction_id: Option<String>,
    /// ISO country code resolved from the request.
    pub country_code: Option<String>,
    /// Feature flags evaluated for the actor.
    pub feature_flags: BTreeMap<String, String>,
    /// Client that recorded the event, e.g. an editor extension.
    pub client: Option<ClientInfo>,
}

/// Recording client name and version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    /// Client name, e.g. "VSCODE_CODY_EXTENSION".
    pub name: String,
    /// Client version, if known.
    pub version: Option<String>,
}

/// What the caller records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventInput {
    /// Feature, e.g. "cody.completion".
    pub feature: String,
    /// Action, e.g. "suggested".
    pub action: String,
    /// Event parameters.
    pub parameters: EventParameters,
    /// Marketing attribution, only ever kept for unredacted export.
    pub marketing_tracking: Option<EventMarketingTracking>,
}

impl EventInput {
    /// Input with empty parameters.
    pub fn new(feature: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
            action: action.into(),
            ..Default::default()
        }
    }

    /// Sets an integer metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: i64) -> Self {
        self.parameters.metadata.insert(key.into(), value);
        self
    }

    /// Sets the private metadata from a JSON object. Non-object values are ignored.
    pub fn with_private_metadata(mut self, value: &serde_json::Value) -> Self {
        if let serde_json::Value::Object(map) = value {
            self.parameters.private_metadata = Some(prost_types::Struct {
                fields: map
                    .iter()
                    .map(|(k, v)| (k.clone(), telemetry_gateway_core::json::json_to_value(v)))
                    .collect(),
            });
        }
        self
    }
}

/// Builds events.
pub struct EventBuilder<C = SystemClock, G = UuidV7> {
    clock: C,
    ids: G,
    server_version: String,
}

impl EventBuilder {
    /// Builder using the wall clock and UUIDv7 IDs.
    pub fn new(server_version: impl Into<String>) -> Self {
        Self::with_sources(server_version, SystemClock, UuidV7)
    }
}

impl<C: Clock, G: IdGenerator> EventBuilder<C, G> {
    /// Builder with an injected clock and ID generator.
    pub fn with_sources(server_version: impl Into<String>, clock: C, ids: G) -> Self {
        Self {
            clock,
            ids,
            server_version: server_version.into(),
        }
    }

    /// Builds an event from `input` under `ctx`.
    ///
    /// Fails if the feature or action is malformed; nothing else is validated.
    pub fn build(&self, ctx: &RecordingContext, input: EventInput) -> Result<Event, BuildError> {
        if !valid_name(&input.feature) {
            return Err(BuildError::InvalidFeature(input.feature));
        }
        if !valid_name(&input.action) {
            return Err(BuildError::InvalidAction(input.action));
        }

        let now = self.clock.now();
        Ok(Event {
            id: self.ids.next_id(),
            timestamp: Some(prost_types::Timestamp {
                seconds: now.timestamp(),
                nanos: i32::try_from(now.timestamp_subsec_nanos()).unwrap_or_default(),
            }),
            feature: input.feature,
            action: input.action,
            source: Some(EventSource {
                server: Some(event_source::Server {
                    version: self.server_version.clone(),
                }),
                client: ctx.client.as_ref().map(|c| event_source::Client {
                    name: c.name.clone(),
                    version: c.version.clone(),
                }),
            }),
            parameters: Some(input.parameters),
            user: user_from(ctx),
            feature_flags: (!ctx.feature_flags.is_empty()).then(|| EventFeatureFlags {
                flags: ctx.feature_flags.clone(),
            }),
            marketing_tracking: input.marketing_tracking,
            interaction: interaction_from(ctx),
        })
    }
}

/// Reports whether `name` is a valid feature or action.
pub fn valid_name(name: &str) -> bool {
    name.len() <= MAX_NAME_LEN && NAME_PATTERN.is_match(name)
}

fn user_from(ctx: &RecordingContext) -> Option<EventUser> {
    let user_id = ctx.user_id.filter(|id| *id > 0);
    let anonymous_user_id = ctx.anonymous_user_id.clone().filter(|id| !id.is_empty());
    if user_id.is_none() && anonymous_user_id.is_none() {
        return None;
    }
    Some(EventUser {
        user_id,
        anonymous_user_id,
    })
}

fn interaction_from(ctx: &RecordingContext) -> Option<EventInteraction> {
    let non_empty = |s: &Option<String>| s.clone().filter(|v| !v.is_empty());
    let trace_id = non_empty(&ctx.trace_id);
    let interaction_id = non_empty(&ctx.interaction_id);
    let geolocation = non_empty(&ctx.country_code)
        .map(|country_code| event_interaction::Geolocation { country_code });

    if trace_id.is_none() && interaction_id.is_none() && geolocation.is_none() {
        return None;
    }
    Some(EventInteraction {
        trace_id,
        interaction_id,
        geolocation,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_builder() -> EventBuilder<impl Clock, impl IdGenerator> {
        EventBuilder::with_sources(
            "5.2.0",
            || Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            || "01890000-0000-7000-8000-000000000000".to_string(),
        )
    }

    #[test]
    fn test_build_fills_id_and_timestamp() {
        let event = fixed_builder()
            .build(&RecordingContext::default(), EventInput::new("search", "submit"))
            .unwrap();

        assert_eq!(event.id, "01890000-0000-7000-8000-000000000000");
        assert_eq!(event.timestamp.unwrap().seconds, 1_704_067_200);
        assert_eq!(event.feature, "search");
        assert_eq!(event.action, "submit");
        assert_eq!(
            event.source.unwrap().server.unwrap().version,
            "5.2.0".to_string()
        );
    }

    #[test]
    fn test_build_is_deterministic() {
        let ctx = RecordingContext {
            user_id: Some(7),
            trace_id: Some("trace".into()),
            ..Default::default()
        };
        let builder = fixed_builder();
        let a = builder.build(&ctx, EventInput::new("search", "submit")).unwrap();
        let b = builder.build(&ctx, EventInput::new("search", "submit")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_context_omits_optional_fields() {
        let event = fixed_builder()
            .build(&RecordingContext::default(), EventInput::new("search", "submit"))
            .unwrap();

        assert!(event.user.is_none());
        assert!(event.interaction.is_none());
        assert!(event.feature_flags.is_none());
        assert!(event.source.unwrap().client.is_none());
    }

    #[test]
    fn test_user_from_actor_or_anonymous() {
        let builder = fixed_builder();

        let ctx = RecordingContext {
            user_id: Some(42),
            ..Default::default()
        };
        let user = builder
            .build(&ctx, EventInput::new("search", "submit"))
            .unwrap()
            .user
            .unwrap();
        assert_eq!(user.user_id, Some(42));
        assert_eq!(user.anonymous_user_id, None);

        let ctx = RecordingContext {
            user_id: Some(0),
            anonymous_user_id: Some("anon".into()),
            ..Default::default()
        };
        let user = builder
            .build(&ctx, EventInput::new("search", "submit"))
            .unwrap()
            .user
            .unwrap();
        assert_eq!(user.user_id, None);
        assert_eq!(user.anonymous_user_id.as_deref(), Some("anon"));
    }

    #[test]
    fn test_interaction_from_any_single_field() {
        let ctx = RecordingContext {
            country_code: Some("FI".into()),
            ..Default::default()
        };
        let interaction = fixed_builder()
            .build(&ctx, EventInput::new("search", "submit"))
            .unwrap()
            .interaction
            .unwrap();
        assert_eq!(interaction.trace_id, None);
        assert_eq!(interaction.geolocation.unwrap().country_code, "FI");
    }

    #[test]
    fn test_feature_flags_only_when_non_empty() {
        let ctx = RecordingContext {
            feature_flags: BTreeMap::from([("new-search".to_string(), "true".to_string())]),
            ..Default::default()
        };
        let flags = fixed_builder()
            .build(&ctx, EventInput::new("search", "submit"))
            .unwrap()
            .feature_flags
            .unwrap();
        assert_eq!(flags.flags.get("new-search").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_rejects_invalid_names() {
        let builder = fixed_builder();
        let ctx = RecordingContext::default();

        assert_eq!(
            builder.build(&ctx, EventInput::new("Search", "submit")),
            Err(BuildError::InvalidFeature("Search".into()))
        );
        assert_eq!(
            builder.build(&ctx, EventInput::new("search", "")),
            Err(BuildError::InvalidAction(String::new()))
        );
        assert!(builder
            .build(&ctx, EventInput::new("a".repeat(65), "submit"))
            .is_err());
        assert!(builder
            .build(&ctx, EventInput::new("cody.completion-v2", "partiallyAccepted"))
            .is_ok());
    }

    #[test]
    fn test_private_metadata_from_json() {
        let input = EventInput::new("cody.completion", "suggested")
            .with_private_metadata(&serde_json::json!({"languageId": "go"}));
        let pm = input.parameters.private_metadata.unwrap();
        assert!(pm.fields.contains_key("languageId"));
    }
}
