//! Private metadata redaction
//!
//! Every event is redacted before it leaves the instance. Exactly one
//! [`RedactionLevel`] applies per event, chosen once:
//!
//! 1. [`RedactionLevel::None`] when the policy is unredacted (the gateway
//!    operator's own instance only)
//! 2. [`RedactionLevel::Allowlisted`] when `feature.action` is on the
//!    [`Allowlist`]: marketing tracking is dropped and private metadata keeps
//!    only the allowlisted keys
//! 3. [`RedactionLevel::All`] otherwise: marketing tracking and private
//!    metadata are both dropped
//!
//! Redaction never fails. Anything unexpected gets the strictest level.

use crate::builder::valid_name;
use crate::config::ExporterConfig;
use crate::error::AllowlistError;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use telemetry_gateway_core::proto::Event;
use tracing::debug;

/// Separator between fields of an additional allowlist entry.
const ENTRY_FIELD_SEPARATOR: &str = "::";

/// Allowlist rows as `(feature, action, allowed keys)`.
type AllowlistTable = [(&'static str, &'static str, &'static [&'static str])];

/// Events allowed to export some private metadata.
const BUILTIN_ALLOWLIST: &AllowlistTable = &[
    ("cody.completion", "suggested", &["languageId", "source", "otherCompletionProviders"]),
    ("cody.completion", "accepted", &["languageId", "source"]),
    ("cody.completion", "partiallyAccepted", &["languageId", "source"]),
    ("cody.command", "executed", &["commandName", "requestID"]),
    ("cody.chat-question", "submitted", &["requestID", "chatModel"]),
    ("cody.chat-question", "executed", &["requestID", "chatModel", "promptText"]),
    ("cody.fixup", "applied", &["languageId"]),
    ("externalAuthSignup", "succeeded", &["serviceType"]),
    ("search.results", "returned", &["patternType"]),
];

/// One allowlisted event and the private metadata keys it may export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowlistEntry {
    /// Event feature.
    pub feature: String,
    /// Event action.
    pub action: String,
    /// Private metadata keys exported for this event.
    pub allowed_private_metadata_keys: Vec<String>,
}

impl AllowlistEntry {
    /// Creates an entry.
    pub fn new<K: Into<String>>(
        feature: impl Into<String>,
        action: impl Into<String>,
        keys: impl IntoIterator<Item = K>,
    ) -> Self {
        Self {
            feature: feature.into(),
            action: action.into(),
            allowed_private_metadata_keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses `feature::action::key[::key...]`.
    pub fn parse(raw: &str) -> Result<Self, AllowlistError> {
        let mut parts = raw.trim().split(ENTRY_FIELD_SEPARATOR);
        let (Some(feature), Some(action)) = (parts.next(), parts.next()) else {
            return Err(AllowlistError::Malformed(raw.to_string()));
        };
        let entry = Self::new(feature, action, parts);
        entry.validate()?;
        Ok(entry)
    }

    fn key(&self) -> String {
        event_key(&self.feature, &self.action)
    }

    fn validate(&self) -> Result<(), AllowlistError> {
        if !valid_name(&self.feature) || !valid_name(&self.action) {
            return Err(AllowlistError::MissingEventName(self.key()));
        }
        if self.allowed_private_metadata_keys.iter().all(|k| k.is_empty()) {
            return Err(AllowlistError::NoAllowedKeys(self.key()));
        }
        Ok(())
    }
}

/// Immutable table of allowlisted events, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct Allowlist {
    entries: HashMap<String, BTreeSet<String>>,
}

impl Allowlist {
    /// Builds an allowlist, rejecting invalid entries. Entries for the same
    /// event are merged.
    pub fn new(entries: impl IntoIterator<Item = AllowlistEntry>) -> Result<Self, AllowlistError> {
        let mut allowlist = Self::default();
        for entry in entries {
            entry.validate()?;
            allowlist.insert(entry);
        }
        Ok(allowlist)
    }

    /// The built-in allowlist, validated like any other entries.
    pub fn builtin() -> Result<Self, AllowlistError> {
        Self::from_table(BUILTIN_ALLOWLIST)
    }

    fn from_table(table: &AllowlistTable) -> Result<Self, AllowlistError> {
        Self::new(
            table
                .iter()
                .map(|(feature, action, keys)| AllowlistEntry::new(*feature, *action, keys.iter().copied())),
        )
    }

    /// The built-in allowlist extended with comma-separated
    /// `feature::action::key[::key...]` entries.
    pub fn builtin_with_additional(additional: &str) -> Result<Self, AllowlistError> {
        let mut allowlist = Self::builtin()?;
        for raw in additional.split(',').filter(|s| !s.trim().is_empty()) {
            let entry = AllowlistEntry::parse(raw)?;
            debug!(event = %entry.key(), "Adding allowlist entry");
            allowlist.insert(entry);
        }
        Ok(allowlist)
    }

    /// Allowed private metadata keys for an event, if it is allowlisted.
    ///
    /// Lookup is an exact match on `feature.action`.
    pub fn allowed_keys(&self, feature: &str, action: &str) -> Option<&BTreeSet<String>> {
        self.entries.get(&event_key(feature, action))
    }

    /// Number of allowlisted events.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no event is allowlisted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, entry: AllowlistEntry) {
        let key = entry.key();
        self.entries.entry(key).or_default().extend(
            entry
                .allowed_private_metadata_keys
                .into_iter()
                .filter(|k| !k.is_empty()),
        );
    }
}

fn event_key(feature: &str, action: &str) -> String {
    format!("{feature}.{action}")
}

/// How much of an event is stripped, from least to most strict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RedactionLevel {
    /// Nothing is stripped
    None,
    /// Marketing tracking and non-allowlisted private metadata are stripped
    Allowlisted,
    /// Marketing tracking and all private metadata are stripped
    All,
}

/// Chooses and applies a redaction level per event.
#[derive(Debug, Clone)]
pub struct RedactionPolicy {
    allowlist: Arc<Allowlist>,
    unredacted: bool,
}

impl RedactionPolicy {
    /// Policy for a customer instance.
    pub fn new(allowlist: Arc<Allowlist>) -> Self {
        Self {
            allowlist,
            unredacted: false,
        }
    }

    /// Policy from exporter settings: unredacted only when the settings say so.
    pub fn from_config(config: &ExporterConfig) -> Self {
        let allowlist = Arc::new(config.allowlist.clone());
        if config.unredacted {
            Self::unredacted(allowlist)
        } else {
            Self::new(allowlist)
        }
    }

    /// Policy that strips nothing. Only for the gateway operator's own instance.
    pub fn unredacted(allowlist: Arc<Allowlist>) -> Self {
        Self {
            allowlist,
            unredacted: true,
        }
    }

    /// The level [`redact`](Self::redact) applies to `event`.
    pub fn level_for(&self, event: &Event) -> RedactionLevel {
        if self.unredacted {
            RedactionLevel::None
        } else if self
            .allowlist
            .allowed_keys(&event.feature, &event.action)
            .is_some()
        {
            RedactionLevel::Allowlisted
        } else {
            RedactionLevel::All
        }
    }

    /// Strips `event` in place and returns the level applied.
    pub fn redact(&self, event: &mut Event) -> RedactionLevel {
        let level = self.level_for(event);
        match level {
            RedactionLevel::None => {}
            RedactionLevel::Allowlisted => {
                event.marketing_tracking = None;
                let allowed = self.allowlist.allowed_keys(&event.feature, &event.action);
                if let Some(params) = event.parameters.as_mut() {
                    if let Some(private) = params.private_metadata.as_mut() {
                        private
                            .fields
                            .retain(|k, _| allowed.is_some_and(|keys| keys.contains(k)));
                        if private.fields.is_empty() {
                            params.private_metadata = None;
                        }
                    }
                }
            }
            RedactionLevel::All => {
                event.marketing_tracking = None;
                if let Some(params) = event.parameters.as_mut() {
                    params.private_metadata = None;
                }
            }
        }
        level
    }
}
