//! Batch result summaries
//!
//! Collapses per-event publish results into one log-friendly summary. The
//! message is fixed per category so log lines aggregate cleanly; failure
//! detail goes into indexed `error.<n>` fields.

use crate::publisher::PublishEventResult;
use std::fmt;

/// Low-cardinality outcome of one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCategory {
    /// Every event failed
    CompleteFailure,
    /// Some events failed
    PartialFailure,
    /// No event failed
    Success,
}

impl ResultCategory {
    /// Label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultCategory::CompleteFailure => "complete_failure",
            ResultCategory::PartialFailure => "partial_failure",
            ResultCategory::Success => "success",
        }
    }

    /// Fixed human-readable message
    pub fn message(&self) -> &'static str {
        match self {
            ResultCategory::CompleteFailure => "all events in batch failed to submit",
            ResultCategory::PartialFailure => "some events in batch failed to submit",
            ResultCategory::Success => "all events in batch submitted successfully",
        }
    }
}

impl fmt::Display for ResultCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of one batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    /// Fixed message for the category
    pub message: &'static str,
    /// Outcome category
    pub category: ResultCategory,
    /// IDs of published events, in input order
    pub succeeded_events: Vec<String>,
    /// Results of failed events, in input order
    pub failed_events: Vec<PublishEventResult>,
    /// One `("error.<n>", detail)` pair per failed event
    pub log_fields: Vec<(String, String)>,
}

impl BatchSummary {
    /// All failure fields joined into one value, for a single log attribute
    pub fn errors_field(&self) -> String {
        self.log_fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Summarizes a batch's publish results.
///
/// An empty batch is a success.
pub fn summarize(results: Vec<PublishEventResult>) -> BatchSummary {
    let total = results.len();
    let mut succeeded_events = Vec::with_capacity(total);
    let mut failed_events = Vec::new();
    for result in results {
        if result.publish_error.is_some() {
            failed_events.push(result);
        } else {
            succeeded_events.push(result.event_id);
        }
    }

    let category = if failed_events.is_empty() {
        ResultCategory::Success
    } else if failed_events.len() == total {
        ResultCategory::CompleteFailure
    } else {
        ResultCategory::PartialFailure
    };

    let log_fields = failed_events
        .iter()
        .enumerate()
        .filter_map(|(i, r)| {
            r.publish_error
                .as_ref()
                .map(|e| (format!("error.{i}"), format!("event {}: {e}", r.event_id)))
        })
        .collect();

    BatchSummary {
        message: category.message(),
        category,
        succeeded_events,
        failed_events,
        log_fields,
    }
}
