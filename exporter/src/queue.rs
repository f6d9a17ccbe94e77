//! Recording and periodic export
//!
//! [`Recorder`] builds and redacts events and appends them to an in-memory
//! [`ExportQueue`]. [`ExportWorker`] drains the queue in batches on an
//! interval. Events the gateway did not acknowledge go back to the front of
//! the queue with their IDs unchanged, so a later retry is idempotent. An
//! event that can never fit in one wire message is dropped instead.

use crate::builder::{Clock, EventBuilder, EventInput, IdGenerator, RecordingContext, SystemClock, UuidV7};
use crate::client::BatchExporter;
use crate::config::ExporterConfig;
use crate::error::{BuildError, ExportErrorKind};
use crate::redaction::RedactionPolicy;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use telemetry_gateway_core::proto::Event;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// FIFO of events awaiting export.
#[derive(Debug, Default)]
pub struct ExportQueue {
    events: Mutex<VecDeque<Event>>,
}

impl ExportQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn push(&self, event: Event) {
        self.events.lock().push_back(event);
    }

    /// Removes up to `max` events from the front.
    pub fn take(&self, max: usize) -> Vec<Event> {
        let mut events = self.events.lock();
        let n = max.min(events.len());
        events.drain(..n).collect()
    }

    /// Puts events back at the front, keeping their relative order.
    pub fn requeue_front(&self, batch: Vec<Event>) {
        let mut events = self.events.lock();
        for event in batch.into_iter().rev() {
            events.push_front(event);
        }
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

/// Records events for export.
pub struct Recorder<C = SystemClock, G = UuidV7> {
    builder: EventBuilder<C, G>,
    policy: RedactionPolicy,
    queue: Arc<ExportQueue>,
}

impl<C: Clock, G: IdGenerator> Recorder<C, G> {
    /// Creates a recorder appending to `queue`.
    pub fn new(builder: EventBuilder<C, G>, policy: RedactionPolicy, queue: Arc<ExportQueue>) -> Self {
        Self {
            builder,
            policy,
            queue,
        }
    }

    /// Builds, redacts and queues an event. Returns its ID.
    pub fn record(&self, ctx: &RecordingContext, input: EventInput) -> Result<String, BuildError> {
        let mut event = self.builder.build(ctx, input)?;
        let level = self.policy.redact(&mut event);
        trace!(
            event_id = %event.id,
            feature = %event.feature,
            action = %event.action,
            redaction = ?level,
            "Recorded event"
        );
        let id = event.id.clone();
        self.queue.push(event);
        Ok(id)
    }
}

/// Result of one export pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Events acknowledged by the gateway
    pub exported: usize,
    /// Events put back for a later pass
    pub requeued: usize,
    /// Events discarded because they exceed the maximum message size
    pub dropped: usize,
}

/// Periodically exports queued events.
pub struct ExportWorker {
    queue: Arc<ExportQueue>,
    exporter: Arc<dyn BatchExporter>,
    batch_size: usize,
    interval: Duration,
    dropped: AtomicU64,
}

impl ExportWorker {
    /// Creates a worker with a batch size of 5000 and a 60 second interval.
    pub fn new(queue: Arc<ExportQueue>, exporter: Arc<dyn BatchExporter>) -> Self {
        Self {
            queue,
            exporter,
            batch_size: 5000,
            interval: Duration::from_secs(60),
            dropped: AtomicU64::new(0),
        }
    }

    /// Creates a worker using the configured batch size and interval.
    pub fn from_config(
        queue: Arc<ExportQueue>,
        exporter: Arc<dyn BatchExporter>,
        config: &ExporterConfig,
    ) -> Self {
        Self::new(queue, exporter)
            .batch_size(config.batch_size)
            .interval(config.interval)
    }

    /// Total events dropped for exceeding the maximum message size.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Sets the maximum events per export call.
    #[must_use]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Sets the time between exports.
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Exports on every interval until `shutdown` fires, then makes one
    /// final attempt to drain what is left.
    pub async fn run(self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.cancelled() => {
                    debug!(queued = self.queue.len(), "Export worker: shutdown signaled, draining queue");
                    break;
                }
            }
            self.export_once(&shutdown).await;
        }

        let final_pass = CancellationToken::new();
        while !self.queue.is_empty() {
            let report = self.export_once(&final_pass).await;
            if report.exported == 0 && report.dropped == 0 {
                warn!(remaining = self.queue.len(), "Export worker: giving up on final drain");
                break;
            }
        }
        debug!("Export worker stopped");
    }

    /// Exports one batch from the front of the queue.
    pub async fn export_once(&self, cancel: &CancellationToken) -> ExportReport {
        let batch = self.queue.take(self.batch_size);
        if batch.is_empty() {
            return ExportReport::default();
        }
        let total = batch.len();

        let (acknowledged, oversized) = match self.exporter.export_batch(batch.clone(), cancel).await {
            Ok(ids) => (ids, None),
            Err(e) => {
                if e.is_total() {
                    error!(
                        request_id = %e.request_id,
                        error = %e.kind,
                        events = total,
                        "Export failed, nothing acknowledged"
                    );
                } else {
                    warn!(
                        request_id = %e.request_id,
                        error = %e.kind,
                        succeeded = e.succeeded.len(),
                        events = total,
                        "Export partially failed"
                    );
                }
                let oversized = match e.kind {
                    ExportErrorKind::EventTooLarge { event_id, size, limit } => {
                        warn!(
                            event_id = %event_id,
                            size,
                            limit,
                            "Dropping event larger than the maximum message size"
                        );
                        Some(event_id)
                    }
                    _ => None,
                };
                (e.succeeded, oversized)
            }
        };

        let acknowledged: HashSet<String> = acknowledged.into_iter().collect();
        let mut dropped = 0;
        let unacknowledged: Vec<Event> = batch
            .into_iter()
            .filter(|event| !acknowledged.contains(&event.id))
            .filter(|event| {
                let is_oversized = oversized.as_deref() == Some(event.id.as_str());
                dropped += usize::from(is_oversized);
                !is_oversized
            })
            .collect();
        self.dropped.fetch_add(dropped as u64, Ordering::Relaxed);

        let report = ExportReport {
            exported: total - unacknowledged.len() - dropped,
            requeued: unacknowledged.len(),
            dropped,
        };
        if !unacknowledged.is_empty() {
            self.queue.requeue_front(unacknowledged);
        }

        info!(
            exported = report.exported,
            requeued = report.requeued,
            dropped = report.dropped,
            queued = self.queue.len(),
            "Export pass complete"
        );
        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::{ExportError, ExportErrorKind};
    use crate::redaction::Allowlist;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn event(id: &str) -> Event {
        Event {
            id: id.to_string(),
            ..Default::default()
        }
    }

    /// Acknowledges every event except those whose ID is listed in `reject`.
    /// Events listed in `too_large` stop the export the way an oversized
    /// event stops the chunker: everything before it is acknowledged.
    struct FakeExporter {
        reject: Vec<String>,
        too_large: Vec<String>,
        calls: AtomicUsize,
        batches: Mutex<Vec<Vec<String>>>,
    }

    impl FakeExporter {
        fn new(reject: &[&str]) -> Self {
            Self {
                reject: reject.iter().map(|s| s.to_string()).collect(),
                too_large: Vec::new(),
                calls: AtomicUsize::new(0),
                batches: Mutex::new(Vec::new()),
            }
        }

        fn too_large(mut self, ids: &[&str]) -> Self {
            self.too_large = ids.iter().map(|s| s.to_string()).collect();
            self
        }
    }

    #[async_trait]
    impl BatchExporter for FakeExporter {
        async fn export_batch(
            &self,
            events: Vec<Event>,
            _cancel: &CancellationToken,
        ) -> Result<Vec<String>, ExportError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.batches
                .lock()
                .push(events.iter().map(|e| e.id.clone()).collect());
            if let Some(pos) = events.iter().position(|e| self.too_large.contains(&e.id)) {
                return Err(ExportError {
                    request_id: "req".into(),
                    succeeded: events[..pos].iter().map(|e| e.id.clone()).collect(),
                    kind: ExportErrorKind::EventTooLarge {
                        event_id: events[pos].id.clone(),
                        size: 2048,
                        limit: 1024,
                    },
                });
            }
            let sent = events.len();
            let succeeded: Vec<String> = events
                .into_iter()
                .map(|e| e.id)
                .filter(|id| !self.reject.contains(id))
                .collect();
            if succeeded.len() < sent {
                let acked = succeeded.len();
                return Err(ExportError {
                    request_id: "req".into(),
                    succeeded,
                    kind: ExportErrorKind::Incomplete {
                        sent,
                        succeeded: acked,
                    },
                });
            }
            Ok(succeeded)
        }
    }

    #[test]
    fn test_queue_take_and_requeue_preserve_order() {
        let queue = ExportQueue::new();
        for id in ["a", "b", "c", "d"] {
            queue.push(event(id));
        }

        let batch = queue.take(3);
        assert_eq!(batch.len(), 3);
        assert_eq!(queue.len(), 1);

        queue.requeue_front(batch);
        let ids: Vec<String> = queue.take(10).into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_recorder_redacts_before_queueing() {
        let queue = Arc::new(ExportQueue::new());
        let recorder = Recorder::new(
            EventBuilder::new("5.2.0"),
            RedactionPolicy::new(Arc::new(Allowlist::default())),
            Arc::clone(&queue),
        );
        let input = EventInput::new("search", "submit")
            .with_private_metadata(&serde_json::json!({"query": "secret"}));

        let id = recorder.record(&RecordingContext::default(), input).unwrap();

        let queued = queue.take(1).pop().unwrap();
        assert_eq!(queued.id, id);
        assert!(queued.parameters.unwrap().private_metadata.is_none());
    }

    #[test]
    fn test_recorder_rejects_invalid_event() {
        let queue = Arc::new(ExportQueue::new());
        let recorder = Recorder::new(
            EventBuilder::new("5.2.0"),
            RedactionPolicy::new(Arc::new(Allowlist::default())),
            Arc::clone(&queue),
        );
        assert!(recorder
            .record(&RecordingContext::default(), EventInput::new("Bad", "submit"))
            .is_err());
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_export_once_requeues_unacknowledged_at_front() {
        let queue = Arc::new(ExportQueue::new());
        for id in ["a", "b", "c", "d"] {
            queue.push(event(id));
        }
        let exporter = Arc::new(FakeExporter::new(&["b"]));
        let worker = ExportWorker::new(Arc::clone(&queue), exporter.clone()).batch_size(3);

        let report = worker.export_once(&CancellationToken::new()).await;
        assert_eq!(
            report,
            ExportReport {
                exported: 2,
                requeued: 1,
                dropped: 0,
            }
        );

        let ids: Vec<String> = queue.take(10).into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["b", "d"]);
    }

    #[tokio::test]
    async fn test_export_once_empty_queue_skips_export() {
        let exporter = Arc::new(FakeExporter::new(&[]));
        let worker = ExportWorker::new(Arc::new(ExportQueue::new()), exporter.clone());

        assert_eq!(
            worker.export_once(&CancellationToken::new()).await,
            ExportReport::default()
        );
        assert_eq!(exporter.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_run_drains_on_shutdown() {
        let queue = Arc::new(ExportQueue::new());
        for i in 0..7 {
            queue.push(event(&format!("evt-{i}")));
        }
        let exporter = Arc::new(FakeExporter::new(&[]));
        let worker = ExportWorker::new(Arc::clone(&queue), exporter.clone())
            .batch_size(3)
            .interval(Duration::from_secs(3600));

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        worker.run(shutdown).await;

        assert!(queue.is_empty());
        assert_eq!(exporter.batches.lock().len(), 3);
    }

    #[tokio::test]
    async fn test_run_final_drain_gives_up_without_progress() {
        let queue = Arc::new(ExportQueue::new());
        queue.push(event("stuck"));
        let exporter = Arc::new(FakeExporter::new(&["stuck"]));
        let worker = ExportWorker::new(Arc::clone(&queue), exporter.clone());

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        worker.run(shutdown).await;

        assert_eq!(queue.len(), 1);
        assert_eq!(exporter.calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_oversized_event_is_dropped_not_requeued() {
        let queue = Arc::new(ExportQueue::new());
        for id in ["huge", "a", "b", "c"] {
            queue.push(event(id));
        }
        let exporter = Arc::new(FakeExporter::new(&[]).too_large(&["huge"]));
        let worker = ExportWorker::new(Arc::clone(&queue), exporter.clone());

        let first = worker.export_once(&CancellationToken::new()).await;
        assert_eq!(
            first,
            ExportReport {
                exported: 0,
                requeued: 3,
                dropped: 1,
            }
        );
        assert_eq!(worker.dropped_count(), 1);

        let second = worker.export_once(&CancellationToken::new()).await;
        assert_eq!(second.exported, 3);
        assert!(queue.is_empty());
        assert_eq!(exporter.batches.lock()[1], vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_oversized_event_mid_batch_keeps_acknowledged() {
        let queue = Arc::new(ExportQueue::new());
        for id in ["a", "huge", "b"] {
            queue.push(event(id));
        }
        let exporter = Arc::new(FakeExporter::new(&[]).too_large(&["huge"]));
        let worker = ExportWorker::new(Arc::clone(&queue), exporter);

        let report = worker.export_once(&CancellationToken::new()).await;
        assert_eq!(
            report,
            ExportReport {
                exported: 1,
                requeued: 1,
                dropped: 1,
            }
        );
        let ids: Vec<String> = queue.take(10).into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[tokio::test]
    async fn test_final_drain_continues_past_dropped_event() {
        let queue = Arc::new(ExportQueue::new());
        for id in ["huge", "a"] {
            queue.push(event(id));
        }
        let exporter = Arc::new(FakeExporter::new(&[]).too_large(&["huge"]));
        let worker = ExportWorker::new(Arc::clone(&queue), exporter.clone());

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        worker.run(shutdown).await;

        assert!(queue.is_empty());
        assert_eq!(exporter.calls.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_worker_from_config() {
        let config = ExporterConfig::from_lookup(|key| match key {
            crate::config::ENV_GATEWAY_ADDR => Some("http://gw".into()),
            crate::config::ENV_BATCH_SIZE => Some("25".into()),
            crate::config::ENV_INTERVAL_SECS => Some("5".into()),
            _ => None,
        })
        .unwrap();

        let worker = ExportWorker::from_config(
            Arc::new(ExportQueue::new()),
            Arc::new(FakeExporter::new(&[])),
            &config,
        );
        assert_eq!(worker.batch_size, 25);
        assert_eq!(worker.interval, Duration::from_secs(5));
    }
}
