use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, warn};

use super::events::IngestionEvent;
use super::ingestion::{IngestionSink, RejectedEvent};
use super::lock;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub events_sent: usize,
    pub batches_sent: usize,
    pub dropped_events: u64,
}

#[derive(Debug, Error)]
pub enum FlushError {
    #[error("flush timed out after {waited:?} with {pending} events pending")]
    Timeout { waited: Duration, pending: usize },
    #[error("delivery failed, dropped {batch_dropped} events: {reason}")]
    Delivery {
        reason: String,
        batch_dropped: usize,
    },
    #[error("{} events rejected by the backend", rejected.len())]
    Rejected {
        rejected: Vec<RejectedEvent>,
        stats: FlushStats,
    },
}

/// Failures from background sends, reported by the next flush
#[derive(Default)]
struct Deferred {
    rejected: Vec<RejectedEvent>,
    delivery: Option<(String, usize)>,
}

struct ExporterInner {
    sink: Arc<dyn IngestionSink>,
    queue: Mutex<VecDeque<IngestionEvent>>,
    deferred: Mutex<Deferred>,
    send_lock: tokio::sync::Mutex<()>,
    notify: Arc<Notify>,
    dropped_events: AtomicU64,
    shutdown: AtomicBool,
    batch_size: usize,
    capacity: usize,
}

/// Batching queue between the tracer and an [`IngestionSink`]
#[derive(Clone)]
pub struct Exporter {
    inner: Arc<ExporterInner>,
}

impl Exporter {
    /// Create an exporter and, when called inside a Tokio runtime, start its background loop.
    pub fn new(
        sink: Arc<dyn IngestionSink>,
        batch_size: usize,
        capacity: usize,
        flush_interval: Duration,
    ) -> Self {
        let exporter = Self {
            inner: Arc::new(ExporterInner {
                sink,
                queue: Mutex::new(VecDeque::new()),
                deferred: Mutex::new(Deferred::default()),
                send_lock: tokio::sync::Mutex::new(()),
                notify: Arc::new(Notify::new()),
                dropped_events: AtomicU64::new(0),
                shutdown: AtomicBool::new(false),
                batch_size: batch_size.max(1),
                capacity: capacity.max(1),
            }),
        };
        if tokio::runtime::Handle::try_current().is_ok() && !flush_interval.is_zero() {
            exporter.spawn_flush_loop(flush_interval);
        } else {
            debug!("No background flush loop; events are sent on explicit flush only");
        }
        exporter
    }

    pub fn enqueue(&self, event: IngestionEvent) {
        if self.inner.shutdown.load(Ordering::Acquire) {
            debug!(event = event.type_name(), "Exporter shut down, discarding event");
            return;
        }
        let mut queue = lock(&self.inner.queue);
        if queue.len() >= self.inner.capacity {
            queue.pop_front();
            self.inner.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
        queue.push_back(event);
        if queue.len() >= self.inner.batch_size {
            self.inner.notify.notify_one();
        }
    }

    /// Send every queued event, waiting for batches already in flight.
    pub async fn flush(&self, timeout: Duration) -> Result<FlushStats, FlushError> {
        let start = Instant::now();
        let mut stats = FlushStats::default();
        let mut rejected = Vec::new();

        loop {
            let _guard = match self.inner.send_lock.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    // a background send is in flight; wait for it to land
                    let remaining = timeout.saturating_sub(start.elapsed());
                    match tokio::time::timeout(remaining, self.inner.send_lock.lock()).await {
                        Ok(guard) => guard,
                        Err(_) => return Err(self.timeout_error(start)),
                    }
                }
            };

            let batch = self.drain_batch();
            if batch.is_empty() {
                break;
            }

            let remaining = timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                self.requeue_front(batch);
                return Err(self.timeout_error(start));
            }
            let outcome = tokio::time::timeout(remaining, self.inner.sink.send(&batch)).await;
            match outcome {
                Err(_) => {
                    self.requeue_front(batch);
                    return Err(self.timeout_error(start));
                }
                Ok(Ok(report)) => {
                    stats.events_sent += report.accepted;
                    stats.batches_sent += 1;
                    rejected.extend(report.rejected);
                }
                Ok(Err(err)) => {
                    warn!(error = %err, events = batch.len(), "Dropping undeliverable batch");
                    return Err(FlushError::Delivery {
                        reason: err.to_string(),
                        batch_dropped: batch.len(),
                    });
                }
            }
        }

        stats.dropped_events = self.dropped_events();
        let deferred = std::mem::take(&mut *lock(&self.inner.deferred));
        if let Some((reason, batch_dropped)) = deferred.delivery {
            return Err(FlushError::Delivery {
                reason,
                batch_dropped,
            });
        }
        rejected.extend(deferred.rejected);
        if !rejected.is_empty() {
            return Err(FlushError::Rejected { rejected, stats });
        }

        debug!(
            events = stats.events_sent,
            batches = stats.batches_sent,
            "Flush complete"
        );
        Ok(stats)
    }

    /// Stop the background loop after flushing what is queued.
    pub async fn shutdown(&self, timeout: Duration) -> Result<FlushStats, FlushError> {
        let result = self.flush(timeout).await;
        self.inner.shutdown.store(true, Ordering::Release);
        self.inner.notify.notify_one();
        result
    }

    pub fn dropped_events(&self) -> u64 {
        self.inner.dropped_events.load(Ordering::Relaxed)
    }

    pub fn pending_len(&self) -> usize {
        lock(&self.inner.queue).len()
    }

    fn spawn_flush_loop(&self, flush_interval: Duration) {
        let weak: Weak<ExporterInner> = Arc::downgrade(&self.inner);
        let notify = Arc::clone(&self.inner.notify);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(flush_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = notify.notified() => {}
                }
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if inner.shutdown.load(Ordering::Acquire) {
                    break;
                }
                Exporter { inner }.send_in_background().await;
            }
            debug!("Background flush loop stopped");
        });
    }

    async fn send_in_background(&self) {
        loop {
            let _guard = self.inner.send_lock.lock().await;
            let batch = self.drain_batch();
            if batch.is_empty() {
                return;
            }
            match self.inner.sink.send(&batch).await {
                Ok(report) => {
                    if !report.rejected.is_empty() {
                        warn!(rejected = report.rejected.len(), "Backend rejected events");
                        lock(&self.inner.deferred).rejected.extend(report.rejected);
                    }
                }
                Err(err) => {
                    warn!(error = %err, events = batch.len(), "Dropping undeliverable batch");
                    let mut deferred = lock(&self.inner.deferred);
                    let dropped = deferred.delivery.as_ref().map_or(0, |(_, n)| *n);
                    deferred.delivery = Some((err.to_string(), dropped + batch.len()));
                }
            }
        }
    }

    fn drain_batch(&self) -> Vec<IngestionEvent> {
        let mut queue = lock(&self.inner.queue);
        let take = queue.len().min(self.inner.batch_size);
        queue.drain(..take).collect()
    }

    fn requeue_front(&self, batch: Vec<IngestionEvent>) {
        let mut queue = lock(&self.inner.queue);
        for event in batch.into_iter().rev() {
            queue.push_front(event);
        }
    }

    fn timeout_error(&self, start: Instant) -> FlushError {
        FlushError::Timeout {
            waited: start.elapsed(),
            pending: self.pending_len(),
        }
    }
}
