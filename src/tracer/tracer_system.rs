//! Tracer system for starting traces and delivering what they record
//!
//! The TracerSystem owns the exporter, the sampler and the sanitizer. Traces are
//! started from it and everything they record flows back through it into the
//! exporter queue, where it waits for the next flush.

use super::context::TraceContext;
use super::event_store::EventStore;
use super::events::{EventPayload, IngestionEvent};
use super::exporter::{Exporter, FlushError, FlushStats};
use super::ingestion::{HttpIngestion, IngestionSink};
use super::sampler::{RatioSampler, Sampler};
use super::sanitize::Sanitizer;
use super::score::Score;
use crate::config::LanternConfig;
use crate::error::Result;
use serde::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

struct TracerInner {
    config: LanternConfig,
    exporter: Exporter,
    sampler: Box<dyn Sampler>,
    sanitizer: Sanitizer,
    enabled: AtomicBool,
}

/// Central system for recording traces and flushing them to an ingestion sink
///
/// Cloning is cheap; every clone shares the same queue.
#[derive(Clone)]
pub struct TracerSystem {
    inner: Arc<TracerInner>,
}

impl TracerSystem {
    /// Create a tracer delivering to the configured Langfuse host
    pub fn new(config: LanternConfig) -> Result<Self> {
        let sink = Arc::new(HttpIngestion::new(&config)?);
        info!(host = %config.host, enabled = config.enabled, "Tracer initialized");
        Ok(Self::with_sink(config, sink))
    }

    /// Create a tracer delivering to an arbitrary sink
    ///
    /// # Arguments
    ///
    /// * `config` - Batching, sampling and sanitizing settings
    /// * `sink` - Destination for batches, e.g. an [`EventStore`]
    pub fn with_sink(config: LanternConfig, sink: Arc<dyn IngestionSink>) -> Self {
        let sampler = Box::new(RatioSampler::new(config.sample_rate));
        Self::with_sampler(config, sink, sampler)
    }

    /// Create a tracer with a custom sampling policy
    pub fn with_sampler(
        config: LanternConfig,
        sink: Arc<dyn IngestionSink>,
        sampler: Box<dyn Sampler>,
    ) -> Self {
        let exporter = Exporter::new(
            sink,
            config.flush_at,
            config.queue_capacity,
            config.flush_interval,
        );
        let sanitizer = Sanitizer::new(config.redact_pattern.clone(), config.max_field_bytes);
        let enabled = AtomicBool::new(config.enabled);
        Self {
            inner: Arc::new(TracerInner {
                config,
                exporter,
                sampler,
                sanitizer,
                enabled,
            }),
        }
    }

    /// Create a tracer that records nothing
    pub fn disabled() -> Self {
        let mut config = LanternConfig::new("", "");
        config.enabled = false;
        config.flush_interval = Duration::ZERO;
        Self::with_sink(config, Arc::new(EventStore::default()))
    }

    /// Create a tracer backed by a fresh in-memory [`EventStore`]
    pub fn in_memory(config: LanternConfig) -> (Self, Arc<EventStore>) {
        let store = Arc::new(EventStore::default());
        (Self::with_sink(config, store.clone()), store)
    }

    pub fn config(&self) -> &LanternConfig {
        &self.inner.config
    }

    /// Check if the tracer is enabled
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    /// Enable the tracer system
    pub fn enable(&self) {
        self.inner.enabled.store(true, Ordering::SeqCst);
    }

    /// Disable the tracer system
    pub fn disable(&self) {
        self.inner.enabled.store(false, Ordering::SeqCst);
    }

    /// Start a new trace
    pub fn trace(&self, name: impl Into<String>) -> TraceContext {
        TraceContext::start(self.clone(), uuid::Uuid::new_v4().to_string(), name.into())
    }

    /// Start a new trace with a caller-chosen id
    pub fn trace_with_id(
        &self,
        trace_id: impl Into<String>,
        name: impl Into<String>,
    ) -> TraceContext {
        TraceContext::start(self.clone(), trace_id.into(), name.into())
    }

    /// Run `f` as the root observation of a new trace named `name`
    ///
    /// The input and the `Ok` output are recorded on both the observation and the
    /// trace. An `Err` marks the observation as failed and is returned unchanged.
    pub async fn observe<I, T, E, F, Fut>(
        &self,
        name: &str,
        input: I,
        f: F,
    ) -> std::result::Result<T, E>
    where
        I: Serialize,
        T: Serialize,
        E: Display,
        F: FnOnce(TraceContext) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        self.trace(name).observe(name, input, f).await
    }

    /// Synchronous form of [`observe`](Self::observe)
    pub fn observe_sync<I, T, E, F>(&self, name: &str, input: I, f: F) -> std::result::Result<T, E>
    where
        I: Serialize,
        T: Serialize,
        E: Display,
        F: FnOnce(TraceContext) -> std::result::Result<T, E>,
    {
        self.trace(name).observe_sync(name, input, f)
    }

    /// Attach a score to any trace by id
    ///
    /// Unknown trace ids are reported by the backend and surface from
    /// [`flush`](Self::flush) as [`FlushError::Rejected`].
    pub fn score(&self, trace_id: &str, score: Score) {
        let sampled = self.is_sampled(trace_id);
        self.emit(sampled, EventPayload::ScoreCreate(score.into_body(trace_id, None)));
    }

    /// Deliver everything queued so far, waiting at most `timeout`
    pub async fn flush(&self, timeout: Duration) -> std::result::Result<FlushStats, FlushError> {
        self.inner.exporter.flush(timeout).await
    }

    /// Flush and stop background delivery
    pub async fn shutdown(&self, timeout: Duration) -> std::result::Result<FlushStats, FlushError> {
        info!("Tracer shutting down");
        self.inner.exporter.shutdown(timeout).await
    }

    /// Number of events waiting for delivery
    pub fn pending_events(&self) -> usize {
        self.inner.exporter.pending_len()
    }

    /// Number of events discarded because the queue was full
    pub fn dropped_events(&self) -> u64 {
        self.inner.exporter.dropped_events()
    }

    pub(crate) fn is_sampled(&self, trace_id: &str) -> bool {
        self.inner.sampler.should_sample(trace_id)
    }

    pub(crate) fn emit(&self, sampled: bool, payload: EventPayload) {
        if !sampled || !self.is_enabled() {
            return;
        }
        let mut event = IngestionEvent::new(payload);
        self.inner.sanitizer.sanitize_event(&mut event);
        self.inner.exporter.enqueue(event);
    }
}

impl Default for TracerSystem {
    fn default() -> Self {
        Self::disabled()
    }
}
