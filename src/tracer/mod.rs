//! Tracing of LLM workloads into Langfuse-style traces
//!
//! A trace is the root unit of work. Within it, observations form a tree:
//! spans for ordinary steps, generations for model calls and events for
//! point-in-time markers. Scores evaluate a trace or one of its observations.
//!
//! # Architecture
//!
//! - **TracerSystem**: starts traces, applies sampling and redaction, owns the exporter
//! - **TraceContext**: explicit handle threaded through the call chain; opens nested observations
//! - **ActiveObservation**: scoped guard that always closes its observation
//! - **Exporter**: bounded queue with background batching and a flush barrier
//! - **IngestionSink**: delivery seam, implemented by `HttpIngestion` and the in-memory `EventStore`
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use lantern::tracer::{Score, TracerSystem};
//! use std::time::Duration;
//!
//! let tracer = TracerSystem::new(lantern::LanternConfig::from_env()?)?;
//! let ctx = tracer.trace("qa");
//! ctx.set_user_id("user-123");
//!
//! let answer = ctx
//!     .observe("answer", "What is Rust?", |_ctx| async { Ok::<_, String>("A language") })
//!     .await?;
//!
//! ctx.score_trace(Score::new("helpfulness", 0.9));
//! tracer.flush(Duration::from_secs(5)).await?;
//! ```

pub mod context;
pub mod event_store;
pub mod events;
pub mod exporter;
pub mod ingestion;
pub mod sampler;
pub mod sanitize;
pub mod score;
pub mod tracer_system;

use std::sync::{Mutex, MutexGuard, PoisonError};

// Re-export main types
pub use context::{ActiveObservation, TraceContext};
pub use event_store::{EventCallback, EventStore};
pub use events::{
    EventPayload, IngestionEvent, ObservationBody, ObservationLevel, ObservationType, ScoreBody,
    ScoreDataType, TraceBody, Usage,
};
pub use exporter::{Exporter, FlushError, FlushStats};
pub use ingestion::{HttpIngestion, IngestionReport, IngestionSink, RejectedEvent};
pub use sampler::{RatioSampler, Sampler};
pub use sanitize::Sanitizer;
pub use score::{Score, ScoreValue};
pub use tracer_system::TracerSystem;

/// Lock a mutex, recovering the data if a holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
