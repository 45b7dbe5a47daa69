//! In-memory ingestion sink with callbacks and querying
//!
//! The event store receives delivered batches exactly as the HTTP backend would
//! and keeps them for inspection. It reassembles traces, observations and scores
//! from the create/update events, which makes it the sink of choice for tests,
//! local debugging and offline runs.

use super::events::{EventPayload, IngestionEvent, ObservationBody, ScoreBody, TraceBody};
use super::ingestion::{IngestionReport, IngestionSink, RejectedEvent};
use super::lock;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Type alias for event callback functions
pub type EventCallback = Arc<dyn Fn(&IngestionEvent) + Send + Sync>;

#[derive(Default)]
struct StoreState {
    events: Vec<IngestionEvent>,
    known_traces: HashSet<String>,
}

/// Store for capturing and querying delivered ingestion events
///
/// Scores that reference a trace id the store has never received are rejected
/// with status 404, mirroring how a backend reports an unknown trace.
pub struct EventStore {
    state: Mutex<StoreState>,
    on_store_callback: Option<EventCallback>,
}

impl EventStore {
    /// Create a new event store
    ///
    /// # Arguments
    ///
    /// * `on_store_callback` - Optional callback function called whenever an event is stored
    pub fn new(on_store_callback: Option<EventCallback>) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            on_store_callback,
        }
    }

    /// Store an event, returning the rejection if the event refers to an unknown trace.
    pub fn store(&self, event: IngestionEvent) -> Option<RejectedEvent> {
        {
            let mut state = lock(&self.state);
            match &event.payload {
                EventPayload::TraceCreate(body) => {
                    state.known_traces.insert(body.id.clone());
                }
                EventPayload::ScoreCreate(body) if !state.known_traces.contains(&body.trace_id) => {
                    return Some(RejectedEvent {
                        id: event.id.clone(),
                        status: 404,
                        message: Some(format!("trace {} not found", body.trace_id)),
                    });
                }
                _ => {}
            }
            state.events.push(event.clone());
        }

        if let Some(callback) = &self.on_store_callback {
            callback(&event);
        }
        None
    }

    /// The trace with all of its `trace-create` upserts merged
    pub fn trace(&self, trace_id: &str) -> Option<TraceBody> {
        let state = lock(&self.state);
        let mut merged: Option<TraceBody> = None;
        for event in &state.events {
            if let EventPayload::TraceCreate(body) = &event.payload {
                if body.id != trace_id {
                    continue;
                }
                match merged.as_mut() {
                    Some(trace) => trace.merge(body),
                    None => merged = Some(body.clone()),
                }
            }
        }
        merged
    }

    /// All trace ids in first-seen order
    pub fn trace_ids(&self) -> Vec<String> {
        let state = lock(&self.state);
        let mut seen = HashSet::new();
        state
            .events
            .iter()
            .filter_map(|event| match &event.payload {
                EventPayload::TraceCreate(body) if seen.insert(body.id.clone()) => {
                    Some(body.id.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Observations of a trace with create and update events merged, in creation order
    pub fn observations(&self, trace_id: &str) -> Vec<ObservationBody> {
        let state = lock(&self.state);
        let mut order: Vec<String> = Vec::new();
        let mut merged: HashMap<String, ObservationBody> = HashMap::new();

        for event in &state.events {
            let Some(body) = event.payload.observation() else {
                continue;
            };
            if body.trace_id != trace_id {
                continue;
            }
            match merged.get_mut(&body.id) {
                Some(existing) => existing.merge(body),
                None => {
                    order.push(body.id.clone());
                    merged.insert(body.id.clone(), body.clone());
                }
            }
        }

        order.into_iter().filter_map(|id| merged.remove(&id)).collect()
    }

    /// A single observation by id, merged across its events
    pub fn observation(&self, trace_id: &str, observation_id: &str) -> Option<ObservationBody> {
        self.observations(trace_id).into_iter().find(|o| o.id == observation_id)
    }

    /// Scores recorded for a trace
    pub fn scores(&self, trace_id: &str) -> Vec<ScoreBody> {
        let state = lock(&self.state);
        state
            .events
            .iter()
            .filter_map(|event| match &event.payload {
                EventPayload::ScoreCreate(body) if body.trace_id == trace_id => Some(body.clone()),
                _ => None,
            })
            .collect()
    }

    /// Count events matching an optional filter
    pub fn count_events(&self, filter_func: Option<&dyn Fn(&IngestionEvent) -> bool>) -> usize {
        let state = lock(&self.state);
        state
            .events
            .iter()
            .filter(|event| filter_func.map_or(true, |filter| filter(event)))
            .count()
    }

    /// Count events of one wire type, e.g. `"span-create"`
    pub fn count_of_type(&self, type_name: &str) -> usize {
        self.count_events(Some(&|event: &IngestionEvent| event.type_name() == type_name))
    }

    /// Get summaries of all events matching an optional filter
    pub fn get_event_summaries(
        &self,
        filter_func: Option<&dyn Fn(&IngestionEvent) -> bool>,
    ) -> Vec<String> {
        let state = lock(&self.state);
        state
            .events
            .iter()
            .filter(|event| filter_func.map_or(true, |filter| filter(event)))
            .map(IngestionEvent::printable_summary)
            .collect()
    }

    /// Get the last N event summaries, optionally filtered
    pub fn get_last_n_summaries(
        &self,
        n: usize,
        filter_func: Option<&dyn Fn(&IngestionEvent) -> bool>,
    ) -> Vec<String> {
        let summaries = self.get_event_summaries(filter_func);
        let start_idx = summaries.len().saturating_sub(n);
        summaries[start_idx..].to_vec()
    }

    /// Clear all events from the store
    pub fn clear(&self) {
        let mut state = lock(&self.state);
        state.events.clear();
        state.known_traces.clear();
    }

    /// Get the total number of events in the store
    pub fn len(&self) -> usize {
        lock(&self.state).events.len()
    }

    /// Check if the event store is empty
    pub fn is_empty(&self) -> bool {
        lock(&self.state).events.is_empty()
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl IngestionSink for EventStore {
    async fn send(&self, batch: &[IngestionEvent]) -> Result<IngestionReport> {
        let mut report = IngestionReport::default();
        for event in batch {
            match self.store(event.clone()) {
                Some(rejected) => report.rejected.push(rejected),
                None => report.accepted += 1,
            }
        }
        Ok(report)
    }
}
