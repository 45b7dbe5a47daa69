//! Explicit trace context and scoped observations
//!
//! A [`TraceContext`] names a trace and, optionally, the observation currently
//! open within it. It is passed by value down the call chain: opening a span
//! yields an [`ActiveObservation`] whose own context points at the new span, so
//! anything started from that context nests beneath it. Clones are cheap and can
//! be moved into concurrent tasks.
//!
//! ```rust,ignore
//! let tracer = TracerSystem::new(LanternConfig::from_env()?)?;
//! let ctx = tracer.trace("story-pipeline");
//! ctx.set_user_id("user-123");
//!
//! let story = ctx
//!     .observe("generate_story", json!({"topic": "space"}), |ctx| async move {
//!         let outline = ctx.observe("outline", json!({}), |_| async { Ok::<_, String>("...") }).await?;
//!         Ok::<_, String>(format!("Story from {}", outline))
//!     })
//!     .await?;
//!
//! tracer.flush(Duration::from_secs(5)).await?;
//! ```

use super::events::{
    EventPayload, ObservationBody, ObservationLevel, ObservationType, TraceBody, Usage,
};
use super::lock;
use super::score::Score;
use super::tracer_system::TracerSystem;
use crate::llm::LlmGatewayResponse;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

struct TraceState {
    id: String,
    sampled: bool,
    body: Mutex<TraceBody>,
}

struct ObservationState {
    id: String,
    kind: ObservationType,
    /// Fields sent with the closing update
    pending: Mutex<ObservationBody>,
    ended: AtomicBool,
}

/// Handle on a trace and the observation currently open in it
#[derive(Clone)]
pub struct TraceContext {
    tracer: TracerSystem,
    trace: Arc<TraceState>,
    current: Option<Arc<ObservationState>>,
}

impl TraceContext {
    pub(crate) fn start(tracer: TracerSystem, id: String, name: String) -> Self {
        let sampled = tracer.is_sampled(&id);
        let body = TraceBody {
            id: id.clone(),
            timestamp: Some(Utc::now()),
            name: Some(name),
            release: tracer.config().release.clone(),
            ..Default::default()
        };
        tracer.emit(sampled, EventPayload::TraceCreate(body.clone()));
        Self {
            tracer,
            trace: Arc::new(TraceState {
                id,
                sampled,
                body: Mutex::new(body),
            }),
            current: None,
        }
    }

    pub fn tracer(&self) -> &TracerSystem {
        &self.tracer
    }

    pub fn trace_id(&self) -> &str {
        &self.trace.id
    }

    /// Id of the observation new children will nest under
    pub fn current_observation_id(&self) -> Option<&str> {
        self.current.as_ref().map(|state| state.id.as_str())
    }

    /// Whether this trace passed sampling and will be delivered
    pub fn is_sampled(&self) -> bool {
        self.trace.sampled
    }

    /// Set the user id on the trace and on every observation opened afterwards
    pub fn set_user_id(&self, user_id: impl Into<String>) {
        let user_id = user_id.into();
        self.update_trace(|trace| trace.user_id = Some(user_id));
    }

    /// Set the session id on the trace and on every observation opened afterwards
    pub fn set_session_id(&self, session_id: impl Into<String>) {
        let session_id = session_id.into();
        self.update_trace(|trace| trace.session_id = Some(session_id));
    }

    pub fn add_tags<I, S>(&self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        self.update_trace(|trace| {
            for tag in tags {
                if !trace.tags.contains(&tag) {
                    trace.tags.push(tag);
                }
            }
        });
    }

    /// Merge one key into the trace metadata
    pub fn attach_metadata(&self, key: impl Into<String>, value: impl Serialize) {
        let key = key.into();
        let value = to_json(&value);
        self.update_trace(|trace| insert_metadata(&mut trace.metadata, key, value));
    }

    /// Apply arbitrary changes to the trace and send the result as an upsert
    pub fn update_trace(&self, update: impl FnOnce(&mut TraceBody)) {
        let snapshot = {
            let mut body = lock(&self.trace.body);
            update(&mut body);
            body.id.clone_from(&self.trace.id);
            body.clone()
        };
        self.tracer.emit(self.trace.sampled, EventPayload::TraceCreate(snapshot));
    }

    /// Modify the fields the current observation reports when it closes
    ///
    /// Returns false when there is no open observation in this context.
    pub fn update_current_observation(&self, update: impl FnOnce(&mut ObservationBody)) -> bool {
        match &self.current {
            Some(state) if !state.ended.load(Ordering::SeqCst) => {
                let mut pending = lock(&state.pending);
                update(&mut pending);
                pending.id.clone_from(&state.id);
                pending.trace_id.clone_from(&self.trace.id);
                true
            }
            _ => false,
        }
    }

    /// Open a span nested under the current observation
    pub fn span(&self, name: impl Into<String>) -> ActiveObservation {
        self.open(ObservationType::Span, name.into(), None)
    }

    /// Open a generation nested under the current observation
    pub fn generation(&self, name: impl Into<String>) -> ActiveObservation {
        self.open(ObservationType::Generation, name.into(), None)
    }

    /// Record a point-in-time event and return its id
    pub fn event(&self, name: impl Into<String>, input: impl Serialize) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let body = ObservationBody {
            id: id.clone(),
            trace_id: self.trace.id.clone(),
            parent_observation_id: self.current_observation_id().map(String::from),
            name: Some(name.into()),
            start_time: Some(Utc::now()),
            input: Some(to_json(&input)),
            metadata: self.identity_metadata(),
            ..Default::default()
        };
        self.tracer.emit(self.trace.sampled, EventPayload::EventCreate(body));
        id
    }

    /// Run `f` inside a span named `name`
    ///
    /// `f` receives the span's context for further nesting. The input and the
    /// `Ok` output are recorded; an `Err` marks the span as failed with the error
    /// text and is returned unchanged.
    pub async fn observe<I, T, E, F, Fut>(&self, name: &str, input: I, f: F) -> Result<T, E>
    where
        I: Serialize,
        T: Serialize,
        E: Display,
        F: FnOnce(TraceContext) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let observation = self.open(
            ObservationType::Span,
            name.to_string(),
            Some(to_json(&input)),
        );
        let result = f(observation.context().clone()).await;
        observation.close_with(&result);
        result
    }

    /// Synchronous form of [`observe`](Self::observe)
    pub fn observe_sync<I, T, E, F>(&self, name: &str, input: I, f: F) -> Result<T, E>
    where
        I: Serialize,
        T: Serialize,
        E: Display,
        F: FnOnce(TraceContext) -> Result<T, E>,
    {
        let observation = self.open(
            ObservationType::Span,
            name.to_string(),
            Some(to_json(&input)),
        );
        let result = f(observation.context().clone());
        observation.close_with(&result);
        result
    }

    pub fn score_trace(&self, score: Score) {
        self.tracer.emit(
            self.trace.sampled,
            EventPayload::ScoreCreate(score.into_body(&self.trace.id, None)),
        );
    }

    /// Score the current observation, or the trace when none is open
    pub fn score_current_observation(&self, score: Score) {
        let observation_id = self.current_observation_id().map(String::from);
        self.tracer.emit(
            self.trace.sampled,
            EventPayload::ScoreCreate(score.into_body(&self.trace.id, observation_id)),
        );
    }

    fn identity_metadata(&self) -> Option<Value> {
        let body = lock(&self.trace.body);
        let mut metadata = Map::new();
        if let Some(user_id) = &body.user_id {
            metadata.insert("user_id".to_string(), Value::String(user_id.clone()));
        }
        if let Some(session_id) = &body.session_id {
            metadata.insert("session_id".to_string(), Value::String(session_id.clone()));
        }
        (!metadata.is_empty()).then_some(Value::Object(metadata))
    }

    fn open(&self, kind: ObservationType, name: String, input: Option<Value>) -> ActiveObservation {
        let id = uuid::Uuid::new_v4().to_string();
        let root = self.current.is_none();
        let metadata = self.identity_metadata();

        let created = ObservationBody {
            id: id.clone(),
            trace_id: self.trace.id.clone(),
            parent_observation_id: self.current_observation_id().map(String::from),
            name: Some(name),
            start_time: Some(Utc::now()),
            input: input.clone(),
            metadata: metadata.clone(),
            ..Default::default()
        };
        self.tracer.emit(self.trace.sampled, create_payload(kind, created));

        if root {
            if let Some(input) = &input {
                self.update_trace(|trace| trace.input = Some(input.clone()));
            }
        }

        let state = Arc::new(ObservationState {
            id: id.clone(),
            kind,
            pending: Mutex::new(ObservationBody {
                id,
                trace_id: self.trace.id.clone(),
                metadata,
                ..Default::default()
            }),
            ended: AtomicBool::new(false),
        });

        ActiveObservation {
            ctx: TraceContext {
                tracer: self.tracer.clone(),
                trace: Arc::clone(&self.trace),
                current: Some(Arc::clone(&state)),
            },
            state,
            root,
        }
    }
}

/// An open span or generation
///
/// Closed by [`end`](Self::end), [`end_with_output`](Self::end_with_output) or
/// [`fail`](Self::fail). Dropping it closes it as well; a drop during a panic is
/// recorded with level `ERROR`.
pub struct ActiveObservation {
    ctx: TraceContext,
    state: Arc<ObservationState>,
    root: bool,
}

impl ActiveObservation {
    pub fn id(&self) -> &str {
        &self.state.id
    }

    pub fn kind(&self) -> ObservationType {
        self.state.kind
    }

    /// Context for work nested under this observation
    pub fn context(&self) -> &TraceContext {
        &self.ctx
    }

    pub fn set_input(&self, input: impl Serialize) {
        let input = to_json(&input);
        if self.root {
            self.ctx.update_trace(|trace| trace.input = Some(input.clone()));
        }
        self.pending().input = Some(input);
    }

    pub fn set_output(&self, output: impl Serialize) {
        self.pending().output = Some(to_json(&output));
    }

    pub fn attach_metadata(&self, key: impl Into<String>, value: impl Serialize) {
        insert_metadata(&mut self.pending().metadata, key.into(), to_json(&value));
    }

    pub fn set_level(&self, level: ObservationLevel) {
        self.pending().level = Some(level);
    }

    pub fn set_status_message(&self, message: impl Into<String>) {
        self.pending().status_message = Some(message.into());
    }

    pub fn set_model(&self, model: impl Into<String>) {
        self.pending().model = Some(model.into());
    }

    pub fn set_model_parameters(&self, parameters: Value) {
        self.pending().model_parameters = Some(parameters);
    }

    pub fn set_usage(&self, usage: impl Into<Usage>) {
        self.pending().usage = Some(usage.into());
    }

    /// Mark the moment the first completion token arrived
    pub fn mark_completion_start(&self) {
        self.pending().completion_start_time = Some(Utc::now());
    }

    /// Copy model, output, usage and finish reason from a provider response
    pub fn record_response(&self, response: &LlmGatewayResponse) {
        let mut pending = self.pending();
        pending.model = Some(response.model.clone());
        pending.output = Some(Value::String(response.content.clone()));
        if let Some(usage) = response.usage {
            pending.usage = Some(usage.into());
        }
        if let Some(reason) = &response.finish_reason {
            insert_metadata(
                &mut pending.metadata,
                "finish_reason".to_string(),
                Value::String(reason.clone()),
            );
        }
    }

    pub fn end(self) {
        self.finish(None, None);
    }

    pub fn end_with_output(self, output: impl Serialize) {
        self.set_output(output);
        self.finish(None, None);
    }

    /// Close with level `ERROR` and `message` as the status message
    pub fn fail(self, message: impl Into<String>) {
        self.finish(Some(ObservationLevel::Error), Some(message.into()));
    }

    fn close_with<T: Serialize, E: Display>(self, result: &Result<T, E>) {
        match result {
            Ok(output) => self.end_with_output(output),
            Err(err) => self.fail(err.to_string()),
        }
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, ObservationBody> {
        lock(&self.state.pending)
    }

    fn finish(&self, level: Option<ObservationLevel>, status_message: Option<String>) {
        if self.state.ended.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut body = std::mem::take(&mut *self.pending());
        body.id.clone_from(&self.state.id);
        body.trace_id.clone_from(&self.ctx.trace.id);
        if level.is_some() {
            body.level = level;
        }
        if status_message.is_some() {
            body.status_message = status_message;
        }
        body.end_time.get_or_insert_with(Utc::now);
        if let Some(Value::Object(identity)) = self.ctx.identity_metadata() {
            for (key, value) in identity {
                insert_metadata(&mut body.metadata, key, value);
            }
        }

        let output = body.output.clone();
        self.ctx
            .tracer
            .emit(self.ctx.trace.sampled, update_payload(self.state.kind, body));

        if self.root {
            if let Some(output) = output {
                self.ctx.update_trace(|trace| trace.output = Some(output));
            }
        }
    }
}

impl Drop for ActiveObservation {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.finish(
                Some(ObservationLevel::Error),
                Some("panicked before the observation ended".to_string()),
            );
        } else {
            self.finish(None, None);
        }
    }
}

fn create_payload(kind: ObservationType, body: ObservationBody) -> EventPayload {
    match kind {
        ObservationType::Span => EventPayload::SpanCreate(body),
        ObservationType::Generation => EventPayload::GenerationCreate(body),
        ObservationType::Event => EventPayload::EventCreate(body),
    }
}

fn update_payload(kind: ObservationType, body: ObservationBody) -> EventPayload {
    match kind {
        ObservationType::Span => EventPayload::SpanUpdate(body),
        ObservationType::Generation => EventPayload::GenerationUpdate(body),
        ObservationType::Event => EventPayload::EventCreate(body),
    }
}

fn insert_metadata(metadata: &mut Option<Value>, key: String, value: Value) {
    match metadata {
        Some(Value::Object(map)) => {
            map.insert(key, value);
        }
        _ => *metadata = Some(Value::Object(Map::from_iter([(key, value)]))),
    }
}

/// Serialize a captured value, recording serialization failures in place of the value
pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value)
        .unwrap_or_else(|err| Value::String(format!("<unserializable: {}>", err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LanternConfig;
    use crate::llm::TokenUsage;
    use crate::tracer::event_store::EventStore;
    use serde_json::json;
    use std::time::Duration;

    fn tracer() -> (TracerSystem, Arc<EventStore>) {
        let mut config = LanternConfig::new("pk-lf-test", "sk-lf-test");
        config.flush_interval = Duration::ZERO;
        TracerSystem::in_memory(config)
    }

    async fn flush(tracer: &TracerSystem) {
        tracer.flush(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_child_parent_is_active_observation() {
        let (tracer, store) = tracer();
        let ctx = tracer.trace("nesting");

        let outer = ctx.span("outer");
        let inner = outer.context().span("inner");
        let inner_id = inner.id().to_string();
        let outer_id = outer.id().to_string();
        inner.end();
        outer.end();
        flush(&tracer).await;

        let observations = store.observations(ctx.trace_id());
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].parent_observation_id, None);
        let inner = store.observation(ctx.trace_id(), &inner_id).unwrap();
        assert_eq!(inner.parent_observation_id.as_deref(), Some(outer_id.as_str()));
        assert!(inner.end_time.is_some());
    }

    #[tokio::test]
    async fn test_observe_records_input_output_on_trace() {
        let (tracer, store) = tracer();

        let story: Result<String, String> = tracer
            .observe("creative-writing-flow", json!({"topic": "space"}), |ctx| async move {
                ctx.observe("outline", json!({"beats": 3}), |_| async {
                    Ok::<_, String>("three beats")
                })
                .await?;
                Ok("Once upon a time".to_string())
            })
            .await;
        flush(&tracer).await;

        assert_eq!(story.unwrap(), "Once upon a time");
        let trace_id = store.trace_ids()[0].clone();
        let trace = store.trace(&trace_id).unwrap();
        assert_eq!(trace.input, Some(json!({"topic": "space"})));
        assert_eq!(trace.output, Some(json!("Once upon a time")));

        let observations = store.observations(&trace_id);
        assert_eq!(observations.len(), 2);
        assert_eq!(
            observations[1].parent_observation_id.as_deref(),
            Some(observations[0].id.as_str())
        );
        assert_eq!(observations[1].output, Some(json!("three beats")));
    }

    #[tokio::test]
    async fn test_failed_closure_recorded_and_error_propagates() {
        let (tracer, store) = tracer();
        let ctx = tracer.trace("failing");

        let result: Result<(), String> = ctx
            .observe("call_provider", json!({}), |_| async {
                Err("rate limited".to_string())
            })
            .await;
        flush(&tracer).await;

        assert_eq!(result.unwrap_err(), "rate limited");
        let observations = store.observations(ctx.trace_id());
        assert_eq!(observations[0].level, Some(ObservationLevel::Error));
        assert_eq!(observations[0].status_message.as_deref(), Some("rate limited"));
        assert!(observations[0].end_time.is_some());
    }

    #[tokio::test]
    async fn test_user_and_session_on_every_observation() {
        let (tracer, store) = tracer();
        let ctx = tracer.trace("chain");
        ctx.set_user_id("user-123");
        ctx.set_session_id("session-456");

        let _: Result<(), String> = ctx
            .observe("step-1", json!({}), |ctx| async move {
                ctx.generation("llm").end();
                ctx.event("checkpoint", json!({"ok": true}));
                Ok(())
            })
            .await;
        flush(&tracer).await;

        let trace = store.trace(ctx.trace_id()).unwrap();
        assert_eq!(trace.user_id.as_deref(), Some("user-123"));
        assert_eq!(trace.session_id.as_deref(), Some("session-456"));

        let observations = store.observations(ctx.trace_id());
        assert_eq!(observations.len(), 3);
        for observation in observations {
            let metadata = observation.metadata_map();
            assert_eq!(metadata["user_id"], "user-123");
            assert_eq!(metadata["session_id"], "session-456");
        }
    }

    #[tokio::test]
    async fn test_replaced_metadata_keeps_user_and_session() {
        let (tracer, store) = tracer();
        let ctx = tracer.trace("manual");
        ctx.set_user_id("user-123");
        ctx.set_session_id("session-456");

        let generation = ctx.generation("anthropic-completion");
        generation.context().update_current_observation(|o| {
            o.metadata = Some(json!({"model_type": "anthropic"}));
        });
        let id = generation.id().to_string();
        generation.end();
        flush(&tracer).await;

        let metadata = store.observation(ctx.trace_id(), &id).unwrap().metadata_map();
        assert_eq!(metadata["model_type"], "anthropic");
        assert_eq!(metadata["user_id"], "user-123");
        assert_eq!(metadata["session_id"], "session-456");
    }

    #[tokio::test]
    async fn test_user_set_after_open_lands_on_close() {
        let (tracer, store) = tracer();
        let ctx = tracer.trace("late-identity");

        let span = ctx.span("step");
        ctx.set_user_id("user-789");
        let id = span.id().to_string();
        span.end();
        flush(&tracer).await;

        let metadata = store.observation(ctx.trace_id(), &id).unwrap().metadata_map();
        assert_eq!(metadata["user_id"], "user-789");
        assert!(!metadata.contains_key("session_id"));
    }

    #[tokio::test]
    async fn test_concurrent_clones_nest_under_same_parent() {
        let (tracer, store) = tracer();
        let ctx = tracer.trace("parallel");
        let root = ctx.span("compare");
        let (left, right) = (root.context().clone(), root.context().clone());

        let (a, b) = tokio::join!(
            left.observe("model-a", json!({}), |_| async { Ok::<_, String>(1) }),
            right.observe("model-b", json!({}), |_| async { Ok::<_, String>(2) }),
        );
        let root_id = root.id().to_string();
        root.end();
        flush(&tracer).await;

        assert_eq!(a.unwrap() + b.unwrap(), 3);
        let children: Vec<_> = store
            .observations(ctx.trace_id())
            .into_iter()
            .filter(|o| o.parent_observation_id.as_deref() == Some(root_id.as_str()))
            .collect();
        assert_eq!(children.len(), 2);
    }

    #[tokio::test]
    async fn test_drop_during_panic_records_error() {
        let (tracer, store) = tracer();
        let ctx = tracer.trace("panicky");

        let panicked = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _span = ctx.span("explodes");
            panic!("boom");
        }));
        flush(&tracer).await;

        assert!(panicked.is_err());
        let observations = store.observations(ctx.trace_id());
        assert_eq!(observations[0].level, Some(ObservationLevel::Error));
    }

    #[tokio::test]
    async fn test_drop_without_end_closes_normally() {
        let (tracer, store) = tracer();
        let ctx = tracer.trace("dropped");

        drop(ctx.span("forgotten"));
        flush(&tracer).await;

        let observations = store.observations(ctx.trace_id());
        assert!(observations[0].end_time.is_some());
        assert_eq!(observations[0].level, None);
        assert_eq!(store.count_of_type("span-update"), 1);
    }

    #[tokio::test]
    async fn test_update_current_observation() {
        let (tracer, store) = tracer();
        let ctx = tracer.trace("manual");
        assert!(!ctx.update_current_observation(|_| {}));

        let generation = ctx.generation("anthropic-completion");
        let updated = generation.context().update_current_observation(|o| {
            o.model = Some("claude-3-opus-20240229".to_string());
            o.usage = Some(Usage::tokens(20, 40));
        });
        let id = generation.id().to_string();
        generation.end();
        flush(&tracer).await;

        assert!(updated);
        let observation = store.observation(ctx.trace_id(), &id).unwrap();
        assert_eq!(observation.model.as_deref(), Some("claude-3-opus-20240229"));
        assert_eq!(observation.usage.as_ref().unwrap().total, Some(60));
        assert_eq!(store.count_of_type("generation-update"), 1);
    }

    #[tokio::test]
    async fn test_record_response_on_generation() {
        let (tracer, store) = tracer();
        let ctx = tracer.trace("manual-capture");
        let generation = ctx.generation("completion");
        generation.set_input(json!([{"role": "user", "content": "hi"}]));

        generation.record_response(&LlmGatewayResponse {
            content: "hello".to_string(),
            model: "gpt-4o-mini".to_string(),
            usage: Some(TokenUsage::new(3, 1)),
            finish_reason: Some("stop".to_string()),
        });
        let id = generation.id().to_string();
        generation.end();
        flush(&tracer).await;

        let observation = store.observation(ctx.trace_id(), &id).unwrap();
        assert_eq!(observation.output, Some(json!("hello")));
        assert_eq!(observation.usage.as_ref().unwrap().input, Some(3));
        assert_eq!(observation.metadata_map()["finish_reason"], "stop");
    }

    #[tokio::test]
    async fn test_scores_through_context() {
        let (tracer, store) = tracer();
        let ctx = tracer.trace("scored");
        let span = ctx.span("answer");

        span.context().score_current_observation(Score::new("relevance", 0.7));
        ctx.score_trace(Score::new("overall", "GOOD"));
        let span_id = span.id().to_string();
        span.end();
        flush(&tracer).await;

        let scores = store.scores(ctx.trace_id());
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].observation_id.as_deref(), Some(span_id.as_str()));
        assert_eq!(scores[1].observation_id, None);
    }

    #[tokio::test]
    async fn test_tags_and_metadata_upsert_trace() {
        let (tracer, store) = tracer();
        let ctx = tracer.trace("tagged");

        ctx.add_tags(["bedrock", "comparison"]);
        ctx.add_tags(["bedrock"]);
        ctx.attach_metadata("region", "us-east-1");
        flush(&tracer).await;

        let trace = store.trace(ctx.trace_id()).unwrap();
        assert_eq!(trace.tags, vec!["bedrock", "comparison"]);
        assert_eq!(trace.metadata, Some(json!({"region": "us-east-1"})));
        assert_eq!(trace.name.as_deref(), Some("tagged"));
    }

    #[test]
    fn test_observe_sync() {
        let (tracer, store) = tracer();

        let result = tracer.observe_sync("parse", "raw", |_ctx| "raw".parse::<i32>());

        assert!(result.is_err());
        assert_eq!(store.len(), 0);
        assert_eq!(tracer.pending_events(), 4);
    }
}
