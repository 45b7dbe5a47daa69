//! Ingestion event types
//!
//! Every trace, observation and score change is queued as an [`IngestionEvent`]
//! and later delivered in batches. The serialized shape matches the Langfuse
//! public ingestion API: `{"id", "timestamp", "type", "body"}` with camelCase
//! bodies and unset fields omitted.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of observation recorded within a trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObservationType {
    Span,
    Generation,
    Event,
}

/// Severity attached to an observation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObservationLevel {
    Debug,
    #[default]
    Default,
    Warning,
    Error,
}

/// Token usage in the ingestion format
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Usage {
    /// Token usage with the total derived from input and output.
    pub fn tokens(input: u64, output: u64) -> Self {
        Self {
            input: Some(input),
            output: Some(output),
            total: Some(input + output),
            unit: Some("TOKENS".to_string()),
        }
    }
}

/// Body of a `trace-create` event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceBody {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
}

impl TraceBody {
    /// Overlay the fields set in `other` onto this body.
    pub fn merge(&mut self, other: &TraceBody) {
        overlay(&mut self.timestamp, &other.timestamp);
        overlay(&mut self.name, &other.name);
        overlay(&mut self.user_id, &other.user_id);
        overlay(&mut self.session_id, &other.session_id);
        overlay(&mut self.input, &other.input);
        overlay(&mut self.output, &other.output);
        overlay(&mut self.metadata, &other.metadata);
        overlay(&mut self.release, &other.release);
        overlay(&mut self.version, &other.version);
        overlay(&mut self.public, &other.public);
        for tag in &other.tags {
            if !self.tags.contains(tag) {
                self.tags.push(tag.clone());
            }
        }
    }
}

/// Body of span, generation and event records (create and update)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationBody {
    pub id: String,
    pub trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_observation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<ObservationLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_parameters: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ObservationBody {
    pub fn merge(&mut self, other: &ObservationBody) {
        overlay(&mut self.parent_observation_id, &other.parent_observation_id);
        overlay(&mut self.name, &other.name);
        overlay(&mut self.start_time, &other.start_time);
        overlay(&mut self.end_time, &other.end_time);
        overlay(&mut self.completion_start_time, &other.completion_start_time);
        overlay(&mut self.input, &other.input);
        overlay(&mut self.output, &other.output);
        overlay(&mut self.metadata, &other.metadata);
        overlay(&mut self.level, &other.level);
        overlay(&mut self.status_message, &other.status_message);
        overlay(&mut self.model, &other.model);
        overlay(&mut self.model_parameters, &other.model_parameters);
        overlay(&mut self.usage, &other.usage);
        overlay(&mut self.version, &other.version);
    }

    /// Metadata as a map, empty when unset or not an object.
    pub fn metadata_map(&self) -> Map<String, Value> {
        match &self.metadata {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        }
    }

    /// Duration in milliseconds between start and end, when both are known.
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }
}

/// Data type tag of a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreDataType {
    Numeric,
    Categorical,
    Boolean,
}

/// Body of a `score-create` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBody {
    pub id: String,
    pub trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation_id: Option<String>,
    pub name: String,
    pub value: Value,
    pub data_type: ScoreDataType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Typed payload of an ingestion event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "body", rename_all = "kebab-case")]
pub enum EventPayload {
    TraceCreate(TraceBody),
    SpanCreate(ObservationBody),
    SpanUpdate(ObservationBody),
    GenerationCreate(ObservationBody),
    GenerationUpdate(ObservationBody),
    EventCreate(ObservationBody),
    ScoreCreate(ScoreBody),
}

impl EventPayload {
    /// Wire name of the event type, e.g. `span-create`.
    pub fn type_name(&self) -> &'static str {
        match self {
            EventPayload::TraceCreate(_) => "trace-create",
            EventPayload::SpanCreate(_) => "span-create",
            EventPayload::SpanUpdate(_) => "span-update",
            EventPayload::GenerationCreate(_) => "generation-create",
            EventPayload::GenerationUpdate(_) => "generation-update",
            EventPayload::EventCreate(_) => "event-create",
            EventPayload::ScoreCreate(_) => "score-create",
        }
    }

    /// Trace the payload belongs to
    pub fn trace_id(&self) -> &str {
        match self {
            EventPayload::TraceCreate(body) => &body.id,
            EventPayload::ScoreCreate(body) => &body.trace_id,
            EventPayload::SpanCreate(body)
            | EventPayload::SpanUpdate(body)
            | EventPayload::GenerationCreate(body)
            | EventPayload::GenerationUpdate(body)
            | EventPayload::EventCreate(body) => &body.trace_id,
        }
    }

    pub fn observation(&self) -> Option<&ObservationBody> {
        match self {
            EventPayload::SpanCreate(body)
            | EventPayload::SpanUpdate(body)
            | EventPayload::GenerationCreate(body)
            | EventPayload::GenerationUpdate(body)
            | EventPayload::EventCreate(body) => Some(body),
            _ => None,
        }
    }

    /// Observation kind for observation payloads
    pub fn observation_type(&self) -> Option<ObservationType> {
        match self {
            EventPayload::SpanCreate(_) | EventPayload::SpanUpdate(_) => {
                Some(ObservationType::Span)
            }
            EventPayload::GenerationCreate(_) | EventPayload::GenerationUpdate(_) => {
                Some(ObservationType::Generation)
            }
            EventPayload::EventCreate(_) => Some(ObservationType::Event),
            _ => None,
        }
    }
}

/// One queued unit of ingestion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestionEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl IngestionEvent {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.payload.type_name()
    }

    pub fn trace_id(&self) -> &str {
        self.payload.trace_id()
    }

    /// Mutable access to the free-form JSON fields of the body
    /// (input, output and metadata), used for sanitizing before delivery.
    pub fn json_fields_mut(&mut self) -> Vec<&mut Value> {
        let (input, output, metadata) = match &mut self.payload {
            EventPayload::TraceCreate(body) => {
                (&mut body.input, &mut body.output, &mut body.metadata)
            }
            EventPayload::SpanCreate(body)
            | EventPayload::SpanUpdate(body)
            | EventPayload::GenerationCreate(body)
            | EventPayload::GenerationUpdate(body)
            | EventPayload::EventCreate(body) => {
                (&mut body.input, &mut body.output, &mut body.metadata)
            }
            EventPayload::ScoreCreate(_) => return Vec::new(),
        };
        [input, output, metadata].into_iter().filter_map(Option::as_mut).collect()
    }

    /// Get a formatted string summary of the event
    pub fn printable_summary(&self) -> String {
        let time_str = self
            .timestamp
            .with_timezone(&Local)
            .format("%H:%M:%S%.3f")
            .to_string();

        let mut summary = format!(
            "[{}] {} (trace_id: {})",
            time_str,
            self.type_name(),
            self.trace_id()
        );

        match &self.payload {
            EventPayload::TraceCreate(body) => {
                if let Some(name) = &body.name {
                    summary.push_str(&format!("\n   Name: {}", name));
                }
                if let Some(user_id) = &body.user_id {
                    summary.push_str(&format!("\n   User: {}", user_id));
                }
                if let Some(session_id) = &body.session_id {
                    summary.push_str(&format!("\n   Session: {}", session_id));
                }
                if !body.tags.is_empty() {
                    summary.push_str(&format!("\n   Tags: {}", body.tags.join(", ")));
                }
            }
            EventPayload::ScoreCreate(body) => {
                summary.push_str(&format!("\n   Score: {} = {}", body.name, body.value));
                if let Some(comment) = &body.comment {
                    summary.push_str(&format!("\n   Comment: {}", comment));
                }
            }
            payload => {
                if let Some(body) = payload.observation() {
                    summary.push_str(&format!("\n   Observation: {}", body.id));
                    if let Some(name) = &body.name {
                        summary.push_str(&format!("\n   Name: {}", name));
                    }
                    if let Some(model) = &body.model {
                        summary.push_str(&format!("\n   Model: {}", model));
                    }
                    if let Some(usage) = &body.usage {
                        summary.push_str(&format!(
                            "\n   Usage: {} in / {} out",
                            usage.input.unwrap_or(0),
                            usage.output.unwrap_or(0)
                        ));
                    }
                    if let Some(level) = body.level.filter(|l| *l != ObservationLevel::Default) {
                        summary.push_str(&format!("\n   Level: {:?}", level));
                    }
                    if let Some(message) = &body.status_message {
                        summary.push_str(&format!("\n   Status: {}", message));
                    }
                }
            }
        }

        summary
    }
}

fn overlay<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
    if source.is_some() {
        target.clone_from(source);
    }
}
