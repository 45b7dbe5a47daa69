//! Callback handler that records chain runs as observations.
//!
//! Chain runs become spans and LLM runs become generations. A run whose parent
//! is still open is nested under the parent's observation, otherwise under the
//! context the handler was created with.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::chain::callbacks::{CallbackHandler, RunContext, RunType};
use crate::llm::models::LlmGatewayResponse;
use crate::tracer::{lock, ActiveObservation, ObservationType, TraceContext};

pub struct TracingCallbackHandler {
    ctx: TraceContext,
    runs: Mutex<HashMap<Uuid, ActiveObservation>>,
}

impl TracingCallbackHandler {
    pub fn new(ctx: TraceContext) -> Self {
        Self {
            ctx,
            runs: Mutex::new(HashMap::new()),
        }
    }

    pub fn trace_id(&self) -> &str {
        self.ctx.trace_id()
    }

    /// Runs started but not yet ended
    pub fn open_runs(&self) -> usize {
        lock(&self.runs).len()
    }

    fn parent_context(&self, ctx: &RunContext) -> TraceContext {
        ctx.parent_run_id
            .and_then(|parent| {
                lock(&self.runs)
                    .get(&parent)
                    .map(|observation| observation.context().clone())
            })
            .unwrap_or_else(|| self.ctx.clone())
    }

    fn take_run(&self, run_id: &Uuid) -> Option<ActiveObservation> {
        lock(&self.runs).remove(run_id)
    }
}

#[async_trait]
impl CallbackHandler for TracingCallbackHandler {
    async fn on_start(&self, ctx: &RunContext, inputs: &Value) {
        let parent = self.parent_context(ctx);
        let observation = match ctx.run_type {
            RunType::Chain => parent.span(ctx.name.as_str()),
            RunType::Llm => {
                let generation = parent.generation(ctx.name.as_str());
                if let Some(model) = inputs.get("model").and_then(Value::as_str) {
                    generation.set_model(model);
                }
                let mut parameters = serde_json::Map::new();
                for key in ["temperature", "max_tokens"] {
                    if let Some(value) = inputs.get(key).filter(|v| !v.is_null()) {
                        parameters.insert(key.to_string(), value.clone());
                    }
                }
                if !parameters.is_empty() {
                    generation.set_model_parameters(Value::Object(parameters));
                }
                generation
            }
        };

        observation.set_input(inputs);
        for (key, value) in &ctx.metadata {
            observation.attach_metadata(key.as_str(), value);
        }
        observation.attach_metadata("run_id", ctx.run_id.to_string());

        debug!(run = %ctx.run_id, observation = observation.id(), "Run started");
        lock(&self.runs).insert(ctx.run_id, observation);
    }

    async fn on_end(&self, ctx: &RunContext, outputs: &Value, duration_ms: u128) {
        if let Some(observation) = self.take_run(&ctx.run_id) {
            // generations keep the text recorded by on_llm_end
            if observation.kind() != ObservationType::Generation {
                observation.set_output(outputs);
            }
            observation.attach_metadata("duration_ms", duration_ms as u64);
            observation.end();
        }
    }

    async fn on_error(&self, ctx: &RunContext, error: &Value, duration_ms: u128) {
        if let Some(observation) = self.take_run(&ctx.run_id) {
            observation.attach_metadata("duration_ms", duration_ms as u64);
            let message = match error {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            observation.fail(message);
        }
    }

    async fn on_llm_end(&self, ctx: &RunContext, response: &LlmGatewayResponse) {
        if let Some(observation) = lock(&self.runs).get(&ctx.run_id) {
            observation.record_response(response);
        }
    }
}
