use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::llm::models::LlmGatewayResponse;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunType {
    Chain,
    Llm,
}

/// Identity and lineage of one chain or LLM run
#[derive(Clone, Debug)]
pub struct RunContext {
    pub run_id: Uuid,
    pub parent_run_id: Option<Uuid>,
    pub run_type: RunType,
    pub name: String,
    pub start_instant: Instant,
    pub metadata: BTreeMap<String, Value>,
}

impl RunContext {
    pub fn root(run_type: RunType, name: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            parent_run_id: None,
            run_type,
            name: name.into(),
            start_instant: Instant::now(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn child(&self, run_type: RunType, name: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            parent_run_id: Some(self.run_id),
            run_type,
            name: name.into(),
            start_instant: Instant::now(),
            metadata: self.metadata.clone(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.start_instant.elapsed().as_millis()
    }
}

/// Parameters of an LLM run, passed as the inputs of its start callback
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LlmInput {
    pub model: String,
    /// Rendered prompt, not the template
    pub prompt: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
}

#[async_trait]
pub trait CallbackHandler: Send + Sync {
    async fn on_start(&self, ctx: &RunContext, inputs: &Value);
    async fn on_end(&self, ctx: &RunContext, outputs: &Value, duration_ms: u128);
    async fn on_error(&self, ctx: &RunContext, error: &Value, duration_ms: u128);
    /// Called before `on_end` for LLM runs with the full provider response
    async fn on_llm_end(&self, _ctx: &RunContext, _response: &LlmGatewayResponse) {}
}

/// Fans each callback out to every registered handler in order
#[derive(Clone, Default)]
pub struct CallbackManager {
    handlers: Vec<Arc<dyn CallbackHandler>>,
}

impl std::fmt::Debug for CallbackManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackManager")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl CallbackManager {
    pub fn new(handlers: Vec<Arc<dyn CallbackHandler>>) -> Self {
        Self { handlers }
    }

    pub fn noop() -> Self {
        Self { handlers: vec![] }
    }

    pub fn is_noop(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn add_handler(&mut self, handler: Arc<dyn CallbackHandler>) {
        self.handlers.push(handler);
    }

    pub async fn on_start(&self, ctx: &RunContext, inputs: &Value) {
        for handler in &self.handlers {
            handler.on_start(ctx, inputs).await;
        }
    }

    pub async fn on_end(&self, ctx: &RunContext, outputs: &Value, duration_ms: u128) {
        for handler in &self.handlers {
            handler.on_end(ctx, outputs, duration_ms).await;
        }
    }

    pub async fn on_error(&self, ctx: &RunContext, error: &Value, duration_ms: u128) {
        for handler in &self.handlers {
            handler.on_error(ctx, error, duration_ms).await;
        }
    }

    pub async fn on_llm_end(&self, ctx: &RunContext, response: &LlmGatewayResponse) {
        for handler in &self.handlers {
            handler.on_llm_end(ctx, response).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingHandler {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CallbackHandler for RecordingHandler {
        async fn on_start(&self, ctx: &RunContext, _inputs: &Value) {
            self.calls.lock().unwrap().push(format!("start:{}", ctx.name));
        }

        async fn on_end(&self, ctx: &RunContext, _outputs: &Value, _duration_ms: u128) {
            self.calls.lock().unwrap().push(format!("end:{}", ctx.name));
        }

        async fn on_error(&self, ctx: &RunContext, _error: &Value, _duration_ms: u128) {
            self.calls.lock().unwrap().push(format!("error:{}", ctx.name));
        }
    }

    #[test]
    fn test_child_links_to_parent_and_inherits_metadata() {
        let root = RunContext::root(RunType::Chain, "summarize")
            .with_metadata("user_id", Value::from("user-456"));

        let child = root.child(RunType::Llm, "gpt-3.5-turbo");

        assert_eq!(root.parent_run_id, None);
        assert_eq!(child.parent_run_id, Some(root.run_id));
        assert_ne!(child.run_id, root.run_id);
        assert_eq!(child.run_type, RunType::Llm);
        assert_eq!(child.metadata["user_id"], "user-456");
    }

    #[tokio::test]
    async fn test_manager_fans_out_to_all_handlers() {
        let first = Arc::new(RecordingHandler::default());
        let second = Arc::new(RecordingHandler::default());
        let manager = CallbackManager::new(vec![first.clone(), second.clone()]);
        let ctx = RunContext::root(RunType::Chain, "qa");

        manager.on_start(&ctx, &Value::Null).await;
        manager.on_error(&ctx, &Value::from("boom"), 3).await;

        for handler in [first, second] {
            assert_eq!(*handler.calls.lock().unwrap(), vec!["start:qa", "error:qa"]);
        }
    }

    #[test]
    fn test_noop_manager() {
        let mut manager = CallbackManager::noop();
        assert!(manager.is_noop());

        manager.add_handler(Arc::new(RecordingHandler::default()));
        assert!(!manager.is_noop());
    }
}
