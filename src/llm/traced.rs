//! Automatic capture of provider calls as generations.
//!
//! [`TracedGateway`] wraps any [`LlmGateway`] and records every completion as a
//! generation under a [`TraceContext`]: model, parameters, messages, output,
//! usage and finish reason. [`TracedGateway::bind`] fixes the context so the
//! result can be handed to code that only knows the plain gateway trait.

use crate::error::Result;
use crate::llm::gateway::{CompletionConfig, LlmGateway};
use crate::llm::models::{LlmGatewayResponse, LlmMessage};
use crate::tracer::TraceContext;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct TracedGateway {
    inner: Arc<dyn LlmGateway>,
    generation_name: String,
}

impl TracedGateway {
    /// Wrap a gateway; generations are named `{provider}-completion`
    pub fn new(inner: Arc<dyn LlmGateway>) -> Self {
        let generation_name = format!("{}-completion", inner.provider());
        Self {
            inner,
            generation_name,
        }
    }

    pub fn with_generation_name(mut self, name: impl Into<String>) -> Self {
        self.generation_name = name.into();
        self
    }

    pub fn provider(&self) -> &str {
        self.inner.provider()
    }

    /// Run one completion inside a generation nested under `ctx`
    ///
    /// Provider errors are recorded on the generation and returned unchanged.
    pub async fn complete(
        &self,
        ctx: &TraceContext,
        model: &str,
        messages: &[LlmMessage],
        config: &CompletionConfig,
    ) -> Result<LlmGatewayResponse> {
        let generation = ctx.generation(self.generation_name.as_str());
        generation.set_input(messages);
        generation.set_model(model);
        generation.set_model_parameters(config.to_model_parameters());
        generation.attach_metadata("provider", self.inner.provider());

        match self.inner.complete(model, messages, config).await {
            Ok(response) => {
                debug!(
                    generation = generation.id(),
                    model = %response.model,
                    "Recorded completion"
                );
                generation.record_response(&response);
                generation.end();
                Ok(response)
            }
            Err(err) => {
                generation.fail(err.to_string());
                Err(err)
            }
        }
    }

    /// Gateway that records under `ctx` on every call
    pub fn bind(&self, ctx: &TraceContext) -> BoundGateway {
        BoundGateway {
            gateway: self.clone(),
            ctx: ctx.clone(),
        }
    }
}

/// A [`TracedGateway`] tied to one trace context
pub struct BoundGateway {
    gateway: TracedGateway,
    ctx: TraceContext,
}

#[async_trait]
impl LlmGateway for BoundGateway {
    fn provider(&self) -> &str {
        self.gateway.provider()
    }

    async fn complete(
        &self,
        model: &str,
        messages: &[LlmMessage],
        config: &CompletionConfig,
    ) -> Result<LlmGatewayResponse> {
        self.gateway.complete(&self.ctx, model, messages, config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LanternConfig;
    use crate::error::LanternError;
    use crate::llm::models::TokenUsage;
    use crate::llm::LlmBroker;
    use crate::tracer::{ObservationLevel, TracerSystem};
    use std::time::Duration;

    struct MockGateway {
        fail: bool,
    }

    #[async_trait]
    impl LlmGateway for MockGateway {
        fn provider(&self) -> &str {
            "mock"
        }

        async fn complete(
            &self,
            model: &str,
            _messages: &[LlmMessage],
            _config: &CompletionConfig,
        ) -> Result<LlmGatewayResponse> {
            if self.fail {
                return Err(LanternError::GatewayError("quota exceeded".to_string()));
            }
            Ok(LlmGatewayResponse {
                content: "A short story".to_string(),
                model: format!("{}-0125", model),
                usage: Some(TokenUsage::new(10, 5)),
                finish_reason: Some("stop".to_string()),
            })
        }
    }

    fn tracer() -> (TracerSystem, Arc<crate::tracer::EventStore>) {
        let mut config = LanternConfig::new("pk", "sk");
        config.flush_interval = Duration::ZERO;
        TracerSystem::in_memory(config)
    }

    #[tokio::test]
    async fn test_complete_records_generation() {
        let (tracer, store) = tracer();
        let ctx = tracer.trace("openai-flow");
        let gateway = TracedGateway::new(Arc::new(MockGateway { fail: false }));
        let config = CompletionConfig::default().with_max_tokens(200);

        let response = gateway
            .complete(&ctx, "gpt-3.5-turbo", &[LlmMessage::user("Tell a story")], &config)
            .await
            .unwrap();
        tracer.flush(Duration::from_secs(1)).await.unwrap();

        assert_eq!(response.content, "A short story");
        assert_eq!(store.count_of_type("generation-create"), 1);
        let generation = &store.observations(ctx.trace_id())[0];
        assert_eq!(generation.name.as_deref(), Some("mock-completion"));
        assert_eq!(generation.model.as_deref(), Some("gpt-3.5-turbo-0125"));
        assert_eq!(generation.model_parameters.as_ref().unwrap()["max_tokens"], 200);
        assert_eq!(generation.input.as_ref().unwrap()[0]["content"], "Tell a story");
        assert_eq!(generation.usage.as_ref().unwrap().total, Some(15));
        assert_eq!(generation.metadata_map()["provider"], "mock");
    }

    #[tokio::test]
    async fn test_complete_failure_recorded_and_propagated() {
        let (tracer, store) = tracer();
        let ctx = tracer.trace("failing-flow");
        let gateway = TracedGateway::new(Arc::new(MockGateway { fail: true }))
            .with_generation_name("story-generation");

        let result = gateway
            .complete(&ctx, "gpt-4", &[LlmMessage::user("Hi")], &CompletionConfig::default())
            .await;
        tracer.flush(Duration::from_secs(1)).await.unwrap();

        assert!(matches!(result, Err(LanternError::GatewayError(_))));
        let generation = &store.observations(ctx.trace_id())[0];
        assert_eq!(generation.name.as_deref(), Some("story-generation"));
        assert_eq!(generation.level, Some(ObservationLevel::Error));
        assert!(generation.status_message.as_ref().unwrap().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_bound_gateway_nests_under_current_span() {
        let (tracer, store) = tracer();
        let ctx = tracer.trace("bound");
        let span = ctx.span("summarize");
        let gateway = TracedGateway::new(Arc::new(MockGateway { fail: false }));
        let broker = LlmBroker::new("gpt-4", Arc::new(gateway.bind(span.context())));

        let text = broker.generate(&[LlmMessage::user("Summarize")], None).await.unwrap();
        let span_id = span.id().to_string();
        span.end();
        tracer.flush(Duration::from_secs(1)).await.unwrap();

        assert_eq!(text, "A short story");
        let generation = store
            .observations(ctx.trace_id())
            .into_iter()
            .find(|o| o.name.as_deref() == Some("mock-completion"))
            .unwrap();
        assert_eq!(generation.parent_observation_id.as_deref(), Some(span_id.as_str()));
    }
}
