use crate::error::Result;
use crate::llm::gateway::{CompletionConfig, LlmGateway};
use crate::llm::models::{LlmGatewayResponse, LlmMessage};
use std::sync::Arc;
use tracing::info;

/// Main interface for LLM interactions
///
/// Pairs a model name with a gateway. Pass a
/// [`BoundGateway`](crate::llm::BoundGateway) to have every call recorded.
#[derive(Clone)]
pub struct LlmBroker {
    model: String,
    gateway: Arc<dyn LlmGateway>,
}

impl LlmBroker {
    /// Create a new LLM broker
    pub fn new(model: impl Into<String>, gateway: Arc<dyn LlmGateway>) -> Self {
        Self {
            model: model.into(),
            gateway,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider(&self) -> &str {
        self.gateway.provider()
    }

    /// Generate text response from LLM
    pub async fn generate(
        &self,
        messages: &[LlmMessage],
        config: Option<CompletionConfig>,
    ) -> Result<String> {
        Ok(self.generate_response(messages, config).await?.content)
    }

    /// Generate a response including model, usage and finish reason
    pub async fn generate_response(
        &self,
        messages: &[LlmMessage],
        config: Option<CompletionConfig>,
    ) -> Result<LlmGatewayResponse> {
        let config = config.unwrap_or_default();
        info!(
            model = %self.model,
            provider = self.gateway.provider(),
            messages = messages.len(),
            "Requesting completion"
        );
        self.gateway.complete(&self.model, messages, &config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LanternError;
    use async_trait::async_trait;

    struct MockGateway {
        responses: Vec<LlmGatewayResponse>,
        call_count: std::sync::Mutex<usize>,
        last_config: std::sync::Mutex<Option<CompletionConfig>>,
    }

    impl MockGateway {
        fn new(responses: Vec<LlmGatewayResponse>) -> Self {
            Self {
                responses,
                call_count: std::sync::Mutex::new(0),
                last_config: std::sync::Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl LlmGateway for MockGateway {
        fn provider(&self) -> &str {
            "mock"
        }

        async fn complete(
            &self,
            _model: &str,
            _messages: &[LlmMessage],
            config: &CompletionConfig,
        ) -> Result<LlmGatewayResponse> {
            *self.last_config.lock().unwrap() = Some(config.clone());
            let mut count = self.call_count.lock().unwrap();
            let idx = *count;
            *count += 1;

            self.responses
                .get(idx)
                .cloned()
                .ok_or_else(|| LanternError::GatewayError("No more responses".to_string()))
        }
    }

    fn response(content: &str) -> LlmGatewayResponse {
        LlmGatewayResponse {
            content: content.to_string(),
            model: "test-model".to_string(),
            usage: None,
            finish_reason: None,
        }
    }

    #[tokio::test]
    async fn test_generate_simple_response() {
        let gateway = Arc::new(MockGateway::new(vec![response("Hello, world!")]));
        let broker = LlmBroker::new("test-model", gateway);

        let result = broker.generate(&[LlmMessage::user("Hi")], None).await;

        assert_eq!(result.unwrap(), "Hello, world!");
    }

    #[tokio::test]
    async fn test_generate_uses_default_config() {
        let gateway = Arc::new(MockGateway::new(vec![response("ok")]));
        let broker = LlmBroker::new("test-model", gateway.clone());

        broker.generate(&[LlmMessage::user("Hi")], None).await.unwrap();

        assert_eq!(*gateway.last_config.lock().unwrap(), Some(CompletionConfig::default()));
    }

    #[tokio::test]
    async fn test_generate_response_passes_config() {
        let gateway = Arc::new(MockGateway::new(vec![response("ok")]));
        let broker = LlmBroker::new("test-model", gateway.clone());
        let config = CompletionConfig::default().with_temperature(0.1);

        let result = broker
            .generate_response(&[LlmMessage::user("Hi")], Some(config.clone()))
            .await;

        assert_eq!(result.unwrap().model, "test-model");
        assert_eq!(*gateway.last_config.lock().unwrap(), Some(config));
    }

    #[tokio::test]
    async fn test_generate_propagates_gateway_error() {
        let gateway = Arc::new(MockGateway::new(vec![]));
        let broker = LlmBroker::new("test-model", gateway);

        let result = broker.generate(&[LlmMessage::user("Hi")], None).await;

        assert!(matches!(result, Err(LanternError::GatewayError(_))));
        assert_eq!(broker.provider(), "mock");
        assert_eq!(broker.model(), "test-model");
    }
}
