use crate::error::Result;
use crate::llm::models::{LlmGatewayResponse, LlmMessage};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

/// Configuration for LLM completion
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionConfig {
    pub temperature: f32,
    pub max_tokens: usize,
    pub top_p: Option<f32>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1024,
            top_p: None,
        }
    }
}

impl CompletionConfig {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Parameters as recorded on a generation
    pub fn to_model_parameters(&self) -> Value {
        let mut params = Map::new();
        params.insert("temperature".to_string(), json!(self.temperature));
        params.insert("max_tokens".to_string(), json!(self.max_tokens));
        if let Some(top_p) = self.top_p {
            params.insert("top_p".to_string(), json!(top_p));
        }
        Value::Object(params)
    }
}

/// Abstract interface for LLM providers
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Provider name recorded on generations, e.g. `"openai"`
    fn provider(&self) -> &str;

    /// Complete an LLM request with text response
    async fn complete(
        &self,
        model: &str,
        messages: &[LlmMessage],
        config: &CompletionConfig,
    ) -> Result<LlmGatewayResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_config_default() {
        let config = CompletionConfig::default();

        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.top_p, None);
    }

    #[test]
    fn test_completion_config_builders() {
        let config = CompletionConfig::default().with_temperature(0.2).with_max_tokens(300);

        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.max_tokens, 300);
    }

    #[test]
    fn test_model_parameters() {
        let config = CompletionConfig {
            temperature: 0.5,
            max_tokens: 500,
            top_p: Some(0.9),
        };

        let params = config.to_model_parameters();

        assert_eq!(params["temperature"], 0.5);
        assert_eq!(params["max_tokens"], 500);
        assert!((params["top_p"].as_f64().unwrap() - 0.9).abs() < 1e-6);
        assert!(CompletionConfig::default().to_model_parameters().get("top_p").is_none());
    }
}
