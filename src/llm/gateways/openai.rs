//! OpenAI Gateway for LLM interactions.
//!
//! This module provides a gateway for OpenAI's chat completions API.

use crate::error::{LanternError, Result};
use crate::llm::gateway::{CompletionConfig, LlmGateway};
use crate::llm::gateways::ensure_success;
use crate::llm::models::{LlmGatewayResponse, LlmMessage, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Configuration for connecting to OpenAI API.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub timeout: Option<std::time::Duration>,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: SecretString::new(std::env::var("OPENAI_API_KEY").unwrap_or_default()),
            base_url: std::env::var("OPENAI_API_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string()),
            timeout: None,
        }
    }
}

/// Gateway for OpenAI LLM service.
pub struct OpenAIGateway {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIGateway {
    /// Create a new OpenAI gateway with default configuration.
    pub fn new() -> Self {
        Self::with_config(OpenAIConfig::default())
    }

    /// Create a new OpenAI gateway with custom configuration.
    pub fn with_config(config: OpenAIConfig) -> Self {
        let mut client_builder = Client::builder();

        if let Some(timeout) = config.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        let client = client_builder.build().unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to default HTTP client");
            Client::new()
        });

        Self { client, config }
    }

    /// Create gateway with custom API key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self::with_config(OpenAIConfig {
            api_key: SecretString::new(api_key.into()),
            ..Default::default()
        })
    }

    /// Create gateway with custom API key and base URL.
    pub fn with_api_key_and_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self::with_config(OpenAIConfig {
            api_key: SecretString::new(api_key.into()),
            base_url: base_url.into(),
            timeout: None,
        })
    }

    fn request_body(model: &str, messages: &[LlmMessage], config: &CompletionConfig) -> Value {
        let mut body = json!({
            "model": model,
            "messages": messages,
            "temperature": config.temperature,
            "max_tokens": config.max_tokens,
        });
        if let Some(top_p) = config.top_p {
            body["top_p"] = json!(top_p);
        }
        body
    }
}

impl Default for OpenAIGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmGateway for OpenAIGateway {
    fn provider(&self) -> &str {
        "openai"
    }

    async fn complete(
        &self,
        model: &str,
        messages: &[LlmMessage],
        config: &CompletionConfig,
    ) -> Result<LlmGatewayResponse> {
        info!("Delegating to OpenAI for completion");
        debug!("Model: {}, Message count: {}", model, messages.len());

        let body = Self::request_body(model, messages, config);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;
        let response_body: Value = ensure_success("OpenAI", response).await?.json().await?;

        parse_chat_completion(model, &response_body)
    }
}

fn parse_chat_completion(requested_model: &str, body: &Value) -> Result<LlmGatewayResponse> {
    let choice = &body["choices"][0];
    if choice.is_null() {
        return Err(LanternError::ApiError(
            "OpenAI response contained no choices".to_string(),
        ));
    }

    let usage = match (
        body["usage"]["prompt_tokens"].as_u64(),
        body["usage"]["completion_tokens"].as_u64(),
    ) {
        (Some(input), Some(output)) => Some(TokenUsage::new(input, output)),
        _ => None,
    };

    Ok(LlmGatewayResponse {
        content: choice["message"]["content"].as_str().unwrap_or_default().to_string(),
        model: body["model"].as_str().unwrap_or(requested_model).to_string(),
        usage,
        finish_reason: choice["finish_reason"].as_str().map(String::from),
    })
}
