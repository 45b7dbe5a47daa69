//! Anthropic Gateway for the Messages API.
//!
//! The request and response shapes here are shared with Anthropic models served
//! through Bedrock, see [`BedrockGateway`](super::BedrockGateway).

use crate::error::{LanternError, Result};
use crate::llm::gateway::{CompletionConfig, LlmGateway};
use crate::llm::gateways::ensure_success;
use crate::llm::models::{LlmGatewayResponse, LlmMessage, MessageRole, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const ANTHROPIC_API_VERSION: &str = "2023-06-01";

/// Configuration for connecting to the Anthropic API.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub timeout: Option<std::time::Duration>,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: SecretString::new(std::env::var("ANTHROPIC_API_KEY").unwrap_or_default()),
            base_url: std::env::var("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_ANTHROPIC_BASE_URL.to_string()),
            timeout: None,
        }
    }
}

/// Gateway for Anthropic's Claude models.
pub struct AnthropicGateway {
    client: Client,
    config: AnthropicConfig,
}

impl AnthropicGateway {
    pub fn new() -> Self {
        Self::with_config(AnthropicConfig::default())
    }

    pub fn with_config(config: AnthropicConfig) -> Self {
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

    pub fn with_api_key_and_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self::with_config(AnthropicConfig {
            api_key: SecretString::new(api_key.into()),
            base_url: base_url.into(),
            timeout: None,
        })
    }
}

impl Default for AnthropicGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmGateway for AnthropicGateway {
    fn provider(&self) -> &str {
        "anthropic"
    }

    async fn complete(
        &self,
        model: &str,
        messages: &[LlmMessage],
        config: &CompletionConfig,
    ) -> Result<LlmGatewayResponse> {
        info!("Delegating to Anthropic for completion");
        debug!("Model: {}, Message count: {}", model, messages.len());

        let mut body = messages_body(messages, config);
        body["model"] = json!(model);

        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", self.config.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .json(&body)
            .send()
            .await?;
        let response_body: Value = ensure_success("Anthropic", response).await?.json().await?;

        parse_message_response(model, &response_body)
    }
}

/// Messages API request body without the model field
///
/// System messages are lifted into the top-level `system` string.
pub(crate) fn messages_body(messages: &[LlmMessage], config: &CompletionConfig) -> Value {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == MessageRole::System)
        .map(|m| m.content.as_str())
        .collect();
    let conversation: Vec<Value> = messages
        .iter()
        .filter(|m| m.role != MessageRole::System)
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();

    let mut body = json!({
        "max_tokens": config.max_tokens,
        "temperature": config.temperature,
        "messages": conversation,
    });
    if !system.is_empty() {
        body["system"] = json!(system.join("\n\n"));
    }
    if let Some(top_p) = config.top_p {
        body["top_p"] = json!(top_p);
    }
    body
}

/// Normalize a Messages API response
pub(crate) fn parse_message_response(
    requested_model: &str,
    body: &Value,
) -> Result<LlmGatewayResponse> {
    let blocks = body["content"].as_array().ok_or_else(|| {
        LanternError::ApiError("Anthropic response contained no content".to_string())
    })?;
    let content: String = blocks
        .iter()
        .filter(|block| block["type"].as_str().map_or(true, |t| t == "text"))
        .filter_map(|block| block["text"].as_str())
        .collect();

    let usage = match (
        body["usage"]["input_tokens"].as_u64(),
        body["usage"]["output_tokens"].as_u64(),
    ) {
        (Some(input), Some(output)) => Some(TokenUsage::new(input, output)),
        _ => None,
    };

    Ok(LlmGatewayResponse {
        content,
        model: body["model"].as_str().unwrap_or(requested_model).to_string(),
        usage,
        finish_reason: body["stop_reason"].as_str().map(String::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_body_lifts_system_prompt() {
        let body = messages_body(
            &[
                LlmMessage::system("You are a research assistant"),
                LlmMessage::user("Explain qubits"),
            ],
            &CompletionConfig::default().with_max_tokens(1000),
        );

        assert_eq!(body["system"], "You are a research assistant");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["max_tokens"], 1000);
        assert!(body.get("top_p").is_none());
    }

    #[test]
    fn test_parse_message_response_joins_text_blocks() {
        let body = json!({
            "model": "claude-3-opus-20240229",
            "content": [{"type": "text", "text": "Hello, "}, {"type": "text", "text": "world"}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 12, "output_tokens": 4}
        });

        let response = parse_message_response("claude", &body).unwrap();

        assert_eq!(response.content, "Hello, world");
        assert_eq!(response.model, "claude-3-opus-20240229");
        assert_eq!(response.usage, Some(TokenUsage::new(12, 4)));
        assert_eq!(response.finish_reason.as_deref(), Some("end_turn"));
    }

    #[test]
    fn test_parse_message_response_without_content() {
        let result = parse_message_response("claude", &json!({"error": "overloaded"}));
        assert!(matches!(result, Err(LanternError::ApiError(_))));
    }

    #[tokio::test]
    async fn test_complete_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "sk-ant-test")
            .match_header("anthropic-version", ANTHROPIC_API_VERSION)
            .match_body(mockito::Matcher::Regex(r#""model":"claude-3-opus-20240229""#.to_string()))
            .with_status(200)
            .with_body(
                r#"{"model":"claude-3-opus-20240229","content":[{"type":"text","text":"Quantum computers use qubits."}],"stop_reason":"end_turn","usage":{"input_tokens":20,"output_tokens":6}}"#,
            )
            .create_async()
            .await;

        let gateway = AnthropicGateway::with_api_key_and_base_url("sk-ant-test", server.url());

        let response = gateway
            .complete(
                "claude-3-opus-20240229",
                &[LlmMessage::user("Summarize quantum computing")],
                &CompletionConfig::default(),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.content, "Quantum computers use qubits.");
        assert_eq!(response.usage.unwrap().total(), 26);
        assert_eq!(gateway.provider(), "anthropic");
    }

    #[tokio::test]
    async fn test_complete_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .with_status(529)
            .with_body(r#"{"type":"error","error":{"type":"overloaded_error"}}"#)
            .create_async()
            .await;

        let gateway = AnthropicGateway::with_api_key_and_base_url("sk-ant-test", server.url());

        let result = gateway
            .complete(
                "claude-3-opus-20240229",
                &[LlmMessage::user("Hi")],
                &CompletionConfig::default(),
            )
            .await;

        mock.assert_async().await;
        assert!(matches!(result, Err(LanternError::GatewayError(msg)) if msg.contains("529")));
    }
}
