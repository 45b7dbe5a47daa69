//! AWS Bedrock Gateway using the `InvokeModel` runtime API.
//!
//! Requests authenticate with a Bedrock API key sent as a bearer token. The
//! body format depends on the model family: Anthropic models use the Messages
//! shape, Amazon Titan text models use `inputText` with a generation config.

use crate::error::{LanternError, Result};
use crate::llm::gateway::{CompletionConfig, LlmGateway};
use crate::llm::gateways::anthropic::{messages_body, parse_message_response};
use crate::llm::gateways::ensure_success;
use crate::llm::models::{LlmGatewayResponse, LlmMessage, MessageRole, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

pub const BEDROCK_ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
pub const DEFAULT_REGION: &str = "us-west-2";
const TITAN_DEFAULT_TOP_P: f32 = 0.9;

/// Request and response format of a Bedrock model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Anthropic,
    Titan,
}

impl ModelFamily {
    /// Detect the family from a model id, including cross-region ids like `us.anthropic.*`
    pub fn from_model_id(model_id: &str) -> Option<Self> {
        if model_id.contains("anthropic.") {
            Some(ModelFamily::Anthropic)
        } else if model_id.contains("amazon.titan-text") {
            Some(ModelFamily::Titan)
        } else {
            None
        }
    }
}

/// Configuration for connecting to Bedrock.
#[derive(Debug, Clone)]
pub struct BedrockConfig {
    pub api_key: SecretString,
    pub region: String,
    /// Overrides the regional runtime endpoint
    pub endpoint: Option<String>,
    pub timeout: Option<std::time::Duration>,
}

impl Default for BedrockConfig {
    fn default() -> Self {
        Self {
            api_key: SecretString::new(
                std::env::var("AWS_BEARER_TOKEN_BEDROCK").unwrap_or_default(),
            ),
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| DEFAULT_REGION.to_string()),
            endpoint: std::env::var("BEDROCK_ENDPOINT").ok(),
            timeout: None,
        }
    }
}

impl BedrockConfig {
    pub fn runtime_endpoint(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://bedrock-runtime.{}.amazonaws.com", self.region),
        }
    }
}

/// Gateway for models hosted on AWS Bedrock.
pub struct BedrockGateway {
    client: Client,
    config: BedrockConfig,
}

impl BedrockGateway {
    pub fn new() -> Self {
        Self::with_config(BedrockConfig::default())
    }

    pub fn with_config(config: BedrockConfig) -> Self {
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

    /// Gateway for a fixed endpoint, e.g. a VPC endpoint or a test server.
    pub fn with_api_key_and_endpoint(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self::with_config(BedrockConfig {
            api_key: SecretString::new(api_key.into()),
            region: DEFAULT_REGION.to_string(),
            endpoint: Some(endpoint.into()),
            timeout: None,
        })
    }

    fn invoke_url(&self, model: &str) -> String {
        format!(
            "{}/model/{}/invoke",
            self.config.runtime_endpoint(),
            urlencoding::encode(model)
        )
    }
}

impl Default for BedrockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmGateway for BedrockGateway {
    fn provider(&self) -> &str {
        "bedrock"
    }

    async fn complete(
        &self,
        model: &str,
        messages: &[LlmMessage],
        config: &CompletionConfig,
    ) -> Result<LlmGatewayResponse> {
        let family = ModelFamily::from_model_id(model).ok_or_else(|| {
            LanternError::GatewayError(format!("Unsupported Bedrock model: {}", model))
        })?;
        info!(family = ?family, "Delegating to Bedrock for completion");
        debug!("Model: {}, Message count: {}", model, messages.len());

        let body = match family {
            ModelFamily::Anthropic => anthropic_body(messages, config),
            ModelFamily::Titan => titan_body(messages, config),
        };

        let response = self
            .client
            .post(self.invoke_url(model))
            .bearer_auth(self.config.api_key.expose_secret())
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;
        let response_body: Value = ensure_success("Bedrock", response).await?.json().await?;

        match family {
            ModelFamily::Anthropic => parse_message_response(model, &response_body),
            ModelFamily::Titan => parse_titan_response(model, &response_body),
        }
    }
}

fn anthropic_body(messages: &[LlmMessage], config: &CompletionConfig) -> Value {
    let mut body = messages_body(messages, config);
    body["anthropic_version"] = json!(BEDROCK_ANTHROPIC_VERSION);
    body
}

fn titan_body(messages: &[LlmMessage], config: &CompletionConfig) -> Value {
    // Titan takes a single prompt; earlier turns are kept as a transcript
    let input_text = match messages {
        [only] => only.content.clone(),
        _ => messages
            .iter()
            .map(|m| match m.role {
                MessageRole::System => m.content.clone(),
                MessageRole::User => format!("User: {}", m.content),
                MessageRole::Assistant => format!("Bot: {}", m.content),
            })
            .collect::<Vec<_>>()
            .join("\n"),
    };

    json!({
        "inputText": input_text,
        "textGenerationConfig": {
            "maxTokenCount": config.max_tokens,
            "temperature": config.temperature,
            "topP": config.top_p.unwrap_or(TITAN_DEFAULT_TOP_P),
        }
    })
}

fn parse_titan_response(model: &str, body: &Value) -> Result<LlmGatewayResponse> {
    let result = &body["results"][0];
    let content = result["outputText"].as_str().ok_or_else(|| {
        LanternError::ApiError("Titan response contained no outputText".to_string())
    })?;

    let usage = match (body["inputTextTokenCount"].as_u64(), result["tokenCount"].as_u64()) {
        (Some(input), Some(output)) => Some(TokenUsage::new(input, output)),
        _ => None,
    };

    Ok(LlmGatewayResponse {
        content: content.trim().to_string(),
        model: model.to_string(),
        usage,
        finish_reason: result["completionReason"].as_str().map(String::from),
    })
}
