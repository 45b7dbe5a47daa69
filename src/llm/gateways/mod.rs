pub mod anthropic;
pub mod bedrock;
pub mod openai;

pub use anthropic::{AnthropicConfig, AnthropicGateway};
pub use bedrock::{BedrockConfig, BedrockGateway};
pub use openai::{OpenAIConfig, OpenAIGateway};

use crate::error::{LanternError, Result};
use reqwest::Response;

/// Turn a non-success provider response into a [`LanternError::GatewayError`]
pub(crate) async fn ensure_success(provider: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response.text().await.unwrap_or_default();
    Err(LanternError::GatewayError(format!(
        "{} API error: {} - {}",
        provider, status, error_text
    )))
}
