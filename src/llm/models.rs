use serde::{Deserialize, Serialize};

use crate::tracer::Usage;

/// Message role in LLM conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Message in LLM conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmMessage {
    #[serde(default = "default_role")]
    pub role: MessageRole,
    pub content: String,
}

fn default_role() -> MessageRole {
    MessageRole::User
}

impl LlmMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Token counts reported by a provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

impl From<TokenUsage> for Usage {
    fn from(usage: TokenUsage) -> Self {
        Usage::tokens(usage.input_tokens, usage.output_tokens)
    }
}

/// Provider-neutral completion result
#[derive(Debug, Clone, PartialEq)]
pub struct LlmGatewayResponse {
    pub content: String,
    /// Model id as reported by the provider
    pub model: String,
    pub usage: Option<TokenUsage>,
    pub finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_role_serialization() {
        assert_eq!(serde_json::to_string(&MessageRole::System).unwrap(), "\"system\"");
        assert_eq!(serde_json::to_string(&MessageRole::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&MessageRole::Assistant).unwrap(), "\"assistant\"");
    }

    #[test]
    fn test_message_role_deserialization() {
        assert_eq!(serde_json::from_str::<MessageRole>("\"system\"").unwrap(), MessageRole::System);
        assert_eq!(
            serde_json::from_str::<MessageRole>("\"assistant\"").unwrap(),
            MessageRole::Assistant
        );
    }

    #[test]
    fn test_message_constructors() {
        let msg = LlmMessage::user("Hello");
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.content, "Hello");

        assert_eq!(LlmMessage::system("Be brief").role, MessageRole::System);
        assert_eq!(LlmMessage::assistant("Sure").role, MessageRole::Assistant);
    }

    #[test]
    fn test_message_missing_role_defaults_to_user() {
        let msg: LlmMessage = serde_json::from_str(r#"{"content": "hi"}"#).unwrap();
        assert_eq!(msg.role, MessageRole::User);
    }

    #[test]
    fn test_token_usage_into_ingestion_usage() {
        let usage: Usage = TokenUsage::new(10, 25).into();
        assert_eq!(usage.total, Some(35));
        assert_eq!(usage.unit.as_deref(), Some("TOKENS"));
    }
}
