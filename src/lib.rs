//! Lantern: Langfuse-style tracing for LLM applications
//!
//! Traces, nested observations and scores are recorded through an explicit
//! [`TraceContext`](tracer::TraceContext) and shipped in batches to a Langfuse
//! compatible ingestion endpoint. Provider gateways for OpenAI, Anthropic and
//! AWS Bedrock can be wrapped so every completion becomes a generation, and the
//! [`chain`] layer reports prompt chains through callbacks.

pub mod chain;
pub mod config;
pub mod error;
pub mod llm;
pub mod tracer;

pub use config::LanternConfig;
pub use error::{LanternError, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::chain::{CallbackManager, LlmChain, PromptTemplate, TracingCallbackHandler};
    pub use crate::config::{load_env_file, LanternConfig};
    pub use crate::error::{LanternError, Result};
    pub use crate::llm::gateways::{AnthropicGateway, BedrockGateway, OpenAIGateway};
    pub use crate::llm::{
        CompletionConfig, LlmBroker, LlmGateway, LlmGatewayResponse, LlmMessage, MessageRole,
        TracedGateway,
    };
    pub use crate::tracer::{ActiveObservation, Score, TraceContext, TracerSystem};
}
