//! Prompt chains with run callbacks
//!
//! An [`LlmChain`] renders a [`PromptTemplate`], sends it through an
//! [`LlmBroker`](crate::llm::LlmBroker) and reports a chain run with a nested
//! LLM run to its [`CallbackManager`]. Register a [`TracingCallbackHandler`]
//! to record those runs as spans and generations of a trace.
//!
//! ```rust,ignore
//! let handler = Arc::new(TracingCallbackHandler::new(ctx.clone()));
//! let chain = LlmChain::new("summarize_text", PromptTemplate::new("Summarize: {text}"), broker)
//!     .with_callbacks(CallbackManager::new(vec![handler]));
//! let output = chain.invoke(&vars).await?;
//! ```

pub mod callbacks;
pub mod llm_chain;
pub mod prompt;
pub mod tracing_handler;

pub use callbacks::{CallbackHandler, CallbackManager, LlmInput, RunContext, RunType};
pub use llm_chain::{ChainOutput, LlmChain};
pub use prompt::PromptTemplate;
pub use tracing_handler::TracingCallbackHandler;
