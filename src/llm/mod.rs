pub mod broker;
pub mod gateway;
pub mod gateways;
pub mod models;
pub mod traced;

pub use broker::LlmBroker;
pub use gateway::{CompletionConfig, LlmGateway};
pub use models::{LlmGatewayResponse, LlmMessage, MessageRole, TokenUsage};
pub use traced::{BoundGateway, TracedGateway};
