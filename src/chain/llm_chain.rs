use std::collections::HashMap;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::chain::callbacks::{CallbackManager, LlmInput, RunContext, RunType};
use crate::chain::prompt::PromptTemplate;
use crate::error::Result;
use crate::llm::gateway::CompletionConfig;
use crate::llm::models::{LlmMessage, TokenUsage};
use crate::llm::LlmBroker;

/// Result of one chain invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainOutput {
    pub text: String,
    pub model: String,
    pub usage: Option<TokenUsage>,
    pub finish_reason: Option<String>,
}

/// A prompt template bound to a broker
///
/// Every invocation reports a chain run with a nested LLM run to the
/// registered callbacks.
#[derive(Clone)]
pub struct LlmChain {
    name: String,
    prompt: PromptTemplate,
    broker: LlmBroker,
    config: Option<CompletionConfig>,
    system_prompt: Option<String>,
    callbacks: CallbackManager,
}

impl LlmChain {
    pub fn new(name: impl Into<String>, prompt: PromptTemplate, broker: LlmBroker) -> Self {
        Self {
            name: name.into(),
            prompt,
            broker,
            config: None,
            system_prompt: None,
            callbacks: CallbackManager::noop(),
        }
    }

    pub fn with_config(mut self, config: CompletionConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_callbacks(mut self, callbacks: CallbackManager) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prompt(&self) -> &PromptTemplate {
        &self.prompt
    }

    pub async fn invoke(&self, vars: &HashMap<String, String>) -> Result<ChainOutput> {
        self.invoke_run(RunContext::root(RunType::Chain, self.name.as_str()), vars)
            .await
    }

    /// Invoke as a child of another run, e.g. a step in a larger workflow
    pub async fn invoke_in(
        &self,
        parent: &RunContext,
        vars: &HashMap<String, String>,
    ) -> Result<ChainOutput> {
        self.invoke_run(parent.child(RunType::Chain, self.name.as_str()), vars)
            .await
    }

    async fn invoke_run(
        &self,
        run: RunContext,
        vars: &HashMap<String, String>,
    ) -> Result<ChainOutput> {
        self.callbacks.on_start(&run, &json!(vars)).await;

        let prompt = match self.prompt.format(vars) {
            Ok(prompt) => prompt,
            Err(err) => {
                warn!(chain = %self.name, error = %err, "Prompt formatting failed");
                self.callbacks
                    .on_error(&run, &Value::String(err.to_string()), run.elapsed_ms())
                    .await;
                return Err(err);
            }
        };

        let result = self.call_llm(&run, prompt).await;
        match &result {
            Ok(output) => {
                self.callbacks
                    .on_end(&run, &json!({ "text": output.text }), run.elapsed_ms())
                    .await;
            }
            Err(err) => {
                self.callbacks
                    .on_error(&run, &Value::String(err.to_string()), run.elapsed_ms())
                    .await;
            }
        }
        result
    }

    async fn call_llm(&self, parent: &RunContext, prompt: String) -> Result<ChainOutput> {
        let run = parent.child(RunType::Llm, self.broker.model());
        let config = self.config.clone().unwrap_or_default();
        let input = LlmInput {
            model: self.broker.model().to_string(),
            prompt: prompt.clone(),
            temperature: Some(config.temperature),
            max_tokens: Some(config.max_tokens),
        };
        self.callbacks
            .on_start(&run, &serde_json::to_value(&input)?)
            .await;

        let mut messages = Vec::with_capacity(2);
        if let Some(system_prompt) = &self.system_prompt {
            messages.push(LlmMessage::system(system_prompt.as_str()));
        }
        messages.push(LlmMessage::user(prompt));

        match self.broker.generate_response(&messages, Some(config)).await {
            Ok(response) => {
                debug!(chain = %self.name, model = %response.model, "LLM run completed");
                self.callbacks.on_llm_end(&run, &response).await;
                self.callbacks
                    .on_end(&run, &Value::String(response.content.clone()), run.elapsed_ms())
                    .await;
                Ok(ChainOutput {
                    text: response.content,
                    model: response.model,
                    usage: response.usage,
                    finish_reason: response.finish_reason,
                })
            }
            Err(err) => {
                self.callbacks
                    .on_error(&run, &Value::String(err.to_string()), run.elapsed_ms())
                    .await;
                Err(err)
            }
        }
    }
}
