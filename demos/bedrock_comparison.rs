//! Bedrock model comparison
//!
//! Sends the same prompt to Claude and Titan on AWS Bedrock concurrently. Each
//! call is a generation under one root span; a model that answers gets a
//! clarity score, a model that fails is recorded as an error without stopping
//! the other.
//!
//! Run with: cargo run --example bedrock_comparison

use anyhow::Result;
use futures::future::join_all;
use lantern::prelude::*;
use serde_json::json;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const PROMPT: &str = "Explain the concept of quantum entanglement in simple terms.";

struct Contender {
    label: &'static str,
    generation: &'static str,
    model: &'static str,
    model_type: &'static str,
    config: CompletionConfig,
    clarity: f64,
    comment: &'static str,
}

fn contenders() -> Vec<Contender> {
    vec![
        Contender {
            label: "Claude",
            generation: "bedrock-claude-completion",
            model: "anthropic.claude-3-sonnet-20240229-v1:0",
            model_type: "anthropic",
            config: CompletionConfig::default().with_max_tokens(500).with_temperature(0.5),
            clarity: 0.85,
            comment: "Clear explanation from Claude",
        },
        Contender {
            label: "Titan",
            generation: "bedrock-titan-completion",
            model: "amazon.titan-text-express-v1",
            model_type: "amazon",
            config: CompletionConfig {
                top_p: Some(0.9),
                ..CompletionConfig::default().with_max_tokens(500).with_temperature(0.7)
            },
            clarity: 0.80,
            comment: "Good explanation from Titan",
        },
    ]
}

async fn generate(
    gateway: &BedrockGateway,
    ctx: &TraceContext,
    contender: &Contender,
) -> lantern::Result<String> {
    let generation = ctx.generation(contender.generation);
    generation.set_input(PROMPT);
    generation.set_model(contender.model);
    generation.set_model_parameters(contender.config.to_model_parameters());
    generation.attach_metadata("model_type", contender.model_type);

    match gateway
        .complete(contender.model, &[LlmMessage::user(PROMPT)], &contender.config)
        .await
    {
        Ok(response) => {
            generation.record_response(&response);
            generation.context().score_current_observation(
                Score::new("clarity", contender.clarity).with_comment(contender.comment),
            );
            generation.end();
            Ok(response.content)
        }
        Err(err) => {
            generation.fail(err.to_string());
            Err(err)
        }
    }
}

async fn compare_models(
    gateway: &BedrockGateway,
    ctx: &TraceContext,
) -> lantern::Result<serde_json::Value> {
    ctx.observe("bedrock-model-comparison", PROMPT, |ctx| async move {
        let contenders = contenders();
        let results = join_all(contenders.iter().map(|c| generate(gateway, &ctx, c))).await;

        let mut responses = serde_json::Map::new();
        for (contender, result) in contenders.iter().zip(results) {
            let text = match result {
                Ok(text) => {
                    let head: String = text.chars().take(200).collect();
                    println!("\n{} Response (excerpt): {}...", contender.label, head);
                    text
                }
                Err(err) => {
                    println!("Error with {}: {}", contender.label, err);
                    format!("Error: {}", err)
                }
            };
            responses.insert(format!("{}_response", contender.label.to_lowercase()), json!(text));
        }
        Ok::<_, lantern::LanternError>(serde_json::Value::Object(responses))
    })
    .await
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let tracer = TracerSystem::new(LanternConfig::from_env()?)?;
    let gateway = BedrockGateway::new();

    let ctx = tracer.trace("bedrock-model-comparison");
    ctx.set_user_id("bedrock-user-789");
    ctx.set_session_id("model-comparison-123");
    ctx.add_tags(["bedrock", "comparison"]);

    let result = compare_models(&gateway, &ctx).await;
    tracer.shutdown(Duration::from_secs(10)).await?;

    result?;
    println!("\nProcess completed successfully!");
    Ok(())
}
