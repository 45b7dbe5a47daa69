//! Anthropic research assistant
//!
//! Records Claude calls by hand instead of through `TracedGateway`: each call
//! opens a generation, sets model and parameters, and copies token usage onto
//! the observation once the response arrives.
//!
//! Run with: cargo run --example anthropic_research

use anyhow::Result;
use lantern::prelude::*;
use lantern::tracer::Usage;
use serde_json::json;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const MODEL: &str = "claude-3-opus-20240229";

const RESEARCH_PROMPT: &str = "Write a comprehensive research summary on quantum computing, including:
1. Basic principles
2. Current state of the technology
3. Major challenges
4. Potential applications
5. Future outlook

Make it accessible to someone with a basic understanding of physics.";

fn excerpt(text: &str, chars: usize) -> String {
    let head: String = text.chars().take(chars).collect();
    format!("{}...", head)
}

async fn generate_with_claude(
    gateway: &AnthropicGateway,
    ctx: &TraceContext,
    prompt: &str,
) -> lantern::Result<String> {
    let config = CompletionConfig::default().with_max_tokens(1000).with_temperature(0.7);

    let generation = ctx.generation("anthropic-completion");
    generation.set_input(prompt);
    generation.set_model(MODEL);
    generation.set_model_parameters(json!({
        "max_tokens": config.max_tokens,
        "temperature": config.temperature,
    }));

    let response = match gateway.complete(MODEL, &[LlmMessage::user(prompt)], &config).await {
        Ok(response) => response,
        Err(err) => {
            generation.fail(err.to_string());
            return Err(err);
        }
    };

    if let Some(usage) = response.usage {
        generation.context().update_current_observation(|observation| {
            observation.usage = Some(Usage::tokens(usage.input_tokens, usage.output_tokens));
        });
    }
    generation.end_with_output(&response.content);
    Ok(response.content)
}

async fn research_assistant(gateway: &AnthropicGateway, ctx: &TraceContext) -> lantern::Result<()> {
    ctx.observe("research-assistant", RESEARCH_PROMPT, |ctx| async move {
        let research_summary = generate_with_claude(gateway, &ctx, RESEARCH_PROMPT).await?;
        println!("\nResearch Summary (excerpt): {}", excerpt(&research_summary, 300));

        let follow_up = format!(
            "Based on the following research summary on quantum computing,\n\
             what are the 3 most promising near-term applications?\n\n{}",
            research_summary
        );
        let applications = generate_with_claude(gateway, &ctx, &follow_up).await?;
        println!("\nPromising Applications (excerpt): {}", excerpt(&applications, 300));

        ctx.score_trace(
            Score::new("comprehensiveness", 0.9)
                .with_comment("Provided detailed information on quantum computing"),
        );

        Ok::<_, lantern::LanternError>(json!({
            "research_summary": research_summary,
            "applications": applications,
        }))
    })
    .await
    .map(|_| ())
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let tracer = TracerSystem::new(LanternConfig::from_env()?)?;
    let gateway = AnthropicGateway::new();

    let ctx = tracer.trace("research-assistant");
    ctx.set_user_id("anthropic-user-456");
    ctx.set_session_id("research-session-123");
    ctx.add_tags(["anthropic", "research"]);

    let result = research_assistant(&gateway, &ctx).await;
    tracer.shutdown(Duration::from_secs(10)).await?;

    result?;
    println!("\nProcess completed successfully!");
    Ok(())
}
