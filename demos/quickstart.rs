//! Quickstart
//!
//! A three-step creative writing flow: write a story, summarize it, classify
//! the sentiment of the summary. Every step is a span with the OpenAI call
//! recorded as a generation inside it, and the trace gets a creativity score.
//!
//! Run with: cargo run --example quickstart

use anyhow::Result;
use lantern::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const MODEL: &str = "gpt-3.5-turbo";

#[derive(Serialize)]
struct FlowOutput {
    story: String,
    summary: String,
    sentiment: String,
}

async fn ask(
    gateway: &TracedGateway,
    ctx: &TraceContext,
    system: &str,
    user: String,
    config: CompletionConfig,
) -> lantern::Result<String> {
    let messages = [LlmMessage::system(system), LlmMessage::user(user)];
    Ok(gateway.complete(ctx, MODEL, &messages, &config).await?.content)
}

async fn generate_story(
    gateway: &TracedGateway,
    ctx: &TraceContext,
    topic: &str,
) -> lantern::Result<String> {
    ctx.observe("generate_story", topic, |ctx| async move {
        let config = CompletionConfig::default().with_max_tokens(150).with_temperature(0.7);
        ask(
            gateway,
            &ctx,
            "You are a creative storyteller.",
            format!("Write a short story about {}.", topic),
            config,
        )
        .await
    })
    .await
}

async fn generate_summary(
    gateway: &TracedGateway,
    ctx: &TraceContext,
    text: &str,
) -> lantern::Result<String> {
    ctx.observe("generate_summary", text, |ctx| async move {
        let config = CompletionConfig::default().with_max_tokens(50).with_temperature(0.3);
        ask(
            gateway,
            &ctx,
            "You are a helpful assistant that summarizes text.",
            format!("Summarize this in one sentence: {}", text),
            config,
        )
        .await
    })
    .await
}

async fn classify_sentiment(
    gateway: &TracedGateway,
    ctx: &TraceContext,
    text: &str,
) -> lantern::Result<String> {
    ctx.observe("classify_sentiment", text, |ctx| async move {
        let config = CompletionConfig::default().with_max_tokens(10).with_temperature(0.1);
        ask(
            gateway,
            &ctx,
            "Classify the sentiment as POSITIVE, NEGATIVE, or NEUTRAL.",
            text.to_string(),
            config,
        )
        .await
    })
    .await
}

async fn creative_writing_flow(
    gateway: &TracedGateway,
    ctx: &TraceContext,
) -> lantern::Result<FlowOutput> {
    ctx.observe("creative-writing-flow", "space exploration", |ctx| async move {
        let story = generate_story(gateway, &ctx, "space exploration").await?;
        println!("\nStory: {}", story);

        let summary = generate_summary(gateway, &ctx, &story).await?;
        println!("\nSummary: {}", summary);

        let sentiment = classify_sentiment(gateway, &ctx, &summary).await?;
        println!("\nSentiment: {}", sentiment);

        ctx.score_trace(
            Score::new("creativity", 0.95)
                .with_comment("This was a highly creative story about space"),
        );

        Ok::<_, lantern::LanternError>(FlowOutput {
            story,
            summary,
            sentiment,
        })
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
    let gateway = TracedGateway::new(Arc::new(OpenAIGateway::new()));

    let ctx = tracer.trace("creative-writing-flow");
    ctx.set_user_id("example-user-123");
    ctx.set_session_id("example-session-456");

    let result = creative_writing_flow(&gateway, &ctx).await;

    // short-lived process: deliver everything before exiting
    let stats = tracer.shutdown(Duration::from_secs(10)).await?;
    println!("\nSent {} events in {} batches", stats.events_sent, stats.batches_sent);

    result?;
    println!("\nProcess completed successfully!");
    Ok(())
}
