//! OpenAI content workflow
//!
//! Processes one text through keyword extraction, summarization and sentiment
//! analysis inside a `content_workflow` trace, scoring the keyword quality and
//! the overall result. A second, standalone trace analyzes one more sentence.
//!
//! Run with: cargo run --example openai_workflow

use anyhow::Result;
use lantern::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const SAMPLE_TEXT: &str = "Artificial intelligence has transformed industries worldwide, enabling automation \
and insights previously unattainable. However, its rapid advancement raises important \
ethical considerations regarding privacy, bias, and the future of work. Responsible AI \
development requires careful governance and transparent practices to ensure benefits \
are widely shared while minimizing potential harms.";

type Sentiment = BTreeMap<String, f64>;

async fn extract_keywords(
    gateway: &TracedGateway,
    ctx: &TraceContext,
    text: &str,
) -> lantern::Result<Vec<String>> {
    ctx.observe("extract_keywords", text, |ctx| async move {
        let messages = [
            LlmMessage::system(
                "You are a keyword extraction assistant. Extract the 5 most important keywords from the text.",
            ),
            LlmMessage::user(text),
        ];
        let config = CompletionConfig::default().with_temperature(0.2);
        let response = gateway.complete(&ctx, "gpt-3.5-turbo", &messages, &config).await?;

        let keywords: Vec<String> = response
            .content
            .trim()
            .lines()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        let quality = if keywords.len() >= 5 { 0.9 } else { 0.5 };
        ctx.score_trace(Score::new("keyword_quality", quality));
        Ok::<_, lantern::LanternError>(keywords)
    })
    .await
}

async fn generate_summary(
    gateway: &TracedGateway,
    ctx: &TraceContext,
    text: &str,
    max_length: usize,
) -> lantern::Result<String> {
    let span = ctx.span("generate_summary");
    span.set_input(text);

    let messages = [
        LlmMessage::system(format!(
            "You are a summarization assistant. Summarize the following text in {} words or less.",
            max_length
        )),
        LlmMessage::user(text),
    ];
    let config = CompletionConfig::default().with_temperature(0.3);
    let response = match gateway
        .complete(span.context(), "gpt-3.5-turbo", &messages, &config)
        .await
    {
        Ok(response) => response,
        Err(err) => {
            span.fail(err.to_string());
            return Err(err);
        }
    };

    if let Some(usage) = response.usage {
        span.attach_metadata("prompt_tokens", usage.input_tokens);
        span.attach_metadata("completion_tokens", usage.output_tokens);
        span.attach_metadata("total_tokens", usage.total());
    }
    let summary = response.content.trim().to_string();
    span.end_with_output(&summary);
    Ok(summary)
}

fn parse_sentiment(content: &str) -> Sentiment {
    if let Ok(parsed) = serde_json::from_str::<Sentiment>(content) {
        return parsed;
    }

    let lower = content.to_lowercase();
    let (positive, neutral, negative) = if lower.contains("positive") {
        (0.7, 0.3, 0.0)
    } else if lower.contains("negative") {
        (0.0, 0.3, 0.7)
    } else {
        (0.0, 1.0, 0.0)
    };
    Sentiment::from([
        ("positive".to_string(), positive),
        ("neutral".to_string(), neutral),
        ("negative".to_string(), negative),
    ])
}

async fn analyze_sentiment(
    gateway: &TracedGateway,
    ctx: &TraceContext,
    text: &str,
) -> lantern::Result<Sentiment> {
    ctx.observe("analyze_sentiment", text, |ctx| async move {
        let messages = [
            LlmMessage::system(
                "You are a sentiment analysis assistant. Analyze the sentiment of the text and return a JSON \
                 with scores for positive, negative, and neutral sentiments. The scores should sum to 1.0.",
            ),
            LlmMessage::user(text),
        ];
        let config = CompletionConfig::default().with_temperature(0.0);
        let response = gateway.complete(&ctx, "gpt-4", &messages, &config).await?;
        Ok::<_, lantern::LanternError>(parse_sentiment(response.content.trim()))
    })
    .await
}

async fn process_content(
    gateway: &TracedGateway,
    tracer: &TracerSystem,
    text: &str,
    user_id: Option<&str>,
) -> lantern::Result<(Vec<String>, String, Sentiment)> {
    let ctx = tracer.trace("content_workflow");
    if let Some(user_id) = user_id {
        ctx.set_user_id(user_id);
    }
    ctx.add_tags(["content-processing", "production"]);

    ctx.observe("content_workflow", text, |ctx| async move {
        let keywords = extract_keywords(gateway, &ctx, text).await?;
        let summary = generate_summary(gateway, &ctx, text, 100).await?;
        let sentiment = analyze_sentiment(gateway, &ctx, text).await?;

        let score = sentiment.get("positive").copied().unwrap_or(0.0) * 0.7
            + sentiment.get("neutral").copied().unwrap_or(0.0) * 0.5;
        ctx.score_trace(Score::new("overall_quality", score));

        Ok::<_, lantern::LanternError>((keywords, summary, sentiment))
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

    let result = async {
        let (keywords, summary, sentiment) =
            process_content(&gateway, &tracer, SAMPLE_TEXT, Some("demo-user-123")).await?;

        println!("\n=== Content Processing Results ===");
        println!("Summary: {}", summary);
        println!("Keywords: {}", keywords.join(", "));
        println!("Sentiment: {:?}", sentiment);

        println!("\n=== Individual API Calls ===");
        let standalone = tracer.trace("analyze_sentiment");
        let sentiment = analyze_sentiment(
            &gateway,
            &standalone,
            "I really enjoyed this product. It exceeded my expectations!",
        )
        .await?;
        println!("Positive sentiment analysis: {:?}", sentiment);
        Ok::<(), lantern::LanternError>(())
    }
    .await;

    if let Err(err) = &result {
        eprintln!("Error during processing: {}", err);
    }

    tracer.shutdown(Duration::from_secs(10)).await?;
    println!("\nAll events sent to Langfuse.");
    Ok(result?)
}
