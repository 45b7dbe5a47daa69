//! Prompt chains traced through callbacks
//!
//! Three traces: a summarization chain, a question answering chain scored by
//! answer confidence, and a multi-step document workflow that runs two chains
//! and records the extraction as its own observation.
//!
//! Run with: cargo run --example chain_workflow

use anyhow::Result;
use lantern::prelude::*;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const MODEL: &str = "gpt-3.5-turbo";

const TEXT_TO_SUMMARIZE: &str = "Artificial intelligence (AI) is intelligence demonstrated by machines, as opposed to natural \
intelligence displayed by animals including humans. AI research has been defined as the field of study of intelligent \
agents, which refers to any system that perceives its environment and takes actions that maximize its chance of \
achieving its goals.";

const QA_CONTEXT: &str = "Langfuse is an open-source LLM engineering platform focused on tracing, evaluation, and monitoring.
It helps developers debug, analyze, and improve their LLM applications in production.
Langfuse was founded in 2023 and supports integrations with OpenAI, LangChain, LlamaIndex, and other popular LLM frameworks.";

const DOCUMENT: &str = "QUARTERLY REPORT
Q3 2023

Revenue: $10.2M (up 15% YoY)
Operating Expenses: $7.5M
Net Profit: $2.7M

Key Highlights:
- Launched new product line on September 15th
- Expanded to European market, opening office in Berlin
- Hired 25 new employees, bringing total headcount to 120
- Customer retention rate improved to 92% from 87% in previous quarter";

fn vars<const N: usize>(pairs: [(&str, &str); N]) -> HashMap<String, String> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn traced(ctx: &TraceContext) -> CallbackManager {
    CallbackManager::new(vec![Arc::new(TracingCallbackHandler::new(ctx.clone()))])
}

fn summarize_chain(broker: &LlmBroker) -> LlmChain {
    LlmChain::new(
        "summarize_text",
        PromptTemplate::new("Please summarize the following text in 2-3 sentences:\n\n{text}"),
        broker.clone(),
    )
    .with_config(CompletionConfig::default().with_temperature(0.7))
}

fn answer_confidence(answer: &str) -> f64 {
    if answer.contains("I don't know") || answer.contains("I'm not sure") {
        0.3
    } else if answer.contains("might be") || answer.contains("possibly") {
        0.7
    } else {
        0.9
    }
}

async fn summarize_text(
    tracer: &TracerSystem,
    broker: &LlmBroker,
    text: &str,
    user_id: &str,
) -> lantern::Result<String> {
    let ctx = tracer.trace("summarize_text");
    ctx.set_user_id(user_id);

    let output = summarize_chain(broker)
        .with_callbacks(traced(&ctx))
        .invoke(&vars([("text", text)]))
        .await?;
    Ok(output.text)
}

async fn answer_question(
    tracer: &TracerSystem,
    broker: &LlmBroker,
    question: &str,
    context: &str,
    user_id: &str,
) -> lantern::Result<String> {
    let ctx = tracer.trace("qa_chain");
    ctx.set_user_id(user_id);

    let chain = LlmChain::new(
        "qa_chain",
        PromptTemplate::new(
            "Given the following context, please answer the question accurately and concisely.\n\n\
             Context: {context}\n\nQuestion: {question}\n\nAnswer:",
        ),
        broker.clone(),
    )
    .with_config(CompletionConfig::default().with_temperature(0.3))
    .with_callbacks(traced(&ctx));

    let output = chain
        .invoke(&vars([("context", context), ("question", question)]))
        .await?;
    ctx.score_trace(Score::new("answer_confidence", answer_confidence(&output.text)));
    Ok(output.text)
}

async fn process_document(
    tracer: &TracerSystem,
    broker: &LlmBroker,
    document: &str,
    user_id: &str,
) -> lantern::Result<(String, String)> {
    let ctx = tracer.trace("multi_step_workflow");
    ctx.set_user_id(user_id);

    ctx.observe("multi_step_workflow", document, |ctx| async move {
        let callbacks = traced(&ctx);

        let summary = summarize_chain(broker)
            .with_callbacks(callbacks.clone())
            .invoke(&vars([("text", document)]))
            .await?
            .text;

        let extraction = LlmChain::new(
            "extract_information",
            PromptTemplate::new(
                "Extract the key entities, dates, and numerical values from this text. Format as a JSON.\n\n{document}",
            ),
            broker.clone(),
        )
        .with_config(CompletionConfig::default().with_temperature(0.3))
        .with_callbacks(callbacks)
        .invoke(&vars([("document", document)]))
        .await?
        .text;

        let observation = ctx.span("document_extraction");
        observation.set_input(json!({ "document": document }));
        observation.end_with_output(&extraction);

        Ok::<_, lantern::LanternError>((summary, extraction))
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
    let broker = LlmBroker::new(MODEL, Arc::new(OpenAIGateway::new()));

    let result = async {
        let summary = summarize_text(&tracer, &broker, TEXT_TO_SUMMARIZE, "user-456").await?;
        println!("Summarized text:\n{}\n", summary);

        let answer = answer_question(
            &tracer,
            &broker,
            "What is Langfuse and what integrations does it support?",
            QA_CONTEXT,
            "user-789",
        )
        .await?;
        println!("Answer to question:\n{}\n", answer);

        let (summary, extracted) = process_document(&tracer, &broker, DOCUMENT, "user-101").await?;
        println!("Document Summary:\n{}\n", summary);
        println!("Extracted Information:\n{}\n", extracted);
        Ok::<(), lantern::LanternError>(())
    }
    .await;

    tracer.shutdown(Duration::from_secs(10)).await?;
    result?;
    println!("All examples completed and traces sent to Langfuse.");
    Ok(())
}
