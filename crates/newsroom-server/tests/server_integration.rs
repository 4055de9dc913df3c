//! End-to-end tests over a real socket.

mod common;

use anyhow::Result;
use futures::StreamExt;
use newsroom_llm::{CompletionResponse, ContentBlock, StopReason, Usage};
use serde_json::{Value, json};

use common::TestServer;

fn text(text: &str) -> CompletionResponse {
    CompletionResponse::new(
        "msg",
        "gpt-4o",
        vec![ContentBlock::text(text)],
        StopReason::EndTurn,
        Usage::new(10, 20),
    )
}

fn retrieve(query: &str, entities: Value) -> CompletionResponse {
    CompletionResponse::new(
        "msg",
        "gpt-4o",
        vec![ContentBlock::tool_use(
            "call_1",
            "news_retriever",
            json!({"query": query, "entities": entities}),
        )],
        StopReason::ToolUse,
        Usage::new(10, 20),
    )
}

#[tokio::test]
async fn test_health_is_public() -> Result<()> {
    let server = TestServer::start_with_responses(vec![]).await?;
    let resp = server
        .client
        .get(format!("{}/api/health", server.base_url()))
        .send()
        .await?;
    assert!(resp.status().is_success());
    let body: Value = resp.json().await?;
    assert_eq!(body["status"], "healthy");
    Ok(())
}

#[tokio::test]
async fn test_missing_credentials_get_challenge() -> Result<()> {
    let server = TestServer::start_with_responses(vec![]).await?;
    let resp = server
        .client
        .get(format!("{}/api/threads", server.base_url()))
        .send()
        .await?;
    assert_eq!(resp.status(), 401);
    assert_eq!(resp.headers()["www-authenticate"], "Basic");
    Ok(())
}

#[tokio::test]
async fn test_chat_round_trip_is_recorded() -> Result<()> {
    let server = TestServer::start_with_responses(vec![
        retrieve("chip shortage", json!(["NVDA"])),
        text("Supply is tight; Nvidia is up."),
    ])
    .await?;

    let resp = server
        .post("/api/chat")
        .json(&json!({
            "messages": [{"role": "user", "content": "How is the chip shortage hitting Nvidia?"}],
            "model": "gpt-4o"
        }))
        .send()
        .await?;
    assert!(resp.status().is_success());
    let body: Value = resp.json().await?;

    assert_eq!(body["news"].as_array().unwrap().len(), 2);
    let last = body["messages"].as_array().unwrap().last().unwrap().clone();
    assert_eq!(last["role"], "assistant");
    assert_eq!(last["content"], "Supply is tight; Nvidia is up.");

    let thread_id = body["thread_id"].as_str().unwrap();
    let steps: Value = server
        .get(&format!("/api/threads/{thread_id}/steps"))
        .send()
        .await?
        .json()
        .await?;
    let types: Vec<&str> = steps
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["type"].as_str().unwrap())
        .collect();
    assert_eq!(types, vec!["user_message", "tool", "assistant_message"]);
    assert_eq!(
        steps[1]["metadata"]["news"].as_array().unwrap().len(),
        2
    );
    Ok(())
}

#[tokio::test]
async fn test_streaming_chat_lines() -> Result<()> {
    let server = TestServer::start_with_responses(vec![
        retrieve("markets", json!([])),
        text("Markets are calm today."),
    ])
    .await?;

    let resp = server
        .post("/api/chat")
        .json(&json!({
            "messages": [{"role": "user", "content": "Anything in the markets?"}],
            "stream": true
        }))
        .send()
        .await?;
    assert!(resp.status().is_success());
    assert_eq!(resp.headers()["content-type"], "application/x-ndjson");

    let mut raw = Vec::new();
    let mut body = resp.bytes_stream();
    while let Some(chunk) = body.next().await {
        raw.extend_from_slice(&chunk?);
    }
    let lines: Vec<Value> = String::from_utf8(raw)?
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;

    // No entities: only the general search ran.
    assert_eq!(lines[0]["news"].as_array().unwrap().len(), 1);
    let answer: String = lines[1..]
        .iter()
        .filter_map(|l| l["chunk"].as_str())
        .collect();
    assert_eq!(answer, "Markets are calm today.");

    let threads = server.store.list_threads(0, 10)?;
    assert_eq!(threads.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_unknown_thread_is_404() -> Result<()> {
    let server = TestServer::start_with_responses(vec![]).await?;
    let resp = server
        .get(&format!("/api/threads/{}", uuid::Uuid::new_v4()))
        .send()
        .await?;
    assert_eq!(resp.status(), 404);
    Ok(())
}
