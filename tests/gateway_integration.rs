//! End-to-end integration tests for the gateway's public HTTP surface
//! (C8): the full axum app built by `ark_a2a_gateway::app::build`, served
//! over a real TCP listener and driven with `reqwest`, mirroring the
//! scenarios in SPEC_FULL §8.

use std::sync::Arc;
use std::time::Duration;

use ark_a2a_gateway::config::GatewayConfig;
use ark_a2a_gateway::registry::{
    Agent, AgentSpec, InMemoryRegistry, ObjectMeta, QueryResponse, QueryStatus, SharedRegistry,
};
use clap::Parser;

fn test_config() -> GatewayConfig {
    GatewayConfig::try_parse_from(["gw"]).unwrap()
}

fn agent(name: &str) -> Agent {
    Agent {
        metadata: ObjectMeta {
            name: name.to_string(),
            namespace: Some("default".to_string()),
            annotations: Default::default(),
            creation_timestamp: None,
        },
        spec: AgentSpec {
            description: Some("a test agent".to_string()),
        },
    }
}

/// Start the full gateway app on a random port, having already run one
/// reconcile so `/a2a/agent/...` and `/healthz` are live.
async fn start_gateway(registry: SharedRegistry) -> (String, tokio::task::JoinHandle<()>) {
    let (app, dynamic_router) = ark_a2a_gateway::app::build(&test_config(), registry);
    dynamic_router.reconcile().await.unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{addr}");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    (base_url, handle)
}

/// Simulate the external controller that advances a freshly created Query
/// to a terminal phase, by polling the in-memory registry for a new query
/// name under the given prefix.
fn drive_query_to_done(registry: Arc<InMemoryRegistry>, prefix: &'static str, content: &'static str) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let names = registry.query_names().await;
            if let Some(name) = names.into_iter().find(|n| n.starts_with(prefix)) {
                registry
                    .set_query_status(
                        &name,
                        QueryStatus {
                            phase: Some("done".to_string()),
                            message: None,
                            responses: vec![QueryResponse {
                                target: Some("foo".to_string()),
                                content: Some(content.to_string()),
                            }],
                        },
                    )
                    .await;
                return;
            }
        }
    });
}

#[tokio::test]
async fn a2a_agents_listing_reflects_mounted_agents() {
    let registry = Arc::new(InMemoryRegistry::new());
    registry.put_agent(agent("foo")).await;

    let (base_url, _handle) = start_gateway(registry).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{base_url}/a2a/agents"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let body: serde_json::Value = resp.json().await.unwrap();
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["name"], "foo");
    assert_eq!(entries[0]["host"], "localhost");
    assert_eq!(entries[0]["metadata"]["type"], "analytical");
}

#[tokio::test]
async fn a2a_agent_card_is_served_for_mounted_agent() {
    let registry = Arc::new(InMemoryRegistry::new());
    registry.put_agent(agent("foo")).await;

    let (base_url, _handle) = start_gateway(registry).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{base_url}/a2a/agent/foo/.well-known/agent.json"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let card: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(card["name"], "foo");
    assert_eq!(card["capabilities"]["streaming"], true);
}

#[tokio::test]
async fn unknown_agent_404s() {
    let registry = Arc::new(InMemoryRegistry::new());
    let (base_url, _handle) = start_gateway(registry).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{base_url}/a2a/agent/ghost/.well-known/agent.json"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn healthz_becomes_ready_after_start() {
    let registry = Arc::new(InMemoryRegistry::new());
    let (base_url, _handle) = start_gateway(registry).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base_url}/healthz")).send().await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["agents"], 0);
}

/// SPEC_FULL §8 scenario 1 — happy path, non-stream chat completion.
#[tokio::test]
async fn openai_non_streaming_chat_completion_happy_path() {
    let registry = Arc::new(InMemoryRegistry::new());
    registry.put_agent(agent("foo")).await;

    let (base_url, _handle) = start_gateway(registry.clone() as SharedRegistry).await;
    drive_query_to_done(registry, "openai-query-", "hello");

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{base_url}/openai/v1/chat/completions"))
        .json(&serde_json::json!({
            "model": "agent/foo",
            "messages": [{"role": "user", "content": "hi"}],
            "stream": false
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["object"], "chat.completion");
    assert_eq!(body["choices"][0]["message"]["content"], "hello");
    assert_eq!(body["choices"][0]["finish_reason"], "stop");
    assert_eq!(body["usage"]["prompt_tokens"], 1);
    assert_eq!(body["usage"]["completion_tokens"], 1);
    assert_eq!(body["usage"]["total_tokens"], 2);
    assert!(body["id"].as_str().unwrap().starts_with("openai-query-"));
}

/// SPEC_FULL §8 scenario 2 — streaming fallback when no streaming backend
/// is configured: exactly one content chunk followed by `[DONE]`.
#[tokio::test]
async fn openai_streaming_falls_back_to_single_chunk_when_no_backend_configured() {
    let registry = Arc::new(InMemoryRegistry::new());
    registry.put_agent(agent("foo")).await;

    let (base_url, _handle) = start_gateway(registry.clone() as SharedRegistry).await;
    drive_query_to_done(registry, "openai-query-", "hello");

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{base_url}/openai/v1/chat/completions"))
        .json(&serde_json::json!({
            "model": "agent/foo",
            "messages": [{"role": "user", "content": "hi"}],
            "stream": true
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "text/event-stream"
    );

    let body = resp.text().await.unwrap();
    let lines: Vec<&str> = body.split("\n\n").filter(|l| !l.is_empty()).collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("data: "));
    assert!(lines[0].contains("hello"));
    assert_eq!(lines[1], "data: [DONE]");
}

#[tokio::test]
async fn openai_models_enumerates_mounted_agent() {
    let registry = Arc::new(InMemoryRegistry::new());
    registry.put_agent(agent("foo")).await;

    let (base_url, _handle) = start_gateway(registry as SharedRegistry).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{base_url}/openai/v1/models"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["object"], "list");
    assert!(body["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|m| m["id"] == "agent/foo"));
}

/// SPEC_FULL §4.6 — malformed `metadata.ark` yields HTTP 400 with the
/// exact `invalid_ark_metadata` error envelope.
#[tokio::test]
async fn openai_chat_completion_rejects_malformed_ark_metadata() {
    let registry = Arc::new(InMemoryRegistry::new());
    registry.put_agent(agent("foo")).await;

    let (base_url, _handle) = start_gateway(registry as SharedRegistry).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base_url}/openai/v1/chat/completions"))
        .json(&serde_json::json!({
            "model": "agent/foo",
            "messages": [{"role": "user", "content": "hi"}],
            "stream": false,
            "metadata": {"ark": "{\"annotations\":\"not-a-map\"}"}
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "invalid_ark_metadata");
}
