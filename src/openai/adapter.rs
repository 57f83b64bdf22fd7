//! OpenAI Adapter (C6) — `/chat/completions` and `/models`, wrapping the
//! same query lifecycle C4 drives, in chat-completion chunk semantics.
//!
//! Grounded on `original_source/.../ark_api/routes/openai.py`: model-string
//! parsing, `metadata.ark` merge, the streaming decision tree, and the
//! word-count token estimate are all translated line-for-line from there.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;

use crate::gateway_error::{GatewayError, GatewayResult};
use crate::query::{ChatCompletionOutcome, QueryDriver};
use crate::registry::{ObjectMeta, QueryInput, SharedRegistry};

use super::streaming_proxy;
use super::types::{
    ArkAnnotations, ArkMetadata, ChatCompletion, ChatCompletionChoice, ChatCompletionChunk,
    ChatCompletionRequest, ChatMessage, Model, ModelList, Usage,
};

/// Target types the gateway knows how to route a Query to (SPEC_FULL §4.6).
const KNOWN_TARGET_TYPES: [&str; 4] = ["agent", "team", "model", "tool"];

/// OpenAI-path query timeout — the full 60-attempt/5s-interval ceiling the
/// query driver polls against (SPEC_FULL §4.3).
const OPENAI_QUERY_TIMEOUT_SECS: u64 = 300;

pub struct OpenAiAdapter {
    registry: SharedRegistry,
    namespace: String,
    http_client: reqwest::Client,
}

impl OpenAiAdapter {
    pub fn new(registry: SharedRegistry, namespace: impl Into<String>) -> Self {
        Self {
            registry,
            namespace: namespace.into(),
            http_client: streaming_proxy::build_client(),
        }
    }

    async fn handle_chat_completion(&self, request: ChatCompletionRequest) -> GatewayResult<Response> {
        let (target_type, target_name) = parse_model(&request.model);
        let annotations = extract_ark_annotations(&request)?;
        let input = QueryInput::Messages(
            request
                .messages
                .iter()
                .map(|m| serde_json::json!({"role": m.role, "content": m.content}))
                .collect(),
        );

        let driver = QueryDriver::new(Arc::clone(&self.registry), self.namespace.clone());

        if !request.stream {
            let (query_name, outcome) = driver
                .post_query_and_wait_for_chat_completion(
                    &target_type,
                    &target_name,
                    input,
                    annotations.clone(),
                )
                .await?;
            return completion_response(query_name, &request, outcome, &annotations);
        }

        let mut streaming_annotations = annotations.clone();
        streaming_annotations.insert("streaming-enabled".to_string(), "true".to_string());

        let query_name = driver
            .post_query(
                "openai-query-",
                &target_type,
                &target_name,
                input,
                OPENAI_QUERY_TIMEOUT_SECS,
                streaming_annotations,
            )
            .await?;

        let streaming_config = self.registry.streaming_config().await?;
        match streaming_config.filter(|cfg| cfg.enabled).and_then(|cfg| cfg.base_url) {
            Some(base_url) => {
                Ok(streaming_proxy::proxy_stream(self.http_client.clone(), &base_url, &query_name).await)
            }
            None => {
                let outcome = driver.poll_for_chat_completion(&query_name).await?;
                fallback_stream_response(query_name, &request, outcome)
            }
        }
    }

    async fn handle_list_models(&self) -> GatewayResult<ModelList> {
        let agents = self.registry.list_agents().await?;
        let teams = self.registry.list_teams().await?;
        let models = self.registry.list_models().await?;
        let tools = self.registry.list_tools().await?;

        let mut data = Vec::with_capacity(agents.len() + teams.len() + models.len() + tools.len());
        data.extend(agents.iter().map(|a| to_model("agent", &a.metadata)));
        data.extend(teams.iter().map(|t| to_model("team", &t.metadata)));
        data.extend(models.iter().map(|m| to_model("model", &m.metadata)));
        data.extend(tools.iter().map(|t| to_model("tool", &t.metadata)));

        Ok(ModelList::new(data))
    }
}

/// Split `model` on `/` into `(target_type, target_name)`; an unrecognized
/// or absent prefix falls back to `("model", <raw>)` (SPEC_FULL §4.6).
fn parse_model(model: &str) -> (String, String) {
    match model.split_once('/') {
        Some((prefix, name)) if KNOWN_TARGET_TYPES.contains(&prefix) => {
            (prefix.to_string(), name.to_string())
        }
        _ => ("model".to_string(), model.to_string()),
    }
}

/// Parse `metadata.ark` (if present) into its annotation map (SPEC_FULL
/// §4.6). OpenAI's `metadata` carries string values only, so `ark` arrives
/// as a JSON-*encoded string* (not a nested object) — matching the ground
/// truth's `ArkOpenAICompletionsMetadata.model_validate_json(metadata["ark"])`.
/// Any other `metadata` key is ignored; a malformed `ark` value is the one
/// validation failure this adapter surfaces as HTTP 400.
fn extract_ark_annotations(request: &ChatCompletionRequest) -> GatewayResult<HashMap<String, String>> {
    let Some(metadata) = &request.metadata else {
        return Ok(HashMap::new());
    };
    let Some(ark_value) = metadata.get("ark") else {
        return Ok(HashMap::new());
    };

    let Some(ark_json) = ark_value.as_str() else {
        return Err(GatewayError::invalid_ark_metadata(
            "metadata.ark must be a JSON-encoded string",
        ));
    };

    let ark: ArkMetadata = serde_json::from_str(ark_json)
        .map_err(|err| GatewayError::invalid_ark_metadata(err.to_string()))?;
    Ok(ark.annotations)
}

fn completion_response(
    query_name: String,
    request: &ChatCompletionRequest,
    outcome: ChatCompletionOutcome,
    annotations: &HashMap<String, String>,
) -> GatewayResult<Response> {
    match outcome {
        ChatCompletionOutcome::Done(content) => {
            let prompt_tokens = count_words(request.messages.iter().map(|m| m.content.as_str()));
            let completion_tokens = count_words(std::iter::once(content.as_str()));
            let completion = ChatCompletion {
                id: query_name,
                object: "chat.completion".to_string(),
                created: Utc::now().timestamp(),
                model: request.model.clone(),
                choices: vec![ChatCompletionChoice {
                    index: 0,
                    message: ChatMessage {
                        role: "assistant".to_string(),
                        content,
                    },
                    finish_reason: "stop".to_string(),
                }],
                usage: Usage {
                    prompt_tokens,
                    completion_tokens,
                    total_tokens: prompt_tokens + completion_tokens,
                },
                ark: (!annotations.is_empty()).then(|| ArkAnnotations {
                    annotations: annotations.clone(),
                }),
            };
            Ok(Json(completion).into_response())
        }
        ChatCompletionOutcome::Error { message, errors } => {
            Err(GatewayError::UpstreamErrorPhase { message, errors })
        }
    }
}

/// Single-chunk-then-`[DONE]` fallback for when streaming is requested but
/// no streaming backend is configured (SPEC_FULL §4.6, §8 scenario 2).
fn fallback_stream_response(
    query_name: String,
    request: &ChatCompletionRequest,
    outcome: ChatCompletionOutcome,
) -> GatewayResult<Response> {
    match outcome {
        ChatCompletionOutcome::Done(content) => {
            let chunk = ChatCompletionChunk::full_content(
                query_name,
                request.model.clone(),
                Utc::now().timestamp(),
                content,
            );
            let body = serde_json::to_string(&chunk)
                .map(|json| format!("data: {json}\n\ndata: [DONE]\n\n"))
                .map_err(|err| GatewayError::Internal(err.to_string()))?;
            Ok(sse_response(body))
        }
        ChatCompletionOutcome::Error { message, errors } => {
            Err(GatewayError::UpstreamErrorPhase { message, errors })
        }
    }
}

fn sse_response(body: String) -> Response {
    axum::http::Response::builder()
        .status(axum::http::StatusCode::OK)
        .header(axum::http::header::CONTENT_TYPE, "text/event-stream")
        .header(axum::http::header::CACHE_CONTROL, "no-cache")
        .header(axum::http::header::CONNECTION, "keep-alive")
        .body(axum::body::Body::from(body))
        .expect("static SSE response headers are valid")
}

fn count_words<'a>(texts: impl Iterator<Item = &'a str>) -> u64 {
    texts.map(|t| t.split_whitespace().count() as u64).sum()
}

fn to_model(prefix: &str, metadata: &ObjectMeta) -> Model {
    let created = metadata
        .creation_timestamp
        .as_deref()
        .and_then(|ts| chrono::DateTime::parse_from_rfc3339(ts).ok())
        .map(|dt| dt.timestamp())
        .unwrap_or_else(|| Utc::now().timestamp());

    Model {
        id: format!("{prefix}/{}", metadata.name),
        object: "model".to_string(),
        created,
        owned_by: "ark".to_string(),
    }
}

async fn chat_completions(
    State(adapter): State<Arc<OpenAiAdapter>>,
    Json(request): Json<ChatCompletionRequest>,
) -> Response {
    match adapter.handle_chat_completion(request).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn list_models(State(adapter): State<Arc<OpenAiAdapter>>) -> Response {
    match adapter.handle_list_models().await {
        Ok(models) => Json(models).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Mount `/chat/completions` and `/models` (C8 nests this under
/// `/openai/v1`).
pub fn router(adapter: Arc<OpenAiAdapter>) -> Router {
    Router::new()
        .route("/chat/completions", post(chat_completions))
        .route("/models", get(list_models))
        .with_state(adapter)
}
