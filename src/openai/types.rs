//! Wire types for the OpenAI-compatible surface (SPEC_FULL §4.6, §6).
//!
//! Grounded on `original_source/.../ark_api/routes/openai.py` and its
//! Pydantic models; expressed as plain `serde` structs in the style of
//! `src/types.rs`'s A2A wire types (explicit field names, `camelCase`-free
//! snake_case since the OpenAI wire format is already snake_case).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One message in an inbound chat-completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// `POST /chat/completions` request body (SPEC_FULL §4.6).
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub stream: bool,
    pub metadata: Option<serde_json::Value>,
}

fn default_temperature() -> f64 {
    1.0
}

/// `metadata.ark` shape (SPEC_FULL §4.6): the only metadata key the gateway
/// interprets; everything else in `metadata` is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArkMetadata {
    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionChoice {
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: String,
}

/// The nested `ark` object a `ChatCompletion` response echoes back, mirroring
/// `ArkOpenAICompletionsMetadata`'s own shape rather than flattening it.
#[derive(Debug, Clone, Serialize)]
pub struct ArkAnnotations {
    pub annotations: HashMap<String, String>,
}

/// Non-streaming `ChatCompletion` response (SPEC_FULL §4.6).
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletion {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatCompletionChoice>,
    pub usage: Usage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ark: Option<ArkAnnotations>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionChunkDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionChunkChoice {
    pub index: u32,
    pub delta: ChatCompletionChunkDelta,
    pub finish_reason: Option<String>,
}

/// One SSE frame's payload in a streaming response (SPEC_FULL §6: framed as
/// `data: <json>\n\n`, terminated by `data: [DONE]\n\n`).
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatCompletionChunkChoice>,
}

impl ChatCompletionChunk {
    /// A single chunk carrying the full answer text, used for the
    /// non-proxied streaming fallback (SPEC_FULL §4.6, §8 scenario 2).
    pub fn full_content(id: impl Into<String>, model: impl Into<String>, created: i64, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object: "chat.completion.chunk".to_string(),
            created,
            model: model.into(),
            choices: vec![ChatCompletionChunkChoice {
                index: 0,
                delta: ChatCompletionChunkDelta {
                    role: Some("assistant".to_string()),
                    content: Some(content.into()),
                },
                finish_reason: Some("stop".to_string()),
            }],
        }
    }
}

/// `GET /models` entry (SPEC_FULL §4.6).
#[derive(Debug, Clone, Serialize)]
pub struct Model {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

/// `GET /models` envelope (SPEC_FULL §6: `{"object":"list","data":[...]}`).
#[derive(Debug, Clone, Serialize)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<Model>,
}

impl ModelList {
    pub fn new(data: Vec<Model>) -> Self {
        Self {
            object: "list".to_string(),
            data,
        }
    }
}
