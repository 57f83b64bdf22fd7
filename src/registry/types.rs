//! Cluster-resource record shapes: Agent, Query, Memory.
//!
//! These mirror the `{metadata, spec, status}` layout of the cluster records
//! the gateway reads and writes (see `original_source/.../models/queries.py`
//! and `.../a2agw/query.py` for the Python shapes this was derived from).
//! The gateway never owns these records — it is a reader of Agents/Memories
//! and a writer-then-watcher of Queries only.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Object metadata shared by every cluster record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    #[serde(rename = "creationTimestamp", default)]
    pub creation_timestamp: Option<String>,
}

/// A cluster-scoped Agent record.
///
/// The gateway only reads the fields the card projector (C2) and the
/// `/openai/v1/models` listing need; the rest of the Agent spec is owned by
/// the agent-CRUD surface named as an external collaborator in SPEC_FULL §1.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Agent {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: AgentSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentSpec {
    #[serde(default)]
    pub description: Option<String>,
}

/// A named cluster resource reduced to what `/openai/v1/models` needs —
/// shared shape for Team/Model/Tool listings alongside Agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamedResource {
    pub metadata: ObjectMeta,
}

/// One target of a Query — `{name, type}` where `type` selects which kind
/// of record `name` refers to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryTarget {
    pub name: String,
    #[serde(rename = "type")]
    pub target_type: String,
}

/// The input a Query carries — either a plain string (A2A path, `type =
/// "user"`) or an ordered list of chat messages (OpenAI path, `type =
/// "messages"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryInput {
    Text(String),
    Messages(Vec<serde_json::Value>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuerySpec {
    pub input: QueryInput,
    #[serde(rename = "type", default = "default_query_type")]
    pub query_type: String,
    pub targets: Vec<QueryTarget>,
    pub timeout: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel: Option<bool>,
}

fn default_query_type() -> String {
    "user".to_string()
}

/// One element of `status.responses[]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryStatus {
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub responses: Vec<QueryResponse>,
}

/// A cluster-scoped Query record: written once by the gateway, advanced
/// through phases by an external controller, polled by the gateway until a
/// terminal phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub metadata: ObjectMeta,
    pub spec: QuerySpec,
    #[serde(default)]
    pub status: QueryStatus,
}

/// A cluster-scoped Memory record — read-only here; see SPEC_FULL §3.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Memory {
    pub metadata: ObjectMeta,
}

/// Optional per-namespace streaming backend configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamingConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub base_url: Option<String>,
}
