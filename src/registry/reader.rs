//! Registry Reader (C1) — read-only, namespace-scoped view over cluster
//! records, plus the create/get/patch/delete operations a Query's
//! write-then-watch lifecycle needs.
//!
//! Grounded on `original_source/.../a2agw/registry.py::AgentRegistry` for the
//! operation set. Two implementations are provided, mirroring the teacher's
//! `TaskStore`/`InMemoryTaskStore` split: [`InMemoryRegistry`] for tests and
//! standalone operation, and [`HttpRegistryReader`] for a real cluster,
//! reusing the crate's existing `reqwest` dependency rather than introducing
//! a dedicated cluster-client crate (none is available anywhere in the
//! corpus this was grounded on).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::gateway_error::{GatewayError, GatewayResult};

use super::types::{Agent, Memory, NamedResource, Query, QuerySpec, StreamingConfig};

/// Optional filter for [`RegistryReader::list_memories`].
#[derive(Debug, Clone, Default)]
pub struct MemoryFilter {
    pub session_id: Option<String>,
}

/// Read-only, namespace-scoped view over cluster records (C1).
///
/// All operations are scoped to the namespace the reader was constructed
/// with; callers must assume eventual consistency — read-your-writes is not
/// guaranteed (SPEC_FULL §4.1).
#[async_trait]
pub trait RegistryReader: Send + Sync {
    async fn list_agents(&self) -> GatewayResult<Vec<Agent>>;
    async fn get_agent(&self, name: &str) -> GatewayResult<Agent>;
    async fn list_teams(&self) -> GatewayResult<Vec<NamedResource>>;
    async fn list_models(&self) -> GatewayResult<Vec<NamedResource>>;
    async fn list_tools(&self) -> GatewayResult<Vec<NamedResource>>;

    async fn create_query(&self, query: Query) -> GatewayResult<()>;
    async fn get_query(&self, name: &str) -> GatewayResult<Query>;
    async fn patch_query(&self, name: &str, spec_patch: QuerySpec) -> GatewayResult<()>;
    async fn delete_query(&self, name: &str) -> GatewayResult<()>;

    async fn list_memories(&self, filter: Option<MemoryFilter>) -> GatewayResult<Vec<Memory>>;

    /// Resolve the streaming backend configuration for this namespace, if any.
    async fn streaming_config(&self) -> GatewayResult<Option<StreamingConfig>>;
}

// ---------------------------------------------------------------------------
// InMemoryRegistry — test/dev backing
// ---------------------------------------------------------------------------

/// In-memory registry reader, for tests and standalone operation without a
/// real cluster. Agents and Queries are seeded/mutated directly by callers
/// (typically test harnesses simulating a controller advancing a Query
/// through phases).
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    agents: RwLock<HashMap<String, Agent>>,
    teams: RwLock<HashMap<String, NamedResource>>,
    models: RwLock<HashMap<String, NamedResource>>,
    tools: RwLock<HashMap<String, NamedResource>>,
    queries: RwLock<HashMap<String, Query>>,
    memories: RwLock<Vec<Memory>>,
    streaming: RwLock<Option<StreamingConfig>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_agent(&self, agent: Agent) {
        self.agents
            .write()
            .await
            .insert(agent.metadata.name.clone(), agent);
    }

    pub async fn remove_agent(&self, name: &str) {
        self.agents.write().await.remove(name);
    }

    /// Directly set a Query's status, simulating the external controller
    /// that advances a Query through phases (SPEC_FULL §1 Non-goals — the
    /// gateway never does this itself; tests stand in for that controller).
    pub async fn set_query_status(&self, name: &str, status: super::types::QueryStatus) {
        if let Some(query) = self.queries.write().await.get_mut(name) {
            query.status = status;
        }
    }

    pub async fn set_streaming_config(&self, config: Option<StreamingConfig>) {
        *self.streaming.write().await = config;
    }

    /// Names of all Queries currently held, for tests driving a simulated
    /// controller that needs to discover a name generated internally by the
    /// query driver.
    pub async fn query_names(&self) -> Vec<String> {
        self.queries.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl RegistryReader for InMemoryRegistry {
    async fn list_agents(&self) -> GatewayResult<Vec<Agent>> {
        Ok(self.agents.read().await.values().cloned().collect())
    }

    async fn get_agent(&self, name: &str) -> GatewayResult<Agent> {
        self.agents
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| GatewayError::not_found(format!("agent '{name}' not found")))
    }

    async fn list_teams(&self) -> GatewayResult<Vec<NamedResource>> {
        Ok(self.teams.read().await.values().cloned().collect())
    }

    async fn list_models(&self) -> GatewayResult<Vec<NamedResource>> {
        Ok(self.models.read().await.values().cloned().collect())
    }

    async fn list_tools(&self) -> GatewayResult<Vec<NamedResource>> {
        Ok(self.tools.read().await.values().cloned().collect())
    }

    async fn create_query(&self, query: Query) -> GatewayResult<()> {
        let name = query.metadata.name.clone();
        debug!(query_name = %name, "creating query");
        self.queries.write().await.insert(name, query);
        Ok(())
    }

    async fn get_query(&self, name: &str) -> GatewayResult<Query> {
        self.queries
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| GatewayError::not_found(format!("query '{name}' not found")))
    }

    async fn patch_query(&self, name: &str, spec_patch: QuerySpec) -> GatewayResult<()> {
        let mut queries = self.queries.write().await;
        let query = queries
            .get_mut(name)
            .ok_or_else(|| GatewayError::not_found(format!("query '{name}' not found")))?;
        query.spec = spec_patch;
        Ok(())
    }

    async fn delete_query(&self, name: &str) -> GatewayResult<()> {
        self.queries.write().await.remove(name);
        Ok(())
    }

    async fn list_memories(&self, _filter: Option<MemoryFilter>) -> GatewayResult<Vec<Memory>> {
        Ok(self.memories.read().await.clone())
    }

    async fn streaming_config(&self) -> GatewayResult<Option<StreamingConfig>> {
        Ok(self.streaming.read().await.clone())
    }
}

// ---------------------------------------------------------------------------
// HttpRegistryReader — REST-backed reader for a real cluster
// ---------------------------------------------------------------------------

/// REST-backed registry reader. Issues plain HTTP calls against a
/// configured cluster API base URL; the exact REST shape (resource paths,
/// auth) is an external-collaborator concern (SPEC_FULL §1), so this client
/// only needs to speak the minimal `{metadata, spec, status}` JSON the rest
/// of the gateway already models in `registry::types`.
#[derive(Debug, Clone)]
pub struct HttpRegistryReader {
    client: reqwest::Client,
    base_url: String,
    namespace: String,
}

impl HttpRegistryReader {
    pub fn new(base_url: impl Into<String>, namespace: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.into(),
            namespace: namespace.into(),
        }
    }

    fn resource_url(&self, kind: &str, name: Option<&str>) -> String {
        match name {
            Some(name) => format!(
                "{}/apis/ark.mckinsey.com/v1alpha1/namespaces/{}/{}/{}",
                self.base_url, self.namespace, kind, name
            ),
            None => format!(
                "{}/apis/ark.mckinsey.com/v1alpha1/namespaces/{}/{}",
                self.base_url, self.namespace, kind
            ),
        }
    }

    fn map_request_error(err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::TransientIo(format!("registry request timed out: {err}"))
        } else if err.is_connect() {
            GatewayError::TransientIo(format!("registry connection failed: {err}"))
        } else {
            GatewayError::TransientIo(format!("registry request failed: {err}"))
        }
    }

    async fn list<T: serde::de::DeserializeOwned>(&self, kind: &str) -> GatewayResult<Vec<T>> {
        #[derive(serde::Deserialize)]
        struct ListResponse<T> {
            #[serde(default)]
            items: Vec<T>,
        }

        let response = self
            .client
            .get(self.resource_url(kind, None))
            .send()
            .await
            .map_err(Self::map_request_error)?;

        if !response.status().is_success() {
            return Err(GatewayError::TransientIo(format!(
                "registry list '{kind}' returned HTTP {}",
                response.status()
            )));
        }

        let parsed: ListResponse<T> = response
            .json()
            .await
            .map_err(|e| GatewayError::Internal(format!("failed to parse '{kind}' list: {e}")))?;
        Ok(parsed.items)
    }
}

#[async_trait]
impl RegistryReader for HttpRegistryReader {
    async fn list_agents(&self) -> GatewayResult<Vec<Agent>> {
        self.list("agents").await
    }

    async fn get_agent(&self, name: &str) -> GatewayResult<Agent> {
        let response = self
            .client
            .get(self.resource_url("agents", Some(name)))
            .send()
            .await
            .map_err(Self::map_request_error)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::not_found(format!("agent '{name}' not found")));
        }
        if !response.status().is_success() {
            return Err(GatewayError::TransientIo(format!(
                "registry get agent '{name}' returned HTTP {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::Internal(format!("failed to parse agent '{name}': {e}")))
    }

    async fn list_teams(&self) -> GatewayResult<Vec<NamedResource>> {
        self.list("teams").await
    }

    async fn list_models(&self) -> GatewayResult<Vec<NamedResource>> {
        self.list("models").await
    }

    async fn list_tools(&self) -> GatewayResult<Vec<NamedResource>> {
        self.list("tools").await
    }

    async fn create_query(&self, query: Query) -> GatewayResult<()> {
        let response = self
            .client
            .post(self.resource_url("queries", None))
            .json(&query)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        if !response.status().is_success() {
            return Err(GatewayError::TransientIo(format!(
                "create query '{}' returned HTTP {}",
                query.metadata.name,
                response.status()
            )));
        }
        Ok(())
    }

    async fn get_query(&self, name: &str) -> GatewayResult<Query> {
        let response = self
            .client
            .get(self.resource_url("queries", Some(name)))
            .send()
            .await
            .map_err(Self::map_request_error)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::not_found(format!("query '{name}' not found")));
        }
        if !response.status().is_success() {
            return Err(GatewayError::TransientIo(format!(
                "get query '{name}' returned HTTP {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::Internal(format!("failed to parse query '{name}': {e}")))
    }

    async fn patch_query(&self, name: &str, spec_patch: QuerySpec) -> GatewayResult<()> {
        let response = self
            .client
            .patch(self.resource_url("queries", Some(name)))
            .json(&serde_json::json!({ "spec": spec_patch }))
            .send()
            .await
            .map_err(Self::map_request_error)?;

        if !response.status().is_success() {
            return Err(GatewayError::TransientIo(format!(
                "patch query '{name}' returned HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn delete_query(&self, name: &str) -> GatewayResult<()> {
        let response = self
            .client
            .delete(self.resource_url("queries", Some(name)))
            .send()
            .await
            .map_err(Self::map_request_error)?;

        if !response.status().is_success() && response.status() != reqwest::StatusCode::NOT_FOUND
        {
            warn!(query_name = %name, status = %response.status(), "delete query returned non-success");
        }
        Ok(())
    }

    async fn list_memories(&self, _filter: Option<MemoryFilter>) -> GatewayResult<Vec<Memory>> {
        self.list("memories").await
    }

    async fn streaming_config(&self) -> GatewayResult<Option<StreamingConfig>> {
        let response = self
            .client
            .get(format!(
                "{}/apis/ark.mckinsey.com/v1alpha1/namespaces/{}/streaming-config",
                self.base_url, self.namespace
            ))
            .send()
            .await
            .map_err(Self::map_request_error)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(GatewayError::TransientIo(format!(
                "get streaming config returned HTTP {}",
                response.status()
            )));
        }

        let config: StreamingConfig = response
            .json()
            .await
            .map_err(|e| GatewayError::Internal(format!("failed to parse streaming config: {e}")))?;
        Ok(Some(config))
    }
}

/// Shared handle to a registry reader, used everywhere a component needs
/// read-only cluster access (SPEC_FULL §9 — passed explicitly, never ambient).
pub type SharedRegistry = Arc<dyn RegistryReader>;
