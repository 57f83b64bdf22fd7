//! Public Surface Wiring (C8) — mounts the Dynamic Router under its stable
//! prefix, exposes the `/a2a/agents` enumeration, the OpenAI-compatible
//! surface, and a liveness/readiness probe.
//!
//! Grounded on `original_source/.../a2agw/a2a_gateway.py` (the `/agents`
//! listing handler's exact field shape) and `.../ark_api/main.py` (router
//! composition), expressed with axum's `Router::nest`/`.route` the way
//! `src/router.rs::DynamicRouter::into_router` and `src/openai::router`
//! already compose their own sub-routers in this crate.

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use serde::Serialize;

use crate::config::GatewayConfig;
use crate::openai::OpenAiAdapter;
use crate::registry::SharedRegistry;
use crate::router::DynamicRouter;

/// One entry of the `GET /a2a/agents` enumeration (SPEC_FULL §4.8).
#[derive(Debug, Serialize)]
struct AgentSummary {
    name: String,
    description: String,
    capabilities: Vec<String>,
    /// Hardcoded to `"localhost"` regardless of the configured agent-card
    /// host — Open Question #1 (SPEC_FULL §9), kept as specified rather
    /// than reconciled with [`crate::card::AgentCardUrlConfig`]'s
    /// configurable host.
    host: String,
    #[serde(rename = "agent-card")]
    agent_card: String,
    created_at: String,
    metadata: AgentSummaryMetadata,
}

#[derive(Debug, Serialize)]
struct AgentSummaryMetadata {
    #[serde(rename = "type")]
    kind: String,
    version: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    agents: usize,
}

async fn list_agent_summaries(State(router): State<Arc<DynamicRouter>>) -> Json<Vec<AgentSummary>> {
    let cards = router.agent_cards().await;
    let now = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();

    let mut summaries: Vec<AgentSummary> = cards
        .into_iter()
        .map(|(name, card)| AgentSummary {
            description: card.description.clone(),
            capabilities: card.skills.iter().map(|s| s.name.clone()).collect(),
            host: "localhost".to_string(),
            agent_card: format!("/a2a/agent/{name}/.well-known/agent.json"),
            created_at: now.clone(),
            metadata: AgentSummaryMetadata {
                kind: "analytical".to_string(),
                version: card.version.clone(),
            },
            name,
        })
        .collect();

    summaries.sort_by(|a, b| a.name.cmp(&b.name));
    Json(summaries)
}

async fn healthz(State(router): State<Arc<DynamicRouter>>) -> Response {
    let agents = router.agent_count().await;
    let status = if router.is_ready() {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(HealthResponse { status: "ok", agents })).into_response()
}

/// Build the gateway's full public HTTP surface (C8) and the
/// [`DynamicRouter`] driving its `/a2a/agent` mount, so the caller can
/// separately spawn the reconcile loop alongside serving.
///
/// SPEC_FULL §2: an immediate reconcile is the router's own job at
/// construction time (see [`DynamicRouter::reconcile`]); this function only
/// assembles routes, it does not reconcile.
pub fn build(config: &GatewayConfig, registry: SharedRegistry) -> (Router, Arc<DynamicRouter>) {
    let dynamic_router = Arc::new(DynamicRouter::new(
        Arc::clone(&registry),
        config.namespace.clone(),
        config.agent_card_url_config(),
        config.default_timeout_secs,
    ));

    let a2a_agent_router = Arc::clone(&dynamic_router).into_router();

    let a2a_agents_router = Router::new()
        .route("/a2a/agents", get(list_agent_summaries))
        .with_state(Arc::clone(&dynamic_router));

    let health_router = Router::new()
        .route("/healthz", get(healthz))
        .with_state(Arc::clone(&dynamic_router));

    let openai_adapter = Arc::new(OpenAiAdapter::new(registry, config.namespace.clone()));
    let openai_router = crate::openai::router(openai_adapter);

    let app = Router::new()
        .nest("/a2a/agent", a2a_agent_router)
        .merge(a2a_agents_router)
        .nest("/openai/v1", openai_router)
        .merge(health_router);

    (app, dynamic_router)
}
