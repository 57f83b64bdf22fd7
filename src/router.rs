//! Dynamic Router (C5) — the live route table mapping `/{agent}/...` to one
//! [`a2a_router`] sub-handler per cluster Agent, reconciled on a periodic
//! loop behind an atomically-swapped handler cell.
//!
//! Grounded on `original_source/.../a2agw/manager.py` (`DynamicManager`,
//! `ProxyApp`): an ASGI app wrapping whichever "real" app the last
//! reconcile installed. axum's [`Router`] plays the role of that ASGI app;
//! the swap itself uses `RwLock<Arc<Router>>` rather than `arc-swap` (not
//! part of the teacher's or the pack's dependency stack) — see DESIGN.md's
//! Open Question notes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Request;
use axum::response::Response;
use axum::Router;
use tokio::sync::{Mutex, RwLock};
use tower::ServiceExt;
use tracing::{debug, info, warn};

use crate::card::{self, AgentCardUrlConfig};
use crate::executor::QueryAgentExecutor;
use crate::gateway_error::GatewayResult;
use crate::registry::SharedRegistry;
use crate::server::{a2a_router, DefaultRequestHandler, InMemoryTaskStore, RequestHandler};
use crate::types::AgentCard;

struct RouterState {
    registry: SharedRegistry,
    namespace: String,
    url_config: AgentCardUrlConfig,
    default_timeout_secs: u64,
    current: RwLock<Arc<Router>>,
    cards: Mutex<HashMap<String, AgentCard>>,
    ready: AtomicBool,
}

/// Owns the live `/{agent}/...` route table and keeps it in sync with the
/// registry's Agent set (C5).
#[derive(Clone)]
pub struct DynamicRouter {
    state: Arc<RouterState>,
}

impl DynamicRouter {
    pub fn new(
        registry: SharedRegistry,
        namespace: impl Into<String>,
        url_config: AgentCardUrlConfig,
        default_timeout_secs: u64,
    ) -> Self {
        Self {
            state: Arc::new(RouterState {
                registry,
                namespace: namespace.into(),
                url_config,
                default_timeout_secs,
                current: RwLock::new(Arc::new(Router::new())),
                cards: Mutex::new(HashMap::new()),
                ready: AtomicBool::new(false),
            }),
        }
    }

    /// `true` once at least one reconcile has completed (SPEC_FULL §4.8
    /// `/healthz` readiness gate).
    pub fn is_ready(&self) -> bool {
        self.state.ready.load(Ordering::Relaxed)
    }

    /// Number of agents currently mounted.
    pub async fn agent_count(&self) -> usize {
        self.state.cards.lock().await.len()
    }

    /// Agent cards currently mounted, keyed by name — used by the
    /// `/a2a/agents` enumeration endpoint (C8).
    pub async fn agent_cards(&self) -> HashMap<String, AgentCard> {
        self.state.cards.lock().await.clone()
    }

    /// List agents from the registry, project their cards, and — only if
    /// the resulting agent set differs from what's currently mounted —
    /// rebuild the route table and swap it in. Mirrors the teacher's
    /// "rebuild only on change" reconcile discipline from `manager.py`.
    pub async fn reconcile(&self) -> GatewayResult<()> {
        let agents = self.state.registry.list_agents().await?;

        let mut new_cards = HashMap::with_capacity(agents.len());
        for agent in &agents {
            let card = card::project(agent, &self.state.url_config);
            new_cards.insert(agent.metadata.name.clone(), card);
        }

        let changed = {
            let existing = self.state.cards.lock().await;
            !cards_equal(&existing, &new_cards)
        };

        if changed {
            let mut router = Router::new();
            for (name, card) in &new_cards {
                let executor = Arc::new(QueryAgentExecutor::new(
                    Arc::clone(&self.state.registry),
                    self.state.namespace.clone(),
                    name.clone(),
                    self.state.default_timeout_secs,
                ));
                let handler: Arc<dyn RequestHandler> = Arc::new(DefaultRequestHandler::new(
                    executor,
                    Arc::new(InMemoryTaskStore::new()),
                ));
                router = router.nest(&format!("/{name}"), a2a_router(handler, card.clone()));
            }

            *self.state.current.write().await = Arc::new(router);
            let agent_count = new_cards.len();
            *self.state.cards.lock().await = new_cards;
            info!(agent_count, "agent set changed, route table rebuilt");
        } else {
            debug!(agent_count = new_cards.len(), "agent set unchanged, skipping rebuild");
        }

        self.state.ready.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Run the reconcile loop at `poll_interval` until `shutdown` fires
    /// (SPEC_FULL §5 graceful shutdown). Reconcile errors are logged and
    /// retried next tick rather than ending the loop — a transient registry
    /// outage should not take down the whole gateway.
    pub async fn run(self: Arc<Self>, poll_interval: Duration, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        loop {
            if let Err(err) = self.reconcile().await {
                warn!(error = %err, "reconcile failed, will retry next tick");
            }

            tokio::select! {
                _ = tokio::time::sleep(poll_interval) => {}
                _ = shutdown.changed() => {
                    info!("router reconcile loop shutting down");
                    return;
                }
            }
        }
    }

    /// Dispatch one request through whichever route table is currently
    /// installed.
    async fn dispatch(&self, req: Request) -> Response {
        let router = {
            let current = self.state.current.read().await;
            Arc::clone(&current)
        };
        let svc = (*router).clone();
        match svc.oneshot(req).await {
            Ok(response) => response,
            Err(infallible) => match infallible {},
        }
    }

    /// Build the axum [`Router`] to mount at the gateway's `/a2a/agent`
    /// prefix (C8): every request falls through to whichever per-agent
    /// route table the last reconcile installed.
    pub fn into_router(self: Arc<Self>) -> Router {
        Router::new().fallback(move |req: Request| {
            let this = Arc::clone(&self);
            async move { this.dispatch(req).await }
        })
    }
}

/// Value-equality over two agent-card maps: same agent names, and each
/// card serializes identically. Catches both added/removed agents and
/// in-place spec edits (e.g. a changed description) without needing
/// [`AgentCard`] to derive `PartialEq` itself.
fn cards_equal(a: &HashMap<String, AgentCard>, b: &HashMap<String, AgentCard>) -> bool {
    if a.len() != b.len() {
        return false;
    }
    b.iter().all(|(name, card)| {
        a.get(name).is_some_and(|existing| {
            serde_json::to_value(existing).ok() == serde_json::to_value(card).ok()
        })
    })
}
