//! `GatewayConfig` — assembled once at start-up from CLI flags and
//! environment variables (optionally loaded from a `.env` file), then
//! passed explicitly into each component's constructor.
//!
//! Grounded on `block-goose`'s `clap::Parser` + `dotenvy` binary-entrypoint
//! idiom (`crates/goose-acp/src/bin/server.rs`); the teacher crate itself
//! has no config layer of its own (it reads env vars ad hoc in
//! `builders.rs`), so this generalizes the pack's convention rather than
//! the teacher's (SPEC_FULL §1, §9 "ambient namespace" — passed explicitly,
//! never reintroduced as module-level state).

use clap::Parser;

use crate::card::AgentCardUrlConfig;

/// Auth mode consumed (but not enforced) by the gateway — SPEC_FULL §6:
/// the gateway only parses and logs this; enforcement belongs to the
/// external auth collaborator named out of scope in §1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AuthMode {
    Sso,
    Basic,
    Hybrid,
    Open,
}

impl std::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Sso => "sso",
            Self::Basic => "basic",
            Self::Hybrid => "hybrid",
            Self::Open => "open",
        };
        write!(f, "{s}")
    }
}

/// Gateway configuration, assembled once at start-up and never re-read
/// mid-process (SPEC_FULL §1). Every field is either a CLI flag with a
/// matching env var (via clap's `env` feature) or an env var consulted
/// directly where the original names one that doesn't read as a flag
/// (e.g. `OIDC_ISSUER_URL`).
#[derive(Parser, Debug, Clone)]
#[command(name = "ark-a2a-gateway", about = "A2A/OpenAI gateway over cluster-scoped Agent and Query records")]
pub struct GatewayConfig {
    /// Address the HTTP server binds to.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port the HTTP server binds to.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Namespace every registry operation is scoped to (SPEC_FULL §4.1 —
    /// derived once at start-up, cached for the process lifetime).
    #[arg(long, env = "ARK_NAMESPACE", default_value = "default")]
    pub namespace: String,

    /// Base URL of the cluster registry's REST API. Omit to run against an
    /// in-memory registry (standalone/dev mode).
    #[arg(long, env = "ARK_API_BASE_URL")]
    pub registry_base_url: Option<String>,

    /// Per-task execution bound, in seconds (SPEC_FULL §4.4, §6).
    #[arg(long, env = "A2A_DEFAULT_TIMEOUT", default_value_t = 300)]
    pub default_timeout_secs: u64,

    /// Reconcile period outside cluster-hosted mode, in seconds (SPEC_FULL
    /// §4.5, §6). Cluster-hosted mode fixes this at 30s regardless of this
    /// flag.
    #[arg(long, env = "A2A_POLL_INTERVAL_SECONDS", default_value_t = 3)]
    pub poll_interval_secs: u64,

    /// Whether the gateway is running cluster-hosted (fixes the reconcile
    /// period at 30s per SPEC_FULL §4.5) rather than standalone.
    #[arg(long, env = "ARK_CLUSTER_HOSTED", default_value_t = false)]
    pub cluster_hosted: bool,

    /// External protocol for AgentCard URLs (SPEC_FULL §6).
    #[arg(long, env = "ARK_A2A_AGENT_CARD_PROTOCOL", default_value = "http")]
    pub agent_card_protocol: String,

    /// External host for AgentCard URLs.
    #[arg(long, env = "ARK_A2A_AGENT_CARD_HOST", default_value = "localhost")]
    pub agent_card_host: String,

    /// External port for AgentCard URLs; defaults to the bound port.
    #[arg(long, env = "ARK_A2A_AGENT_CARD_PORT")]
    pub agent_card_port: Option<String>,

    /// External path prefix for AgentCard URLs.
    #[arg(long, env = "ARK_A2A_AGENT_CARD_PATH", default_value = "")]
    pub agent_card_path: String,

    /// OIDC issuer URL, consulted by the external auth collaborator only
    /// (SPEC_FULL §1 Non-goals — the gateway never mediates auth itself).
    #[arg(long, env = "OIDC_ISSUER_URL")]
    pub oidc_issuer_url: Option<String>,

    /// OIDC application/client id, consulted by the external auth
    /// collaborator only.
    #[arg(long, env = "OIDC_APPLICATION_ID")]
    pub oidc_application_id: Option<String>,

    /// Auth mode, consulted by the external auth collaborator only.
    #[arg(long, value_enum, env = "AUTH_MODE", default_value_t = AuthMode::Open)]
    pub auth_mode: AuthMode,
}

impl GatewayConfig {
    /// Parse CLI flags and environment variables, loading a `.env` file
    /// first if one is present (missing `.env` is not an error).
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        Self::parse()
    }

    /// The reconcile period C5's loop sleeps between ticks (SPEC_FULL §4.5:
    /// 30s cluster-hosted, else `A2A_POLL_INTERVAL_SECONDS`).
    pub fn reconcile_period(&self) -> std::time::Duration {
        let secs = if self.cluster_hosted { 30 } else { self.poll_interval_secs };
        std::time::Duration::from_secs(secs)
    }

    pub fn agent_card_url_config(&self) -> AgentCardUrlConfig {
        AgentCardUrlConfig {
            protocol: self.agent_card_protocol.clone(),
            host: self.agent_card_host.clone(),
            port: self
                .agent_card_port
                .clone()
                .unwrap_or_else(|| self.port.to_string()),
            path: self.agent_card_path.clone(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
