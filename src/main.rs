//! Binary entry point: loads configuration, wires the public HTTP surface,
//! runs the reconcile loop alongside the server, and shuts down gracefully
//! on `SIGINT`/`SIGTERM`.
//!
//! Grounded on `block-goose`'s binary-entrypoint shape
//! (`crates/goose-acp/src/bin/server.rs`): `clap::Parser` for CLI/env
//! config, `tracing_subscriber` with an `EnvFilter`, `axum::serve`, and
//! `tokio::signal` for graceful shutdown — none of this exists in the
//! teacher crate itself, which is a library with no binary of its own.

use std::sync::Arc;

use ark_a2a_gateway::config::GatewayConfig;
use ark_a2a_gateway::registry::{HttpRegistryReader, InMemoryRegistry, RegistryReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::load();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    info!(
        namespace = %config.namespace,
        cluster_hosted = config.cluster_hosted,
        "starting ark-a2a-gateway",
    );

    let registry: Arc<dyn RegistryReader> = match &config.registry_base_url {
        Some(base_url) => Arc::new(HttpRegistryReader::new(base_url.clone(), config.namespace.clone())),
        None => {
            info!("no ARK_API_BASE_URL configured, running against an in-memory registry");
            Arc::new(InMemoryRegistry::new())
        }
    };

    let (app, dynamic_router) = ark_a2a_gateway::app::build(&config, registry);

    dynamic_router.reconcile().await?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let reconcile_loop = tokio::spawn(Arc::clone(&dynamic_router).run(config.reconcile_period(), shutdown_rx));

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!(addr = %config.bind_addr(), "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    reconcile_loop.await?;

    Ok(())
}

/// Resolves once either `SIGINT` (Ctrl-C) or, on unix, `SIGTERM` fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received");
}
