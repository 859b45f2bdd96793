//! GraphQL Gateway
//!
//! A minimal HTTP front end for a GraphQL endpoint backed by Postgres, built
//! with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!                     │                  GATEWAY                      │
//!   Client Request    │  ┌──────────┐   ┌────────────┐   ┌─────────┐ │
//!   ──────────────────┼─▶│ listener │──▶│ drain gate │──▶│ graphql │ │
//!                     │  └──────────┘   └────────────┘   └────┬────┘ │
//!                     │                                       │      │
//!                     │                                       ▼      │
//!                     │                                  ┌─────────┐ │
//!                     │                                  │  store  │─┼──▶ Postgres
//!                     │                                  └─────────┘ │
//!                     │  ┌────────────────────────────────────────┐  │
//!                     │  │ lifecycle: start (store → listener)    │  │
//!                     │  │            stop  (drain ∥ close, 30s)  │  │
//!                     │  └────────────────────────────────────────┘  │
//!                     └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use graphql_gateway::config::load_config;
use graphql_gateway::http::{build_router, AppState, TypenameExecutor};
use graphql_gateway::lifecycle::{signals, LifecycleCoordinator, LifecycleState};
use graphql_gateway::net::{ConnectionTracker, HttpListener};
use graphql_gateway::observability::{logging, metrics};
use graphql_gateway::store::PgStore;

#[derive(Parser)]
#[command(name = "graphql-gateway")]
#[command(about = "HTTP front end for a Postgres-backed GraphQL endpoint", long_about = None)]
struct Cli {
    /// Optional TOML configuration file. PORT, HOST, DATABASE_URL and APP_ENV override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.environment,
        "graphql-gateway starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let lifecycle = LifecycleState::new();
    let tracker = ConnectionTracker::new();
    let state = AppState::new(Arc::new(TypenameExecutor), config.environment);
    let router = build_router(&config, state, lifecycle.clone(), tracker.clone());

    let listener = HttpListener::new(config.listener.host.clone(), router, tracker);
    let store = PgStore::new(config.database.clone());
    let port = config
        .listener
        .port
        .ok_or("listener port is required (set PORT or listener.port)")?;

    let coordinator = LifecycleCoordinator::new(store, listener, lifecycle, port)
        .with_drain_timeout(Duration::from_secs(config.shutdown.drain_timeout_secs));

    if let Err(e) = coordinator.start().await {
        tracing::error!(error = %e, "Startup failed");
        return Err(e.into());
    }

    signals::shutdown_signal().await;
    coordinator.stop(true).await;

    Ok(())
}
