//! # medinfrad
//!
//! The medinfra daemon.
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize structured logging
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct application services over the store and the audit bus
//! - Forward audit records to the log
//! - Build the axum router, bind to a TCP port and serve
//! - Handle graceful shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use medinfra_adapter_http_axum::router;
use medinfra_adapter_http_axum::state::AppState;
use medinfra_adapter_storage_sqlite_sqlx::Config as DatabaseConfig;
use medinfra_app::audit_bus::InProcessAuditBus;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    // Database
    let db = DatabaseConfig {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await?;
    let store = db.store();

    // Audit
    let audit = Arc::new(InProcessAuditBus::new(config.limits.audit_capacity));
    let mut records = audit.subscribe();
    tokio::spawn(async move {
        loop {
            match records.recv().await {
                Ok(record) => tracing::info!(
                    target: "medinfra::audit",
                    branch_id = %record.branch_id,
                    actor_id = %record.actor_id,
                    action = %record.action,
                    entity = %record.entity,
                    entity_id = %record.entity_id,
                    meta = %record.meta,
                    "audit"
                ),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "audit log subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // HTTP
    let state = AppState::new(store, audit, config.limits.max_tree_nodes);
    let app = router::build(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "medinfrad listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("medinfrad stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
