/// Axum HTTP server setup and routing
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::*;
use crate::state::MockLedger;

pub fn create_router(ledger: MockLedger) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // Horizon
        .route("/accounts/:id", get(get_account))
        .route("/accounts/:id/payments", get(get_payments))
        .route("/accounts/:id/operations", get(get_operations))
        .route("/claimable_balances", get(get_claimable_balances))
        .route("/fee_stats", get(get_fee_stats))
        .route("/transactions", post(submit_transaction))
        // Federation
        .route("/.well-known/stellar.toml", get(get_stellar_toml))
        .route("/federation", get(get_federation))
        // Reputation directory
        .route("/explorer/directory", get(get_directory))
        .with_state(ledger)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(ledger: MockLedger, host: String, port: u16) -> anyhow::Result<()> {
    let app = create_router(ledger);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Horizon mock listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Serves `ledger` on an ephemeral localhost port
///
/// Returns the bound address; the server runs until the runtime shuts down.
pub async fn spawn(ledger: MockLedger) -> anyhow::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = create_router(ledger);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            log::error!("Horizon mock stopped: {}", e);
        }
    });

    log::debug!("Horizon mock spawned on {}", addr);
    Ok(addr)
}
