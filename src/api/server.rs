use std::net::SocketAddr;

use axum::{Router, middleware, routing::get, routing::post};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::{
    auth::require_token,
    services::{
        enqueue_job, finish_job, get_cursor, get_job, health, lease_jobs, list_cursors,
        list_workers, metrics, register_worker,
    },
    state::AppState,
};
use crate::config::Config;
use crate::store::MeshStore;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Every route of the service. Only `/health` skips the token check.
pub fn router(state: AppState) -> Router {
    let max_concurrent = state.config.server.max_concurrent_requests;

    let protected = Router::new()
        .route("/v1/workers/register", post(register_worker))
        .route("/v1/workers", get(list_workers))
        .route("/v1/jobs", post(enqueue_job))
        .route("/v1/jobs/lease", post(lease_jobs))
        .route("/v1/jobs/finish", post(finish_job))
        .route("/v1/jobs/{job_id}", get(get_job))
        .route("/v1/cursors", get(list_cursors))
        .route("/v1/cursors/{site_id}", get(get_cursor))
        .route("/operators/metrics", get(metrics))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .with_state(state)
        // Handles Content-Encoding transparently; size limits apply to the decoded body
        .layer(RequestDecompressionLayer::new())
        .layer(ConcurrencyLimitLayer::new(max_concurrent))
        .layer(TraceLayer::new_for_http())
}

/// Serve the API until SIGINT/SIGTERM, with the lease reaper running alongside
pub async fn run(config: Config, address: Option<SocketAddr>) -> Result<(), AnyError> {
    let address = address.unwrap_or(config.server.bind_addr);

    info!(url = %config.database.url, "Opening database");
    let store = MeshStore::connect(&config.database.url, config.database.max_connections)
        .await
        .map_err(|e| format!("Failed to open database: {}", e))?;

    let reaper_config = config.reaper.clone();
    let state = AppState::new(config, store.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reaper = if reaper_config.enabled {
        Some(
            state
                .scheduler
                .reaper
                .clone()
                .spawn(reaper_config.interval.as_duration(), shutdown_rx),
        )
    } else {
        warn!("Lease reaper disabled; expired leases are only reclaimed by `reap` runs");
        None
    };

    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "Mesh scheduler listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await?;

    if let Some(handle) = reaper {
        if let Err(err) = handle.await {
            warn!(error = %err, "Lease reaper task ended abnormally");
        }
    }
    store.close().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
