//! Provisioning HTTP API (axum).

pub mod error;
pub mod handlers;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use vms_provision::TenantService;

pub use error::{AppError, ErrorResponse, PROVISIONING_FAILED};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TenantService>,
}

pub fn router(service: Arc<TenantService>) -> Router {
    let v1 = Router::new()
        .route("/tenants", post(handlers::create_tenant))
        .route("/tenants/{id}", get(handlers::get_tenant));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/v1", v1)
        .with_state(AppState { service })
}

/// Serve the API on `listener` until Ctrl-C.
pub async fn serve(listener: TcpListener, service: Arc<TenantService>) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!("Provisioning API listening on http://{}", addr);
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
