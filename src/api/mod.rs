//! HTTP layer exposing prediction and health endpoints.

pub mod routes;
pub mod types;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::model::InferenceService;

/// Shared handler state: the ready, read-only model service.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<InferenceService>,
}

pub fn router(service: Arc<InferenceService>) -> Router {
    Router::new()
        .route("/predict", post(routes::predict))
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}

pub async fn serve(service: Arc<InferenceService>, host: String, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    info!(%addr, version = ?service.version(), "serving review-labeler API");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router(service).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
