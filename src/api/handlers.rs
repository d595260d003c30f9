//! Request handlers

use super::{
    errors::ApiError,
    middleware::RequestId,
    models::{HealthResponse, LobbiesResponse, MetricsResponse},
};
use crate::common::traits::Ledger;
use crate::common::types::Stake;
use crate::lobby::LobbySummary;
use crate::metrics::EngineMetrics;
use crate::registry::LobbyRegistry;
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    pub registry: Arc<LobbyRegistry>,
    pub ledger: Arc<dyn Ledger>,
    pub metrics: Arc<EngineMetrics>,
    pub started_at: DateTime<Utc>,
    pub version: String,
}

/// GET /health
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Running".to_string(),
        version: state.version.clone(),
    })
}

/// GET /lobbies
pub async fn lobbies_handler(State(state): State<Arc<AppState>>) -> Json<LobbiesResponse> {
    Json(LobbiesResponse {
        lobbies: state.registry.summaries().await,
    })
}

/// GET /lobbies/:stake
pub async fn lobby_handler(
    Extension(request_id): Extension<RequestId>,
    Path(stake): Path<Stake>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<LobbySummary>, ApiError> {
    let lobby = state
        .registry
        .get(stake)
        .ok_or_else(|| ApiError::not_found(request_id.0, format!("No lobby for stake {}", stake)))?;
    Ok(Json(lobby.summary().await))
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        engine: state.metrics.snapshot(),
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}
