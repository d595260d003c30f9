//! Response bodies of the HTTP endpoints

use crate::lobby::LobbySummary;
use crate::metrics::MetricsSnapshot;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LobbiesResponse {
    pub lobbies: Vec<LobbySummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsResponse {
    #[serde(flatten)]
    pub engine: MetricsSnapshot,
    pub uptime_secs: i64,
}

/// Query string of the WebSocket endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectQuery {
    pub player_id: Option<u64>,
}
