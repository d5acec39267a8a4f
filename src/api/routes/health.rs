//! Health check endpoint

use axum::{Json, extract::State};

use crate::api::state::RelayState;
use crate::api::types::HealthResponse;

/// GET /health
///
/// Liveness plus the number of alerts still waiting for Slack
pub async fn health_check(State(state): State<RelayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        queued_alerts: state.queued(),
    })
}
