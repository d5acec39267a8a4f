//! Alerts pushed by pacemaker

use axum::{body::Bytes, extract::State};
use tracing::{debug, info, warn};

use crate::alerts::AlertEvent;
use crate::api::error::ApiResult;
use crate::api::state::RelayState;

/// POST /pacemaker
///
/// Accepts a pacemaker alert. Active anomalies are queued for Slack,
/// recoveries and state-less events are acknowledged and dropped.
pub async fn receive_alert(
    State(state): State<RelayState>,
    body: Bytes,
) -> ApiResult<&'static str> {
    let alert: AlertEvent = serde_json::from_slice(&body)
        .inspect_err(|e| warn!("rejecting alert body: {}", e))?;

    if !alert.is_active() {
        info!(
            "suppressing {} alert for {}",
            alert.state.as_deref().unwrap_or("state-less"),
            alert.check
        );
        return Ok("OK");
    }

    debug!("relaying alert for {}", alert.check);
    state.enqueue(alert);

    Ok("OK")
}
