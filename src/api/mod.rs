//! Inbound HTTP surface of the alert relay
//!
//! Pacemaker pushes alerts here and Slack posts chat commands here. Alerts
//! are only validated and queued; delivery happens in the Slack dispatcher.
//!
//! ## Endpoints
//!
//! - `POST /pacemaker`, `POST /integrations/pacemaker` - Alert intake
//! - `POST /slack`, `POST /integrations/slack` - Chat commands
//! - `GET /health` - Health check

pub mod error;
pub mod routes;
pub mod state;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use state::RelayState;
pub use types::{CommandForm, CommandReply, HealthResponse};

use std::net::SocketAddr;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the relay router
pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/pacemaker", post(routes::pacemaker::receive_alert))
        .route("/integrations/pacemaker", post(routes::pacemaker::receive_alert))
        .route("/slack", post(routes::slack::receive_command))
        .route("/integrations/slack", post(routes::slack::receive_command))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Spawn the relay server
///
/// Binds before returning so a bad listen address is reported to the caller.
/// Returns the server's local address.
pub async fn spawn_relay_server(
    listen: SocketAddr,
    state: RelayState,
) -> anyhow::Result<SocketAddr> {
    info!("starting relay on {}", listen);

    let listener = tokio::net::TcpListener::bind(listen).await?;
    let addr = listener.local_addr()?;

    info!("relay listening on {}", addr);

    let app = router(state);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("relay server error: {}", e);
        }
    });

    Ok(addr)
}
