//! HTTP listener serving the game server's poll cycle

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::application::errors::RelayError;
use crate::application::relay::broker::RelayBroker;
use crate::domain::entities::PollResponse;

/// Build the poll router.  GET and POST share one handler; the response is
/// always 200 with the standard drain payload.
pub fn build_router(broker: Arc<RelayBroker>) -> Router {
    Router::new()
        .route("/", get(poll).post(poll))
        .route("/health", get(health))
        .with_state(broker)
}

async fn poll(State(broker): State<Arc<RelayBroker>>, body: Bytes) -> Json<PollResponse> {
    Json(broker.handle_poll(&body).await)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "discord-relay",
    }))
}

/// Serve the poll endpoint until the process exits
pub async fn serve(broker: Arc<RelayBroker>, port: u16) -> Result<(), RelayError> {
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    tracing::info!("Relay endpoint listening on http://127.0.0.1:{}", port);
    axum::serve(listener, build_router(broker)).await?;
    Ok(())
}
