use axum::{
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    routing::any,
    Router,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use super::services::{handle_update, Ack};
use crate::state::AppState;
use crate::telegram::dto::Update;

pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/api/webhook", any(webhook))
}

/// Telegram delivery endpoint. Every recognised case answers 200 so the
/// platform does not redeliver; non-POST requests are liveness probes.
#[instrument(skip(state, body), fields(request_id = %Uuid::new_v4()))]
pub async fn webhook(
    State(state): State<AppState>,
    method: Method,
    body: Bytes,
) -> (StatusCode, &'static str) {
    if method != Method::POST {
        return (StatusCode::OK, "OK");
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(u) => u,
        Err(e) => {
            warn!(error = %e, "body is not a telegram update");
            return (StatusCode::OK, Ack::NoMessage.body());
        }
    };
    tracing::debug!(update_id = ?update.update_id, "update received");

    let ack = handle_update(&state, update).await;
    (StatusCode::OK, ack.body())
}
