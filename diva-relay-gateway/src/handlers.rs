use axum::{extract::State, Json};
use std::time::Duration;

use crate::error::ApiError;
use crate::state::{AppState, HealthResponse, MessageRequest, MessageResponse};

const HTTP_CHANNEL: &str = "http";

/// Submit a message on the HTTP channel and wait for the agent's reply.
///
/// A missing reply still answers 200 with the channel's timeout notice.
pub async fn message_handler(
    State(state): State<AppState>,
    Json(payload): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text must not be empty".to_string()));
    }
    if payload.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("user_id must not be empty".to_string()));
    }

    let channel = state.channels.require_handler(HTTP_CHANNEL).await?;
    let timeout = payload
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| channel.default_timeout());

    tracing::debug!("Received message from {}", payload.user_id);
    let response = channel
        .send_message(&payload.text, &payload.user_id, timeout)
        .await?;

    Ok(Json(MessageResponse { response }))
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut running = Vec::new();
    for name in state.channels.list_channels().await {
        if state.channels.is_channel_running(&name).await {
            running.push(name);
        }
    }

    Json(HealthResponse {
        status: "ok".to_string(),
        channels: running,
    })
}
