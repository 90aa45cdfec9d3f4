use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{health_handler, message_handler};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/message", post(message_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(
    state: AppState,
    addr: SocketAddr,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            tracing::info!("Server shutting down signal received");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::echo::EchoAgent;
    use crate::state::{HealthResponse, MessageResponse};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use diva_relay_channels::ChannelManager;
    use diva_relay_core::bus::MessageBus;
    use diva_relay_core::config::Config;
    use serde::de::DeserializeOwned;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn started_state(config: Config) -> AppState {
        let manager = ChannelManager::new(config, MessageBus::new());
        manager.initialize().await.unwrap();
        manager.start_all().await.unwrap();
        AppState::new(Arc::new(manager))
    }

    fn post_message(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/message")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json<T: DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_message_round_trip_with_echo_agent() {
        let state = started_state(Config::default()).await;
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
        tokio::spawn(EchoAgent::new(state.channels.bus().clone()).run(shutdown_rx));

        let response = router(state)
            .oneshot(post_message(
                serde_json::json!({"text": "hello", "user_id": "u1"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: MessageResponse = read_json(response).await;
        assert_eq!(body.response, "echo: hello");
    }

    #[tokio::test]
    async fn test_message_timeout_is_ok_response() {
        let state = started_state(Config::default()).await;

        let response = router(state)
            .oneshot(post_message(
                serde_json::json!({"text": "anyone?", "user_id": "u1", "timeout_secs": 1}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: MessageResponse = read_json(response).await;
        assert_eq!(body.response, Config::default().channels.http.timeout_notice);
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected() {
        let state = started_state(Config::default()).await;

        let response = router(state)
            .oneshot(post_message(serde_json::json!({"text": " ", "user_id": "u1"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_zero_timeout_is_rejected() {
        let state = started_state(Config::default()).await;

        let response = router(state)
            .oneshot(post_message(
                serde_json::json!({"text": "hi", "user_id": "u1", "timeout_secs": 0}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_oversized_timeout_is_rejected() {
        let state = started_state(Config::default()).await;

        let response = router(state)
            .oneshot(post_message(
                serde_json::json!({"text": "hi", "user_id": "u1", "timeout_secs": u64::MAX}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_blank_user_id_is_rejected() {
        let state = started_state(Config::default()).await;

        let response = router(state)
            .oneshot(post_message(serde_json::json!({"text": "hi", "user_id": "\t "})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_denied_sender_is_forbidden() {
        let mut config = Config::default();
        config.channels.http.allow_from = vec!["friend".to_string()];
        let state = started_state(config).await;

        let response = router(state)
            .oneshot(post_message(serde_json::json!({"text": "hi", "user_id": "stranger"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_disabled_channel_is_unavailable() {
        let mut config = Config::default();
        config.channels.http.enabled = false;
        let state = started_state(config).await;

        let response = router(state)
            .oneshot(post_message(serde_json::json!({"text": "hi", "user_id": "u1"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_health_lists_running_channels() {
        let state = started_state(Config::default()).await;

        let response = router(state)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: HealthResponse = read_json(response).await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.channels, vec!["http".to_string()]);
    }
}
