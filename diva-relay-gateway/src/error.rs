use axum::response::{IntoResponse, Response};
use axum::{http::StatusCode, Json};
use diva_relay_channels::ChannelError;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Channel(err) => match err {
                ChannelError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                ChannelError::AccessDenied(_) => StatusCode::FORBIDDEN,
                ChannelError::NotConfigured(_) | ChannelError::NotRunning(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                ChannelError::SendError(_) | ChannelError::Error(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
