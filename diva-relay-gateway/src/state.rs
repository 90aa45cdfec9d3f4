use diva_relay_channels::ChannelManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub channels: Arc<ChannelManager>,
}

impl AppState {
    pub fn new(channels: Arc<ChannelManager>) -> Self {
        Self { channels }
    }
}

/// Body of `POST /message`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRequest {
    pub text: String,
    pub user_id: String,
    /// Overrides the channel's reply timeout
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub channels: Vec<String>,
}
