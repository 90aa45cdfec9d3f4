//! Base trait for channel handlers

use async_trait::async_trait;
use diva_relay_core::bus::{InboundMessage, MessageBus};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle state of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChannelState::Stopped => "stopped",
            ChannelState::Starting => "starting",
            ChannelState::Running => "running",
            ChannelState::Stopping => "stopping",
        };
        f.write_str(s)
    }
}

/// Trait for channel handlers
///
/// Lifecycle methods take `&self` so a running channel can be stopped while
/// requests are still waiting on it.
#[async_trait]
pub trait ChannelHandler: Send + Sync {
    /// Get the channel name
    fn name(&self) -> &str;

    /// Current lifecycle state
    fn state(&self) -> ChannelState;

    /// Check if the channel is running
    fn is_running(&self) -> bool {
        self.state() == ChannelState::Running
    }

    /// Start the channel handler
    async fn start(&self) -> Result<()>;

    /// Stop the channel handler
    async fn stop(&self) -> Result<()>;

    /// Submit `text` for `caller_id` and wait up to `timeout` for the reply.
    ///
    /// A missing reply is not an error: the caller gets the channel's
    /// timeout notice as the text.
    async fn send_message(&self, text: &str, caller_id: &str, timeout: Duration)
        -> Result<String>;

    /// Timeout used when the caller does not pick one
    fn default_timeout(&self) -> Duration;

    /// Check if a sender is allowed
    fn is_allowed(&self, sender_id: &str) -> bool;
}

/// Channel errors
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel error: {0}")]
    Error(String),

    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    #[error("Channel not running: {0}")]
    NotRunning(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Send error: {0}")]
    SendError(String),

    #[error("Access denied for sender: {0}")]
    AccessDenied(String),
}

pub type Result<T> = std::result::Result<T, ChannelError>;

/// Common channel state: name, allow list and the bus it publishes to
pub struct BaseChannel {
    /// Channel name
    pub name: String,
    /// Allowed senders list (empty = allow all)
    pub allow_from: Vec<String>,
    /// Bus shared with the agent
    pub bus: MessageBus,
}

impl BaseChannel {
    /// Create a new base channel
    pub fn new(name: impl Into<String>, bus: MessageBus, allow_from: Vec<String>) -> Self {
        Self {
            name: name.into(),
            allow_from,
            bus,
        }
    }

    /// Check if a sender is allowed
    pub fn is_allowed(&self, sender_id: &str) -> bool {
        if self.allow_from.is_empty() {
            return true;
        }

        if self.allow_from.iter().any(|allowed| allowed == sender_id) {
            return true;
        }

        // Compound IDs (e.g., "12345|username") match on any part
        sender_id
            .split('|')
            .filter(|part| !part.is_empty())
            .any(|part| self.allow_from.iter().any(|allowed| allowed == part))
    }

    /// Conversation id for a caller on this channel
    pub fn thread_id(&self, caller_id: &str) -> String {
        format!("{}-{}", self.name, caller_id)
    }

    /// Publish a message to the agent
    pub fn publish(&self, msg: InboundMessage) -> Result<()> {
        self.bus
            .publish_inbound(msg)
            .map_err(|e| ChannelError::SendError(e.to_string()))
    }
}

/// Shared channel handler type
pub type ChannelHandlerPtr = Arc<dyn ChannelHandler>;
