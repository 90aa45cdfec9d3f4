//! Event types for the message bus

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Message submitted by a channel for the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Globally unique message identifier
    pub id: String,
    /// Channel identifier (e.g., "http")
    pub channel: String,
    /// Conversation identifier used to correlate the reply
    pub thread_id: String,
    /// User identifier
    pub sender_id: String,
    /// Display name of the sender
    pub sender_name: String,
    /// Message text content
    pub text: String,
    /// Message timestamp
    pub timestamp: DateTime<Utc>,
    /// Attachment URLs or paths, in order
    #[serde(default)]
    pub attachments: Vec<String>,
    /// Channel-specific metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl InboundMessage {
    /// Create a new inbound message with a fresh id
    pub fn new(
        channel: impl Into<String>,
        thread_id: impl Into<String>,
        sender_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let sender_id = sender_id.into();
        Self {
            id: Uuid::new_v4().to_string(),
            channel: channel.into(),
            thread_id: thread_id.into(),
            sender_name: sender_id.clone(),
            sender_id,
            text: text.into(),
            timestamp: Utc::now(),
            attachments: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Use a caller-minted message id instead of the generated one
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the sender display name
    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = name.into();
        self
    }

    /// Add an attachment to the message
    pub fn with_attachment(mut self, attachment: impl Into<String>) -> Self {
        self.attachments.push(attachment.into());
        self
    }

    /// Add metadata to the message
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Build the reply for this message.
    ///
    /// The reply keeps the channel and thread id so the waiting channel can
    /// match it, and points `reply_to` at this message.
    pub fn reply(&self, text: impl Into<String>) -> OutboundMessage {
        OutboundMessage::new(self.channel.clone(), self.thread_id.clone(), text).reply_to(&self.id)
    }
}

/// Message produced by the agent for a channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Globally unique message identifier
    pub id: String,
    /// Channel identifier
    pub channel: String,
    /// Conversation identifier, copied from the inbound message it answers
    pub thread_id: String,
    /// Message text content
    pub text: String,
    /// Message timestamp
    pub timestamp: DateTime<Utc>,
    /// Optional message to reply to
    pub reply_to: Option<String>,
    /// Attachment URLs or paths, in order
    #[serde(default)]
    pub attachments: Vec<String>,
    /// Channel-specific metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl OutboundMessage {
    /// Create a new outbound message
    pub fn new(
        channel: impl Into<String>,
        thread_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            channel: channel.into(),
            thread_id: thread_id.into(),
            text: text.into(),
            timestamp: Utc::now(),
            reply_to: None,
            attachments: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Set the reply-to message ID
    pub fn reply_to(mut self, message_id: impl Into<String>) -> Self {
        self.reply_to = Some(message_id.into());
        self
    }

    /// Add an attachment to the message
    pub fn with_attachment(mut self, attachment: impl Into<String>) -> Self {
        self.attachments.push(attachment.into());
        self
    }

    /// Add metadata to the message
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
