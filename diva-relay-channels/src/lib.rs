//! Channel adapters for diva-relay
//!
//! A channel turns an external request into an inbound bus message and
//! waits for the agent's reply on the same conversation.

pub mod base;
pub mod correlation;
pub mod http;
pub mod manager;
pub mod waiter;

pub use base::{BaseChannel, ChannelError, ChannelHandler, ChannelHandlerPtr, ChannelState, Result};
pub use correlation::{PendingReplies, Resolution};
pub use http::HttpChannel;
pub use manager::ChannelManager;
pub use waiter::{waiter, Completer, WaitOutcome, Waiter};
