//! HTTP gateway for diva-relay
//!
//! Exposes the HTTP channel over a small JSON API and ships a trivial echo
//! agent for running the relay without a real consumer.

pub mod echo;
pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

pub use echo::EchoAgent;
pub use error::ApiError;
pub use server::{router, run_server};
pub use state::AppState;
