//! Core types for diva-relay
//!
//! This crate provides the message bus, the bus event types, configuration
//! and logging shared by every diva-relay component.

pub mod bus;
pub mod config;
pub mod error;
pub mod logging;
pub mod utils;

pub use error::{Error, Result};
