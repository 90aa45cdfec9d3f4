//! Channel manager

use crate::base::{ChannelError, ChannelHandlerPtr, Result};
use crate::http::HttpChannel;
use diva_relay_core::bus::MessageBus;
use diva_relay_core::config::schema::Config;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Channel manager that coordinates all channel handlers
pub struct ChannelManager {
    /// Configuration
    config: Config,
    /// Bus shared by every channel and the agent
    bus: MessageBus,
    /// Channel handlers
    handlers: RwLock<HashMap<String, ChannelHandlerPtr>>,
}

impl ChannelManager {
    /// Create a new channel manager
    pub fn new(config: Config, bus: MessageBus) -> Self {
        Self {
            config,
            bus,
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Initialize channels based on configuration
    pub async fn initialize(&self) -> Result<()> {
        let mut handlers = self.handlers.write().await;

        if self.config.channels.http.enabled {
            let handler = HttpChannel::new(self.config.channels.http.clone(), self.bus.clone());
            handlers.insert("http".to_string(), Arc::new(handler) as ChannelHandlerPtr);
            tracing::info!("HTTP channel initialized");
        } else {
            tracing::info!("HTTP channel disabled");
        }

        Ok(())
    }

    /// Register an already-built channel under its own name
    pub async fn register(&self, handler: ChannelHandlerPtr) {
        let name = handler.name().to_string();
        let previous = self.handlers.write().await.insert(name.clone(), handler);
        if let Some(previous) = previous {
            if let Err(e) = previous.stop().await {
                tracing::error!("Failed to stop replaced {} channel: {}", name, e);
            }
        }
    }

    /// Start all channel handlers
    pub async fn start_all(&self) -> Result<()> {
        let handlers = self.handlers.read().await;

        for (name, handler) in handlers.iter() {
            tracing::info!("Starting {} channel...", name);
            if let Err(e) = handler.start().await {
                tracing::error!("Failed to start {} channel: {}", name, e);
            }
        }

        Ok(())
    }

    /// Stop all channel handlers
    pub async fn stop_all(&self) -> Result<()> {
        let mut handlers = self.handlers.write().await;

        for (name, handler) in handlers.iter() {
            tracing::info!("Stopping {} channel...", name);
            if let Err(e) = handler.stop().await {
                tracing::error!("Failed to stop {} channel: {}", name, e);
            }
        }

        handlers.clear();
        Ok(())
    }

    /// Get a channel handler by name
    pub async fn get_handler(&self, name: &str) -> Option<ChannelHandlerPtr> {
        let handlers = self.handlers.read().await;
        handlers.get(name).cloned()
    }

    /// Get a channel handler by name, failing if it is not registered
    pub async fn require_handler(&self, name: &str) -> Result<ChannelHandlerPtr> {
        self.get_handler(name)
            .await
            .ok_or_else(|| ChannelError::NotConfigured(format!("Channel {} not found", name)))
    }

    /// Check if a channel is running
    pub async fn is_channel_running(&self, name: &str) -> bool {
        let handlers = self.handlers.read().await;
        handlers
            .get(name)
            .is_some_and(|handler| handler.is_running())
    }

    /// Get list of active channels
    pub async fn list_channels(&self) -> Vec<String> {
        let handlers = self.handlers.read().await;
        let mut names: Vec<String> = handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// The bus shared by the managed channels
    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }
}

impl Default for ChannelManager {
    fn default() -> Self {
        Self::new(Config::default(), MessageBus::new())
    }
}
