//! Echo agent
//!
//! Answers every inbound message on its own thread. Used by
//! `diva-relay gateway --echo` and by tests; a real deployment replaces it
//! with an agent that consumes the same bus.

use diva_relay_core::bus::{InboundMessage, MessageBus};
use diva_relay_core::utils::truncate;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

pub struct EchoAgent {
    bus: MessageBus,
    prefix: String,
}

impl EchoAgent {
    pub fn new(bus: MessageBus) -> Self {
        Self {
            bus,
            prefix: "echo: ".to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Consume inbound messages until the shutdown signal fires
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("Echo agent started");

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                msg = self.bus.consume_inbound() => match msg {
                    Some(msg) => self.answer(&msg),
                    None => break,
                },
            }
        }

        info!("Echo agent stopped");
    }

    fn answer(&self, msg: &InboundMessage) {
        debug!(
            thread_id = %msg.thread_id,
            "Echoing: {}",
            truncate(&msg.text, 50)
        );
        let reply = msg.reply(format!("{}{}", self.prefix, msg.text));
        if let Err(e) = self.bus.publish_outbound(reply) {
            error!("Failed to publish echo reply: {}", e);
        }
    }
}
