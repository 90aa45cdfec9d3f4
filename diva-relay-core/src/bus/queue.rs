//! Async message queue implementation

use super::events::{InboundMessage, OutboundMessage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::trace;

/// Async message bus that decouples channels from the agent
///
/// Channels push messages to the inbound queue, and the agent processes
/// them and pushes responses to the outbound queue. Both directions are
/// unbounded FIFO queues; the bus never drops a message and knows nothing
/// about which reply belongs to which request.
///
/// Cloning the bus yields another handle to the same queues.
#[derive(Clone)]
pub struct MessageBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    /// Inbound messages from channels
    inbound_tx: mpsc::UnboundedSender<InboundMessage>,
    inbound_rx: Mutex<mpsc::UnboundedReceiver<InboundMessage>>,
    inbound_len: AtomicUsize,
    /// Outbound messages to channels
    outbound_tx: mpsc::UnboundedSender<OutboundMessage>,
    outbound_rx: Mutex<mpsc::UnboundedReceiver<OutboundMessage>>,
    outbound_len: AtomicUsize,
}

impl MessageBus {
    /// Create a new message bus
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        Self {
            inner: Arc::new(BusInner {
                inbound_tx,
                inbound_rx: Mutex::new(inbound_rx),
                inbound_len: AtomicUsize::new(0),
                outbound_tx,
                outbound_rx: Mutex::new(outbound_rx),
                outbound_len: AtomicUsize::new(0),
            }),
        }
    }

    /// Publish a message from a channel to the agent
    pub fn publish_inbound(&self, msg: InboundMessage) -> crate::Result<()> {
        trace!(thread_id = %msg.thread_id, "Publishing inbound message");
        // Count before sending so a fast consumer never decrements first
        self.inner.inbound_len.fetch_add(1, Ordering::AcqRel);
        self.inner.inbound_tx.send(msg).map_err(|_| {
            self.inner.inbound_len.fetch_sub(1, Ordering::AcqRel);
            crate::Error::Channel("Inbound channel closed".to_string())
        })
    }

    /// Publish a response from the agent to channels
    pub fn publish_outbound(&self, msg: OutboundMessage) -> crate::Result<()> {
        trace!(thread_id = %msg.thread_id, "Publishing outbound message");
        // Count before sending so a fast consumer never decrements first
        self.inner.outbound_len.fetch_add(1, Ordering::AcqRel);
        self.inner.outbound_tx.send(msg).map_err(|_| {
            self.inner.outbound_len.fetch_sub(1, Ordering::AcqRel);
            crate::Error::Channel("Outbound channel closed".to_string())
        })
    }

    /// Wait for the next inbound message.
    ///
    /// Cancel-safe: dropping the returned future before it completes leaves
    /// the queue untouched. Returns `None` only once the queue is closed.
    pub async fn consume_inbound(&self) -> Option<InboundMessage> {
        let mut rx = self.inner.inbound_rx.lock().await;
        let msg = rx.recv().await;
        if msg.is_some() {
            self.inner.inbound_len.fetch_sub(1, Ordering::AcqRel);
        }
        msg
    }

    /// Wait for the next outbound message.
    ///
    /// Cancel-safe in the same way as [`MessageBus::consume_inbound`].
    pub async fn consume_outbound(&self) -> Option<OutboundMessage> {
        let mut rx = self.inner.outbound_rx.lock().await;
        let msg = rx.recv().await;
        if msg.is_some() {
            self.inner.outbound_len.fetch_sub(1, Ordering::AcqRel);
        }
        msg
    }

    /// Number of inbound messages waiting to be consumed
    pub fn inbound_size(&self) -> usize {
        self.inner.inbound_len.load(Ordering::Acquire)
    }

    /// Number of outbound messages waiting to be consumed
    pub fn outbound_size(&self) -> usize {
        self.inner.outbound_len.load(Ordering::Acquire)
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}
