//! HTTP channel integration
//!
//! Bridges a request/response transport onto the bus. Each call publishes an
//! inbound message and waits for the agent's outbound reply on the same
//! thread id. A background dispatcher drains the outbound queue and hands
//! each reply to the request waiting for it.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use diva_relay_core::bus::{InboundMessage, MessageBus, OutboundMessage};
use diva_relay_core::config::HttpChannelConfig;
use diva_relay_core::utils::truncate;

use crate::base::{BaseChannel, ChannelError, ChannelHandler, ChannelState, Result};
use crate::correlation::{PendingReplies, Resolution};
use crate::waiter::WaitOutcome;

const CHANNEL_NAME: &str = "http";
const PREVIEW_LEN: usize = 50;

/// Running dispatcher task and the token that stops it
struct Dispatcher {
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

/// HTTP channel handler
///
/// Does not listen on a socket itself; the transport calls
/// [`ChannelHandler::send_message`] for every request it receives.
pub struct HttpChannel {
    base: BaseChannel,
    config: HttpChannelConfig,
    pending: Arc<PendingReplies>,
    state: RwLock<ChannelState>,
    /// Also serializes start/stop
    dispatcher: Mutex<Option<Dispatcher>>,
}

impl HttpChannel {
    /// Create a new HTTP channel on `bus`
    pub fn new(config: HttpChannelConfig, bus: MessageBus) -> Self {
        Self {
            base: BaseChannel::new(CHANNEL_NAME, bus, config.allow_from.clone()),
            config,
            pending: Arc::new(PendingReplies::new()),
            state: RwLock::new(ChannelState::Stopped),
            dispatcher: Mutex::new(None),
        }
    }

    /// Number of requests currently waiting for a reply
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Whether a request is waiting on `thread_id`
    pub fn has_pending(&self, thread_id: &str) -> bool {
        self.pending.contains(thread_id)
    }

    fn set_state(&self, state: ChannelState) {
        *self.state.write() = state;
    }

    /// Drain outbound messages until `shutdown` fires
    async fn dispatch_loop(
        bus: MessageBus,
        pending: Arc<PendingReplies>,
        shutdown: CancellationToken,
    ) {
        debug!("Starting HTTP outbound dispatcher");

        loop {
            let msg = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                msg = bus.consume_outbound() => msg,
            };

            let Some(msg) = msg else {
                warn!("Outbound queue closed, stopping HTTP dispatcher");
                break;
            };

            isolate_fault(&msg, || Self::route_reply(&pending, &msg));
        }

        debug!("HTTP outbound dispatcher stopped");
    }

    fn route_reply(pending: &PendingReplies, msg: &OutboundMessage) {
        match pending.resolve(&msg.thread_id, &msg.text) {
            Resolution::Delivered { message_id } => {
                debug!(thread_id = %msg.thread_id, %message_id, "Delivered reply");
            }
            Resolution::WaiterGone { message_id } => {
                debug!(
                    thread_id = %msg.thread_id,
                    %message_id,
                    "Reply arrived after its request stopped waiting"
                );
            }
            Resolution::NoWaiter => {
                debug!(thread_id = %msg.thread_id, "Dropping reply with no pending request");
            }
        }
    }
}

/// Run one dispatcher step, logging a panic instead of unwinding the loop.
/// Returns whether the step completed.
fn isolate_fault<F: FnOnce()>(msg: &OutboundMessage, step: F) -> bool {
    match std::panic::catch_unwind(AssertUnwindSafe(step)) {
        Ok(()) => true,
        Err(panic) => {
            error!(
                thread_id = %msg.thread_id,
                "Error in HTTP outbound listener: {}",
                panic_message(panic.as_ref())
            );
            false
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[async_trait]
impl ChannelHandler for HttpChannel {
    fn name(&self) -> &str {
        &self.base.name
    }

    fn state(&self) -> ChannelState {
        *self.state.read()
    }

    async fn start(&self) -> Result<()> {
        let mut dispatcher = self.dispatcher.lock().await;
        if dispatcher.is_some() {
            return Ok(());
        }

        self.set_state(ChannelState::Starting);
        info!("Starting HTTP channel...");

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(Self::dispatch_loop(
            self.base.bus.clone(),
            Arc::clone(&self.pending),
            shutdown.clone(),
        ));
        *dispatcher = Some(Dispatcher { shutdown, handle });

        self.set_state(ChannelState::Running);
        info!("HTTP channel started");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let mut dispatcher = self.dispatcher.lock().await;
        let Some(Dispatcher { shutdown, handle }) = dispatcher.take() else {
            return Ok(());
        };

        self.set_state(ChannelState::Stopping);
        info!("Stopping HTTP channel...");

        shutdown.cancel();
        if let Err(e) = handle.await {
            error!("HTTP outbound dispatcher ended abnormally: {}", e);
        }

        // Waiting callers are not woken early; each returns at its own deadline
        let abandoned = self.pending.clear();
        if abandoned > 0 {
            info!("{} HTTP requests still waiting at shutdown", abandoned);
        }

        self.set_state(ChannelState::Stopped);
        info!("HTTP channel stopped");
        Ok(())
    }

    async fn send_message(
        &self,
        text: &str,
        caller_id: &str,
        timeout: Duration,
    ) -> Result<String> {
        if timeout.is_zero() {
            return Err(ChannelError::InvalidRequest(
                "timeout must be positive".to_string(),
            ));
        }
        if !self.is_allowed(caller_id) {
            warn!(
                "Access denied for sender {} on channel {}. Add them to allow_from to grant access.",
                caller_id, self.base.name
            );
            return Err(ChannelError::AccessDenied(caller_id.to_string()));
        }
        if !self.is_running() {
            return Err(ChannelError::NotRunning(self.base.name.clone()));
        }

        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Err(ChannelError::InvalidRequest(format!(
                "timeout of {}s is out of range",
                timeout.as_secs()
            )));
        };
        let message_id = Uuid::new_v4().to_string();
        let thread_id = self.base.thread_id(caller_id);

        let (waiter, replaced) = self.pending.register(&thread_id, &message_id);
        if let Some(previous) = replaced {
            warn!(
                %thread_id,
                superseded = %previous,
                "Request replaced an earlier one still waiting on the same thread"
            );
        }

        let inbound =
            InboundMessage::new(self.base.name.clone(), thread_id.clone(), caller_id, text)
                .with_id(message_id.clone())
                .with_metadata("user_id", caller_id);

        if let Err(e) = self.base.publish(inbound) {
            self.pending.remove_if(&thread_id, &message_id);
            return Err(e);
        }
        info!("HTTP message sent to bus: {}", truncate(text, PREVIEW_LEN));

        match waiter.wait_until(deadline).await {
            WaitOutcome::Completed(reply) => Ok(reply),
            WaitOutcome::TimedOut => {
                self.pending.remove_if(&thread_id, &message_id);
                warn!("HTTP message timeout for user {}", caller_id);
                Ok(self.config.timeout_notice.clone())
            }
            WaitOutcome::Abandoned => {
                // Superseded or shut down: answer at the deadline like any other timeout
                tokio::time::sleep_until(deadline).await;
                self.pending.remove_if(&thread_id, &message_id);
                warn!("HTTP message for user {} abandoned before a reply", caller_id);
                Ok(self.config.timeout_notice.clone())
            }
        }
    }

    fn default_timeout(&self) -> Duration {
        self.config.timeout()
    }

    fn is_allowed(&self, sender_id: &str) -> bool {
        self.base.is_allowed(sender_id)
    }
}

impl Default for HttpChannel {
    fn default() -> Self {
        Self::new(HttpChannelConfig::default(), MessageBus::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    const NOTICE: &str = "too slow";

    fn test_channel(bus: &MessageBus) -> HttpChannel {
        let config = HttpChannelConfig {
            timeout_notice: NOTICE.to_string(),
            ..HttpChannelConfig::default()
        };
        HttpChannel::new(config, bus.clone())
    }

    /// Answer every inbound message with `prefix` + its text
    fn spawn_echo(bus: &MessageBus, prefix: &'static str) -> JoinHandle<()> {
        let bus = bus.clone();
        tokio::spawn(async move {
            while let Some(msg) = bus.consume_inbound().await {
                let reply = msg.reply(format!("{}{}", prefix, msg.text));
                bus.publish_outbound(reply).unwrap();
            }
        })
    }

    #[test]
    fn test_http_channel_new() {
        let channel = HttpChannel::default();
        assert_eq!(channel.name(), "http");
        assert_eq!(channel.state(), ChannelState::Stopped);
        assert!(!channel.is_running());
        assert_eq!(channel.default_timeout(), Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_start_stop() {
        let bus = MessageBus::new();
        let channel = test_channel(&bus);

        channel.start().await.unwrap();
        assert!(channel.is_running());
        // Second start is a no-op
        channel.start().await.unwrap();
        assert!(channel.is_running());

        channel.stop().await.unwrap();
        assert_eq!(channel.state(), ChannelState::Stopped);
        channel.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_reply_is_returned() {
        let bus = MessageBus::new();
        let channel = test_channel(&bus);
        channel.start().await.unwrap();
        let _echo = spawn_echo(&bus, "echo: ");

        let reply = channel
            .send_message("ping", "u1", Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(reply, "echo: ping");
        assert!(!channel.has_pending("http-u1"));
    }

    #[tokio::test]
    async fn test_timeout_returns_notice() {
        let bus = MessageBus::new();
        let channel = test_channel(&bus);
        channel.start().await.unwrap();

        let started = Instant::now();
        let reply = channel
            .send_message("hello", "u1", Duration::from_millis(200))
            .await
            .unwrap();

        assert_eq!(reply, NOTICE);
        assert!(started.elapsed() >= Duration::from_millis(200));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(channel.pending_requests(), 0);
    }

    #[tokio::test]
    async fn test_inbound_message_fields() {
        let bus = MessageBus::new();
        let channel = test_channel(&bus);
        channel.start().await.unwrap();

        let send = channel.send_message("hi there", "u7", Duration::from_millis(100));
        let consume = async {
            let msg = bus.consume_inbound().await.unwrap();
            assert_eq!(msg.channel, "http");
            assert_eq!(msg.thread_id, "http-u7");
            assert_eq!(msg.sender_id, "u7");
            assert_eq!(msg.sender_name, "u7");
            assert_eq!(msg.text, "hi there");
            assert!(msg.attachments.is_empty());
            assert_eq!(msg.metadata.get("user_id"), Some(&serde_json::json!("u7")));
            assert!(Uuid::parse_str(&msg.id).is_ok());
        };

        let (reply, ()) = tokio::join!(send, consume);
        assert_eq!(reply.unwrap(), NOTICE);
    }

    #[tokio::test]
    async fn test_rejects_zero_timeout() {
        let bus = MessageBus::new();
        let channel = test_channel(&bus);
        channel.start().await.unwrap();

        let err = channel
            .send_message("hi", "u1", Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::InvalidRequest(_)));
        assert_eq!(bus.inbound_size(), 0);
    }

    #[tokio::test]
    async fn test_rejects_unrepresentable_timeout() {
        let bus = MessageBus::new();
        let channel = test_channel(&bus);
        channel.start().await.unwrap();

        let err = channel
            .send_message("hi", "u1", Duration::from_secs(u64::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::InvalidRequest(_)));
        assert_eq!(bus.inbound_size(), 0);
        assert_eq!(channel.pending_requests(), 0);
    }

    #[test]
    fn test_isolate_fault_contains_panic() {
        let msg = OutboundMessage::new("http", "http-u1", "boom");

        assert!(!isolate_fault(&msg, || panic!("route failed")));

        let mut ran = false;
        assert!(isolate_fault(&msg, || ran = true));
        assert!(ran);
    }

    #[tokio::test]
    async fn test_denied_sender_publishes_nothing() {
        let bus = MessageBus::new();
        let config = HttpChannelConfig {
            allow_from: vec!["friend".to_string()],
            ..HttpChannelConfig::default()
        };
        let channel = HttpChannel::new(config, bus.clone());
        channel.start().await.unwrap();

        let err = channel
            .send_message("hi", "stranger", Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, ChannelError::AccessDenied(_)));
        assert_eq!(bus.inbound_size(), 0);
        assert_eq!(channel.pending_requests(), 0);
    }

    #[tokio::test]
    async fn test_send_requires_running_channel() {
        let bus = MessageBus::new();
        let channel = test_channel(&bus);

        let err = channel
            .send_message("hi", "u1", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::NotRunning(_)));
    }

    #[tokio::test]
    async fn test_orphan_reply_does_not_stop_dispatcher() {
        let bus = MessageBus::new();
        let channel = test_channel(&bus);
        channel.start().await.unwrap();

        bus.publish_outbound(OutboundMessage::new("http", "http-nobody", "lost"))
            .unwrap();
        let _echo = spawn_echo(&bus, "");

        let reply = channel
            .send_message("still alive", "u1", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(reply, "still alive");
    }

    #[tokio::test]
    async fn test_newer_request_supersedes_older() {
        let bus = MessageBus::new();
        let channel = Arc::new(test_channel(&bus));
        channel.start().await.unwrap();

        let first = {
            let channel = Arc::clone(&channel);
            tokio::spawn(async move {
                channel
                    .send_message("first", "u1", Duration::from_millis(300))
                    .await
            })
        };
        let first_msg = bus.consume_inbound().await.unwrap();

        let second = {
            let channel = Arc::clone(&channel);
            tokio::spawn(async move {
                channel
                    .send_message("second", "u1", Duration::from_secs(5))
                    .await
            })
        };
        let second_msg = bus.consume_inbound().await.unwrap();
        assert_eq!(first_msg.thread_id, second_msg.thread_id);

        bus.publish_outbound(second_msg.reply("for second")).unwrap();

        assert_eq!(second.await.unwrap().unwrap(), "for second");
        let started = Instant::now();
        assert_eq!(first.await.unwrap().unwrap(), NOTICE);
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(channel.pending_requests(), 0);
    }

    #[tokio::test]
    async fn test_stop_leaves_pending_request_to_its_deadline() {
        let bus = MessageBus::new();
        let channel = Arc::new(test_channel(&bus));
        channel.start().await.unwrap();

        let started = Instant::now();
        let pending = {
            let channel = Arc::clone(&channel);
            tokio::spawn(async move {
                channel
                    .send_message("waiting", "u1", Duration::from_millis(400))
                    .await
            })
        };
        bus.consume_inbound().await.unwrap();

        timeout(Duration::from_millis(200), channel.stop())
            .await
            .expect("stop should not wait for pending requests")
            .unwrap();
        assert_eq!(channel.state(), ChannelState::Stopped);
        assert!(!pending.is_finished());

        assert_eq!(pending.await.unwrap().unwrap(), NOTICE);
        assert!(started.elapsed() >= Duration::from_millis(400));
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
