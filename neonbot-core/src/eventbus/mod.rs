//! src/eventbus/mod.rs
//!
//! Provides an in-process event bus that supports guaranteed delivery
//! to multiple subscribers via bounded MPSC queues.

use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use twilight_model::gateway::payload::incoming::InteractionCreate;
use twilight_model::id::Id;
use twilight_model::id::marker::{ApplicationMarker, ChannelMarker, UserMarker};

use neonbot_common::models::{ChatMessage, ReactionEvent};

/// Events the Discord shards publish for the handlers to consume.
#[derive(Debug, Clone)]
pub enum BotEvent {
    /// Gateway session is ready; carries the identities the handlers need.
    Ready {
        bot_user_id: Id<UserMarker>,
        application_id: Id<ApplicationMarker>,
        shard_id: u32,
    },

    /// A chat message (prefix commands live here).
    MessageCreate(ChatMessage),

    /// Someone reacted to a message.
    ReactionAdd(ReactionEvent),

    /// Slash command or other interaction.
    Interaction(Box<InteractionCreate>),
}

impl BotEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            BotEvent::Ready { .. } => "ready",
            BotEvent::MessageCreate(_) => "message.create",
            BotEvent::ReactionAdd(_) => "reaction.add",
            BotEvent::Interaction(_) => "interaction.create",
        }
    }

    /// Channel the event belongs to, when it has one.
    pub fn channel_id(&self) -> Option<Id<ChannelMarker>> {
        match self {
            BotEvent::Ready { .. } => None,
            BotEvent::MessageCreate(msg) => Some(msg.channel_id),
            BotEvent::ReactionAdd(reaction) => Some(reaction.channel_id),
            BotEvent::Interaction(interaction) => interaction.0.channel.as_ref().map(|c| c.id),
        }
    }
}

/// Each subscriber gets its own `mpsc::Sender<BotEvent>` for guaranteed delivery.
///
/// - If the subscriber’s channel buffer fills, `publish` will await
///   until there's space (backpressure).
/// - If the subscriber has dropped the `Receiver`, the channel is closed
///   and sending returns an error.
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<BotEvent>>>>,
    shutdown_tx: watch::Sender<bool>,
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Default size for each subscriber’s buffer.
const DEFAULT_BUFFER_SIZE: usize = 1000;

impl EventBus {
    /// Create a new, empty event bus.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            subscribers: Arc::new(Mutex::new(vec![])),
            shutdown_tx: tx,
            shutdown_rx: rx,
        }
    }

    /// Flag shutdown and close every subscriber queue.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        self.subscribers.lock().await.clear();
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Resolves once `shutdown` has been called.
    pub async fn wait_for_shutdown(&self) {
        let mut rx = self.shutdown_rx.clone();
        let _ = rx.wait_for(|down| *down).await;
    }

    /// Returns a receiver on which events will be delivered.
    pub async fn subscribe(&self, buffer_size: Option<usize>) -> mpsc::Receiver<BotEvent> {
        let size = buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE);
        let (tx, rx) = mpsc::channel(size);
        let mut subs = self.subscribers.lock().await;
        subs.push(tx);
        rx
    }

    /// Publish an event to all subscribers. Dropped subscribers are pruned.
    pub async fn publish(&self, event: BotEvent) {
        if self.is_shutdown() {
            return;
        }
        let senders = {
            let subs = self.subscribers.lock().await;
            subs.clone()
        };
        let mut closed = false;
        for s in senders {
            if s.send(event.clone()).await.is_err() {
                closed = true;
            }
        }
        if closed {
            self.subscribers.lock().await.retain(|s| !s.is_closed());
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, timeout, Duration};

    fn ready(shard_id: u32) -> BotEvent {
        BotEvent::Ready {
            bot_user_id: Id::new(1),
            application_id: Id::new(2),
            shard_id,
        }
    }

    fn shard_of(event: &BotEvent) -> Option<u32> {
        match event {
            BotEvent::Ready { shard_id, .. } => Some(*shard_id),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::new();

        let mut rx1 = bus.subscribe(Some(5)).await;
        let mut rx2 = bus.subscribe(Some(5)).await;

        bus.publish(ready(0)).await;

        let evt1 = rx1.recv().await.expect("rx1 should get event");
        let evt2 = rx2.recv().await.expect("rx2 should get event");
        assert_eq!(evt1.event_type(), "ready");
        assert_eq!(evt2.event_type(), "ready");
    }

    #[tokio::test]
    async fn test_backpressure_blocking() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe(Some(1)).await; // queue size = 1

        bus.publish(ready(1)).await;

        let handle = tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            let first = rx.recv().await.expect("expected first message");
            let second = rx.recv().await.expect("expected second message");
            (first, second)
        });

        // This call waits until the reader makes room.
        let second_publish = bus.publish(ready(2));
        let result = timeout(Duration::from_millis(500), second_publish).await;
        assert!(result.is_ok(), "publish should eventually unblock");

        let (evt1, evt2) = handle.await.unwrap();
        assert_eq!(shard_of(&evt1), Some(1));
        assert_eq!(shard_of(&evt2), Some(2));
    }

    #[tokio::test]
    async fn test_shutdown_closes_subscribers() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe(Some(5)).await;

        bus.shutdown().await;
        assert!(bus.is_shutdown());
        bus.publish(ready(0)).await;
        assert!(rx.recv().await.is_none(), "queue should be closed after shutdown");

        timeout(Duration::from_millis(100), bus.wait_for_shutdown())
            .await
            .expect("wait_for_shutdown resolves after shutdown");
    }

    #[tokio::test]
    async fn test_dropped_subscriber_is_pruned() {
        let bus = EventBus::new();
        let rx = bus.subscribe(Some(5)).await;
        drop(rx);
        bus.publish(ready(0)).await;
        assert!(bus.subscribers.lock().await.is_empty());
    }
}
