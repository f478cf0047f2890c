use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use twilight_model::id::Id;
use twilight_model::id::marker::ChannelMarker;

use crate::eventbus::{BotEvent, EventBus};
use crate::services::event_context::EventContext;
use crate::services::event_handler::EventHandler;
use crate::services::event_registry::EventHandlerRegistry;

/// How often idle channel workers are dropped.
const WORKER_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

type Job = (Vec<Arc<dyn EventHandler>>, BotEvent);

/// Sequential queue for one channel's events.
struct ChannelWorker {
    tx: mpsc::UnboundedSender<Job>,
    /// Jobs sent but not yet fully handled. Only the dispatcher increments it.
    pending: Arc<AtomicUsize>,
}

impl ChannelWorker {
    fn spawn(channel_id: Id<ChannelMarker>, context: Arc<EventContext>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let pending = Arc::new(AtomicUsize::new(0));
        let counter = pending.clone();
        tokio::spawn(async move {
            while let Some((handlers, event)) = rx.recv().await {
                run_handlers(&handlers, &event, &context).await;
                counter.fetch_sub(1, Ordering::AcqRel);
            }
            debug!("DiscordEventService: worker for channel {channel_id} exited");
        });
        Self { tx, pending }
    }

    fn is_idle(&self) -> bool {
        self.pending.load(Ordering::Acquire) == 0
    }
}

/// Service that listens for Discord events on the EventBus and dispatches
/// them to registered handlers using the EventHandlerRegistry.
///
/// Events for the same channel are handled strictly in arrival order, one
/// after another. Different channels run concurrently, so a slow `/karaoke`
/// launch never holds up a reaction on another channel's control message.
pub struct DiscordEventService {
    event_bus: Arc<EventBus>,
    registry: Arc<EventHandlerRegistry>,
    context: Arc<EventContext>,
}

impl DiscordEventService {
    pub fn new(
        event_bus: Arc<EventBus>,
        registry: Arc<EventHandlerRegistry>,
        context: Arc<EventContext>,
    ) -> Self {
        Self {
            event_bus,
            registry,
            context,
        }
    }

    /// Subscribe now and dispatch in the background. Events published after
    /// this returns are guaranteed to be seen.
    pub async fn start(self) -> JoinHandle<()> {
        let rx = self.event_bus.subscribe(None).await;
        info!("DiscordEventService: Started, listening on EventBus");
        tokio::spawn(self.run(rx))
    }

    async fn run(self, mut rx: mpsc::Receiver<BotEvent>) {
        let mut workers: HashMap<Id<ChannelMarker>, ChannelWorker> = HashMap::new();
        let mut prune = tokio::time::interval(WORKER_PRUNE_INTERVAL);

        loop {
            tokio::select! {
                maybe_event = rx.recv() => match maybe_event {
                    Some(event) => self.dispatch_event(event, &mut workers).await,
                    None => break,
                },
                _ = prune.tick() => {
                    // Safe: nothing else sends, so an idle worker has an empty queue.
                    workers.retain(|_, worker| !worker.is_idle());
                }
            }
        }
        info!("DiscordEventService: Shutting down listener loop");
    }

    /// Dispatch an event to all registered handlers
    async fn dispatch_event(
        &self,
        event: BotEvent,
        workers: &mut HashMap<Id<ChannelMarker>, ChannelWorker>,
    ) {
        let handlers = self.registry.get_handlers_for_event(&event).await;
        if handlers.is_empty() {
            debug!("DiscordEventService: No handlers registered for {}", event.event_type());
            return;
        }

        let Some(channel_id) = event.channel_id() else {
            run_handlers(&handlers, &event, &self.context).await;
            return;
        };

        let worker = workers
            .entry(channel_id)
            .or_insert_with(|| ChannelWorker::spawn(channel_id, self.context.clone()));
        worker.pending.fetch_add(1, Ordering::AcqRel);
        if let Err(mpsc::error::SendError(job)) = worker.tx.send((handlers, event)) {
            // The previous worker died mid-handler; start over with a fresh one.
            warn!("DiscordEventService: worker for channel {channel_id} was gone, restarting it");
            let fresh = ChannelWorker::spawn(channel_id, self.context.clone());
            fresh.pending.fetch_add(1, Ordering::AcqRel);
            if fresh.tx.send(job).is_err() {
                error!("DiscordEventService: could not hand event to channel {channel_id}");
            }
            workers.insert(channel_id, fresh);
        }
    }
}

/// Execute handlers in priority order
async fn run_handlers(handlers: &[Arc<dyn EventHandler>], event: &BotEvent, context: &EventContext) {
    for handler in handlers {
        match handler.handle(event, context).await {
            Ok(true) => {
                debug!("DiscordEventService: Handler '{}' processed {}", handler.id(), event.event_type());
            }
            Ok(false) => {
                debug!("DiscordEventService: Handler '{}' skipped {}", handler.id(), event.event_type());
            }
            Err(e) => {
                error!("DiscordEventService: Handler '{}' failed: {:?}", handler.id(), e);
            }
        }
    }
}
