use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use twilight_cache_inmemory::{InMemoryCache, ResourceType};
use twilight_gateway::{
    self as gateway, CloseFrame, Config, Event, EventTypeFlags, Intents, MessageSender, Shard,
    StreamExt,
};
use twilight_http::Client as HttpClient;
use twilight_http::client::ClientBuilder;
use twilight_model::channel::message::EmojiReactionType;
use twilight_model::gateway::GatewayReaction;
use twilight_model::gateway::payload::incoming::MessageCreate;

use neonbot_common::models::{ChatMessage, ReactionEvent};

use crate::Error;
use crate::eventbus::{BotEvent, EventBus};

const INTENTS: Intents = Intents::GUILDS
    .union(Intents::GUILD_MESSAGES)
    .union(Intents::MESSAGE_CONTENT)
    .union(Intents::GUILD_MESSAGE_REACTIONS)
    .union(Intents::DIRECT_MESSAGES)
    .union(Intents::DIRECT_MESSAGE_REACTIONS);

const EVENT_TYPES: EventTypeFlags = EventTypeFlags::READY
    .union(EventTypeFlags::GUILD_CREATE)
    .union(EventTypeFlags::GUILD_DELETE)
    .union(EventTypeFlags::CHANNEL_CREATE)
    .union(EventTypeFlags::MESSAGE_CREATE)
    .union(EventTypeFlags::REACTION_ADD)
    .union(EventTypeFlags::INTERACTION_CREATE);

fn chat_message(msg: &MessageCreate) -> ChatMessage {
    ChatMessage {
        channel_id: msg.channel_id,
        guild_id: msg.guild_id,
        author_id: msg.author.id,
        author_name: msg.author.name.clone(),
        author_is_bot: msg.author.bot,
        content: msg.content.clone(),
    }
}

fn reaction_event(reaction: &GatewayReaction) -> ReactionEvent {
    let emoji = match &reaction.emoji {
        EmojiReactionType::Unicode { name } => Some(name.clone()),
        _ => None,
    };
    ReactionEvent {
        channel_id: reaction.channel_id,
        message_id: reaction.message_id,
        user_id: reaction.user_id,
        emoji,
    }
}

async fn shard_runner(mut shard: Shard, event_bus: Arc<EventBus>, cache: Arc<InMemoryCache>) {
    let shard_id = shard.id().number();
    info!("(ShardRunner) Shard {shard_id} started. Listening for events.");

    while let Some(item) = shard.next_event(EVENT_TYPES).await {
        let event = match item {
            Ok(event) => event,
            Err(err) => {
                error!("Shard {shard_id} => error receiving event: {err:?}");
                continue;
            }
        };
        cache.update(&event);

        let bot_event = match event {
            Event::Ready(ready) => {
                info!(
                    "Shard {shard_id} => READY as {} (ID={}) in {} guild(s)",
                    ready.user.name,
                    ready.user.id,
                    ready.guilds.len()
                );
                BotEvent::Ready {
                    bot_user_id: ready.user.id,
                    application_id: ready.application.id,
                    shard_id,
                }
            }
            Event::MessageCreate(msg) => BotEvent::MessageCreate(chat_message(&msg)),
            Event::ReactionAdd(reaction) => BotEvent::ReactionAdd(reaction_event(&reaction)),
            Event::InteractionCreate(interaction) => BotEvent::Interaction(interaction),
            other => {
                trace!("Shard {shard_id} => unhandled event: {:?}", other.kind());
                continue;
            }
        };
        event_bus.publish(bot_event).await;
    }

    warn!("(ShardRunner) Shard {shard_id} event loop ended.");
}

/// Gateway shards plus the shared HTTP client and cache.
///
/// The HTTP client exists from construction so outputs can be wired before
/// [`DiscordPlatform::connect`] starts publishing events.
pub struct DiscordPlatform {
    token: String,
    http: Arc<HttpClient>,
    cache: Arc<InMemoryCache>,
    event_bus: Arc<EventBus>,
    shard_tasks: Vec<JoinHandle<()>>,
    shard_senders: Vec<MessageSender>,
}

impl DiscordPlatform {
    pub fn new(token: &str, event_bus: Arc<EventBus>) -> Result<Self, Error> {
        if token.trim().is_empty() {
            return Err(Error::Config("Discord token is empty".into()));
        }

        let http = Arc::new(
            ClientBuilder::new()
                .token(token.to_string())
                .timeout(Duration::from_secs(30))
                .build(),
        );
        let cache = Arc::new(
            InMemoryCache::builder()
                .resource_types(ResourceType::GUILD | ResourceType::CHANNEL)
                .build(),
        );

        Ok(Self {
            token: token.to_string(),
            http,
            cache,
            event_bus,
            shard_tasks: Vec::new(),
            shard_senders: Vec::new(),
        })
    }

    pub fn http(&self) -> Arc<HttpClient> {
        self.http.clone()
    }

    pub fn cache(&self) -> Arc<InMemoryCache> {
        self.cache.clone()
    }

    /// Presence updates and other gateway commands go through these.
    pub fn shard_senders(&self) -> Vec<MessageSender> {
        self.shard_senders.clone()
    }

    pub fn is_connected(&self) -> bool {
        !self.shard_tasks.is_empty()
    }

    pub async fn connect(&mut self) -> Result<(), Error> {
        if self.is_connected() {
            info!("(DiscordPlatform) Already connected => skipping");
            return Ok(());
        }

        let config = Config::new(self.token.clone(), INTENTS);
        let shards = gateway::create_recommended(&self.http, config, |_, b| b.build())
            .await
            .map_err(|e| Error::Platform(format!("create_recommended error: {e}")))?;

        for shard in shards {
            self.shard_senders.push(shard.sender());
            let handle = tokio::spawn(shard_runner(shard, self.event_bus.clone(), self.cache.clone()));
            self.shard_tasks.push(handle);
        }
        info!("(DiscordPlatform) Connected with {} shard(s)", self.shard_tasks.len());
        Ok(())
    }

    pub async fn disconnect(&mut self) {
        for sender in &self.shard_senders {
            if let Err(e) = sender.close(CloseFrame::NORMAL) {
                debug!("shard already closed: {e}");
            }
        }
        for task in self.shard_tasks.drain(..) {
            if let Err(e) = task.await {
                warn!("shard task ended abnormally: {e}");
            }
        }
        self.shard_senders.clear();
        info!("(DiscordPlatform) Disconnected");
    }
}
