use async_trait::async_trait;
use tracing::{debug, warn};

use crate::Error;
use crate::eventbus::BotEvent;
use crate::services::event_context::EventContext;
use crate::services::event_handler::EventHandler;

/// Runs prefix commands (`+sing`, `+stop`, ...) and posts the replies.
#[derive(Default)]
pub struct PrefixCommandHandler;

impl PrefixCommandHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventHandler for PrefixCommandHandler {
    fn id(&self) -> &str {
        "discord.prefix_commands"
    }

    fn event_types(&self) -> Vec<&'static str> {
        vec!["message.create"]
    }

    async fn handle(&self, event: &BotEvent, ctx: &EventContext) -> Result<bool, Error> {
        let BotEvent::MessageCreate(msg) = event else {
            return Ok(false);
        };
        let Some(response) = ctx.command_service.handle_chat_line(msg).await? else {
            return Ok(false);
        };

        debug!(channel = %msg.channel_id, replies = response.texts.len(), "prefix command handled");
        for text in &response.texts {
            if let Err(e) = ctx.output.emit(msg.channel_id, text).await {
                warn!(channel = %msg.channel_id, "could not send command reply: {e}");
                break;
            }
        }
        Ok(true)
    }

    fn priority(&self) -> i32 {
        50
    }
}
