use async_trait::async_trait;
use tracing::{info, warn};

use crate::Error;
use crate::eventbus::BotEvent;
use crate::services::discord::slashcommands::register_global_slash_commands;
use crate::services::event_context::EventContext;
use crate::services::event_handler::EventHandler;

/// Records the bot's identities and registers slash commands once per process.
#[derive(Default)]
pub struct ReadyHandler;

impl ReadyHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventHandler for ReadyHandler {
    fn id(&self) -> &str {
        "discord.ready"
    }

    fn event_types(&self) -> Vec<&'static str> {
        vec!["ready"]
    }

    async fn handle(&self, event: &BotEvent, ctx: &EventContext) -> Result<bool, Error> {
        let BotEvent::Ready {
            bot_user_id,
            application_id,
            shard_id,
        } = event
        else {
            return Ok(false);
        };

        info!(shard = shard_id, bot = %bot_user_id, "Discord shard ready");
        ctx.control.set_bot_user(*bot_user_id);

        // Every shard sends READY; only the first one registers commands.
        if !ctx.set_application_id(*application_id) {
            return Ok(true);
        }
        match &ctx.discord_http {
            Some(http) => {
                register_global_slash_commands(http, *application_id).await?;
                info!("Registered global slash commands");
            }
            None => warn!("No Discord HTTP client; skipping slash command registration"),
        }
        Ok(true)
    }

    fn priority(&self) -> i32 {
        10 // ready must land before anything needs the bot's ids
    }
}
