use async_trait::async_trait;
use tracing::{debug, warn};

use crate::Error;
use crate::eventbus::BotEvent;
use crate::services::discord::slashcommands::handle_interaction_create;
use crate::services::event_context::EventContext;
use crate::services::event_handler::EventHandler;

/// Handler for Discord interaction events (slash commands).
#[derive(Default)]
pub struct InteractionHandler;

impl InteractionHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventHandler for InteractionHandler {
    fn id(&self) -> &str {
        "discord.interaction"
    }

    fn event_types(&self) -> Vec<&'static str> {
        vec!["interaction.create"]
    }

    async fn handle(&self, event: &BotEvent, ctx: &EventContext) -> Result<bool, Error> {
        let BotEvent::Interaction(interaction) = event else {
            return Ok(false);
        };
        let (Some(http), Some(application_id)) = (&ctx.discord_http, ctx.application_id()) else {
            warn!("Interaction arrived before READY; ignoring");
            return Ok(false);
        };
        debug!(interaction = %interaction.id, "dispatching slash command");
        handle_interaction_create(http.clone(), application_id, interaction, ctx).await?;
        Ok(true)
    }

    fn priority(&self) -> i32 {
        50 // Higher priority for interactive commands
    }
}
