use async_trait::async_trait;
use tracing::debug;

use crate::Error;
use crate::eventbus::BotEvent;
use crate::services::event_context::EventContext;
use crate::services::event_handler::EventHandler;

/// Pause/resume/stop from reactions on a karaoke control message.
#[derive(Default)]
pub struct KaraokeReactionHandler;

impl KaraokeReactionHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventHandler for KaraokeReactionHandler {
    fn id(&self) -> &str {
        "karaoke.reaction"
    }

    fn event_types(&self) -> Vec<&'static str> {
        vec!["reaction.add"]
    }

    async fn handle(&self, event: &BotEvent, ctx: &EventContext) -> Result<bool, Error> {
        let BotEvent::ReactionAdd(reaction) = event else {
            return Ok(false);
        };
        match ctx.control.handle_reaction(reaction).await {
            Some(outcome) => {
                debug!(channel = %reaction.channel_id, user = %reaction.user_id, "reaction control: {outcome:?}");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn priority(&self) -> i32 {
        20
    }
}
