use twilight_model::application::command::CommandType;
use twilight_util::builder::command::CommandBuilder;

use neonbot_common::error::Error;

use crate::services::discord::slashcommands::Reply;
use crate::services::event_context::EventContext;

/// Create a CommandBuilder for `/ping`.
/// In Twilight 0.16, `build()` returns a `Command` directly (no `Result`).
pub fn create_ping_command() -> CommandBuilder {
    CommandBuilder::new("ping", "Check that the bot is responsive", CommandType::ChatInput)
}

/// Handle an incoming `/ping` interaction.
pub async fn handle_ping(reply: &Reply<'_>, ctx: &EventContext) -> Result<(), Error> {
    reply.respond(&ctx.command_service.ping(), false).await
}
