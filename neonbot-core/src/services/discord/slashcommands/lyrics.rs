use twilight_model::application::command::CommandType;
use twilight_model::application::interaction::application_command::CommandDataOption;
use twilight_util::builder::command::{CommandBuilder, StringBuilder};

use neonbot_common::error::Error;

use crate::services::discord::slashcommands::{Reply, string_option};
use crate::services::event_context::EventContext;

pub fn create_lyrics_command() -> CommandBuilder {
    CommandBuilder::new("lyrics", "Post the full lyrics of a song", CommandType::ChatInput)
        .option(StringBuilder::new("query", "Song to look up, e.g. `Adele - Hello`").required(true))
}

pub async fn handle_lyrics(
    reply: &Reply<'_>,
    ctx: &EventContext,
    options: &[CommandDataOption],
) -> Result<(), Error> {
    let Some(query) = string_option(options, "query") else {
        return reply.respond("Tell me which song, e.g. `Adele - Hello`.", true).await;
    };
    reply.defer().await?;
    let texts = ctx.command_service.lyrics(&query).await;
    reply.follow_up(&texts).await
}
