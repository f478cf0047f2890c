use twilight_model::application::command::CommandType;
use twilight_model::application::interaction::application_command::CommandDataOption;
use twilight_model::id::Id;
use twilight_model::id::marker::ChannelMarker;
use twilight_util::builder::command::{CommandBuilder, NumberBuilder, StringBuilder};

use neonbot_common::error::Error;
use neonbot_common::models::ControlOp;

use crate::karaoke::{LaunchRequest, MAX_DELAY_SECS, MIN_DELAY_SECS};
use crate::services::discord::slashcommands::{Reply, number_option, string_option};
use crate::services::event_context::EventContext;

pub fn create_karaoke_command() -> CommandBuilder {
    CommandBuilder::new(
        "karaoke",
        "Sing a song line by line in this channel",
        CommandType::ChatInput,
    )
    .option(StringBuilder::new("query", "Song to sing, e.g. `Adele - Hello`").required(true))
    .option(
        NumberBuilder::new("delay", "Seconds between lines")
            .min_value(MIN_DELAY_SECS)
            .max_value(MAX_DELAY_SECS),
    )
}

pub fn create_control_command(name: &str, description: &str) -> CommandBuilder {
    CommandBuilder::new(name, description, CommandType::ChatInput)
}

/// `/karaoke` fetches lyrics first, so defer before launching.
pub async fn handle_karaoke(
    reply: &Reply<'_>,
    ctx: &EventContext,
    channel_id: Id<ChannelMarker>,
    options: &[CommandDataOption],
) -> Result<(), Error> {
    let Some(query) = string_option(options, "query") else {
        return reply.respond("Tell me what to sing, e.g. `Adele - Hello`.", true).await;
    };
    let request = LaunchRequest::new(channel_id, &query)
        .in_guild(reply.interaction.guild_id)
        .with_delay(number_option(options, "delay"));

    reply.defer().await?;
    let text = match ctx.command_service.start_karaoke(request).await {
        Ok(text) | Err(text) => text,
    };
    reply.follow_up(&[text]).await
}

/// `/pause`, `/resume` and `/stop` share the same path as the reactions.
pub async fn handle_control(
    reply: &Reply<'_>,
    ctx: &EventContext,
    channel_id: Id<ChannelMarker>,
    name: &str,
) -> Result<(), Error> {
    let op = match name {
        "pause" => ControlOp::Pause,
        "resume" => ControlOp::Resume,
        _ => ControlOp::Stop,
    };
    let text = ctx.command_service.control(channel_id, op).await;
    reply.respond(&text, true).await
}
