use twilight_model::application::command::CommandType;
use twilight_model::application::interaction::application_command::CommandDataOption;
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::ChannelMarker;
use twilight_util::builder::command::{CommandBuilder, NumberBuilder};

use neonbot_common::error::Error;

use crate::karaoke::{MAX_DELAY_SECS, MIN_DELAY_SECS};
use crate::services::discord::slashcommands::{Reply, number_option};
use crate::services::event_context::EventContext;

/// Server managers only; in DMs the setting is per channel.
pub fn create_setdelay_command() -> CommandBuilder {
    CommandBuilder::new(
        "setdelay",
        "Set the default seconds between karaoke lines",
        CommandType::ChatInput,
    )
    .default_member_permissions(Permissions::MANAGE_GUILD)
    .option(
        NumberBuilder::new("delay", "Seconds between lines")
            .required(true)
            .min_value(MIN_DELAY_SECS)
            .max_value(MAX_DELAY_SECS),
    )
}

pub fn create_getdelay_command() -> CommandBuilder {
    CommandBuilder::new(
        "getdelay",
        "Show the default seconds between karaoke lines",
        CommandType::ChatInput,
    )
}

pub async fn handle_setdelay(
    reply: &Reply<'_>,
    ctx: &EventContext,
    channel_id: Id<ChannelMarker>,
    options: &[CommandDataOption],
) -> Result<(), Error> {
    let Some(delay) = number_option(options, "delay") else {
        return reply.respond("Give a delay in seconds.", true).await;
    };
    let text = ctx
        .command_service
        .set_default_delay(reply.interaction.guild_id, channel_id, delay)
        .await;
    reply.respond(&text, true).await
}

pub async fn handle_getdelay(
    reply: &Reply<'_>,
    ctx: &EventContext,
    channel_id: Id<ChannelMarker>,
) -> Result<(), Error> {
    let text = ctx
        .command_service
        .get_default_delay(reply.interaction.guild_id, channel_id)
        .await;
    reply.respond(&text, true).await
}
