pub mod karaoke;
pub mod lyrics;
pub mod ping;
pub mod settings;

use std::sync::Arc;
use tracing::{debug, warn};
use twilight_http::Client as HttpClient;
use twilight_model::{
    application::{
        command::Command,
        interaction::{
            Interaction, InteractionData,
            application_command::{CommandDataOption, CommandOptionValue},
        },
    },
    channel::message::MessageFlags,
    gateway::payload::incoming::InteractionCreate,
    http::interaction::{InteractionResponse, InteractionResponseData, InteractionResponseType},
    id::Id,
    id::marker::{ApplicationMarker, ChannelMarker},
};

use neonbot_common::error::Error;

use crate::services::event_context::EventContext;

/// Every slash command the bot offers.
pub fn all_commands() -> Vec<Command> {
    vec![
        karaoke::create_karaoke_command().build(),
        karaoke::create_control_command("pause", "Pause the karaoke in this channel").build(),
        karaoke::create_control_command("resume", "Resume the paused karaoke in this channel").build(),
        karaoke::create_control_command("stop", "Stop the karaoke in this channel").build(),
        settings::create_setdelay_command().build(),
        settings::create_getdelay_command().build(),
        lyrics::create_lyrics_command().build(),
        ping::create_ping_command().build(),
    ]
}

pub async fn register_global_slash_commands(
    http: &Arc<HttpClient>,
    application_id: Id<ApplicationMarker>,
) -> Result<(), Error> {
    let commands = all_commands();
    http.interaction(application_id)
        .set_global_commands(&commands)
        .await
        .map_err(|e| Error::Platform(format!("Failed to register global slash commands: {e}")))?;
    Ok(())
}

/// Dispatch slash commands from an `InteractionCreate`.
pub async fn handle_interaction_create(
    http: Arc<HttpClient>,
    application_id: Id<ApplicationMarker>,
    event: &InteractionCreate,
    ctx: &EventContext,
) -> Result<(), Error> {
    let interaction = &event.0;

    let Some(InteractionData::ApplicationCommand(cmd_data)) = &interaction.data else {
        return Ok(());
    };
    let reply = Reply {
        http: &http,
        application_id,
        interaction,
    };
    let Some(channel_id) = interaction_channel(interaction) else {
        return reply.respond("This command only works in a channel.", true).await;
    };

    debug!(command = %cmd_data.name, channel = %channel_id, "slash command");
    match cmd_data.name.as_str() {
        "karaoke" => karaoke::handle_karaoke(&reply, ctx, channel_id, &cmd_data.options).await,
        "pause" | "resume" | "stop" => {
            karaoke::handle_control(&reply, ctx, channel_id, &cmd_data.name).await
        }
        "setdelay" => settings::handle_setdelay(&reply, ctx, channel_id, &cmd_data.options).await,
        "getdelay" => settings::handle_getdelay(&reply, ctx, channel_id).await,
        "lyrics" => lyrics::handle_lyrics(&reply, ctx, &cmd_data.options).await,
        "ping" => ping::handle_ping(&reply, ctx).await,
        other => {
            if let Err(e) = reply.respond(&format!("Unrecognized command: {other}"), true).await {
                warn!("could not answer unknown command: {e}");
            }
            Ok(())
        }
    }
}

fn interaction_channel(interaction: &Interaction) -> Option<Id<ChannelMarker>> {
    interaction.channel.as_ref().map(|c| c.id)
}

/// Answers one interaction, either directly or after a deferral.
pub struct Reply<'a> {
    http: &'a Arc<HttpClient>,
    application_id: Id<ApplicationMarker>,
    pub interaction: &'a Interaction,
}

impl Reply<'_> {
    pub async fn respond(&self, content: &str, ephemeral: bool) -> Result<(), Error> {
        let data = InteractionResponseData {
            content: Some(content.to_string()),
            flags: ephemeral.then_some(MessageFlags::EPHEMERAL),
            ..Default::default()
        };
        self.create_response(InteractionResponseType::ChannelMessageWithSource, Some(data))
            .await
    }

    /// Acknowledge now and answer later with [`Reply::follow_up`].
    pub async fn defer(&self) -> Result<(), Error> {
        self.create_response(InteractionResponseType::DeferredChannelMessageWithSource, None)
            .await
    }

    /// First text replaces the deferred "thinking" message, the rest are follow-ups.
    pub async fn follow_up(&self, texts: &[String]) -> Result<(), Error> {
        let client = self.http.interaction(self.application_id);
        let token = &self.interaction.token;
        let mut texts = texts.iter();

        if let Some(first) = texts.next() {
            client
                .update_response(token)
                .content(Some(first.as_str()))
                .await
                .map_err(|e| Error::Platform(format!("Error updating interaction response: {e}")))?;
        }
        for text in texts {
            client
                .create_followup(token)
                .content(text)
                .await
                .map_err(|e| Error::Platform(format!("Error sending follow-up: {e}")))?;
        }
        Ok(())
    }

    async fn create_response(
        &self,
        kind: InteractionResponseType,
        data: Option<InteractionResponseData>,
    ) -> Result<(), Error> {
        self.http
            .interaction(self.application_id)
            .create_response(
                self.interaction.id,
                &self.interaction.token,
                &InteractionResponse { kind, data },
            )
            .await
            .map_err(|e| Error::Platform(format!("Error responding to interaction: {e}")))?;
        Ok(())
    }
}

pub(crate) fn string_option(options: &[CommandDataOption], name: &str) -> Option<String> {
    options.iter().find(|o| o.name == name).and_then(|o| match &o.value {
        CommandOptionValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}

/// Discord may send whole numbers as integers even for NUMBER options.
pub(crate) fn number_option(options: &[CommandDataOption], name: &str) -> Option<f64> {
    options.iter().find(|o| o.name == name).and_then(|o| match o.value {
        CommandOptionValue::Number(n) => Some(n),
        CommandOptionValue::Integer(i) => Some(i as f64),
        _ => None,
    })
}
