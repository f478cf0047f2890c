use std::sync::Arc;

use async_trait::async_trait;
use tracing::{trace, warn};
use twilight_http::Client as HttpClient;
use twilight_http::error::{Error as HttpError, ErrorType};
use twilight_http::request::channel::reaction::RequestReactionType;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, MessageMarker, UserMarker};

use neonbot_common::models::ControlOp;
use neonbot_common::traits::api::ChannelOutput;

use crate::Error;

/// Rate limits and server errors are worth trying the next line for.
fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

fn map_http_error(action: &str, e: HttpError) -> Error {
    let transient = match e.kind() {
        ErrorType::Response { status, .. } => is_transient_status(status.get()),
        ErrorType::RequestTimedOut | ErrorType::RequestError | ErrorType::ServiceUnavailable { .. } => true,
        _ => false,
    };
    if transient {
        Error::TransientDelivery(format!("{action}: {e}"))
    } else {
        Error::Platform(format!("{action}: {e}"))
    }
}

/// [`ChannelOutput`] backed by the Discord REST API.
#[derive(Clone)]
pub struct DiscordOutput {
    http: Arc<HttpClient>,
}

impl DiscordOutput {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ChannelOutput for DiscordOutput {
    async fn emit(&self, channel_id: Id<ChannelMarker>, text: &str) -> Result<(), Error> {
        self.http
            .create_message(channel_id)
            .content(text)
            .await
            .map_err(|e| map_http_error("Error sending Discord message", e))?;
        Ok(())
    }

    async fn create_control_surface(
        &self,
        channel_id: Id<ChannelMarker>,
        content: &str,
        ops: &[ControlOp],
    ) -> Result<Id<MessageMarker>, Error> {
        let message = self
            .http
            .create_message(channel_id)
            .content(content)
            .await
            .map_err(|e| map_http_error("Error posting karaoke controls", e))?
            .model()
            .await
            .map_err(|e| Error::Platform(format!("Error reading posted message: {e}")))?;

        // Missing reactions only cost the shortcut; commands still work.
        for op in ops {
            let emoji = RequestReactionType::Unicode { name: op.glyph() };
            if let Err(e) = self.http.create_reaction(channel_id, message.id, &emoji).await {
                warn!(channel = %channel_id, "could not add {op} reaction: {e}");
            }
        }
        Ok(message.id)
    }

    async fn clear_reaction(
        &self,
        channel_id: Id<ChannelMarker>,
        message_id: Id<MessageMarker>,
        emoji: &str,
        user_id: Id<UserMarker>,
    ) -> Result<(), Error> {
        let emoji = RequestReactionType::Unicode { name: emoji };
        self.http
            .delete_reaction(channel_id, message_id, &emoji, user_id)
            .await
            .map_err(|e| map_http_error("Error removing reaction", e))?;
        trace!(channel = %channel_id, message = %message_id, "removed control reaction");
        Ok(())
    }
}
