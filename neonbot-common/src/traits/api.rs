use async_trait::async_trait;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, MessageMarker, UserMarker};

use crate::error::Error;
use crate::models::{ControlOp, Song};

/// Where karaoke output goes. In production this is a Discord channel.
#[async_trait]
pub trait ChannelOutput: Send + Sync {
    /// Post one plain-text message.
    async fn emit(&self, channel_id: Id<ChannelMarker>, text: &str) -> Result<(), Error>;

    /// Post the control message and attach one affordance per op.
    /// Returns the id of the posted message.
    async fn create_control_surface(
        &self,
        channel_id: Id<ChannelMarker>,
        content: &str,
        ops: &[ControlOp],
    ) -> Result<Id<MessageMarker>, Error>;

    /// Remove `user_id`'s `emoji` reaction from a message.
    async fn clear_reaction(
        &self,
        channel_id: Id<ChannelMarker>,
        message_id: Id<MessageMarker>,
        emoji: &str,
        user_id: Id<UserMarker>,
    ) -> Result<(), Error>;
}

/// Resolves a free-text query to a song.
///
/// `Ok(None)` means "nothing found"; `Err` means the provider itself failed.
#[async_trait]
pub trait LyricsProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, query: &str) -> Result<Option<Song>, Error>;
}
