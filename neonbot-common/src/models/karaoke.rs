use std::fmt;

use serde::{Deserialize, Serialize};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, MessageMarker, UserMarker};

/// Playback state of one karaoke session.
///
/// `Running <-> Paused` may flip any number of times; `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Running,
    Paused,
    Stopped,
}

impl SessionState {
    pub fn is_live(self) -> bool {
        !matches!(self, SessionState::Stopped)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Running => "running",
            SessionState::Paused => "paused",
            SessionState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// A control intent, independent of whether it came from a reaction or a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlOp {
    Pause,
    Resume,
    Stop,
}

const VARIATION_SELECTOR: char = '\u{FE0F}';

impl ControlOp {
    pub const ALL: [ControlOp; 3] = [ControlOp::Pause, ControlOp::Resume, ControlOp::Stop];

    /// The emoji posted on the control message for this op.
    pub fn glyph(self) -> &'static str {
        match self {
            ControlOp::Pause => "\u{23F8}\u{FE0F}",
            ControlOp::Resume => "\u{25B6}\u{FE0F}",
            ControlOp::Stop => "\u{23F9}\u{FE0F}",
        }
    }

    /// Map a reaction emoji back to an op. Clients do not always send the
    /// variation selector, so it is ignored on both sides.
    pub fn from_glyph(emoji: &str) -> Option<Self> {
        let wanted = emoji.trim_end_matches(VARIATION_SELECTOR);
        Self::ALL
            .into_iter()
            .find(|op| op.glyph().trim_end_matches(VARIATION_SELECTOR) == wanted)
    }
}

impl fmt::Display for ControlOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ControlOp::Pause => "pause",
            ControlOp::Resume => "resume",
            ControlOp::Stop => "stop",
        };
        f.write_str(s)
    }
}

/// A reaction added to some message, as seen by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    pub channel_id: Id<ChannelMarker>,
    pub message_id: Id<MessageMarker>,
    pub user_id: Id<UserMarker>,
    /// Unicode emoji name; `None` for custom guild emoji.
    pub emoji: Option<String>,
}

/// Inbound chat message (used by the prefix command surface).
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub channel_id: Id<ChannelMarker>,
    pub guild_id: Option<Id<GuildMarker>>,
    pub author_id: Id<UserMarker>,
    pub author_name: String,
    pub author_is_bot: bool,
    pub content: String,
}
