//! Reaction and command entry points for pause/resume/stop.
//!
//! Both entry points end up in [`KaraokeControl::apply_to`], so the same
//! intent always produces the same transition and the same single notice.

use std::sync::{Arc, OnceLock};

use tracing::{debug, trace};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, UserMarker};

use neonbot_common::models::{ControlOp, ReactionEvent, SessionState};
use neonbot_common::traits::api::ChannelOutput;

use crate::karaoke::registry::SessionRegistry;
use crate::karaoke::session::{KaraokeSession, Transition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    /// The op changed the session state.
    Applied(ControlOp),
    /// The session was already in a state where the op does nothing.
    Unchanged { op: ControlOp, state: SessionState },
    /// No live session in that channel.
    NoSession,
}

impl ControlOutcome {
    /// Short reply for the user who issued a command.
    pub fn reply(&self) -> String {
        match self {
            ControlOutcome::Applied(ControlOp::Pause) => "Paused.".to_string(),
            ControlOutcome::Applied(ControlOp::Resume) => "Resumed.".to_string(),
            ControlOutcome::Applied(ControlOp::Stop) => "Stopped.".to_string(),
            ControlOutcome::Unchanged { state, .. } => format!("Karaoke is already {state}."),
            ControlOutcome::NoSession => crate::karaoke::notices::NOTHING_RUNNING.to_string(),
        }
    }
}

pub struct KaraokeControl {
    registry: SessionRegistry,
    output: Arc<dyn ChannelOutput>,
    bot_user_id: OnceLock<Id<UserMarker>>,
}

impl KaraokeControl {
    pub fn new(registry: SessionRegistry, output: Arc<dyn ChannelOutput>) -> Self {
        Self {
            registry,
            output,
            bot_user_id: OnceLock::new(),
        }
    }

    /// Reactions from this user (the bot itself) are ignored.
    pub fn set_bot_user(&self, user_id: Id<UserMarker>) {
        if self.bot_user_id.set(user_id).is_err() {
            trace!("bot user id already known");
        }
    }

    pub async fn pause_karaoke(&self, channel_id: Id<ChannelMarker>) -> ControlOutcome {
        self.apply(channel_id, ControlOp::Pause).await
    }

    pub async fn resume_karaoke(&self, channel_id: Id<ChannelMarker>) -> ControlOutcome {
        self.apply(channel_id, ControlOp::Resume).await
    }

    pub async fn stop_karaoke(&self, channel_id: Id<ChannelMarker>) -> ControlOutcome {
        self.apply(channel_id, ControlOp::Stop).await
    }

    /// Command entry: act on whatever live session owns `channel_id`.
    pub async fn apply(&self, channel_id: Id<ChannelMarker>, op: ControlOp) -> ControlOutcome {
        match self.registry.get(channel_id) {
            Some(session) if session.is_live() => self.apply_to(&session, op).await,
            _ => ControlOutcome::NoSession,
        }
    }

    /// Reaction entry. Returns `None` when the reaction is not a control
    /// input for a running session (wrong message, bot's own, unknown emoji).
    pub async fn handle_reaction(&self, event: &ReactionEvent) -> Option<ControlOutcome> {
        if self.bot_user_id.get() == Some(&event.user_id) {
            return None;
        }
        let emoji = event.emoji.as_deref()?;
        let session = self.registry.get(event.channel_id)?;
        if session.control_surface_id() != event.message_id {
            trace!(message = %event.message_id, "reaction on a non-control message");
            return None;
        }
        let op = ControlOp::from_glyph(emoji)?;

        let outcome = self.apply_to(&session, op).await;

        // Leave the control message with only the bot's own reactions.
        if let Err(e) = self
            .output
            .clear_reaction(event.channel_id, event.message_id, emoji, event.user_id)
            .await
        {
            trace!("could not remove control reaction: {e}");
        }

        Some(outcome)
    }

    async fn apply_to(&self, session: &KaraokeSession, op: ControlOp) -> ControlOutcome {
        let transition = match op {
            ControlOp::Pause => session.pause().await,
            ControlOp::Resume => session.resume().await,
            ControlOp::Stop => session.stop().await,
        };
        debug!(channel = %session.channel_id(), session = %session.id(), "karaoke {op}: {transition:?}");

        match transition {
            Transition::Applied => {
                if op == ControlOp::Stop {
                    self.registry
                        .remove_if_current(session.channel_id(), session.id());
                }
                ControlOutcome::Applied(op)
            }
            Transition::NoOp(state) => ControlOutcome::Unchanged { op, state },
        }
    }
}
