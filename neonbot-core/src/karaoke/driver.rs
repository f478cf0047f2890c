//! The per-session playback loop.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use twilight_model::id::Id;
use twilight_model::id::marker::ChannelMarker;
use uuid::Uuid;

use neonbot_common::models::SessionState;

use crate::Error;
use crate::karaoke::notices;
use crate::karaoke::registry::SessionRegistry;
use crate::karaoke::session::{EndReason, KaraokeSession};
use crate::karaoke::{MAX_TRANSIENT_FAILURES, PAUSE_POLL_INTERVAL};

#[derive(Debug)]
enum DriveExit {
    /// Every line was played.
    Finished,
    /// The session was stopped or replaced in the registry.
    Halted,
    /// The cancel token fired at a suspension point.
    Cancelled,
    /// Output failed in a non-recoverable way.
    Failed(Error),
}

/// Removes the session from the registry when the driver exits by any path,
/// including the task being aborted.
struct RegistryCleanup {
    registry: SessionRegistry,
    session: Arc<KaraokeSession>,
}

impl Drop for RegistryCleanup {
    fn drop(&mut self) {
        if self.session.terminate(EndReason::Aborted) {
            warn!(session = %self.session.id(), "karaoke driver dropped while session was live");
        }
        let removed = self
            .registry
            .remove_if_current(self.session.channel_id(), self.session.id());
        debug!(
            channel = %self.session.channel_id(),
            session = %self.session.id(),
            removed,
            "karaoke driver cleanup"
        );
    }
}

/// Spawn the driver for `session` on the current runtime.
///
/// The session must already be in `registry`.
pub fn spawn(session: Arc<KaraokeSession>, registry: SessionRegistry) -> JoinHandle<()> {
    tokio::spawn(run(session, registry))
}

pub async fn run(session: Arc<KaraokeSession>, registry: SessionRegistry) {
    let _cleanup = RegistryCleanup {
        registry: registry.clone(),
        session: session.clone(),
    };

    info!(
        channel = %session.channel_id(),
        session = %session.id(),
        lines = session.lines().len(),
        "karaoke playback starting"
    );
    session.notify(&notices::started(&session.song().title)).await;

    let exit = drive(&session, &registry).await;
    debug!(session = %session.id(), cursor = session.cursor(), "karaoke loop exited: {exit:?}");

    conclude(&session, exit).await;
}

/// Settle the end reason and post the single closing notice.
async fn conclude(session: &KaraokeSession, exit: DriveExit) {
    match exit {
        DriveExit::Finished if session.terminate(EndReason::Finished) => {
            info!(channel = %session.channel_id(), session = %session.id(), "karaoke finished");
            session.notify(&notices::finished(&session.song().title)).await;
        }
        DriveExit::Failed(e) if session.terminate(EndReason::Failed) => {
            error!(channel = %session.channel_id(), session = %session.id(), "karaoke playback failed: {e}");
            session.notify(notices::DELIVERY_FAILED).await;
        }
        // Someone else ended the session after the loop exited.
        DriveExit::Finished | DriveExit::Failed(_) => announce_external_end(session, false).await,
        DriveExit::Halted => announce_external_end(session, false).await,
        DriveExit::Cancelled => announce_external_end(session, true).await,
    }
}

async fn announce_external_end(session: &KaraokeSession, cancelled: bool) {
    match session.end_reason() {
        // stop() already posted its notice.
        Some(EndReason::UserStop) => {}
        Some(EndReason::Superseded) | Some(EndReason::Shutdown) => {
            session.notify(notices::CANCELLED).await;
        }
        _ if cancelled => {
            session.notify(notices::CANCELLED).await;
        }
        _ => {
            session.terminate(EndReason::Aborted);
            session.notify(notices::STOPPED).await;
        }
    }
}

async fn drive(session: &KaraokeSession, registry: &SessionRegistry) -> DriveExit {
    let channel_id = session.channel_id();
    let cancel = session.cancel_token();
    let mut transient_failures = 0u32;

    loop {
        if !still_registered(registry, channel_id, session.id()) {
            return DriveExit::Halted;
        }

        match session.state() {
            SessionState::Stopped => return DriveExit::Halted,
            SessionState::Paused => {
                tokio::select! {
                    _ = cancel.cancelled() => return DriveExit::Cancelled,
                    _ = session.state_change() => {}
                    _ = sleep(PAUSE_POLL_INTERVAL) => {}
                }
                continue;
            }
            SessionState::Running => {}
        }

        let index = session.cursor();
        let Some(line) = session.lines().get(index) else {
            return DriveExit::Finished;
        };

        let line = line.trim();
        if !line.is_empty() {
            match session.output().emit(channel_id, line).await {
                Ok(()) => transient_failures = 0,
                Err(e) if e.is_transient() && transient_failures + 1 < MAX_TRANSIENT_FAILURES => {
                    transient_failures += 1;
                    warn!(channel = %channel_id, cursor = index, "skipping karaoke line after send failure: {e}");
                }
                Err(e) => return DriveExit::Failed(e),
            }

            tokio::select! {
                _ = cancel.cancelled() => return DriveExit::Cancelled,
                _ = sleep(session.delay()) => {}
            }
        }

        session.advance_cursor();
    }
}

fn still_registered(registry: &SessionRegistry, channel_id: Id<ChannelMarker>, id: Uuid) -> bool {
    registry
        .get(channel_id)
        .is_some_and(|current| current.id() == id)
}
