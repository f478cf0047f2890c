use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, MessageMarker};
use uuid::Uuid;

use neonbot_common::models::{SessionState, Song};
use neonbot_common::traits::api::ChannelOutput;

use crate::karaoke::notices;

/// Why a session reached `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Someone asked for it (reaction or command). Already announced.
    UserStop,
    /// A newer launch in the same channel took over.
    Superseded,
    /// The bot is shutting down.
    Shutdown,
    /// All lines were played.
    Finished,
    /// Output failed and playback gave up.
    Failed,
    /// The driver task went away without reaching one of the above.
    Aborted,
}

/// Result of a pause/resume/stop call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// State changed; exactly one notice was posted.
    Applied,
    /// Nothing to do from this state; nothing was posted.
    NoOp(SessionState),
}

#[derive(Debug)]
struct Status {
    state: SessionState,
    end_reason: Option<EndReason>,
}

/// One karaoke run in one channel.
///
/// The line cursor is only advanced by the playback driver; everything else
/// may read it. The control surface id is fixed at construction.
pub struct KaraokeSession {
    id: Uuid,
    channel_id: Id<ChannelMarker>,
    control_surface_id: Id<MessageMarker>,
    song: Song,
    lines: Vec<String>,
    delay: Duration,
    status: Mutex<Status>,
    cursor: AtomicUsize,
    state_changed: Notify,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
    output: Arc<dyn ChannelOutput>,
}

impl KaraokeSession {
    pub fn new(
        channel_id: Id<ChannelMarker>,
        control_surface_id: Id<MessageMarker>,
        song: Song,
        delay: Duration,
        output: Arc<dyn ChannelOutput>,
    ) -> Self {
        let lines = song.lines();
        Self {
            id: Uuid::new_v4(),
            channel_id,
            control_surface_id,
            song,
            lines,
            delay,
            status: Mutex::new(Status {
                state: SessionState::Running,
                end_reason: None,
            }),
            cursor: AtomicUsize::new(0),
            state_changed: Notify::new(),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
            output,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn channel_id(&self) -> Id<ChannelMarker> {
        self.channel_id
    }

    pub fn control_surface_id(&self) -> Id<MessageMarker> {
        self.control_surface_id
    }

    pub fn song(&self) -> &Song {
        &self.song
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn state(&self) -> SessionState {
        self.status.lock().state
    }

    pub fn is_live(&self) -> bool {
        self.state().is_live()
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.status.lock().end_reason
    }

    /// Index of the next line to play.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    pub(crate) fn advance_cursor(&self) -> usize {
        self.cursor.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Resolves on the next pause/resume/stop, used to wake a paused driver early.
    pub(crate) async fn state_change(&self) {
        self.state_changed.notified().await
    }

    pub async fn pause(&self) -> Transition {
        self.flip(SessionState::Running, SessionState::Paused, notices::PAUSED)
            .await
    }

    pub async fn resume(&self) -> Transition {
        self.flip(SessionState::Paused, SessionState::Running, notices::RESUMED)
            .await
    }

    /// Stop on user request. Idempotent; only the first call posts a notice.
    pub async fn stop(&self) -> Transition {
        match self.end(EndReason::UserStop) {
            Ok(()) => {
                info!(channel = %self.channel_id, session = %self.id, "karaoke stopped by user");
                self.notify(notices::STOPPED).await;
                Transition::Applied
            }
            Err(state) => Transition::NoOp(state),
        }
    }

    /// Stop without posting anything; the driver announces the end.
    pub fn terminate(&self, reason: EndReason) -> bool {
        self.end(reason).is_ok()
    }

    /// Hand the driver task to the session. Only the first handle is kept.
    pub fn attach_task(&self, handle: JoinHandle<()>) {
        let mut task = self.task.lock();
        if task.is_none() {
            *task = Some(handle);
        }
    }

    /// Wait for the driver task to exit (if one was attached and not yet joined).
    pub async fn join(&self) {
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(session = %self.id, "karaoke driver task ended abnormally: {e}");
            }
        }
    }

    /// Post to the session's channel. Failures are logged, not returned.
    pub(crate) async fn notify(&self, text: &str) {
        if let Err(e) = self.output.emit(self.channel_id, text).await {
            warn!(channel = %self.channel_id, "failed to post karaoke notice: {e}");
        }
    }

    pub(crate) fn output(&self) -> &Arc<dyn ChannelOutput> {
        &self.output
    }

    async fn flip(&self, from: SessionState, to: SessionState, notice: &str) -> Transition {
        {
            let mut status = self.status.lock();
            if status.state != from {
                return Transition::NoOp(status.state);
            }
            status.state = to;
        }
        debug!(channel = %self.channel_id, session = %self.id, "karaoke {from} -> {to}");
        self.state_changed.notify_waiters();
        self.notify(notice).await;
        Transition::Applied
    }

    fn end(&self, reason: EndReason) -> Result<(), SessionState> {
        {
            let mut status = self.status.lock();
            if status.state == SessionState::Stopped {
                return Err(SessionState::Stopped);
            }
            status.state = SessionState::Stopped;
            status.end_reason = Some(reason);
        }
        self.cancel.cancel();
        self.state_changed.notify_waiters();
        Ok(())
    }
}

impl std::fmt::Debug for KaraokeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KaraokeSession")
            .field("id", &self.id)
            .field("channel_id", &self.channel_id)
            .field("control_surface_id", &self.control_surface_id)
            .field("title", &self.song.title)
            .field("state", &self.state())
            .field("cursor", &self.cursor())
            .field("lines", &self.lines.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::helpers::{RecordingOutput, song_from_lines};

    fn session(output: Arc<RecordingOutput>) -> KaraokeSession {
        KaraokeSession::new(
            Id::new(1),
            Id::new(100),
            song_from_lines(&["a", "b"]),
            Duration::from_millis(500),
            output,
        )
    }

    #[tokio::test]
    async fn pause_resume_round_trip() {
        let out = Arc::new(RecordingOutput::new());
        let s = session(out.clone());

        assert_eq!(s.pause().await, Transition::Applied);
        assert_eq!(s.state(), SessionState::Paused);
        assert_eq!(s.pause().await, Transition::NoOp(SessionState::Paused));

        assert_eq!(s.resume().await, Transition::Applied);
        assert_eq!(s.resume().await, Transition::NoOp(SessionState::Running));

        assert_eq!(out.texts(), vec![notices::PAUSED, notices::RESUMED]);
    }

    #[tokio::test]
    async fn stop_is_terminal_and_idempotent() {
        let out = Arc::new(RecordingOutput::new());
        let s = session(out.clone());

        assert_eq!(s.stop().await, Transition::Applied);
        assert_eq!(s.stop().await, Transition::NoOp(SessionState::Stopped));
        assert_eq!(s.pause().await, Transition::NoOp(SessionState::Stopped));
        assert_eq!(s.resume().await, Transition::NoOp(SessionState::Stopped));

        assert!(s.cancel_token().is_cancelled());
        assert_eq!(s.end_reason(), Some(EndReason::UserStop));
        assert_eq!(out.count(notices::STOPPED), 1);
        assert_eq!(out.texts().len(), 1);
    }

    #[tokio::test]
    async fn stop_from_paused() {
        let out = Arc::new(RecordingOutput::new());
        let s = session(out.clone());
        s.pause().await;
        assert_eq!(s.stop().await, Transition::Applied);
        assert_eq!(s.state(), SessionState::Stopped);
    }

    #[tokio::test]
    async fn terminate_is_silent() {
        let out = Arc::new(RecordingOutput::new());
        let s = session(out.clone());
        assert!(s.terminate(EndReason::Superseded));
        assert!(!s.terminate(EndReason::Shutdown));
        assert_eq!(s.end_reason(), Some(EndReason::Superseded));
        assert!(out.texts().is_empty());
    }
}
