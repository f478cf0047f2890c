use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::join_all;
use tracing::{debug, info};
use twilight_model::id::Id;
use twilight_model::id::marker::ChannelMarker;
use uuid::Uuid;

use crate::karaoke::session::{EndReason, KaraokeSession};

/// Channel id -> the session currently owning that channel.
///
/// Cloning is cheap and every clone sees the same map. Only the launcher
/// inserts; removal happens through [`SessionRegistry::remove_if_current`]
/// so a finishing session can never evict the one that replaced it.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<Id<ChannelMarker>, Arc<KaraokeSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, channel_id: Id<ChannelMarker>) -> Option<Arc<KaraokeSession>> {
        self.sessions.get(&channel_id).map(|entry| entry.value().clone())
    }

    /// Insert `session` under its channel, returning whatever it replaced.
    pub fn put(&self, session: Arc<KaraokeSession>) -> Option<Arc<KaraokeSession>> {
        debug!(channel = %session.channel_id(), session = %session.id(), "registering karaoke session");
        self.sessions.insert(session.channel_id(), session)
    }

    pub fn remove(&self, channel_id: Id<ChannelMarker>) -> Option<Arc<KaraokeSession>> {
        self.sessions.remove(&channel_id).map(|(_, s)| s)
    }

    /// Remove the entry for `channel_id` only if it still belongs to `session_id`.
    pub fn remove_if_current(&self, channel_id: Id<ChannelMarker>, session_id: Uuid) -> bool {
        self.sessions
            .remove_if(&channel_id, |_, s| s.id() == session_id)
            .is_some()
    }

    /// Sessions that have not reached `Stopped`.
    pub fn live_count(&self) -> usize {
        self.sessions.iter().filter(|e| e.value().is_live()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn channels(&self) -> Vec<Id<ChannelMarker>> {
        self.sessions.iter().map(|e| *e.key()).collect()
    }

    /// Stop every session and wait for their drivers to finish cleanup.
    pub async fn shutdown(&self) {
        let sessions: Vec<Arc<KaraokeSession>> =
            self.sessions.iter().map(|e| e.value().clone()).collect();
        if !sessions.is_empty() {
            info!("Stopping {} karaoke session(s) for shutdown", sessions.len());
        }
        for session in &sessions {
            session.terminate(EndReason::Shutdown);
        }
        join_all(sessions.iter().map(|s| s.join())).await;
        for session in sessions {
            self.remove_if_current(session.channel_id(), session.id());
        }
    }
}
