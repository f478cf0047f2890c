//! Rotating "Playing ..." presence.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use rand::seq::SliceRandom;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use twilight_cache_inmemory::InMemoryCache;
use twilight_gateway::MessageSender;
use twilight_model::gateway::payload::outgoing::UpdatePresence;
use twilight_model::gateway::presence::{ActivityType, MinimalActivity, Status};

use crate::eventbus::EventBus;
use crate::karaoke::SessionRegistry;

pub const MIN_ROTATE_SECS: u64 = 15;
pub const MAX_ROTATE_SECS: u64 = 25;
pub const REBUILD_INTERVAL: Duration = Duration::from_secs(120);
const MAX_STATUS_CHARS: usize = 120;

pub const CUSTOM_LINES: &[&str] = &[
    "Warming up the vocal cords",
    "Humming in the green room",
    "Tuning the mic stand",
    "Practising the high notes",
    "Picking the next encore",
    "Your personal DJ \u{1F3A7}",
    "Reading lyrics off the wall",
];

pub const STATIC_LINES: &[&str] = &[
    "\u{1F3A4} Karaoke ready - use +sing or /karaoke",
    "+lyrics | +sing",
    "\u{1F4E9} Active in DMs",
];

/// `Xd Yh`, `Xh Ym`, `Xm Ys` or `Xs`, whichever leading unit is non-zero.
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let mins = (total % 3_600) / 60;
    let secs = total % 60;
    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {mins}m")
    } else if mins > 0 {
        format!("{mins}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

/// Inputs for one rebuild of the rotation list.
#[derive(Debug, Clone, Default)]
pub struct StatusSnapshot {
    pub uptime: Duration,
    pub active_sessions: usize,
    pub guilds: Option<usize>,
}

pub fn build_status_messages<R: Rng + ?Sized>(snapshot: &StatusSnapshot, rng: &mut R) -> Vec<String> {
    let mut msgs = vec![format!("Uptime {}", format_uptime(snapshot.uptime))];
    if let Some(guilds) = snapshot.guilds.filter(|g| *g > 0) {
        msgs.push(format!("Singing in {guilds} server(s)"));
    }
    msgs.push(format!("Karaoke sessions: {}", snapshot.active_sessions));

    let mut custom: Vec<&str> = CUSTOM_LINES.to_vec();
    custom.shuffle(rng);
    msgs.extend(custom.into_iter().take(3).map(str::to_string));
    msgs.extend(STATIC_LINES.iter().map(|s| s.to_string()));

    let mut deduped: Vec<String> = Vec::with_capacity(msgs.len());
    for msg in msgs {
        let msg = truncate_status(msg);
        if !deduped.contains(&msg) {
            deduped.push(msg);
        }
    }
    deduped
}

fn truncate_status(msg: String) -> String {
    if msg.chars().count() > MAX_STATUS_CHARS {
        let mut cut: String = msg.chars().take(MAX_STATUS_CHARS - 3).collect();
        cut.push_str("...");
        cut
    } else {
        msg
    }
}

fn presence(text: &str) -> Option<UpdatePresence> {
    let activity = MinimalActivity {
        kind: ActivityType::Playing,
        name: text.to_string(),
        url: None,
    };
    match UpdatePresence::new(vec![activity.into()], false, None, Status::Online) {
        Ok(p) => Some(p),
        Err(e) => {
            warn!("invalid presence '{}': {}", text, e);
            None
        }
    }
}

/// Spawns the presence rotation loop; it ends when the event bus shuts down.
pub fn spawn_status_rotation(
    senders: Vec<MessageSender>,
    registry: SessionRegistry,
    cache: Option<Arc<InMemoryCache>>,
    event_bus: Arc<EventBus>,
) -> JoinHandle<()> {
    let started = Instant::now();
    let snapshot = move || StatusSnapshot {
        uptime: started.elapsed(),
        active_sessions: registry.live_count(),
        guilds: cache.as_ref().map(|c| c.stats().guilds()),
    };

    tokio::spawn(async move {
        info!("Presence rotation started for {} shard(s)", senders.len());
        let mut msgs = build_status_messages(&snapshot(), &mut rand::rng());
        let mut next = 0usize;
        let mut last_build = Instant::now();

        loop {
            if last_build.elapsed() >= REBUILD_INTERVAL {
                msgs = build_status_messages(&snapshot(), &mut rand::rng());
                next = 0;
                last_build = Instant::now();
            }

            if let Some(text) = msgs.get(next % msgs.len().max(1)) {
                if let Some(update) = presence(text) {
                    for sender in &senders {
                        if let Err(e) = sender.command(&update) {
                            debug!("could not update presence: {}", e);
                        }
                    }
                }
            }
            next = next.wrapping_add(1);

            let wait = Duration::from_secs(rand::rng().random_range(MIN_ROTATE_SECS..=MAX_ROTATE_SECS));
            tokio::select! {
                _ = event_bus.wait_for_shutdown() => break,
                _ = sleep(wait) => {}
            }
        }
        info!("Presence rotation stopped.");
    })
}
