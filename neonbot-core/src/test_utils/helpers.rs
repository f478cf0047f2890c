// File: neonbot-core/src/test_utils/helpers.rs
//
// In-memory stand-ins for the karaoke engine's collaborators.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, MessageMarker, UserMarker};

use neonbot_common::models::{ControlOp, SettingsKey, Song};
use neonbot_common::traits::api::{ChannelOutput, LyricsProvider};
use neonbot_common::traits::repository_traits::SettingsStore;

use crate::Error;

/// Build a song whose text is `lines` joined with newlines.
pub fn song_from_lines(lines: &[&str]) -> Song {
    Song::new("test song", "test artist", &lines.join("\n"), "test")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputRecord {
    Emit {
        channel_id: Id<ChannelMarker>,
        text: String,
    },
    ControlSurface {
        channel_id: Id<ChannelMarker>,
        message_id: Id<MessageMarker>,
        content: String,
        ops: Vec<ControlOp>,
    },
    ClearReaction {
        message_id: Id<MessageMarker>,
        emoji: String,
        user_id: Id<UserMarker>,
    },
}

/// Records everything the engine sends. Message ids start at 1000.
pub struct RecordingOutput {
    records: Mutex<Vec<OutputRecord>>,
    emitted: watch::Sender<usize>,
    next_message_id: AtomicU64,
    transient_failures: Mutex<HashSet<String>>,
    fatal_failures: Mutex<HashSet<String>>,
    fail_surface: AtomicBool,
    fail_clear: AtomicBool,
}

impl RecordingOutput {
    pub fn new() -> Self {
        let (emitted, _) = watch::channel(0);
        Self {
            records: Mutex::new(Vec::new()),
            emitted,
            next_message_id: AtomicU64::new(1000),
            transient_failures: Mutex::new(HashSet::new()),
            fatal_failures: Mutex::new(HashSet::new()),
            fail_surface: AtomicBool::new(false),
            fail_clear: AtomicBool::new(false),
        }
    }

    pub fn records(&self) -> Vec<OutputRecord> {
        self.records.lock().clone()
    }

    /// Texts of every successful emit, in order.
    pub fn texts(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| match r {
                OutputRecord::Emit { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Emits that are song lines. Notices all start with an emoji; test
    /// lyrics are plain ASCII.
    pub fn lines_sung(&self) -> Vec<String> {
        self.texts()
            .into_iter()
            .filter(|t| t.chars().next().is_some_and(|c| c.is_ascii()))
            .collect()
    }

    pub fn count(&self, text: &str) -> usize {
        self.texts().iter().filter(|t| t.as_str() == text).count()
    }

    pub fn control_surfaces(&self) -> Vec<Id<MessageMarker>> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| match r {
                OutputRecord::ControlSurface { message_id, .. } => Some(*message_id),
                _ => None,
            })
            .collect()
    }

    pub fn cleared_reactions(&self) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|r| matches!(r, OutputRecord::ClearReaction { .. }))
            .count()
    }

    /// Wait until at least `n` emits have succeeded.
    pub async fn wait_for_emits(&self, n: usize) {
        let mut rx = self.emitted.subscribe();
        let _ = rx.wait_for(|count| *count >= n).await;
    }

    pub fn fail_line_transient(&self, line: &str) {
        self.transient_failures.lock().insert(line.to_string());
    }

    pub fn fail_line_fatal(&self, line: &str) {
        self.fatal_failures.lock().insert(line.to_string());
    }

    pub fn fail_control_surface(&self) {
        self.fail_surface.store(true, Ordering::SeqCst);
    }

    pub fn fail_clear_reaction(&self) {
        self.fail_clear.store(true, Ordering::SeqCst);
    }
}

impl Default for RecordingOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelOutput for RecordingOutput {
    async fn emit(&self, channel_id: Id<ChannelMarker>, text: &str) -> Result<(), Error> {
        if self.transient_failures.lock().contains(text) {
            return Err(Error::TransientDelivery(format!("rate limited: {text}")));
        }
        if self.fatal_failures.lock().contains(text) {
            return Err(Error::Platform(format!("forbidden: {text}")));
        }
        self.records.lock().push(OutputRecord::Emit {
            channel_id,
            text: text.to_string(),
        });
        self.emitted.send_modify(|count| *count += 1);
        Ok(())
    }

    async fn create_control_surface(
        &self,
        channel_id: Id<ChannelMarker>,
        content: &str,
        ops: &[ControlOp],
    ) -> Result<Id<MessageMarker>, Error> {
        if self.fail_surface.load(Ordering::SeqCst) {
            return Err(Error::Platform("missing permissions".into()));
        }
        let message_id = Id::new(self.next_message_id.fetch_add(1, Ordering::SeqCst));
        self.records.lock().push(OutputRecord::ControlSurface {
            channel_id,
            message_id,
            content: content.to_string(),
            ops: ops.to_vec(),
        });
        Ok(message_id)
    }

    async fn clear_reaction(
        &self,
        _channel_id: Id<ChannelMarker>,
        message_id: Id<MessageMarker>,
        emoji: &str,
        user_id: Id<UserMarker>,
    ) -> Result<(), Error> {
        if self.fail_clear.load(Ordering::SeqCst) {
            return Err(Error::Platform("missing manage messages".into()));
        }
        self.records.lock().push(OutputRecord::ClearReaction {
            message_id,
            emoji: emoji.to_string(),
            user_id,
        });
        Ok(())
    }
}

enum LyricsBehaviour {
    Found(Song),
    NotFound,
    Failing,
}

/// Lyrics provider that always gives the same answer.
pub struct StaticLyrics {
    behaviour: LyricsBehaviour,
    calls: AtomicUsize,
}

impl StaticLyrics {
    pub fn with_song(title: &str, artist: &str, text: &str) -> Self {
        Self::from_song(Song::new(title, artist, text, "static"))
    }

    pub fn from_song(song: Song) -> Self {
        Self {
            behaviour: LyricsBehaviour::Found(song),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn not_found() -> Self {
        Self {
            behaviour: LyricsBehaviour::NotFound,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            behaviour: LyricsBehaviour::Failing,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LyricsProvider for StaticLyrics {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self, _query: &str) -> Result<Option<Song>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            LyricsBehaviour::Found(song) => Ok(Some(song.clone())),
            LyricsBehaviour::NotFound => Ok(None),
            LyricsBehaviour::Failing => Err(Error::Provider("upstream returned 503".into())),
        }
    }
}

/// Settings kept in a map; can be told to fail reads.
#[derive(Default)]
pub struct MemorySettings {
    delays: Mutex<HashMap<SettingsKey, f64>>,
    fail_reads: AtomicBool,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value without validation.
    pub fn preset(&self, key: SettingsKey, delay_secs: f64) {
        self.delays.lock().insert(key, delay_secs);
    }

    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn get_default_delay(&self, key: SettingsKey) -> Result<Option<f64>, Error> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Io(std::io::Error::other("settings unavailable")));
        }
        Ok(self.delays.lock().get(&key).copied())
    }

    async fn set_default_delay(&self, key: SettingsKey, delay_secs: f64) -> Result<(), Error> {
        let delay_secs = crate::karaoke::validate_delay(delay_secs)?;
        self.delays.lock().insert(key, delay_secs);
        Ok(())
    }
}
