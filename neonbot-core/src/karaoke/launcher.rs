use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker};

use neonbot_common::models::{ControlOp, SettingsKey};
use neonbot_common::traits::api::{ChannelOutput, LyricsProvider};
use neonbot_common::traits::repository_traits::SettingsStore;

use crate::Error;
use crate::karaoke::registry::SessionRegistry;
use crate::karaoke::session::{EndReason, KaraokeSession};
use crate::karaoke::{DEFAULT_DELAY_SECS, driver, notices, validate_delay};

#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub channel_id: Id<ChannelMarker>,
    pub guild_id: Option<Id<GuildMarker>>,
    pub query: String,
    /// Seconds between lines; must be within `[0.1, 10.0]` when given.
    pub delay_override: Option<f64>,
}

impl LaunchRequest {
    pub fn new(channel_id: Id<ChannelMarker>, query: &str) -> Self {
        Self {
            channel_id,
            guild_id: None,
            query: query.to_string(),
            delay_override: None,
        }
    }

    pub fn in_guild(mut self, guild_id: Option<Id<GuildMarker>>) -> Self {
        self.guild_id = guild_id;
        self
    }

    pub fn with_delay(mut self, delay_secs: Option<f64>) -> Self {
        self.delay_override = delay_secs;
        self
    }
}

/// Starts karaoke sessions. A new launch in a channel always replaces the old one.
#[derive(Clone)]
pub struct KaraokeLauncher {
    registry: SessionRegistry,
    lyrics: Arc<dyn LyricsProvider>,
    settings: Arc<dyn SettingsStore>,
    output: Arc<dyn ChannelOutput>,
}

impl KaraokeLauncher {
    pub fn new(
        registry: SessionRegistry,
        lyrics: Arc<dyn LyricsProvider>,
        settings: Arc<dyn SettingsStore>,
        output: Arc<dyn ChannelOutput>,
    ) -> Self {
        Self {
            registry,
            lyrics,
            settings,
            output,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Resolve delay and song, post the control message, register the
    /// session and start its driver.
    ///
    /// Errors: `Validation` for a bad delay (nothing touched), `NotFound`
    /// when no lyrics came back (no control message posted), anything else
    /// for platform failures.
    pub async fn launch(&self, request: LaunchRequest) -> Result<Arc<KaraokeSession>, Error> {
        let delay_secs = self.resolve_delay(&request).await?;
        let channel_id = request.channel_id;

        if let Some(previous) = self.registry.get(channel_id) {
            if previous.terminate(EndReason::Superseded) {
                info!(channel = %channel_id, session = %previous.id(), "superseding running karaoke session");
            }
        }

        let song = match self.lyrics.fetch(&request.query).await {
            Ok(Some(song)) if !song.is_blank() => song,
            Ok(Some(song)) => {
                info!(query = %request.query, source = %song.source, "lyrics provider returned an empty text");
                return Err(not_found(&request.query));
            }
            Ok(None) => {
                info!(query = %request.query, "no lyrics found");
                return Err(not_found(&request.query));
            }
            Err(e) => {
                warn!(query = %request.query, provider = self.lyrics.name(), "lyrics lookup failed: {e}");
                return Err(not_found(&request.query));
            }
        };

        let control_surface_id = self
            .output
            .create_control_surface(
                channel_id,
                &notices::control_surface(&song, delay_secs),
                &ControlOp::ALL,
            )
            .await?;

        let session = Arc::new(KaraokeSession::new(
            channel_id,
            control_surface_id,
            song,
            Duration::from_secs_f64(delay_secs),
            self.output.clone(),
        ));

        // Register before the driver can yield, so early reactions find it.
        if let Some(replaced) = self.registry.put(session.clone()) {
            if replaced.id() != session.id() && replaced.terminate(EndReason::Superseded) {
                info!(channel = %channel_id, session = %replaced.id(), "superseded a concurrent launch");
            }
        }
        session.attach_task(driver::spawn(session.clone(), self.registry.clone()));

        info!(
            channel = %channel_id,
            session = %session.id(),
            title = %session.song().title,
            source = %session.song().source,
            delay_secs,
            "karaoke session launched"
        );
        Ok(session)
    }

    async fn resolve_delay(&self, request: &LaunchRequest) -> Result<f64, Error> {
        if let Some(delay) = request.delay_override {
            return validate_delay(delay);
        }

        let key = SettingsKey::for_location(request.guild_id, request.channel_id);
        match self.settings.get_default_delay(key).await {
            Ok(Some(stored)) => match validate_delay(stored) {
                Ok(delay) => Ok(delay),
                Err(_) => {
                    warn!(%key, stored, "ignoring out-of-range stored delay");
                    Ok(DEFAULT_DELAY_SECS)
                }
            },
            Ok(None) => Ok(DEFAULT_DELAY_SECS),
            Err(e) => {
                warn!(%key, "could not read stored delay, using default: {e}");
                Ok(DEFAULT_DELAY_SECS)
            }
        }
    }
}

fn not_found(query: &str) -> Error {
    Error::NotFound(format!("Could not find lyrics for **{query}**."))
}
