//! neonbot-server/src/context.rs
//!
//! Wires every service together (ServerContext) before anything connects.

use std::sync::Arc;

use tracing::info;

use neonbot_common::traits::api::{ChannelOutput, LyricsProvider};
use neonbot_common::traits::repository_traits::SettingsStore;
use neonbot_core::Error;
use neonbot_core::eventbus::EventBus;
use neonbot_core::karaoke::{KaraokeControl, KaraokeLauncher, SessionRegistry};
use neonbot_core::lyrics::LyricsService;
use neonbot_core::platforms::discord::{DiscordOutput, DiscordPlatform};
use neonbot_core::services::event_handlers::register_builtin_handlers;
use neonbot_core::services::{CommandService, EventContext, EventHandlerRegistry};
use neonbot_core::settings::JsonSettingsStore;
use neonbot_core::{DefaultHttpClient, HttpClient};

use crate::Args;

/// The global server context (a bag of references to the bus, sessions, platform, etc.).
pub struct ServerContext {
    pub event_bus: Arc<EventBus>,
    pub sessions: SessionRegistry,
    pub platform: DiscordPlatform,
    pub handlers: Arc<EventHandlerRegistry>,
    pub event_context: Arc<EventContext>,
}

impl ServerContext {
    pub async fn new(args: &Args) -> Result<Self, Error> {
        let event_bus = Arc::new(EventBus::new());
        let sessions = SessionRegistry::new();

        let platform = DiscordPlatform::new(&args.discord_token, event_bus.clone())?;
        let output: Arc<dyn ChannelOutput> = Arc::new(DiscordOutput::new(platform.http()));

        let http: Arc<dyn HttpClient> = Arc::new(DefaultHttpClient::new());
        let lyrics = LyricsService::with_defaults(http, args.genius_token.as_deref());
        info!("Lyrics providers: {:?}", lyrics.provider_names());
        let lyrics: Arc<dyn LyricsProvider> = Arc::new(lyrics);

        let store = JsonSettingsStore::open(&args.data_dir).await?;
        info!("Settings file: {}", store.path().display());
        let settings: Arc<dyn SettingsStore> = Arc::new(store);

        let control = Arc::new(KaraokeControl::new(sessions.clone(), output.clone()));
        let launcher = KaraokeLauncher::new(sessions.clone(), lyrics.clone(), settings.clone(), output.clone());
        let command_service = Arc::new(CommandService::new(
            launcher,
            control.clone(),
            settings,
            lyrics,
            &args.prefix,
        ));
        let event_context = Arc::new(EventContext::new(
            command_service,
            control,
            output,
            &args.prefix,
            Some(platform.http()),
        ));

        let handlers = Arc::new(EventHandlerRegistry::new());
        register_builtin_handlers(&handlers).await?;

        Ok(Self {
            event_bus,
            sessions,
            platform,
            handlers,
            event_context,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[tokio::test]
    async fn builds_without_connecting() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let args = Args::try_parse_from([
            "neonbot",
            "--discord-token",
            "token",
            "--data-dir",
            data_dir.to_str().unwrap(),
        ])
        .unwrap();

        let ctx = ServerContext::new(&args).await.unwrap();
        assert!(data_dir.join("settings.json").exists());
        assert!(!ctx.platform.is_connected());
        assert_eq!(ctx.handlers.list_handlers().await.len(), 4);
        assert!(ctx.sessions.is_empty());
    }
}
