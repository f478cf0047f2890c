use std::sync::{Arc, OnceLock};

use twilight_http::Client as HttpClient;
use twilight_model::id::Id;
use twilight_model::id::marker::ApplicationMarker;

use neonbot_common::traits::api::ChannelOutput;

use crate::karaoke::KaraokeControl;
use crate::services::command_service::CommandService;

/// EventContext encapsulates all services that event handlers might need.
/// Handlers get one object instead of many parameters, which keeps them
/// easy to construct in tests.
pub struct EventContext {
    pub command_service: Arc<CommandService>,
    pub control: Arc<KaraokeControl>,
    pub output: Arc<dyn ChannelOutput>,
    /// Prefix for text commands, e.g. `+`.
    pub prefix: String,
    /// `None` when running without a Discord connection (tests).
    pub discord_http: Option<Arc<HttpClient>>,
    application_id: OnceLock<Id<ApplicationMarker>>,
}

impl EventContext {
    pub fn new(
        command_service: Arc<CommandService>,
        control: Arc<KaraokeControl>,
        output: Arc<dyn ChannelOutput>,
        prefix: &str,
        discord_http: Option<Arc<HttpClient>>,
    ) -> Self {
        Self {
            command_service,
            control,
            output,
            prefix: prefix.to_string(),
            discord_http,
            application_id: OnceLock::new(),
        }
    }

    /// Learned from the gateway READY payload. Later calls are ignored.
    pub fn set_application_id(&self, id: Id<ApplicationMarker>) -> bool {
        self.application_id.set(id).is_ok()
    }

    pub fn application_id(&self) -> Option<Id<ApplicationMarker>> {
        self.application_id.get().copied()
    }
}
