use std::fmt;

use serde::{Deserialize, Serialize};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker};

/// Where a stored setting applies. Guild-wide inside servers, per channel in DMs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsKey {
    Guild(Id<GuildMarker>),
    Channel(Id<ChannelMarker>),
}

impl SettingsKey {
    pub fn for_location(guild_id: Option<Id<GuildMarker>>, channel_id: Id<ChannelMarker>) -> Self {
        match guild_id {
            Some(g) => SettingsKey::Guild(g),
            None => SettingsKey::Channel(channel_id),
        }
    }
}

impl fmt::Display for SettingsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Guild keys stay bare so files written by older versions keep working.
            SettingsKey::Guild(id) => write!(f, "{id}"),
            SettingsKey::Channel(id) => write!(f, "channel:{id}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_delay: Option<f64>,
}
