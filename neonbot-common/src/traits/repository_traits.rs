use async_trait::async_trait;

use crate::error::Error;
use crate::models::SettingsKey;

/// Persistent per-guild (or per-DM) karaoke settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Stored default line delay in seconds, `None` if never set.
    async fn get_default_delay(&self, key: SettingsKey) -> Result<Option<f64>, Error>;

    async fn set_default_delay(&self, key: SettingsKey, delay_secs: f64) -> Result<(), Error>;
}
