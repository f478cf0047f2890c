//! File-backed karaoke settings (`settings.json` in the data directory).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use neonbot_common::models::{ChannelSettings, SettingsKey};
use neonbot_common::traits::repository_traits::SettingsStore;

use crate::Error;
use crate::karaoke::validate_delay;

pub const SETTINGS_FILE_NAME: &str = "settings.json";

type SettingsFile = BTreeMap<String, ChannelSettings>;

pub struct JsonSettingsStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonSettingsStore {
    /// Open (creating if needed) `<data_dir>/settings.json`.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, Error> {
        let data_dir = data_dir.as_ref();
        tokio::fs::create_dir_all(data_dir).await?;
        let path = data_dir.join(SETTINGS_FILE_NAME);
        if tokio::fs::try_exists(&path).await? {
            debug!("Using settings file {}", path.display());
        } else {
            info!("Creating empty settings file {}", path.display());
            write_file(&path, &SettingsFile::new()).await?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<SettingsFile, Error> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) if raw.trim().is_empty() => Ok(SettingsFile::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SettingsFile::new()),
            Err(e) => Err(e.into()),
        }
    }
}

async fn write_file(path: &Path, data: &SettingsFile) -> Result<(), Error> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, serde_json::to_vec_pretty(data)?).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl SettingsStore for JsonSettingsStore {
    async fn get_default_delay(&self, key: SettingsKey) -> Result<Option<f64>, Error> {
        let _guard = self.lock.lock().await;
        let data = self.read_all().await?;
        Ok(data.get(&key.to_string()).and_then(|s| s.default_delay))
    }

    async fn set_default_delay(&self, key: SettingsKey, delay_secs: f64) -> Result<(), Error> {
        let delay_secs = validate_delay(delay_secs)?;
        let _guard = self.lock.lock().await;
        let mut data = self.read_all().await?;
        data.entry(key.to_string()).or_default().default_delay = Some(delay_secs);
        write_file(&self.path, &data).await?;
        info!(%key, delay_secs, "default karaoke delay updated");
        Ok(())
    }
}
