use std::path::PathBuf;
use std::time::Duration;

use crate::fetch::TransferSettings;

/// Tunables for one coordinator instance.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Directory backing the key-value store.
    pub storage_dir: PathBuf,
    /// Root directory for downloaded files and exports.
    pub download_dir: PathBuf,
    pub download_batch_size: usize,
    /// How long the icon shows `waiting` after a page completes.
    pub icon_idle_grace: Duration,
    pub toast_duration_ms: u64,
    pub checkpoint_key: String,
    pub settings_key: String,
    pub transfer: TransferSettings,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("state"),
            download_dir: PathBuf::from("downloads"),
            download_batch_size: 5,
            icon_idle_grace: Duration::from_millis(2000),
            toast_duration_ms: 5000,
            checkpoint_key: "pagination_checkpoint".to_string(),
            settings_key: "settings".to_string(),
            transfer: TransferSettings::default(),
        }
    }
}
