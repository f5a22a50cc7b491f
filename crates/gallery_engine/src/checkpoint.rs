use std::sync::Arc;

use chrono::Utc;
use gallery_core::{Checkpoint, CheckpointDraft};
use gallery_logging::{gallery_debug, gallery_info};

use crate::store::KeyValueStore;
use crate::StorageError;

/// Source of checkpoint timestamps, epoch milliseconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Persists the single resumable snapshot of a crawl.
///
/// There is at most one checkpoint: `save` overwrites, `clear` deletes.
pub struct CheckpointManager {
    store: Arc<dyn KeyValueStore>,
    key: String,
    clock: Clock,
}

impl CheckpointManager {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            clock: Arc::new(|| Utc::now().timestamp_millis()),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub async fn save(&self, draft: CheckpointDraft) -> Result<Checkpoint, StorageError> {
        let checkpoint = Checkpoint::from_draft(draft, (self.clock)());
        let value = serde_json::to_value(&checkpoint).map_err(|source| StorageError::Encode {
            key: self.key.clone(),
            source,
        })?;
        self.store.set(&self.key, value).await?;
        gallery_info!(
            "Checkpoint saved: page {} with {} images",
            checkpoint.pagination_status.current_page,
            checkpoint.images.len()
        );
        Ok(checkpoint)
    }

    /// `Ok(None)` when nothing has been saved.
    pub async fn load(&self) -> Result<Option<Checkpoint>, StorageError> {
        let Some(value) = self.store.get(&self.key).await? else {
            gallery_debug!("No checkpoint stored");
            return Ok(None);
        };
        let checkpoint = serde_json::from_value(value).map_err(|source| StorageError::Decode {
            key: self.key.clone(),
            source,
        })?;
        Ok(Some(checkpoint))
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(&self.key).await?;
        gallery_debug!("Checkpoint cleared");
        Ok(())
    }

    pub async fn exists(&self) -> Result<bool, StorageError> {
        Ok(self.store.get(&self.key).await?.is_some())
    }
}
