use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gallery_core::{
    AddOutcome, GalleryStatus, ImageCollection, Item, PaginationCommand, PaginationReport,
    PaginationState, PaginationStatus, SessionStats, Settings, TabId, TransitionError,
};
use gallery_logging::{gallery_debug, gallery_info, gallery_warn};
use serde_json::Value;

use crate::lock::NamedLocks;
use crate::store::KeyValueStore;
use crate::StorageError;

/// Lock guarding the item collection.
pub const IMAGES_LOCK: &str = "images";
const SETTINGS_LOCK: &str = "settings";

#[derive(Debug, Default)]
struct Session {
    current_tab: Option<TabId>,
    images: ImageCollection,
    gallery: GalleryStatus,
    pagination: PaginationStatus,
    settings: Settings,
}

/// Owner of the live session.
///
/// Built once at process start and shared by `Arc` with the router and the
/// download coordinator. Field access goes through short synchronous critical
/// sections that never span an await; read-check-insert sequences on the
/// item list must additionally run inside [`SessionStateManager::with_lock`]
/// on [`IMAGES_LOCK`].
pub struct SessionStateManager {
    session: Mutex<Session>,
    locks: NamedLocks,
    store: Arc<dyn KeyValueStore>,
    settings_key: String,
}

impl SessionStateManager {
    pub fn new(store: Arc<dyn KeyValueStore>, settings_key: impl Into<String>) -> Self {
        Self {
            session: Mutex::new(Session::default()),
            locks: NamedLocks::new(),
            store,
            settings_key: settings_key.into(),
        }
    }

    /// Load persisted settings. A missing record keeps the defaults.
    pub async fn initialize(&self) -> Result<(), StorageError> {
        match self.store.get(&self.settings_key).await? {
            Some(Value::Object(settings)) => {
                gallery_info!("Loaded {} persisted settings", settings.len());
                self.session().settings = settings;
            }
            Some(other) => {
                gallery_warn!("Ignoring persisted settings that are not an object: {}", other);
            }
            None => gallery_debug!("No persisted settings, using defaults"),
        }
        Ok(())
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn with_lock<F, Fut, T>(&self, name: &str, section: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.locks.with_lock(name, section).await
    }

    /// Append unseen items. Call while holding [`IMAGES_LOCK`].
    pub fn add_images(&self, items: Vec<Item>) -> AddOutcome {
        let outcome = self.session().images.add(items);
        gallery_debug!(
            "Added {} images ({} skipped), total {}",
            outcome.added,
            outcome.skipped,
            outcome.total
        );
        outcome
    }

    pub fn images(&self) -> Vec<Item> {
        self.session().images.items().to_vec()
    }

    pub fn image_count(&self) -> usize {
        self.session().images.len()
    }

    pub fn clear_images(&self) {
        self.session().images.clear();
    }

    pub fn update_gallery_status(&self, status: GalleryStatus) {
        self.session().gallery = status;
    }

    /// Fold a tab's status report in. Returns the new status and whether the
    /// reported state was a legal move.
    pub fn update_pagination_status(&self, report: &PaginationReport) -> (PaginationStatus, bool) {
        let mut session = self.session();
        let accepted = session.pagination.apply_report(report);
        (session.pagination.clone(), accepted)
    }

    pub fn apply_pagination_command(
        &self,
        command: PaginationCommand,
    ) -> Result<PaginationStatus, TransitionError> {
        let mut session = self.session();
        session.pagination.apply_command(command)?;
        Ok(session.pagination.clone())
    }

    /// Overwrite the logical state without validation.
    pub fn set_pagination_state(&self, state: PaginationState) {
        self.session().pagination.state = state;
    }

    pub fn pagination_status(&self) -> PaginationStatus {
        self.session().pagination.clone()
    }

    pub fn stats(&self) -> SessionStats {
        let session = self.session();
        SessionStats {
            total_images: session.images.len(),
            current_tab: session.current_tab,
            gallery: session.gallery,
            pagination: session.pagination.clone(),
        }
    }

    pub fn settings(&self) -> Settings {
        self.session().settings.clone()
    }

    /// Merge `patch` into the settings and persist the result.
    ///
    /// In-memory settings change only after the store accepted the write.
    pub async fn update_settings(&self, patch: Settings) -> Result<Settings, StorageError> {
        self.with_lock(SETTINGS_LOCK, || async move {
            let mut merged = self.settings();
            merged.extend(patch);
            self.store
                .set(&self.settings_key, Value::Object(merged.clone()))
                .await?;
            self.session().settings = merged.clone();
            Ok(merged)
        })
        .await
    }

    /// Last writer wins.
    pub fn set_current_tab(&self, tab: TabId) {
        let previous = self.session().current_tab.replace(tab);
        if previous != Some(tab) {
            gallery_info!("Scraping tab is now {} (was {:?})", tab, previous);
        }
    }

    pub fn current_tab(&self) -> Option<TabId> {
        self.session().current_tab
    }
}
