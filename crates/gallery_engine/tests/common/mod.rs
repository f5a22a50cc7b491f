#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use gallery_core::{IconStatus, Item, TabId, TabMessage, UiEvent};
use gallery_engine::{
    BadgeSetter, CheckpointManager, CoordinatorConfig, DownloadCoordinator, DownloadId,
    DownloadProjection, DownloadRequest, DownloadService, ExportError, Exporter, FailureKind,
    IconStatusProjector, IconStatusTracker, KeyValueStore, MemoryStore, MessageRouter,
    RouterDeps, SessionStateManager, StorageError, TransferError, Transport, TransportError,
};
use serde_json::{json, Value};

pub const CHECKPOINT_KEY: &str = "pagination_checkpoint";
pub const SETTINGS_KEY: &str = "settings";
pub const FIXED_TIMESTAMP: i64 = 1_700_000_000_000;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(gallery_logging::initialize_for_tests);
}

pub fn items(urls: &[&str]) -> Vec<Item> {
    urls.iter().map(|url| Item::new(*url)).collect()
}

/// Let spawned tasks run until `ready` holds.
pub async fn wait_until(mut ready: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if ready() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(TabId, TabMessage)>>,
    events: Mutex<Vec<UiEvent>>,
    tabs_unreachable: AtomicBool,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<(TabId, TabMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<UiEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
        self.events.lock().unwrap().clear();
    }

    pub fn make_tabs_unreachable(&self) {
        self.tabs_unreachable.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_to_tab(&self, tab: TabId, message: TabMessage) -> Result<(), TransportError> {
        if self.tabs_unreachable.load(Ordering::SeqCst) {
            return Err(TransportError::NoReceiver(tab));
        }
        self.sent.lock().unwrap().push((tab, message));
        Ok(())
    }

    fn broadcast(&self, event: UiEvent) -> Result<(), TransportError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BadgeCall {
    Text(TabId, String),
    Background(TabId, String),
}

#[derive(Default)]
pub struct RecordingBadge {
    calls: Mutex<Vec<BadgeCall>>,
}

impl RecordingBadge {
    pub fn calls(&self) -> Vec<BadgeCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl BadgeSetter for RecordingBadge {
    fn set_text(&self, tab: TabId, text: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(BadgeCall::Text(tab, text.to_string()));
    }

    fn set_background(&self, tab: TabId, color: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(BadgeCall::Background(tab, color.to_string()));
    }
}

/// Accepts every URL except those containing `fail`.
#[derive(Default)]
pub struct FakeDownloadService {
    requests: Mutex<Vec<DownloadRequest>>,
    next_id: AtomicU64,
}

impl FakeDownloadService {
    pub fn requests(&self) -> Vec<DownloadRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl DownloadService for FakeDownloadService {
    async fn download(&self, request: DownloadRequest) -> Result<DownloadId, TransferError> {
        let failing = request.url.contains("fail");
        self.requests.lock().unwrap().push(request);
        tokio::task::yield_now().await;
        if failing {
            return Err(TransferError::new(FailureKind::HttpStatus(404), "404 Not Found"));
        }
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Reads succeed empty, writes fail.
#[derive(Default)]
pub struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<Value>, StorageError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Value) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("disk full".to_string()))
    }

    async fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("disk full".to_string()))
    }
}

/// Echoes its input; format `panic` panics, anything but `json` is rejected.
pub struct StubExporter;

#[async_trait]
impl Exporter for StubExporter {
    async fn export(
        &self,
        format: &str,
        items: &[Item],
        _options: &Value,
    ) -> Result<Value, ExportError> {
        match format {
            "json" => Ok(json!({"format": format, "count": items.len()})),
            "panic" => panic!("exporter exploded"),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

pub struct Harness {
    pub router: Arc<MessageRouter>,
    pub state: Arc<SessionStateManager>,
    pub checkpoints: Arc<CheckpointManager>,
    pub downloads: Arc<DownloadCoordinator>,
    pub transport: Arc<RecordingTransport>,
    pub icon: Arc<IconStatusTracker>,
    pub badge: Arc<RecordingBadge>,
    pub files: Arc<FakeDownloadService>,
    pub config: CoordinatorConfig,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<dyn KeyValueStore>) -> Self {
        init_logging();
        let config = CoordinatorConfig {
            download_batch_size: 3,
            icon_idle_grace: Duration::from_millis(2000),
            ..CoordinatorConfig::default()
        };

        let transport = Arc::new(RecordingTransport::default());
        let icon = Arc::new(IconStatusTracker::new());
        let badge = Arc::new(RecordingBadge::default());
        let files = Arc::new(FakeDownloadService::default());

        let state = Arc::new(SessionStateManager::new(Arc::clone(&store), SETTINGS_KEY));
        let checkpoints = Arc::new(
            CheckpointManager::new(store, CHECKPOINT_KEY).with_clock(Arc::new(|| FIXED_TIMESTAMP)),
        );
        let projection = Arc::new(DownloadProjection::new(
            transport.clone(),
            icon.clone(),
            config.icon_idle_grace,
        ));
        let downloads = Arc::new(DownloadCoordinator::new(
            files.clone(),
            projection,
            Arc::clone(&state),
            config.download_batch_size,
        ));

        let router = MessageRouter::new(
            RouterDeps {
                state: Arc::clone(&state),
                checkpoints: Arc::clone(&checkpoints),
                downloads: Arc::clone(&downloads),
                transport: transport.clone(),
                icon: icon.clone(),
                badge: badge.clone(),
                files: files.clone(),
                exporter: Arc::new(StubExporter),
                memory: None,
            },
            &config,
        );

        Self {
            router,
            state,
            checkpoints,
            downloads,
            transport,
            icon,
            badge,
            files,
            config,
        }
    }

    pub fn icon(&self) -> IconStatus {
        self.icon.current()
    }
}
