//! Gallery engine: the async session coordinator and its IO collaborators.
mod checkpoint;
mod config;
mod download;
mod error;
mod export;
mod fetch;
mod filename;
mod icon;
mod lock;
mod persist;
mod ports;
mod router;
mod state;
mod store;

pub use checkpoint::{CheckpointManager, Clock};
pub use config::CoordinatorConfig;
pub use download::{DownloadCoordinator, DownloadJob};
pub use error::{
    DownloadError, ExportError, FailureKind, RouterError, StorageError, TransferError,
    TransportError,
};
pub use export::JsonExporter;
pub use fetch::{ReqwestDownloadService, TransferSettings};
pub use filename::download_filename;
pub use icon::{show_waiting_then_idle, DownloadProjection, IconStatusTracker};
pub use lock::NamedLocks;
pub use persist::{ensure_dir, write_atomic};
pub use ports::{
    BadgeSetter, DownloadEventSink, DownloadId, DownloadRequest, DownloadService, Exporter,
    IconStatusProjector, MemoryMonitor, Transport,
};
pub use router::{Dispatch, MessageRouter, RouterDeps};
pub use state::{SessionStateManager, IMAGES_LOCK};
pub use store::{FileStore, KeyValueStore, MemoryStore};
