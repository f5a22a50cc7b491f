//! Seams to the platform the coordinator runs in.
//!
//! Each trait stands for one external collaborator: cross-context messaging,
//! the toolbar badge and icon, the platform download service, export
//! encoding, and memory statistics.

use async_trait::async_trait;
use gallery_core::{
    DownloadEvent, IconStatus, Item, MemoryStats, TabId, TabMessage, UiEvent,
};
use serde_json::Value;

use crate::{ExportError, TransferError, TransportError};

pub type DownloadId = u64;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver to one tab and wait until it was accepted.
    async fn send_to_tab(&self, tab: TabId, message: TabMessage) -> Result<(), TransportError>;

    /// Fire-and-forget fan-out to every UI observer.
    fn broadcast(&self, event: UiEvent) -> Result<(), TransportError>;
}

pub trait BadgeSetter: Send + Sync {
    fn set_text(&self, tab: TabId, text: &str);
    fn set_background(&self, tab: TabId, color: &str);
}

pub trait IconStatusProjector: Send + Sync {
    fn set(&self, status: IconStatus);
    fn current(&self) -> IconStatus;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    /// Relative path below the download directory.
    pub filename: String,
    pub save_as: bool,
}

#[async_trait]
pub trait DownloadService: Send + Sync {
    async fn download(&self, request: DownloadRequest) -> Result<DownloadId, TransferError>;
}

#[async_trait]
pub trait Exporter: Send + Sync {
    async fn export(
        &self,
        format: &str,
        items: &[Item],
        options: &Value,
    ) -> Result<Value, ExportError>;
}

pub trait MemoryMonitor: Send + Sync {
    fn stats(&self) -> Option<MemoryStats>;
}

pub trait DownloadEventSink: Send + Sync {
    fn emit(&self, event: DownloadEvent);
}
