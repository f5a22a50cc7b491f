use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{DownloadEvent, DownloadProgress, GalleryStatus, Item, Message, PaginationStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: ToastKind,
    /// Display time in milliseconds.
    #[serde(default = "default_toast_duration")]
    pub duration: u64,
}

fn default_toast_duration() -> u64 {
    5000
}

impl Toast {
    pub fn new(kind: ToastKind, message: impl Into<String>, duration: u64) -> Self {
        Self {
            message: message.into(),
            kind,
            duration,
        }
    }
}

/// Events fanned out to every open UI observer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum UiEvent {
    #[serde(rename = "gallery-status-update")]
    GalleryStatusUpdate { data: GalleryStatus },
    #[serde(rename = "images-update")]
    ImagesUpdate { images: Vec<Item> },
    #[serde(rename = "pagination-status-update")]
    PaginationStatusUpdate { data: PaginationStatus },
    #[serde(rename = "toast-show")]
    ToastShow { data: Toast },
    #[serde(rename = "download-progress-update")]
    DownloadProgressUpdate { data: Option<Value> },
    #[serde(rename = "download/started")]
    DownloadStarted { data: DownloadProgress },
    #[serde(rename = "download/progress")]
    DownloadProgress { data: DownloadProgress },
    #[serde(rename = "download/page-complete")]
    DownloadPageComplete { data: DownloadProgress },
    #[serde(rename = "download/complete")]
    DownloadComplete { data: DownloadProgress },
    #[serde(rename = "download/stopped")]
    DownloadStopped { data: DownloadProgress },
    #[serde(rename = "download/failed")]
    DownloadFailed { data: DownloadProgress, error: String },
}

impl From<DownloadEvent> for UiEvent {
    fn from(event: DownloadEvent) -> Self {
        match event {
            DownloadEvent::Started(data) => UiEvent::DownloadStarted { data },
            DownloadEvent::Progress(data) => UiEvent::DownloadProgress { data },
            DownloadEvent::PageComplete(data) => UiEvent::DownloadPageComplete { data },
            DownloadEvent::Complete(data) => UiEvent::DownloadComplete { data },
            DownloadEvent::Stopped(data) => UiEvent::DownloadStopped { data },
            DownloadEvent::Failed { progress, reason } => UiEvent::DownloadFailed {
                data: progress,
                error: reason,
            },
        }
    }
}

/// Acknowledgement sent back to the tab that reported a finished page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "ack")]
pub struct Ack {
    #[serde(rename = "ackFor")]
    pub ack_for: String,
    pub data: Option<Value>,
}

/// Anything the coordinator sends to a specific tab.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TabMessage {
    /// A pagination command relayed verbatim from a UI context.
    Command(Message),
    Ack(Ack),
}

/// Coarse status shown on the toolbar icon.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum IconStatus {
    #[default]
    Idle,
    Downloading {
        downloaded: usize,
        total: usize,
    },
    Paginating {
        page: u32,
    },
    Paused,
    Complete,
    Error {
        message: String,
    },
    Waiting,
}
