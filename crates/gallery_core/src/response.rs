use serde::Serialize;
use serde_json::Value;

use crate::{Checkpoint, DownloadStatus, Item, MemoryStats, SessionStats, Settings};

/// Reply to one inbound message: `{success, error?, ...payload}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Empty {},
    Added {
        total: usize,
        added: usize,
    },
    Images {
        images: Vec<Item>,
    },
    Settings {
        settings: Settings,
    },
    Checkpoint {
        checkpoint: Option<Checkpoint>,
    },
    Exists {
        exists: bool,
    },
    DownloadId {
        #[serde(rename = "downloadId")]
        download_id: u64,
    },
    Export {
        result: Value,
    },
    Status {
        stats: SessionStats,
        downloads: DownloadStatus,
    },
    MemoryStats {
        stats: Option<MemoryStats>,
    },
}

impl Response {
    pub fn ok() -> Self {
        Self::with(Payload::Empty {})
    }

    pub fn with(payload: Payload) -> Self {
        Self {
            success: true,
            error: None,
            payload,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            payload: Payload::Empty {},
        }
    }
}
