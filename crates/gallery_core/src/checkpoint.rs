use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Item, PaginationStatus};

/// Snapshot content supplied by the scraping tab before a risky navigation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointDraft {
    #[serde(default)]
    pub pagination_status: PaginationStatus,
    #[serde(default)]
    pub images: Vec<Item>,
    #[serde(default)]
    pub session_meta: Map<String, Value>,
}

/// The single persisted resume point. `timestamp` is epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub pagination_status: PaginationStatus,
    pub images: Vec<Item>,
    pub timestamp: i64,
    #[serde(default)]
    pub session_meta: Map<String, Value>,
}

impl Checkpoint {
    pub fn from_draft(draft: CheckpointDraft, timestamp: i64) -> Self {
        Self {
            pagination_status: draft.pagination_status,
            images: draft.images,
            timestamp,
            session_meta: draft.session_meta,
        }
    }
}
