use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{PaginationStatus, TabId};

/// Option name to value, merged key by key on update.
pub type Settings = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryStatus {
    pub is_gallery: bool,
    #[serde(default)]
    pub image_count: u32,
}

/// Read-only summary of the live session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub total_images: usize,
    pub current_tab: Option<TabId>,
    pub gallery: GalleryStatus,
    pub pagination: PaginationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub used: u64,
    pub total: u64,
    pub usage_percent: f64,
}
