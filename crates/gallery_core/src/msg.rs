use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    CheckpointDraft, DownloadOptions, GalleryStatus, Item, PaginationCommand, PaginationReport,
    Settings,
};

pub type TabId = u32;

/// Where an inbound message came from.
///
/// Content scripts run inside a tab and carry its id; popup and side panel
/// contexts do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SenderContext {
    pub tab: Option<TabId>,
}

impl SenderContext {
    pub fn from_tab(tab: TabId) -> Self {
        Self { tab: Some(tab) }
    }

    pub fn ui() -> Self {
        Self { tab: None }
    }
}

/// Every inbound message the coordinator understands.
///
/// The wire form is `{"type": "<tag>", ...payload}`. `export/<format>` is a
/// family of tags and is recognised by [`Message::parse`] before serde runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    #[serde(rename = "init")]
    Init,
    #[serde(rename = "gallery-detected")]
    GalleryDetected { data: GalleryStatus },
    #[serde(rename = "images-found")]
    ImagesFound { images: Vec<Item> },
    #[serde(rename = "pagination-status")]
    PaginationStatus { data: PaginationReport },
    #[serde(rename = "pagination-start")]
    PaginationStart {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    #[serde(rename = "pagination-stop")]
    PaginationStop {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    #[serde(rename = "pagination-pause")]
    PaginationPause {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    #[serde(rename = "pagination-resume")]
    PaginationResume {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    #[serde(rename = "pagination-cancel")]
    PaginationCancel {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    #[serde(rename = "checkpoint-save")]
    CheckpointSave { data: CheckpointDraft },
    #[serde(rename = "checkpoint-load")]
    CheckpointLoad,
    #[serde(rename = "checkpoint-clear")]
    CheckpointClear,
    #[serde(rename = "checkpoint-exists")]
    CheckpointExists,
    #[serde(rename = "memory-warning")]
    MemoryWarning {
        #[serde(default)]
        data: Option<MemoryWarning>,
    },
    #[serde(rename = "memory-stats")]
    MemoryStats,
    #[serde(rename = "toast-show")]
    ToastShow { data: crate::Toast },
    #[serde(rename = "download-page-complete")]
    DownloadPageComplete {
        #[serde(default)]
        data: Option<Value>,
    },
    #[serde(rename = "error-report")]
    ErrorReport {
        #[serde(default)]
        data: Option<ErrorReport>,
    },
    #[serde(rename = "get-images")]
    GetImages,
    #[serde(rename = "clear-images")]
    ClearImages,
    #[serde(rename = "settings-update")]
    SettingsUpdate { settings: Settings },
    #[serde(rename = "settings-get")]
    SettingsGet,
    #[serde(rename = "download-start")]
    DownloadStart {
        #[serde(default)]
        images: Option<Vec<Item>>,
        #[serde(default)]
        options: Option<DownloadOptions>,
    },
    #[serde(rename = "download/batch-response")]
    BatchResponse {
        #[serde(rename = "continue")]
        proceed: bool,
    },
    #[serde(rename = "download/file")]
    DownloadFile { data: FileDownload },
    #[serde(skip)]
    Export {
        format: String,
        data: Option<Value>,
    },
    #[serde(rename = "api-endpoint-detected")]
    ApiEndpointDetected {
        #[serde(default)]
        endpoint: Option<Value>,
    },
    #[serde(rename = "get-status")]
    GetStatus,
}

/// Tags accepted by [`Message::parse`], besides the `export/` family.
pub const MESSAGE_TYPES: &[&str] = &[
    "init",
    "gallery-detected",
    "images-found",
    "pagination-status",
    "pagination-start",
    "pagination-stop",
    "pagination-pause",
    "pagination-resume",
    "pagination-cancel",
    "checkpoint-save",
    "checkpoint-load",
    "checkpoint-clear",
    "checkpoint-exists",
    "memory-warning",
    "memory-stats",
    "toast-show",
    "download-page-complete",
    "error-report",
    "get-images",
    "clear-images",
    "settings-update",
    "settings-get",
    "download-start",
    "download/batch-response",
    "download/file",
    "api-endpoint-detected",
    "get-status",
];

const EXPORT_PREFIX: &str = "export/";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryWarning {
    #[serde(default)]
    pub usage_percent: Option<Value>,
}

impl MemoryWarning {
    /// Usage as display text, e.g. `"87.5"`; `"unknown"` when absent.
    pub fn usage_text(&self) -> String {
        match &self.usage_percent {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Number(number)) => number.to_string(),
            _ => "unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub user_friendly: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDownload {
    pub url: String,
    pub filename: String,
    #[serde(default)]
    pub save_as: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    MissingType,
    UnknownType(String),
    Malformed { message_type: String, reason: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MissingType => write!(f, "message has no type tag"),
            ParseError::UnknownType(tag) => write!(f, "unknown message type {tag}"),
            ParseError::Malformed {
                message_type,
                reason,
            } => write!(f, "malformed {message_type} message: {reason}"),
        }
    }
}

impl std::error::Error for ParseError {}

impl Message {
    /// Classify a raw JSON message.
    pub fn parse(raw: Value) -> Result<Self, ParseError> {
        let tag = raw
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ParseError::MissingType)?
            .to_string();

        if let Some(format) = tag.strip_prefix(EXPORT_PREFIX) {
            let data = raw.get("data").filter(|value| !value.is_null()).cloned();
            return Ok(Message::Export {
                format: format.to_string(),
                data,
            });
        }

        if !MESSAGE_TYPES.contains(&tag.as_str()) {
            return Err(ParseError::UnknownType(tag));
        }

        serde_json::from_value(raw).map_err(|err| ParseError::Malformed {
            message_type: tag,
            reason: err.to_string(),
        })
    }

    /// Wire tag, with `export/<format>` collapsed to `export`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Message::Init => "init",
            Message::GalleryDetected { .. } => "gallery-detected",
            Message::ImagesFound { .. } => "images-found",
            Message::PaginationStatus { .. } => "pagination-status",
            Message::PaginationStart { .. } => "pagination-start",
            Message::PaginationStop { .. } => "pagination-stop",
            Message::PaginationPause { .. } => "pagination-pause",
            Message::PaginationResume { .. } => "pagination-resume",
            Message::PaginationCancel { .. } => "pagination-cancel",
            Message::CheckpointSave { .. } => "checkpoint-save",
            Message::CheckpointLoad => "checkpoint-load",
            Message::CheckpointClear => "checkpoint-clear",
            Message::CheckpointExists => "checkpoint-exists",
            Message::MemoryWarning { .. } => "memory-warning",
            Message::MemoryStats => "memory-stats",
            Message::ToastShow { .. } => "toast-show",
            Message::DownloadPageComplete { .. } => "download-page-complete",
            Message::ErrorReport { .. } => "error-report",
            Message::GetImages => "get-images",
            Message::ClearImages => "clear-images",
            Message::SettingsUpdate { .. } => "settings-update",
            Message::SettingsGet => "settings-get",
            Message::DownloadStart { .. } => "download-start",
            Message::BatchResponse { .. } => "download/batch-response",
            Message::DownloadFile { .. } => "download/file",
            Message::Export { .. } => "export",
            Message::ApiEndpointDetected { .. } => "api-endpoint-detected",
            Message::GetStatus => "get-status",
        }
    }

    /// The control command carried by a `pagination-<command>` message.
    pub fn pagination_command(&self) -> Option<PaginationCommand> {
        match self {
            Message::PaginationStart { .. } => Some(PaginationCommand::Start),
            Message::PaginationStop { .. } => Some(PaginationCommand::Stop),
            Message::PaginationPause { .. } => Some(PaginationCommand::Pause),
            Message::PaginationResume { .. } => Some(PaginationCommand::Resume),
            Message::PaginationCancel { .. } => Some(PaginationCommand::Cancel),
            _ => None,
        }
    }

    /// Build the `pagination-<command>` message for `command`.
    pub fn pagination(command: PaginationCommand) -> Self {
        match command {
            PaginationCommand::Start => Message::PaginationStart { data: None },
            PaginationCommand::Stop => Message::PaginationStop { data: None },
            PaginationCommand::Pause => Message::PaginationPause { data: None },
            PaginationCommand::Resume => Message::PaginationResume { data: None },
            PaginationCommand::Cancel => Message::PaginationCancel { data: None },
        }
    }
}
