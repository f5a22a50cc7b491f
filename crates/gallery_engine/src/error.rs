use std::fmt;
use std::io;

use gallery_core::{TabId, TransitionError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
    #[error("could not encode {key}: {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },
    #[error("could not decode {key}: {source}")]
    Decode {
        key: String,
        source: serde_json::Error,
    },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("No active tab available for pagination command")]
    NoActiveTab,
    #[error("no receiver in tab {0}")]
    NoReceiver(TabId),
    #[error("transport closed: {0}")]
    Closed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Network,
    Write,
    Rejected,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Write => write!(f, "write failed"),
            FailureKind::Rejected => write!(f, "rejected by download service"),
        }
    }
}

/// Failure of a single file transfer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct TransferError {
    pub kind: FailureKind,
    pub message: String,
}

impl TransferError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownloadError {
    #[error("a download job is already running")]
    AlreadyActive,
    #[error("no download batch is waiting for a decision")]
    NoPendingDecision,
    #[error("download interrupted")]
    Interrupted,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unsupported export format {0}")]
    UnsupportedFormat(String),
    #[error("export io error: {0}")]
    Io(#[from] io::Error),
    #[error("could not encode export: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Anything a message handler can fail with.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("handler panicked: {0}")]
    Panicked(String),
}
