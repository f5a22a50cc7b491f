//! Gallery core: session data model, message taxonomy and the pagination state machine.
//!
//! Everything in this crate is pure data and pure transitions; the async
//! coordinator that owns the live session lives in `gallery_engine`.
mod checkpoint;
mod download;
mod event;
mod item;
mod msg;
mod pagination;
mod response;
mod state;

pub use checkpoint::{Checkpoint, CheckpointDraft};
pub use download::{
    DownloadEvent, DownloadOptions, DownloadProgress, DownloadState, DownloadStatus,
    FailedDownload,
};
pub use event::{Ack, IconStatus, TabMessage, Toast, ToastKind, UiEvent};
pub use item::{normalize_identity, AddOutcome, ImageCollection, Item};
pub use msg::{
    ErrorReport, FileDownload, MemoryWarning, Message, ParseError, SenderContext, TabId,
    MESSAGE_TYPES,
};
pub use pagination::{
    PaginationCommand, PaginationReport, PaginationState, PaginationStatus, TransitionError,
};
pub use response::{Payload, Response};
pub use state::{GalleryStatus, MemoryStats, SessionStats, Settings};
