use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DownloadState {
    #[default]
    Idle,
    Downloading,
    AwaitingConfirmation,
    Stopped,
    Complete,
    Failed,
}

impl DownloadState {
    pub fn is_active(self) -> bool {
        matches!(
            self,
            DownloadState::Downloading | DownloadState::AwaitingConfirmation
        )
    }
}

/// Counters for the current (or last) batch job.
///
/// `downloaded + failed <= total` holds for every snapshot handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadProgress {
    pub total: usize,
    pub downloaded: usize,
    pub failed: usize,
    pub batch: usize,
}

impl DownloadProgress {
    pub fn processed(&self) -> usize {
        self.downloaded + self.failed
    }

    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.processed())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedDownload {
    pub url: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadStatus {
    pub state: DownloadState,
    pub progress: DownloadProgress,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailedDownload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadOptions {
    /// Items per batch before asking whether to continue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
    /// Sub-folder prepended to every filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(default)]
    pub save_as: bool,
}

/// Lifecycle notifications emitted by the download coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadEvent {
    Started(DownloadProgress),
    Progress(DownloadProgress),
    /// A batch finished and the job now waits for a continue/stop decision.
    PageComplete(DownloadProgress),
    Complete(DownloadProgress),
    Stopped(DownloadProgress),
    Failed {
        progress: DownloadProgress,
        reason: String,
    },
}

impl DownloadEvent {
    pub fn progress(&self) -> DownloadProgress {
        match self {
            DownloadEvent::Started(p)
            | DownloadEvent::Progress(p)
            | DownloadEvent::PageComplete(p)
            | DownloadEvent::Complete(p)
            | DownloadEvent::Stopped(p) => *p,
            DownloadEvent::Failed { progress, .. } => *progress,
        }
    }
}
