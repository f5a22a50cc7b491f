use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use gallery_core::{DownloadEvent, IconStatus, UiEvent};
use gallery_logging::gallery_debug;

use crate::ports::{DownloadEventSink, IconStatusProjector, Transport};

/// In-memory icon state that logs every change.
#[derive(Debug, Default)]
pub struct IconStatusTracker {
    current: Mutex<IconStatus>,
}

impl IconStatusTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IconStatusProjector for IconStatusTracker {
    fn set(&self, status: IconStatus) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if *current != status {
            gallery_debug!("Icon status {:?} -> {:?}", *current, status);
            *current = status;
        }
    }

    fn current(&self) -> IconStatus {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Show `waiting`, then fall back to `idle` after `grace` unless something
/// else took over the icon in the meantime.
pub fn show_waiting_then_idle(icon: &Arc<dyn IconStatusProjector>, grace: Duration) {
    icon.set(IconStatus::Waiting);
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        gallery_debug!("No runtime for icon decay; leaving icon in waiting");
        return;
    };
    let icon = Arc::clone(icon);
    runtime.spawn(async move {
        tokio::time::sleep(grace).await;
        if icon.current() == IconStatus::Waiting {
            icon.set(IconStatus::Idle);
        }
    });
}

/// Projects download lifecycle events onto the icon and the UI channel.
pub struct DownloadProjection {
    transport: Arc<dyn Transport>,
    icon: Arc<dyn IconStatusProjector>,
    idle_grace: Duration,
}

impl DownloadProjection {
    pub fn new(
        transport: Arc<dyn Transport>,
        icon: Arc<dyn IconStatusProjector>,
        idle_grace: Duration,
    ) -> Self {
        Self {
            transport,
            icon,
            idle_grace,
        }
    }
}

impl DownloadEventSink for DownloadProjection {
    fn emit(&self, event: DownloadEvent) {
        match &event {
            DownloadEvent::Started(progress) | DownloadEvent::Progress(progress) => {
                self.icon.set(IconStatus::Downloading {
                    downloaded: progress.downloaded,
                    total: progress.total,
                });
            }
            DownloadEvent::PageComplete(_) => show_waiting_then_idle(&self.icon, self.idle_grace),
            DownloadEvent::Complete(_) => self.icon.set(IconStatus::Complete),
            DownloadEvent::Stopped(_) => self.icon.set(IconStatus::Idle),
            DownloadEvent::Failed { .. } => self.icon.set(IconStatus::Error {
                message: "Download failed".to_string(),
            }),
        }
        if let Err(err) = self.transport.broadcast(UiEvent::from(event)) {
            gallery_debug!("Error broadcasting download event: {}", err);
        }
    }
}
