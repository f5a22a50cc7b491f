use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gallery_core::{
    DownloadEvent, DownloadOptions, DownloadProgress, DownloadState, DownloadStatus,
    FailedDownload, Item,
};
use gallery_logging::{gallery_debug, gallery_info, gallery_warn};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::filename::download_filename;
use crate::ports::{DownloadEventSink, DownloadId, DownloadRequest, DownloadService};
use crate::state::SessionStateManager;
use crate::{DownloadError, TransferError};

#[derive(Default)]
struct Job {
    /// Bumped on every claim; a job only touches the slot it claimed.
    generation: u64,
    status: DownloadStatus,
    /// Present while a finished batch waits for a continue/stop decision.
    gate: Option<oneshot::Sender<bool>>,
}

/// Runs one batched download job at a time.
///
/// After every batch but the last the job parks on a gate until
/// [`DownloadCoordinator::resume_downloads`] says whether to go on. Items
/// already handed to the download service are never recalled.
pub struct DownloadCoordinator {
    service: Arc<dyn DownloadService>,
    sink: Arc<dyn DownloadEventSink>,
    session: Arc<SessionStateManager>,
    default_batch_size: usize,
    job: Mutex<Job>,
    shutdown: CancellationToken,
}

/// A claimed job slot, returned by [`DownloadCoordinator::begin`].
///
/// The slot stays active until [`DownloadJob::run`] finishes. Dropping an
/// unfinished job marks it failed.
pub struct DownloadJob {
    coordinator: Arc<DownloadCoordinator>,
    generation: u64,
    items: Vec<Item>,
    options: DownloadOptions,
}

impl Drop for DownloadJob {
    fn drop(&mut self) {
        let mut job = self.coordinator.job();
        if job.generation == self.generation && job.status.state.is_active() {
            job.status.state = DownloadState::Failed;
            job.gate = None;
        }
    }
}

impl DownloadCoordinator {
    pub fn new(
        service: Arc<dyn DownloadService>,
        sink: Arc<dyn DownloadEventSink>,
        session: Arc<SessionStateManager>,
        default_batch_size: usize,
    ) -> Self {
        Self {
            service,
            sink,
            session,
            default_batch_size: default_batch_size.max(1),
            job: Mutex::new(Job::default()),
            shutdown: CancellationToken::new(),
        }
    }

    fn job(&self) -> MutexGuard<'_, Job> {
        self.job.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> DownloadStatus {
        self.job().status.clone()
    }

    /// Claim the job slot for `items` without starting any transfer.
    ///
    /// Fails with [`DownloadError::AlreadyActive`] while another job holds
    /// the slot, leaving that job untouched.
    pub fn begin(
        self: &Arc<Self>,
        items: Vec<Item>,
        options: DownloadOptions,
    ) -> Result<DownloadJob, DownloadError> {
        if self.shutdown.is_cancelled() {
            return Err(DownloadError::Interrupted);
        }
        let (generation, started) = {
            let mut job = self.job();
            if job.status.state.is_active() {
                return Err(DownloadError::AlreadyActive);
            }
            job.generation += 1;
            job.gate = None;
            job.status = DownloadStatus {
                state: DownloadState::Downloading,
                progress: DownloadProgress {
                    total: items.len(),
                    ..DownloadProgress::default()
                },
                failures: Vec::new(),
            };
            (job.generation, job.status.progress)
        };
        self.sink.emit(DownloadEvent::Started(started));
        Ok(DownloadJob {
            coordinator: Arc::clone(self),
            generation,
            items,
            options,
        })
    }

    /// Claim the slot for everything currently in the session.
    pub fn begin_session(
        self: &Arc<Self>,
        options: DownloadOptions,
    ) -> Result<DownloadJob, DownloadError> {
        let items = self.session.images();
        self.begin(items, options)
    }

    /// Download everything currently in the session.
    pub async fn download_session(
        self: &Arc<Self>,
        options: DownloadOptions,
    ) -> Result<DownloadStatus, DownloadError> {
        self.begin_session(options)?.run().await
    }

    pub async fn download_images(
        self: &Arc<Self>,
        items: Vec<Item>,
        options: DownloadOptions,
    ) -> Result<DownloadStatus, DownloadError> {
        self.begin(items, options)?.run().await
    }

    /// Release a job parked between batches.
    pub fn resume_downloads(&self, should_continue: bool) -> Result<(), DownloadError> {
        let mut job = self.job();
        let gate = job.gate.take().ok_or(DownloadError::NoPendingDecision)?;
        if gate.send(should_continue).is_err() {
            return Err(DownloadError::NoPendingDecision);
        }
        // A stopped job keeps the slot until it has wound down itself.
        if should_continue {
            job.status.state = DownloadState::Downloading;
        }
        gallery_debug!("Batch decision: continue={}", should_continue);
        Ok(())
    }

    /// Tear down: a parked or running job ends as failed.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn record(&self, item: &Item, result: Result<DownloadId, TransferError>) -> DownloadProgress {
        let mut job = self.job();
        match result {
            Ok(id) => {
                gallery_debug!("Download {} started for {}", id, item.url);
                job.status.progress.downloaded += 1;
            }
            Err(err) => {
                gallery_warn!("Download failed for {}: {}", item.url, err);
                job.status.progress.failed += 1;
                job.status.failures.push(FailedDownload {
                    url: item.url.clone(),
                    error: err.to_string(),
                });
            }
        }
        job.status.progress
    }

    /// Move the running job to a final state and snapshot it.
    fn finish(&self, state: DownloadState) -> DownloadStatus {
        let mut job = self.job();
        job.status.state = state;
        job.status.clone()
    }

    /// Park until `resume_downloads` decides; `Ok(false)` means stop.
    async fn await_decision(&self) -> Result<bool, DownloadError> {
        let (tx, rx) = oneshot::channel();
        let progress = {
            let mut job = self.job();
            job.status.state = DownloadState::AwaitingConfirmation;
            job.gate = Some(tx);
            job.status.progress
        };
        self.sink.emit(DownloadEvent::PageComplete(progress));

        tokio::select! {
            decision = rx => decision.map_err(|_| self.interrupt()),
            _ = self.shutdown.cancelled() => Err(self.interrupt()),
        }
    }

    fn interrupt(&self) -> DownloadError {
        let progress = {
            let mut job = self.job();
            job.status.state = DownloadState::Failed;
            job.gate = None;
            job.status.progress
        };
        gallery_warn!(
            "Download interrupted after {} of {} items",
            progress.processed(),
            progress.total
        );
        self.sink.emit(DownloadEvent::Failed {
            progress,
            reason: DownloadError::Interrupted.to_string(),
        });
        DownloadError::Interrupted
    }
}

impl DownloadJob {
    pub fn total(&self) -> usize {
        self.items.len()
    }

    /// Hand every item to the download service, batch by batch.
    pub async fn run(self) -> Result<DownloadStatus, DownloadError> {
        let coordinator = Arc::clone(&self.coordinator);
        let batch_size = self
            .options
            .batch_size
            .filter(|size| *size > 0)
            .unwrap_or(coordinator.default_batch_size);
        gallery_info!(
            "Starting download of {} items in batches of {}",
            self.items.len(),
            batch_size
        );

        let batch_count = self.items.len().div_ceil(batch_size);
        for (index, batch) in self.items.chunks(batch_size).enumerate() {
            coordinator.job().status.progress.batch = index + 1;

            for (offset, item) in batch.iter().enumerate() {
                if coordinator.shutdown.is_cancelled() {
                    return Err(coordinator.interrupt());
                }
                let request = DownloadRequest {
                    url: item.url.clone(),
                    filename: download_filename(
                        item,
                        index * batch_size + offset,
                        self.options.folder.as_deref(),
                    ),
                    save_as: self.options.save_as,
                };
                let result = coordinator.service.download(request).await;
                let progress = coordinator.record(item, result);
                coordinator.sink.emit(DownloadEvent::Progress(progress));
            }

            if index + 1 == batch_count {
                break;
            }
            if !coordinator.await_decision().await? {
                let status = coordinator.finish(DownloadState::Stopped);
                gallery_info!(
                    "Download stopped after {} of {} items",
                    status.progress.processed(),
                    status.progress.total
                );
                coordinator.sink.emit(DownloadEvent::Stopped(status.progress));
                return Ok(status);
            }
        }

        let status = coordinator.finish(DownloadState::Complete);
        gallery_info!(
            "Download complete: {} downloaded, {} failed",
            status.progress.downloaded,
            status.progress.failed
        );
        coordinator.sink.emit(DownloadEvent::Complete(status.progress));
        Ok(status)
    }
}
