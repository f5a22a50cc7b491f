//! Single entry point for inbound messages from every context.
//!
//! Each message is classified once and handed to exactly one handler. Sync
//! handlers answer immediately, async handlers hand back a future; either
//! way failures (including panics) come back as `{success: false, error}`.
//!
//! Hosts keep per-sender ordering by awaiting [`Dispatch::Pending`] replies
//! before taking the next message. Only [`Dispatch::Detached`] replies may
//! run in the background, since they wait on messages still to come.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use gallery_core::{
    Ack, CheckpointDraft, DownloadOptions, ErrorReport, FileDownload, GalleryStatus, IconStatus,
    Item, MemoryWarning, Message, PaginationCommand, PaginationReport, PaginationState,
    PaginationStatus, ParseError, Payload, Response, SenderContext, Settings, TabMessage, Toast,
    ToastKind, UiEvent,
};
use gallery_logging::{gallery_debug, gallery_error, gallery_info, gallery_warn};
use serde_json::{json, Value};

use crate::checkpoint::CheckpointManager;
use crate::download::{DownloadCoordinator, DownloadJob};
use crate::icon::show_waiting_then_idle;
use crate::ports::{
    BadgeSetter, DownloadRequest, DownloadService, Exporter, IconStatusProjector, MemoryMonitor,
    Transport,
};
use crate::state::{SessionStateManager, IMAGES_LOCK};
use crate::{CoordinatorConfig, RouterError, TransportError};

const GALLERY_BADGE_COLOR: &str = "#4CAF50";

/// How the caller gets its reply.
pub enum Dispatch {
    /// Nothing matched; no reply will ever be sent.
    Ignored,
    Ready(Response),
    /// Must finish before the next message is dispatched.
    Pending(BoxFuture<'static, Response>),
    /// Long-running reply; later messages are dispatched while it runs.
    Detached(BoxFuture<'static, Response>),
}

impl Dispatch {
    /// Whether the reply channel has to stay open.
    pub fn responds_async(&self) -> bool {
        matches!(self, Dispatch::Pending(_) | Dispatch::Detached(_))
    }

    pub async fn into_response(self) -> Option<Response> {
        match self {
            Dispatch::Ignored => None,
            Dispatch::Ready(response) => Some(response),
            Dispatch::Pending(future) | Dispatch::Detached(future) => Some(future.await),
        }
    }
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatch::Ignored => write!(f, "Ignored"),
            Dispatch::Ready(response) => f.debug_tuple("Ready").field(response).finish(),
            Dispatch::Pending(_) => write!(f, "Pending(..)"),
            Dispatch::Detached(_) => write!(f, "Detached(..)"),
        }
    }
}

/// Collaborators the router drives.
pub struct RouterDeps {
    pub state: Arc<SessionStateManager>,
    pub checkpoints: Arc<CheckpointManager>,
    pub downloads: Arc<DownloadCoordinator>,
    pub transport: Arc<dyn Transport>,
    pub icon: Arc<dyn IconStatusProjector>,
    pub badge: Arc<dyn BadgeSetter>,
    pub files: Arc<dyn DownloadService>,
    pub exporter: Arc<dyn Exporter>,
    pub memory: Option<Arc<dyn MemoryMonitor>>,
}

pub struct MessageRouter {
    state: Arc<SessionStateManager>,
    checkpoints: Arc<CheckpointManager>,
    downloads: Arc<DownloadCoordinator>,
    transport: Arc<dyn Transport>,
    icon: Arc<dyn IconStatusProjector>,
    badge: Arc<dyn BadgeSetter>,
    files: Arc<dyn DownloadService>,
    exporter: Arc<dyn Exporter>,
    memory: Option<Arc<dyn MemoryMonitor>>,
    idle_grace: Duration,
    toast_duration_ms: u64,
}

type HandlerResult = Result<Response, RouterError>;

impl MessageRouter {
    pub fn new(deps: RouterDeps, config: &CoordinatorConfig) -> Arc<Self> {
        Arc::new(Self {
            state: deps.state,
            checkpoints: deps.checkpoints,
            downloads: deps.downloads,
            transport: deps.transport,
            icon: deps.icon,
            badge: deps.badge,
            files: deps.files,
            exporter: deps.exporter,
            memory: deps.memory,
            idle_grace: config.icon_idle_grace,
            toast_duration_ms: config.toast_duration_ms,
        })
    }

    /// Classify a raw JSON message and dispatch it.
    pub fn dispatch_raw(self: &Arc<Self>, raw: Value, sender: SenderContext) -> Dispatch {
        match Message::parse(raw) {
            Ok(message) => self.dispatch(message, sender),
            Err(ParseError::UnknownType(tag)) => {
                gallery_debug!("Ignoring unknown message type {}", tag);
                Dispatch::Ignored
            }
            Err(ParseError::MissingType) => {
                gallery_debug!("Ignoring message without a type");
                Dispatch::Ignored
            }
            Err(err) => {
                gallery_warn!("Rejecting message: {}", err);
                Dispatch::Ready(Response::failure(err.to_string()))
            }
        }
    }

    /// Dispatch and wait for the reply, if any.
    pub async fn handle(self: &Arc<Self>, message: Message, sender: SenderContext) -> Option<Response> {
        self.dispatch(message, sender).into_response().await
    }

    pub fn dispatch(self: &Arc<Self>, message: Message, sender: SenderContext) -> Dispatch {
        let name = message.type_name();
        gallery_debug!("Handling message: {}", name);

        match message {
            Message::Init => self.ready(name, || self.handle_init(sender)),
            Message::GalleryDetected { data } => {
                self.ready(name, || self.handle_gallery_detected(data, sender))
            }
            Message::ImagesFound { images } => {
                self.pending(name, |this| async move { this.handle_images_found(images).await })
            }
            Message::PaginationStatus { data } => {
                self.ready(name, || self.handle_pagination_status(&data))
            }
            message @ (Message::PaginationStart { .. }
            | Message::PaginationStop { .. }
            | Message::PaginationPause { .. }
            | Message::PaginationResume { .. }
            | Message::PaginationCancel { .. }) => self.dispatch_pagination(message, sender),
            Message::CheckpointSave { data } => {
                self.pending(name, |this| async move { this.handle_checkpoint_save(data).await })
            }
            Message::CheckpointLoad => {
                self.pending(name, |this| async move { this.handle_checkpoint_load().await })
            }
            Message::CheckpointClear => {
                self.pending(name, |this| async move { this.handle_checkpoint_clear().await })
            }
            Message::CheckpointExists => {
                self.pending(name, |this| async move { this.handle_checkpoint_exists().await })
            }
            Message::MemoryWarning { data } => {
                self.ready(name, || self.handle_memory_warning(data.unwrap_or_default()))
            }
            Message::MemoryStats => self.ready(name, || self.handle_memory_stats()),
            Message::ToastShow { data } => self.ready(name, || self.handle_toast_show(data)),
            Message::DownloadPageComplete { data } => self.pending(name, |this| async move {
                this.handle_download_page_complete(data, sender).await
            }),
            Message::ErrorReport { data } => {
                self.ready(name, || self.handle_error_report(data.unwrap_or_default()))
            }
            Message::GetImages => self.ready(name, || self.handle_get_images()),
            Message::ClearImages => {
                self.pending(name, |this| async move { this.handle_clear_images().await })
            }
            Message::SettingsUpdate { settings } => self.pending(name, |this| async move {
                this.handle_settings_update(settings).await
            }),
            Message::SettingsGet => self.ready(name, || self.handle_settings_get()),
            Message::DownloadStart { images, options } => {
                self.dispatch_download(name, images, options.unwrap_or_default(), sender)
            }
            Message::BatchResponse { proceed } => {
                self.ready(name, || self.handle_batch_response(proceed))
            }
            Message::DownloadFile { data } => {
                self.pending(name, |this| async move { this.handle_file_download(data).await })
            }
            Message::Export { format, data } => self.pending(name, |this| async move {
                this.handle_export(format, data).await
            }),
            Message::ApiEndpointDetected { endpoint } => {
                self.ready(name, || self.handle_api_endpoint_detected(endpoint))
            }
            Message::GetStatus => self.ready(name, || self.handle_get_status()),
        }
    }

    /// Commands from the scraping tab itself are local transitions; from any
    /// other context they are relayed to the scraping tab.
    fn dispatch_pagination(self: &Arc<Self>, message: Message, sender: SenderContext) -> Dispatch {
        let name = message.type_name();
        let Some(command) = message.pagination_command() else {
            return Dispatch::Ignored;
        };
        let owner = self.state.current_tab();
        let from_owner = sender.tab.is_some() && sender.tab == owner;

        if from_owner {
            self.pending(name, move |this| async move {
                this.handle_local_pagination(command).await
            })
        } else {
            self.pending(name, |this| async move { this.forward_to_active_tab(message).await })
        }
    }

    /// The job slot is claimed before returning, so a rejected start never
    /// disturbs the job already running.
    fn dispatch_download(
        self: &Arc<Self>,
        name: &'static str,
        images: Option<Vec<Item>>,
        options: DownloadOptions,
        sender: SenderContext,
    ) -> Dispatch {
        match guarded(|| self.begin_download(images, options, sender)) {
            Ok(job) => Dispatch::Detached(self.settled(name, |this| async move {
                this.run_download(job).await
            })),
            Err(err) => Dispatch::Ready(settle(name, Err(err))),
        }
    }

    fn ready<F>(&self, name: &'static str, handler: F) -> Dispatch
    where
        F: FnOnce() -> HandlerResult,
    {
        Dispatch::Ready(settle(name, guarded(handler)))
    }

    fn pending<F, Fut>(self: &Arc<Self>, name: &'static str, handler: F) -> Dispatch
    where
        F: FnOnce(Arc<Self>) -> Fut,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Dispatch::Pending(self.settled(name, handler))
    }

    fn settled<F, Fut>(
        self: &Arc<Self>,
        name: &'static str,
        handler: F,
    ) -> BoxFuture<'static, Response>
    where
        F: FnOnce(Arc<Self>) -> Fut,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let future = handler(Arc::clone(self));
        Box::pin(async move {
            let outcome = AssertUnwindSafe(future)
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(RouterError::Panicked(panic_message(payload))));
            settle(name, outcome)
        })
    }

    fn broadcast(&self, event: UiEvent) {
        if let Err(err) = self.transport.broadcast(event) {
            gallery_debug!("Error broadcasting to UI: {}", err);
        }
    }

    fn toast(&self, kind: ToastKind, message: impl Into<String>) {
        self.broadcast(UiEvent::ToastShow {
            data: Toast::new(kind, message, self.toast_duration_ms),
        });
    }

    fn handle_init(&self, sender: SenderContext) -> HandlerResult {
        if let Some(tab) = sender.tab {
            self.state.set_current_tab(tab);
            self.badge.set_text(tab, "");
        }
        Ok(Response::ok())
    }

    fn handle_gallery_detected(&self, data: GalleryStatus, sender: SenderContext) -> HandlerResult {
        self.state.update_gallery_status(data);

        if let (true, Some(tab)) = (data.is_gallery, sender.tab) {
            self.badge.set_text(tab, &data.image_count.to_string());
            self.badge.set_background(tab, GALLERY_BADGE_COLOR);
        }

        self.broadcast(UiEvent::GalleryStatusUpdate { data });
        Ok(Response::ok())
    }

    async fn handle_images_found(&self, images: Vec<Item>) -> HandlerResult {
        let state = &self.state;
        let (outcome, snapshot) = state
            .with_lock(IMAGES_LOCK, || async move {
                let outcome = state.add_images(images);
                (outcome, state.images())
            })
            .await;

        self.broadcast(UiEvent::ImagesUpdate { images: snapshot });
        Ok(Response::with(Payload::Added {
            total: outcome.total,
            added: outcome.added,
        }))
    }

    fn handle_pagination_status(&self, report: &PaginationReport) -> HandlerResult {
        let (status, accepted) = self.state.update_pagination_status(report);
        if !accepted {
            gallery_warn!(
                "Ignoring pagination state {:?} reported while {:?}",
                report.state,
                status.state
            );
        }

        self.broadcast(UiEvent::PaginationStatusUpdate {
            data: status.clone(),
        });
        if report.state.is_some() && accepted {
            self.project_pagination(&status);
        }
        Ok(Response::ok())
    }

    async fn forward_to_active_tab(&self, message: Message) -> HandlerResult {
        let tab = self.state.current_tab().ok_or(TransportError::NoActiveTab)?;
        gallery_debug!("Forwarding {} to tab {}", message.type_name(), tab);
        self.transport
            .send_to_tab(tab, TabMessage::Command(message))
            .await?;
        Ok(Response::ok())
    }

    async fn handle_local_pagination(&self, command: PaginationCommand) -> HandlerResult {
        let status = self.state.apply_pagination_command(command)?;
        gallery_info!("Pagination {:?} -> {:?}", command, status.state);

        // Cooperative: the tab stops itself once it sees the command.
        if let Some(tab) = self.state.current_tab() {
            let echo = TabMessage::Command(Message::pagination(command));
            if let Err(err) = self.transport.send_to_tab(tab, echo).await {
                gallery_debug!("Error sending {:?} to tab {}: {}", command, tab, err);
            }
        }

        self.broadcast(UiEvent::PaginationStatusUpdate {
            data: status.clone(),
        });
        self.project_pagination(&status);

        // The tab is told to stop even when the checkpoint outlives the cancel.
        if command == PaginationCommand::Cancel {
            self.checkpoints.clear().await?;
        }
        Ok(Response::ok())
    }

    fn project_pagination(&self, status: &PaginationStatus) {
        let icon = match status.state {
            PaginationState::Running => IconStatus::Paginating {
                page: status.current_page.max(1),
            },
            PaginationState::Paused => IconStatus::Paused,
            PaginationState::Complete => IconStatus::Complete,
            PaginationState::Error => IconStatus::Error {
                message: status.error.clone().unwrap_or_else(|| "Error".to_string()),
            },
            PaginationState::Idle | PaginationState::Cancelled => IconStatus::Idle,
        };
        self.icon.set(icon);
    }

    async fn handle_checkpoint_save(&self, draft: CheckpointDraft) -> HandlerResult {
        self.checkpoints.save(draft).await?;
        Ok(Response::ok())
    }

    async fn handle_checkpoint_load(&self) -> HandlerResult {
        let checkpoint = self.checkpoints.load().await?;
        Ok(Response::with(Payload::Checkpoint { checkpoint }))
    }

    async fn handle_checkpoint_clear(&self) -> HandlerResult {
        self.checkpoints.clear().await?;
        Ok(Response::ok())
    }

    async fn handle_checkpoint_exists(&self) -> HandlerResult {
        let exists = self.checkpoints.exists().await?;
        Ok(Response::with(Payload::Exists { exists }))
    }

    fn handle_memory_warning(&self, warning: MemoryWarning) -> HandlerResult {
        let usage = warning.usage_text();
        gallery_warn!("Memory warning received: {}%", usage);
        self.toast(ToastKind::Warning, format!("Memory usage high: {usage}%"));
        Ok(Response::ok())
    }

    fn handle_memory_stats(&self) -> HandlerResult {
        let stats = self.memory.as_ref().and_then(|monitor| monitor.stats());
        Ok(Response::with(Payload::MemoryStats { stats }))
    }

    fn handle_toast_show(&self, toast: Toast) -> HandlerResult {
        self.broadcast(UiEvent::ToastShow { data: toast });
        Ok(Response::ok())
    }

    async fn handle_download_page_complete(
        &self,
        data: Option<Value>,
        sender: SenderContext,
    ) -> HandlerResult {
        gallery_info!("Page download complete: {:?}", data);

        if let Some(tab) = sender.tab {
            let ack = TabMessage::Ack(Ack {
                ack_for: "download-page-complete".to_string(),
                data: data.clone(),
            });
            if let Err(err) = self.transport.send_to_tab(tab, ack).await {
                gallery_debug!("Error acknowledging page to tab {}: {}", tab, err);
            }
        }

        self.broadcast(UiEvent::DownloadProgressUpdate { data });
        show_waiting_then_idle(&self.icon, self.idle_grace);
        Ok(Response::ok())
    }

    fn handle_error_report(&self, report: ErrorReport) -> HandlerResult {
        gallery_error!(
            "Error reported from {}: {}",
            report.context.as_deref().unwrap_or("unknown"),
            report.error.as_deref().unwrap_or("(no detail)")
        );
        let message = report
            .user_friendly
            .or(report.error)
            .unwrap_or_else(|| "An error occurred".to_string());
        self.toast(ToastKind::Error, message);
        Ok(Response::ok())
    }

    fn handle_get_images(&self) -> HandlerResult {
        Ok(Response::with(Payload::Images {
            images: self.state.images(),
        }))
    }

    async fn handle_clear_images(&self) -> HandlerResult {
        let state = &self.state;
        state
            .with_lock(IMAGES_LOCK, || async move { state.clear_images() })
            .await;
        self.broadcast(UiEvent::ImagesUpdate { images: Vec::new() });
        Ok(Response::ok())
    }

    async fn handle_settings_update(&self, patch: Settings) -> HandlerResult {
        let settings = self.state.update_settings(patch).await?;
        Ok(Response::with(Payload::Settings { settings }))
    }

    fn handle_settings_get(&self) -> HandlerResult {
        Ok(Response::with(Payload::Settings {
            settings: self.state.settings(),
        }))
    }

    /// Claiming the slot projects `Downloading{0/n}` onto the icon.
    fn begin_download(
        &self,
        images: Option<Vec<Item>>,
        options: DownloadOptions,
        sender: SenderContext,
    ) -> Result<DownloadJob, RouterError> {
        if let Some(tab) = sender.tab {
            self.state.set_current_tab(tab);
            gallery_debug!("Download started from tab {}", tab);
        }
        let job = match images {
            Some(items) => self.downloads.begin(items, options)?,
            None => self.downloads.begin_session(options)?,
        };
        Ok(job)
    }

    async fn run_download(&self, job: DownloadJob) -> HandlerResult {
        let status = job.run().await?;
        gallery_info!("Download job ended as {:?}", status.state);
        Ok(Response::ok())
    }

    fn handle_batch_response(&self, proceed: bool) -> HandlerResult {
        self.downloads.resume_downloads(proceed)?;
        Ok(Response::ok())
    }

    async fn handle_file_download(&self, data: FileDownload) -> HandlerResult {
        let request = DownloadRequest {
            url: data.url,
            filename: data.filename,
            save_as: data.save_as.unwrap_or(true),
        };
        let filename = request.filename.clone();
        let download_id = self.files.download(request).await?;
        gallery_info!("File download started: {} (ID: {})", filename, download_id);
        Ok(Response::with(Payload::DownloadId { download_id }))
    }

    async fn handle_export(&self, format: String, data: Option<Value>) -> HandlerResult {
        let options = data.unwrap_or_else(|| json!({}));
        let items = match options.get("images") {
            Some(images) => serde_json::from_value::<Vec<Item>>(images.clone())
                .map_err(|err| RouterError::InvalidPayload(err.to_string()))?,
            None => self.state.images(),
        };
        let result = self.exporter.export(&format, &items, &options).await?;
        Ok(Response::with(Payload::Export { result }))
    }

    fn handle_api_endpoint_detected(&self, endpoint: Option<Value>) -> HandlerResult {
        gallery_info!("API endpoint detected: {:?}", endpoint);
        Ok(Response::ok())
    }

    fn handle_get_status(&self) -> HandlerResult {
        Ok(Response::with(Payload::Status {
            stats: self.state.stats(),
            downloads: self.downloads.status(),
        }))
    }
}

fn guarded<T>(handler: impl FnOnce() -> Result<T, RouterError>) -> Result<T, RouterError> {
    panic::catch_unwind(AssertUnwindSafe(handler))
        .unwrap_or_else(|payload| Err(RouterError::Panicked(panic_message(payload))))
}

fn settle(name: &str, outcome: HandlerResult) -> Response {
    outcome.unwrap_or_else(|err| {
        gallery_error!("Error handling {}: {}", name, err);
        Response::failure(err.to_string())
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "unknown panic".to_string()
}
