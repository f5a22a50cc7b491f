//! StepGallery host: runs the session coordinator behind a JSON-lines
//! channel on stdin/stdout.
//!
//! Each input line is `{"id": .., "sender": {"tab": N} | null, "message": {..}}`.
//! Replies come back as `{"id": .., "response": {..}}`; messages without a
//! handler get no reply.

mod config;
mod host;
mod transport;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use gallery_core::{SenderContext, TabId};
use gallery_engine::{
    ensure_dir, CheckpointManager, Dispatch, DownloadCoordinator, DownloadProjection, FileStore,
    IconStatusTracker, JsonExporter, KeyValueStore, MessageRouter, ReqwestDownloadService,
    RouterDeps, SessionStateManager, StorageError,
};
use gallery_logging::{gallery_debug, gallery_error, gallery_info, gallery_warn};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::AppConfig;
use crate::host::LoggingBadge;
use crate::transport::StdioTransport;

const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
enum StartupError {
    #[error("could not prepare directory {path:?}: {source}")]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not load persisted settings: {0}")]
    Settings(#[from] StorageError),
    #[error("could not read stdin: {0}")]
    Input(#[from] std::io::Error),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    sender: Option<SenderEnvelope>,
    message: Value,
}

#[derive(Debug, Default, Deserialize)]
struct SenderEnvelope {
    #[serde(default)]
    tab: Option<TabId>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_PATH));
    let loaded = config::load(&config_path);
    let app_config = loaded.config;

    gallery_logging::initialize(
        app_config.log_destination,
        app_config.log_level,
        &app_config.log_path,
    );
    if let Some(warning) = loaded.warning {
        gallery_warn!("{}", warning);
    }
    gallery_info!(
        "StepGallery starting at {} with config {:?}",
        chrono::Local::now().to_rfc3339(),
        config_path
    );

    let (transport, writer) = StdioTransport::spawn(tokio::io::stdout());
    let result = serve(app_config, transport).await;

    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer).await.is_err() {
        gallery_warn!("Output writer did not drain in time");
    }

    match result {
        Ok(()) => {
            gallery_info!("Input closed, shutting down");
            ExitCode::SUCCESS
        }
        Err(err) => {
            gallery_error!("Fatal: {}", err);
            eprintln!("stepgallery: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn serve(app_config: AppConfig, transport: StdioTransport) -> Result<(), StartupError> {
    let config = app_config.coordinator;
    for dir in [&config.storage_dir, &config.download_dir] {
        ensure_dir(dir).map_err(|source| StartupError::Directory {
            path: dir.clone(),
            source,
        })?;
    }

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(config.storage_dir.clone()));
    let state = Arc::new(SessionStateManager::new(
        Arc::clone(&store),
        config.settings_key.clone(),
    ));
    state.initialize().await?;

    let transport = Arc::new(transport);
    let icon = Arc::new(IconStatusTracker::new());
    let files = Arc::new(ReqwestDownloadService::new(
        config.transfer.clone(),
        config.download_dir.clone(),
    ));
    let downloads = Arc::new(DownloadCoordinator::new(
        files.clone(),
        Arc::new(DownloadProjection::new(
            transport.clone(),
            icon.clone(),
            config.icon_idle_grace,
        )),
        Arc::clone(&state),
        config.download_batch_size,
    ));
    let router = MessageRouter::new(
        RouterDeps {
            state,
            checkpoints: Arc::new(CheckpointManager::new(store, config.checkpoint_key.clone())),
            downloads: Arc::clone(&downloads),
            transport: transport.clone(),
            icon,
            badge: Arc::new(LoggingBadge),
            files,
            exporter: Arc::new(JsonExporter::new(config.download_dir.clone())),
            memory: None,
        },
        &config,
    );
    gallery_info!(
        "Coordinator ready: storage {:?}, downloads {:?}",
        config.storage_dir,
        config.download_dir
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let outcome = loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(err) => break Err(StartupError::Input(err)),
        };
        if line.trim().is_empty() {
            continue;
        }
        handle_line(&router, &transport, &line).await;
    };

    downloads.shutdown();
    outcome
}

/// Replies are settled in arrival order; only detached ones outlive the line.
async fn handle_line(router: &Arc<MessageRouter>, transport: &Arc<StdioTransport>, line: &str) {
    let envelope: Envelope = match serde_json::from_str(line) {
        Ok(envelope) => envelope,
        Err(err) => {
            gallery_warn!("Dropping unreadable input line: {}", err);
            return;
        }
    };
    let sender = SenderContext {
        tab: envelope.sender.unwrap_or_default().tab,
    };

    match router.dispatch_raw(envelope.message, sender) {
        Dispatch::Ignored => gallery_debug!("No reply for request {}", envelope.id),
        Dispatch::Ready(response) => send_reply(transport, &envelope.id, &response),
        Dispatch::Pending(future) => send_reply(transport, &envelope.id, &future.await),
        Dispatch::Detached(future) => {
            let transport = Arc::clone(transport);
            let id = envelope.id;
            // A parked download must not block the input loop.
            tokio::spawn(async move {
                let response = future.await;
                send_reply(&transport, &id, &response);
            });
        }
    }
}

fn send_reply(transport: &StdioTransport, id: &Value, response: &gallery_core::Response) {
    if let Err(err) = transport.reply(id, response) {
        gallery_error!("Could not reply to request {}: {}", id, err);
    }
}
