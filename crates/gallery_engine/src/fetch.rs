use std::path::{Component, Path, PathBuf};
use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use gallery_logging::{gallery_debug, gallery_info};

use crate::persist::write_atomic;
use crate::ports::{DownloadId, DownloadRequest, DownloadService};
use crate::{FailureKind, TransferError};

#[derive(Debug, Clone)]
pub struct TransferSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            redirect_limit: 5,
            max_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Download service that streams each URL into `output_dir`.
///
/// Files are written atomically. There is no save-as dialog in a headless
/// host, so `save_as` is only logged.
#[derive(Debug)]
pub struct ReqwestDownloadService {
    settings: TransferSettings,
    output_dir: PathBuf,
    next_id: AtomicU64,
}

impl ReqwestDownloadService {
    pub fn new(settings: TransferSettings, output_dir: PathBuf) -> Self {
        Self {
            settings,
            output_dir,
            next_id: AtomicU64::new(1),
        }
    }

    fn build_client(
        &self,
        redirect_counter: Arc<AtomicUsize>,
    ) -> Result<reqwest::Client, TransferError> {
        let redirect_limit = self.settings.redirect_limit;
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            let count = attempt.previous().len();
            redirect_counter.store(count, Ordering::Relaxed);
            if count >= redirect_limit {
                attempt.error("redirect limit exceeded")
            } else {
                attempt.follow()
            }
        });

        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(policy)
            .build()
            .map_err(|err| TransferError::new(FailureKind::Network, err.to_string()))
    }

    fn too_large(&self, actual: u64) -> TransferError {
        TransferError::new(
            FailureKind::TooLarge {
                max_bytes: self.settings.max_bytes,
                actual: Some(actual),
            },
            "response too large",
        )
    }
}

#[async_trait]
impl DownloadService for ReqwestDownloadService {
    async fn download(&self, request: DownloadRequest) -> Result<DownloadId, TransferError> {
        if !is_relative_path(&request.filename) {
            return Err(TransferError::new(
                FailureKind::Rejected,
                format!("filename {:?} escapes the download directory", request.filename),
            ));
        }
        let parsed = reqwest::Url::parse(&request.url)
            .map_err(|err| TransferError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let redirect_counter = Arc::new(AtomicUsize::new(0));
        let client = self.build_client(Arc::clone(&redirect_counter))?;

        let response = client.get(parsed).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(self.too_large(content_len));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(self.too_large(next_len));
            }
            bytes.extend_from_slice(&chunk);
        }

        let output_dir = self.output_dir.clone();
        let filename = request.filename.clone();
        let target = tokio::task::spawn_blocking(move || write_atomic(&output_dir, &filename, &bytes))
            .await
            .map_err(|err| TransferError::new(FailureKind::Write, err.to_string()))?
            .map_err(|err| TransferError::new(FailureKind::Write, err.to_string()))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if request.save_as {
            gallery_debug!("save_as requested for {}; writing directly", request.filename);
        }
        gallery_info!(
            "Downloaded {} -> {:?} (id {}, {} redirects)",
            request.url,
            target,
            id,
            redirect_counter.load(Ordering::Relaxed)
        );
        Ok(id)
    }
}

fn is_relative_path(filename: &str) -> bool {
    let path = Path::new(filename);
    path.components().next().is_some()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
}

fn map_reqwest_error(err: reqwest::Error) -> TransferError {
    if err.is_timeout() {
        return TransferError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return TransferError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    TransferError::new(FailureKind::Network, err.to_string())
}
