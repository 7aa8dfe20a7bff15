//! Byte transfer collaborators.
//!
//! A [`Transfer`] starts moving bytes in the background and immediately hands
//! back a [`TransferHandle`]: a shared progress counter plus a one-shot
//! outcome. The download manager samples the counter on its own cadence, so
//! transfers never have to know about events or reporting intervals.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::error::DownloadError;
use crate::http::{HttpTimeouts, build_http_client};

/// Byte counters shared between a running transfer and its observer.
#[derive(Debug, Default)]
pub struct TransferProgress {
    written: AtomicU64,
    total: AtomicU64,
}

impl TransferProgress {
    /// Records the expected size. Zero means unknown.
    pub fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
    }

    /// Adds freshly written bytes.
    pub fn add(&self, bytes: u64) {
        self.written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Bytes written so far.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Fraction written, or `None` while the total size is unknown.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ratio(&self) -> Option<f64> {
        let total = self.total.load(Ordering::Relaxed);
        if total == 0 {
            return None;
        }
        Some((self.written() as f64 / total as f64).clamp(0.0, 1.0))
    }
}

/// Handle to a transfer running in the background.
#[derive(Debug)]
pub struct TransferHandle {
    /// Live byte counters.
    pub progress: Arc<TransferProgress>,
    /// Resolves once with the final path or the failure.
    pub outcome: oneshot::Receiver<Result<PathBuf, DownloadError>>,
}

impl TransferHandle {
    /// Creates a connected handle and the sender half the transfer reports into.
    #[must_use]
    pub fn channel() -> (
        Self,
        Arc<TransferProgress>,
        oneshot::Sender<Result<PathBuf, DownloadError>>,
    ) {
        let progress = Arc::new(TransferProgress::default());
        let (tx, rx) = oneshot::channel();
        (
            Self {
                progress: Arc::clone(&progress),
                outcome: rx,
            },
            progress,
            tx,
        )
    }
}

/// Starts byte transfers.
///
/// Implementations must create the destination's parent directory, stop at
/// the next chunk boundary once `cancel` fires, and send exactly one outcome.
pub trait Transfer: Send + Sync {
    /// Starts copying `url` to `dest`. Must not block; spawns onto the tokio runtime.
    fn start(&self, url: &str, dest: &Path, cancel: CancellationToken) -> TransferHandle;
}

/// Streams HTTP response bodies to disk.
#[derive(Debug, Clone)]
pub struct HttpTransfer {
    client: Client,
}

impl HttpTransfer {
    /// Creates a transfer client with the given timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Client`] if the HTTP client cannot be built.
    pub fn new(timeouts: HttpTimeouts) -> Result<Self, DownloadError> {
        let client = build_http_client(timeouts).map_err(|source| DownloadError::Client { source })?;
        Ok(Self { client })
    }
}

impl Transfer for HttpTransfer {
    fn start(&self, url: &str, dest: &Path, cancel: CancellationToken) -> TransferHandle {
        let (handle, progress, tx) = TransferHandle::channel();
        let client = self.client.clone();
        let url = url.to_string();
        let dest = dest.to_path_buf();

        tokio::spawn(async move {
            let result = run_transfer(&client, &url, &dest, &progress, &cancel).await;
            if tx.send(result).is_err() {
                debug!(url = %url, "transfer outcome dropped; observer gone");
            }
        });

        handle
    }
}

#[instrument(skip(client, progress, cancel), fields(url = %url, dest = %dest.display()))]
async fn run_transfer(
    client: &Client,
    url: &str,
    dest: &Path,
    progress: &TransferProgress,
    cancel: &CancellationToken,
) -> Result<PathBuf, DownloadError> {
    let parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(DownloadError::invalid_url(url));
    }

    if let Some(parent) = dest.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DownloadError::io(parent, e))?;
    }

    let response = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(DownloadError::cancelled(url)),
        sent = client.get(parsed).send() => sent.map_err(|e| DownloadError::network(url, e))?,
    };

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::http_status(url, status.as_u16()));
    }
    if let Some(length) = response.content_length() {
        progress.set_total(length);
    }

    let file = File::create(dest)
        .await
        .map_err(|e| DownloadError::io(dest, e))?;

    match stream_to_file(file, response, url, dest, progress, cancel).await {
        Ok(bytes) => {
            info!(bytes, "transfer complete");
            Ok(dest.to_path_buf())
        }
        Err(error) => {
            if let Err(remove_error) = tokio::fs::remove_file(dest).await {
                warn!(error = %remove_error, "failed to remove partial file");
            }
            Err(error)
        }
    }
}

async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    dest: &Path,
    progress: &TransferProgress,
    cancel: &CancellationToken,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DownloadError::cancelled(url)),
            next = stream.next() => next,
        };
        let Some(chunk_result) = next else {
            break;
        };
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(dest, e))?;

        bytes_written += chunk.len() as u64;
        progress.add(chunk.len() as u64);
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(dest, e))?;

    Ok(bytes_written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_ratio_unknown_total() {
        let progress = TransferProgress::default();
        progress.add(100);
        assert_eq!(progress.ratio(), None);
    }

    #[test]
    fn test_progress_ratio_known_total() {
        let progress = TransferProgress::default();
        progress.set_total(200);
        progress.add(50);
        assert_eq!(progress.ratio(), Some(0.25));
        progress.add(500);
        assert_eq!(progress.ratio(), Some(1.0), "ratio must clamp to 1.0");
    }

    #[tokio::test]
    async fn test_invalid_url_reports_failure() {
        let transfer = HttpTransfer::new(HttpTimeouts::TRANSFER).unwrap();
        let dir = tempfile::TempDir::new().unwrap();
        let handle = transfer.start(
            "not a url",
            &dir.path().join("a.mp4"),
            CancellationToken::new(),
        );
        let outcome = handle.outcome.await.unwrap();
        assert!(matches!(outcome, Err(DownloadError::InvalidUrl { .. })));
    }
}
