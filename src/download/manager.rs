//! Download records and their lifecycle.
//!
//! [`DownloadManager`] is owned by the single state consumer. Starting a
//! download spawns a reporter task that samples the transfer's byte counters
//! at a fixed interval and emits [`DownloadEvent`]s; the manager itself never
//! polls and only changes state in response to calls and events.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::DownloadError;
use super::transfer::{Transfer, TransferHandle};
use crate::event::{AppEvent, DownloadEvent, EventSink};
use crate::task::TaskHandle;

/// Identity of a download, unique for the process lifetime.
pub type DownloadId = u64;

/// Default interval between progress samples.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(200);

/// Lifecycle status of a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    /// Created, no progress reported yet.
    Pending,
    /// At least one progress sample received.
    InProgress,
    /// Finished successfully.
    Complete,
    /// Finished with an error.
    Failed,
    /// Cancelled by the user.
    Cancelled,
}

impl DownloadStatus {
    /// Returns the stable display label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "downloading",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Pending or in progress.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }

    /// Complete, failed or cancelled. Terminal records never change again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the user asked to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Name shown in the downloads view.
    pub name: String,
    /// Source URL.
    pub url: String,
    /// Destination file path.
    pub path: PathBuf,
}

/// One user-requested transfer.
#[derive(Debug)]
pub struct Download {
    id: DownloadId,
    name: String,
    path: PathBuf,
    url: String,
    progress: f64,
    status: DownloadStatus,
    error: Option<String>,
    task: TaskHandle,
}

impl Download {
    #[must_use]
    pub fn id(&self) -> DownloadId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target path; replaced by the transfer's final path on completion.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Progress ratio in `[0.0, 1.0]`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    #[must_use]
    pub fn status(&self) -> DownloadStatus {
        self.status
    }

    /// Failure message for failed downloads.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Tracks every download started during this process.
///
/// Records are never removed; terminal ones stay visible until exit.
pub struct DownloadManager {
    downloads: Vec<Download>,
    next_id: DownloadId,
    transfer: Arc<dyn Transfer>,
    sink: EventSink,
    progress_interval: Duration,
}

impl fmt::Debug for DownloadManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadManager")
            .field("downloads", &self.downloads)
            .field("next_id", &self.next_id)
            .field("progress_interval", &self.progress_interval)
            .finish_non_exhaustive()
    }
}

impl DownloadManager {
    /// Creates an empty manager reporting into `sink`.
    #[must_use]
    pub fn new(transfer: Arc<dyn Transfer>, sink: EventSink, progress_interval: Duration) -> Self {
        Self {
            downloads: Vec::new(),
            next_id: 1,
            transfer,
            sink,
            progress_interval,
        }
    }

    /// Creates a Pending record and launches its transfer. Returns immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, request: DownloadRequest) -> DownloadId {
        let id = self.next_id;
        self.next_id += 1;

        let task = TaskHandle::new(id);
        let handle = self
            .transfer
            .start(&request.url, &request.path, task.token());
        tokio::spawn(report_transfer(
            id,
            request.url.clone(),
            handle,
            task.token(),
            self.sink.clone(),
            self.progress_interval,
        ));

        info!(download_id = id, name = %request.name, path = %request.path.display(), "download started");
        self.downloads.push(Download {
            id,
            name: request.name,
            path: request.path,
            url: request.url,
            progress: 0.0,
            status: DownloadStatus::Pending,
            error: None,
            task,
        });
        id
    }

    /// Cancels an active download.
    ///
    /// Returns `true` if the record moved to Cancelled. Terminal records and
    /// unknown ids are left untouched.
    pub fn cancel(&mut self, id: DownloadId) -> bool {
        let Some(download) = self.get_mut(id) else {
            debug!(download_id = id, "cancel for unknown download ignored");
            return false;
        };
        if download.status.is_terminal() {
            return false;
        }
        download.status = DownloadStatus::Cancelled;
        download.task.cancel();
        info!(download_id = id, "download cancelled");
        true
    }

    /// Applies a progress sample. NaN and samples for terminal records are ignored.
    pub fn on_progress(&mut self, id: DownloadId, ratio: f64) {
        if ratio.is_nan() {
            return;
        }
        let Some(download) = self.get_mut(id) else {
            return;
        };
        if download.status.is_terminal() {
            return;
        }
        download.status = DownloadStatus::InProgress;
        download.progress = download.progress.max(ratio.clamp(0.0, 1.0));
    }

    /// Applies the terminal outcome of a transfer.
    ///
    /// Ignored for records that are already terminal, which covers a late
    /// completion racing a user cancel.
    pub fn on_complete(&mut self, id: DownloadId, result: Result<PathBuf, DownloadError>) {
        let Some(download) = self.get_mut(id) else {
            return;
        };
        if download.status.is_terminal() {
            debug!(download_id = id, status = %download.status, "late completion ignored");
            return;
        }
        match result {
            Ok(path) => {
                download.status = DownloadStatus::Complete;
                download.progress = 1.0;
                download.path = path;
                info!(download_id = id, "download complete");
            }
            Err(error) => {
                warn!(download_id = id, error = %error, "download failed");
                download.status = DownloadStatus::Failed;
                download.error = Some(error.to_string());
            }
        }
    }

    /// Dispatches a download event to [`on_progress`](Self::on_progress) or
    /// [`on_complete`](Self::on_complete).
    pub fn handle_event(&mut self, event: DownloadEvent) {
        match event {
            DownloadEvent::Progress { id, ratio } => self.on_progress(id, ratio),
            DownloadEvent::Complete { id, result } => self.on_complete(id, result),
        }
    }

    /// Number of Pending or InProgress records.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.downloads
            .iter()
            .filter(|d| d.status.is_active())
            .count()
    }

    /// All records in creation order.
    #[must_use]
    pub fn downloads(&self) -> &[Download] {
        &self.downloads
    }

    #[must_use]
    pub fn get(&self, id: DownloadId) -> Option<&Download> {
        self.downloads.iter().find(|d| d.id == id)
    }

    fn get_mut(&mut self, id: DownloadId) -> Option<&mut Download> {
        self.downloads.iter_mut().find(|d| d.id == id)
    }
}

/// Samples a transfer until it finishes or is cancelled.
///
/// Emits any number of progress events followed by at most one completion.
/// After cancellation nothing more is emitted for this id.
async fn report_transfer(
    id: DownloadId,
    url: String,
    mut handle: TransferHandle,
    cancel: CancellationToken,
    sink: EventSink,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_reported: Option<f64> = None;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(download_id = id, "reporter stopped by cancellation");
                return;
            }
            outcome = &mut handle.outcome => {
                let result = outcome.unwrap_or_else(|_| Err(DownloadError::aborted(&url)));
                if cancel.is_cancelled() {
                    return;
                }
                sink.emit(AppEvent::Download(DownloadEvent::Complete { id, result }));
                return;
            }
            _ = ticker.tick() => {
                // Without a known size, report once that bytes are flowing.
                let ratio = match handle.progress.ratio() {
                    Some(ratio) => ratio,
                    None if handle.progress.written() > 0 => 0.0,
                    None => continue,
                };
                if last_reported != Some(ratio) {
                    last_reported = Some(ratio);
                    sink.emit(AppEvent::Download(DownloadEvent::Progress { id, ratio }));
                }
            }
        }
    }
}
