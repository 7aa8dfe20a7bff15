//! Non-interactive single download.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use streamdl_core::event::{self, AppEvent, DownloadEvent};
use streamdl_core::{
    DownloadManager, DownloadRequest, DownloadStatus, HttpTransfer, Transfer, sanitize_filename,
};
use tracing::{info, warn};

use crate::config::RunConfig;

/// Progress bar resolution.
const BAR_UNITS: u64 = 1000;

/// File name for a headless download: the given name, else the last URL
/// path segment, sanitized either way.
fn headless_filename(url: &str, name: Option<&str>) -> String {
    let stem = name.map(str::to_string).unwrap_or_else(|| {
        url::Url::parse(url)
            .ok()
            .and_then(|u| {
                u.path_segments()
                    .and_then(|mut segments| segments.next_back().map(str::to_string))
            })
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.rsplit_once('.') {
                Some((stem, _ext)) if !stem.is_empty() => stem.to_string(),
                _ => segment,
            })
            .unwrap_or_default()
    });
    sanitize_filename(&stem)
}

fn progress_bar(quiet: bool) -> ProgressBar {
    if quiet || !io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(BAR_UNITS);
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{bar:40}] {percent}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

/// Downloads `url` through the download manager and waits for the outcome.
pub(crate) async fn run_download(
    config: &RunConfig,
    url: &str,
    name: Option<&str>,
    quiet: bool,
) -> Result<PathBuf> {
    let transfer: Arc<dyn Transfer> = Arc::new(HttpTransfer::new(config.transfer_timeouts)?);
    let (sink, mut events) = event::channel();
    let mut manager = DownloadManager::new(transfer, sink, config.settings.progress_interval);

    let filename = headless_filename(url, name);
    let request = DownloadRequest {
        name: name.unwrap_or(filename.as_str()).to_string(),
        url: url.to_string(),
        path: config.settings.download_dir.join(&filename),
    };
    let id = manager.start(request);

    let bar = progress_bar(quiet);
    bar.set_message(filename.clone());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!(download_id = id, "interrupted");
                manager.cancel(id);
            }
            event = events.recv() => {
                let Some(AppEvent::Download(event)) = event else {
                    continue;
                };
                let done = matches!(event, DownloadEvent::Complete { .. });
                manager.handle_event(event);
                if let Some(download) = manager.get(id) {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    bar.set_position((download.progress() * BAR_UNITS as f64) as u64);
                }
                if !done {
                    continue;
                }
            }
        }

        let Some(download) = manager.get(id) else {
            bail!("download record {id} disappeared");
        };
        match download.status() {
            DownloadStatus::Complete => {
                bar.finish_and_clear();
                info!(path = %download.path().display(), "download complete");
                return Ok(download.path().to_path_buf());
            }
            DownloadStatus::Failed => {
                bar.abandon();
                bail!(
                    "Download failed: {}",
                    download.error().unwrap_or("unknown error")
                );
            }
            DownloadStatus::Cancelled => {
                bar.abandon();
                bail!("Download cancelled");
            }
            DownloadStatus::Pending | DownloadStatus::InProgress => {}
        }
    }
}
