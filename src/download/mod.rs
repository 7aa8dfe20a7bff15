//! Concurrent downloads.
//!
//! # Features
//!
//! - [`DownloadManager`] owns every [`Download`] record and applies progress
//!   and completion events in a single place
//! - [`Transfer`] abstracts the byte mover; [`HttpTransfer`] streams HTTP
//!   bodies to disk and honours cooperative cancellation between chunks
//! - Filename derivation for single and batch downloads plus size formatting

mod error;
mod filename;
mod manager;
mod transfer;

pub use error::DownloadError;
pub use filename::{
    MAX_STEM_CHARS, MEDIA_EXTENSION, batch_display_name, batch_filename, format_size,
    sanitize_filename, sanitize_provider_filename, stream_filename,
};
pub use manager::{
    DEFAULT_PROGRESS_INTERVAL, Download, DownloadId, DownloadManager, DownloadRequest,
    DownloadStatus,
};
pub use transfer::{HttpTransfer, Transfer, TransferHandle, TransferProgress};

// Use `Result<T, DownloadError>` explicitly in signatures; no module-local alias.
