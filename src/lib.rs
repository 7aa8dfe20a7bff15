//! Streamdl Core Library
//!
//! This library provides the core of the streamdl terminal browser: catalog
//! lookups, a concurrent download manager, staggered batch stream fetching,
//! and the navigation state machine that ties them together.
//!
//! # Architecture
//!
//! All visible state is owned by [`app::App`], which consumes [`event::AppEvent`]s
//! from a single channel. Background work (catalog fetches, byte transfers,
//! batch lookups) runs as tokio tasks that only report back through an
//! [`event::EventSink`].
//!
//! - [`catalog`] - Catalog and stream provider traits plus their HTTP implementations
//! - [`download`] - Download records, transfer driver, retry policy, filenames
//! - [`batch`] - Staggered per-episode stream lookup and aggregation
//! - [`filter`] / [`listing`] - Live list filtering and list item presentation
//! - [`player`] - External media player launch
//! - [`app`] - Navigation state machine

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod app;
pub mod batch;
pub mod catalog;
pub mod download;
pub mod event;
pub mod filter;
mod http;
pub mod listing;
pub mod player;
pub mod retry;
pub mod task;
mod user_agent;

// Re-export commonly used types
pub use app::{App, Key, Section, Services, Settings, View};
pub use batch::{BatchFailure, BatchOrchestrator, BatchOutcome, BatchStream, FailureReason};
pub use catalog::{
    CatalogError, CatalogProvider, Episode, HttpCatalog, HttpStreamProvider, Season,
    StreamCandidate, StreamProvider, Title,
};
pub use download::{
    Download, DownloadError, DownloadId, DownloadManager, DownloadRequest, DownloadStatus,
    HttpTransfer, Transfer, format_size, sanitize_filename,
};
pub use event::{AppEvent, EventSink};
pub use http::HttpTimeouts;
pub use player::{ExternalPlayer, Player, PlayerError};
pub use task::TaskHandle;
