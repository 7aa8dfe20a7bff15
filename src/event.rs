//! Events delivered to the single state-owning consumer.
//!
//! Every background task reports back exclusively through an [`EventSink`].
//! The receiving half is drained by the front end, which hands each event to
//! [`App::handle_event`](crate::app::App::handle_event). Events produced by one
//! task arrive in the order that task sent them; there is no ordering across
//! tasks.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::trace;

use crate::app::Key;
use crate::batch::BatchId;
use crate::catalog::{CatalogError, Episode, Season, StreamCandidate, Title};
use crate::download::{DownloadError, DownloadId};

/// Everything the state machine reacts to.
#[derive(Debug)]
pub enum AppEvent {
    /// A key press from the terminal.
    Key(Key),
    /// Periodic redraw tick (spinner and progress animation).
    Tick,
    /// A catalog or stream lookup finished.
    Catalog(CatalogEvent),
    /// A transfer reported progress or finished.
    Download(DownloadEvent),
    /// A batch lookup task started or resolved.
    Batch(BatchEvent),
}

/// Result of one catalog lookup, tagged with the lookup that requested it.
#[derive(Debug)]
pub struct CatalogEvent {
    /// Sequence number of the lookup that produced this result.
    pub lookup: u64,
    /// The lookup payload.
    pub result: CatalogResult,
}

/// Payload of a finished catalog lookup.
#[derive(Debug)]
pub enum CatalogResult {
    Titles(Result<Vec<Title>, CatalogError>),
    Seasons(Result<Vec<Season>, CatalogError>),
    Episodes(Result<Vec<Episode>, CatalogError>),
    Streams(Result<Vec<StreamCandidate>, CatalogError>),
}

impl CatalogResult {
    /// Stable label used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Titles(_) => "titles",
            Self::Seasons(_) => "seasons",
            Self::Episodes(_) => "episodes",
            Self::Streams(_) => "streams",
        }
    }
}

/// Progress and terminal events for a single download.
#[derive(Debug)]
pub enum DownloadEvent {
    /// Fraction of bytes written so far.
    Progress { id: DownloadId, ratio: f64 },
    /// The transfer finished, successfully or not. Sent at most once per id.
    Complete {
        id: DownloadId,
        result: Result<PathBuf, DownloadError>,
    },
}

/// Events produced by the tasks of one batch run.
#[derive(Debug)]
pub enum BatchEvent {
    /// Task `index` finished its stagger delay and began its lookup.
    FetchStarted { batch: BatchId, index: usize },
    /// Task `index` reached its terminal outcome.
    EpisodeResolved {
        batch: BatchId,
        index: usize,
        result: Result<Vec<StreamCandidate>, CatalogError>,
    },
}

/// Producer handle for the application event channel.
///
/// Cloned into every task that needs to report back. Sending never blocks;
/// if the consumer is gone the event is dropped.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl EventSink {
    /// Queues an event for the consumer.
    ///
    /// Returns `false` when the receiving side has been dropped.
    pub fn emit(&self, event: AppEvent) -> bool {
        let delivered = self.tx.send(event).is_ok();
        if !delivered {
            trace!("event receiver dropped; discarding event");
        }
        delivered
    }
}

/// Creates the application event channel.
#[must_use]
pub fn channel() -> (EventSink, mpsc::UnboundedReceiver<AppEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink { tx }, rx)
}
