//! Staggered batch stream lookups.
//!
//! A batch runs one stream lookup per episode. Task `i` waits `i * stagger`
//! before it starts so the provider's rate limit is respected. Results come
//! back out of order as [`BatchEvent`]s; [`BatchOrchestrator::on_resolved`]
//! folds them into [`BatchStream`]s and [`BatchFailure`]s and yields a single
//! [`BatchOutcome`] once every episode has reached a terminal state.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::catalog::{CatalogError, Episode, StreamCandidate, StreamProvider};
use crate::event::{AppEvent, BatchEvent, EventSink};
use crate::task::{TaskHandle, sleep_unless_cancelled};

/// Identity of one batch run.
pub type BatchId = u64;

/// Default delay multiplier between batch task starts.
pub const DEFAULT_STAGGER: Duration = Duration::from_secs(5);

/// A stream chosen for an episode during a batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchStream {
    pub episode: Episode,
    pub stream: StreamCandidate,
    /// Whether the stream will be downloaded on commit. Starts out `true`.
    pub selected: bool,
    order: usize,
}

/// Why an episode produced no stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The lookup itself failed.
    ProviderError(String),
    /// Streams existed but none matched the release filter.
    NoMatch(String),
    /// The provider returned an empty list.
    NoStreams,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderError(message) => write!(f, "provider error: {message}"),
            Self::NoMatch(filter) => write!(f, "no match for '{filter}'"),
            Self::NoStreams => f.write_str("no streams available"),
        }
    }
}

/// An episode for which no acceptable stream was found.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    pub episode: Episode,
    pub reason: FailureReason,
    order: usize,
}

/// The single aggregate result of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Nothing matched and nothing failed.
    NoMatches,
    /// Results are ready for selection.
    Ready { matched: usize, failed: usize },
}

/// What happened when a batch was launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launch {
    /// Tasks were spawned; the outcome arrives through events.
    Started(BatchId),
    /// There was nothing to fetch.
    Empty,
}

/// Picks the first candidate whose name or filename contains `filter`,
/// case-insensitively. Candidates are scanned in provider order.
#[must_use]
pub fn select_stream<'a>(candidates: &'a [StreamCandidate], filter: &str) -> Option<&'a StreamCandidate> {
    let needle = filter.to_lowercase();
    candidates.iter().find(|candidate| {
        candidate.name.to_lowercase().contains(&needle)
            || candidate
                .behavior_hints
                .filename
                .to_lowercase()
                .contains(&needle)
    })
}

struct BatchRun {
    id: BatchId,
    filter: String,
    episodes: Vec<Episode>,
    resolved: Vec<bool>,
    outstanding: usize,
    cancel: CancellationToken,
    tasks: Vec<TaskHandle>,
}

/// Launches batch runs and accumulates their results.
///
/// Only the most recent run is live: launching again cancels the previous
/// run's tasks and any of its late events are ignored.
pub struct BatchOrchestrator {
    provider: Arc<dyn StreamProvider>,
    sink: EventSink,
    stagger: Duration,
    next_id: BatchId,
    run: Option<BatchRun>,
    streams: Vec<BatchStream>,
    failures: Vec<BatchFailure>,
}

impl fmt::Debug for BatchOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchOrchestrator")
            .field("stagger", &self.stagger)
            .field("active", &self.active_batch())
            .field("streams", &self.streams.len())
            .field("failures", &self.failures.len())
            .finish_non_exhaustive()
    }
}

impl BatchOrchestrator {
    #[must_use]
    pub fn new(provider: Arc<dyn StreamProvider>, sink: EventSink, stagger: Duration) -> Self {
        Self {
            provider,
            sink,
            stagger,
            next_id: 1,
            run: None,
            streams: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Starts one staggered lookup per episode.
    ///
    /// `title_id` and each episode form the provider item id. Previous
    /// results are discarded. Must be called from within a tokio runtime.
    #[instrument(skip(self, episodes), fields(episodes = episodes.len()))]
    pub fn launch(&mut self, title_id: &str, episodes: Vec<Episode>, filter: &str) -> Launch {
        self.cancel_active();
        self.streams.clear();
        self.failures.clear();

        if episodes.is_empty() {
            return Launch::Empty;
        }

        let id = self.next_id;
        self.next_id += 1;
        let cancel = CancellationToken::new();
        let mut tasks = Vec::with_capacity(episodes.len());

        for (index, episode) in episodes.iter().enumerate() {
            let task = TaskHandle::child_of(index as u64, &cancel);
            let delay = self
                .stagger
                .saturating_mul(u32::try_from(index).unwrap_or(u32::MAX));
            tokio::spawn(fetch_episode(
                id,
                index,
                episode.stream_id(title_id),
                delay,
                Arc::clone(&self.provider),
                self.sink.clone(),
                task.token(),
            ));
            tasks.push(task);
        }

        info!(batch = id, filter = %filter, "batch launched");
        self.run = Some(BatchRun {
            id,
            filter: filter.to_string(),
            resolved: vec![false; episodes.len()],
            outstanding: episodes.len(),
            episodes,
            cancel,
            tasks,
        });
        Launch::Started(id)
    }

    /// Folds one terminal per-episode result into the batch.
    ///
    /// Returns the aggregate outcome exactly once, on the event that brings
    /// the outstanding count to zero. Stale or duplicate events return `None`.
    pub fn on_resolved(
        &mut self,
        batch: BatchId,
        index: usize,
        result: Result<Vec<StreamCandidate>, CatalogError>,
    ) -> Option<BatchOutcome> {
        let run = self.run.as_mut().filter(|run| run.id == batch)?;
        if run.resolved.get(index).copied().unwrap_or(true) {
            debug!(batch, index, "duplicate or out-of-range batch result ignored");
            return None;
        }
        run.resolved[index] = true;
        run.outstanding -= 1;
        if let Some(task) = run.tasks.get(index) {
            debug!(batch, task_id = task.id(), "batch task resolved");
        }

        let episode = run.episodes[index].clone();
        match result {
            Ok(candidates) if candidates.is_empty() => self.failures.push(BatchFailure {
                episode,
                reason: FailureReason::NoStreams,
                order: index,
            }),
            Ok(candidates) => match select_stream(&candidates, &run.filter) {
                Some(stream) => self.streams.push(BatchStream {
                    episode,
                    stream: stream.clone(),
                    selected: true,
                    order: index,
                }),
                None => self.failures.push(BatchFailure {
                    episode,
                    reason: FailureReason::NoMatch(run.filter.clone()),
                    order: index,
                }),
            },
            Err(error) => self.failures.push(BatchFailure {
                episode,
                reason: FailureReason::ProviderError(error.to_string()),
                order: index,
            }),
        }

        if run.outstanding > 0 {
            return None;
        }

        self.run = None;
        self.streams.sort_by_key(|s| s.order);
        self.failures.sort_by_key(|f| f.order);
        info!(
            batch,
            matched = self.streams.len(),
            failed = self.failures.len(),
            "batch complete"
        );
        if self.streams.is_empty() && self.failures.is_empty() {
            Some(BatchOutcome::NoMatches)
        } else {
            Some(BatchOutcome::Ready {
                matched: self.streams.len(),
                failed: self.failures.len(),
            })
        }
    }

    /// Id of the run still waiting for results.
    #[must_use]
    pub fn active_batch(&self) -> Option<BatchId> {
        self.run.as_ref().map(|run| run.id)
    }

    /// Episodes of the live run still waiting for a result.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.run.as_ref().map_or(0, |run| run.outstanding)
    }

    /// Signals every task of the live run and forgets it.
    pub fn cancel_active(&mut self) {
        if let Some(run) = self.run.take() {
            debug!(batch = run.id, "cancelling batch run");
            run.cancel.cancel();
        }
    }

    #[must_use]
    pub fn streams(&self) -> &[BatchStream] {
        &self.streams
    }

    #[must_use]
    pub fn failures(&self) -> &[BatchFailure] {
        &self.failures
    }

    /// Flips the selection flag of one stream.
    pub fn toggle(&mut self, index: usize) {
        if let Some(stream) = self.streams.get_mut(index) {
            stream.selected = !stream.selected;
        }
    }

    pub fn select_all(&mut self) {
        self.set_all(true);
    }

    pub fn select_none(&mut self) {
        self.set_all(false);
    }

    fn set_all(&mut self, selected: bool) {
        for stream in &mut self.streams {
            stream.selected = selected;
        }
    }

    #[must_use]
    pub fn selected_count(&self) -> usize {
        self.streams.iter().filter(|s| s.selected).count()
    }

    /// Drains the results, returning only the selected streams.
    pub fn take_selected(&mut self) -> Vec<BatchStream> {
        self.failures.clear();
        std::mem::take(&mut self.streams)
            .into_iter()
            .filter(|s| s.selected)
            .collect()
    }

    /// Discards the results without side effects.
    pub fn clear(&mut self) {
        self.streams.clear();
        self.failures.clear();
    }
}

async fn fetch_episode(
    batch: BatchId,
    index: usize,
    item_id: String,
    delay: Duration,
    provider: Arc<dyn StreamProvider>,
    sink: EventSink,
    cancel: CancellationToken,
) {
    if !sleep_unless_cancelled(delay, &cancel).await {
        return;
    }
    sink.emit(AppEvent::Batch(BatchEvent::FetchStarted { batch, index }));
    debug!(batch, index, item_id = %item_id, "batch lookup started");

    let result = tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        result = provider.list_streams(&item_id) => result,
    };
    sink.emit(AppEvent::Batch(BatchEvent::EpisodeResolved {
        batch,
        index,
        result,
    }));
}
