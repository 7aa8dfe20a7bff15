//! Navigation state machine.
//!
//! [`App`] owns every piece of visible state. The front end feeds it
//! [`AppEvent`]s one at a time through [`App::handle_event`] and renders from
//! its accessors between events. Background work is started from inside the
//! handlers and reports back through the [`EventSink`] the app was built with,
//! so all mutation happens on the consumer side.

mod keys;
mod nav;

#[cfg(test)]
mod tests;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::batch::{BatchOrchestrator, BatchOutcome, DEFAULT_STAGGER, Launch};
use crate::catalog::{
    CatalogProvider, DEFAULT_SEARCH_LIMIT, Episode, Season, StreamCandidate, StreamProvider, Title,
};
use crate::download::{DEFAULT_PROGRESS_INTERVAL, DownloadManager, Transfer};
use crate::event::{AppEvent, BatchEvent, CatalogEvent, CatalogResult, EventSink};
use crate::listing::ListView;
use crate::player::Player;
use crate::task::TaskHandle;

pub use keys::Key;
pub use nav::{Loading, Pending, Section, View};

/// External collaborators the state machine drives.
#[derive(Clone)]
pub struct Services {
    pub catalog: Arc<dyn CatalogProvider>,
    pub streams: Arc<dyn StreamProvider>,
    pub transfer: Arc<dyn Transfer>,
    pub player: Arc<dyn Player>,
}

/// Tunables resolved from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory downloads are written into.
    pub download_dir: PathBuf,
    /// Maximum titles requested per search.
    pub search_limit: usize,
    /// Delay multiplier between batch task starts.
    pub batch_stagger: Duration,
    /// Progress sampling interval for transfers.
    pub progress_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("downloads"),
            search_limit: DEFAULT_SEARCH_LIMIT,
            batch_stagger: DEFAULT_STAGGER,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// The application state.
pub struct App {
    catalog: Arc<dyn CatalogProvider>,
    streams_provider: Arc<dyn StreamProvider>,
    player: Arc<dyn Player>,
    settings: Settings,
    sink: EventSink,

    view: View,
    section: Section,
    loading: Option<Loading>,
    filtering: bool,
    error: Option<String>,
    status: Option<String>,
    quit: bool,
    spinner_frame: usize,

    search_input: String,
    filter_input: String,
    batch_input: String,

    titles: ListView<Title>,
    seasons: ListView<Season>,
    episodes: ListView<Episode>,
    streams: ListView<StreamCandidate>,
    selected_title: Option<Title>,
    selected_season: Option<Season>,
    selected_episode: Option<Episode>,

    next_lookup: u64,
    lookup_task: Option<TaskHandle>,

    batch: BatchOrchestrator,
    batch_filter: String,
    batch_started: usize,
    batch_total: usize,
    batch_cursor: usize,

    downloads: DownloadManager,
    download_cursor: usize,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("view", &self.view)
            .field("section", &self.section)
            .field("loading", &self.loading)
            .field("filtering", &self.filtering)
            .field("error", &self.error)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl App {
    #[must_use]
    pub fn new(services: Services, settings: Settings, sink: EventSink) -> Self {
        let batch = BatchOrchestrator::new(
            Arc::clone(&services.streams),
            sink.clone(),
            settings.batch_stagger,
        );
        let downloads = DownloadManager::new(
            Arc::clone(&services.transfer),
            sink.clone(),
            settings.progress_interval,
        );
        Self {
            catalog: services.catalog,
            streams_provider: services.streams,
            player: services.player,
            settings,
            sink,
            view: View::default(),
            section: Section::default(),
            loading: None,
            filtering: false,
            error: None,
            status: None,
            quit: false,
            spinner_frame: 0,
            search_input: String::new(),
            filter_input: String::new(),
            batch_input: String::new(),
            titles: ListView::default(),
            seasons: ListView::default(),
            episodes: ListView::default(),
            streams: ListView::default(),
            selected_title: None,
            selected_season: None,
            selected_episode: None,
            next_lookup: 1,
            lookup_task: None,
            batch,
            batch_filter: String::new(),
            batch_started: 0,
            batch_total: 0,
            batch_cursor: 0,
            downloads,
            download_cursor: 0,
        }
    }

    /// Applies one event. Must be called from within a tokio runtime, since
    /// handlers may spawn background tasks.
    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Tick => {
                if self.loading.is_some() || self.downloads.active_count() > 0 {
                    self.spinner_frame = self.spinner_frame.wrapping_add(1);
                }
            }
            AppEvent::Catalog(event) => self.on_catalog(event),
            AppEvent::Download(event) => self.downloads.handle_event(event),
            AppEvent::Batch(event) => self.on_batch(event),
        }
    }

    // ==================== Accessors ====================

    #[must_use]
    pub fn view(&self) -> View {
        self.view
    }

    #[must_use]
    pub fn section(&self) -> Section {
        self.section
    }

    #[must_use]
    pub fn loading(&self) -> Option<&Loading> {
        self.loading.as_ref()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    #[must_use]
    pub fn is_filtering(&self) -> bool {
        self.filtering
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Whether a quit request was accepted.
    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    #[must_use]
    pub fn spinner_frame(&self) -> usize {
        self.spinner_frame
    }

    #[must_use]
    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    #[must_use]
    pub fn filter_input(&self) -> &str {
        &self.filter_input
    }

    #[must_use]
    pub fn batch_input(&self) -> &str {
        &self.batch_input
    }

    #[must_use]
    pub fn titles(&self) -> &ListView<Title> {
        &self.titles
    }

    #[must_use]
    pub fn seasons(&self) -> &ListView<Season> {
        &self.seasons
    }

    #[must_use]
    pub fn episodes(&self) -> &ListView<Episode> {
        &self.episodes
    }

    #[must_use]
    pub fn streams(&self) -> &ListView<StreamCandidate> {
        &self.streams
    }

    #[must_use]
    pub fn selected_title(&self) -> Option<&Title> {
        self.selected_title.as_ref()
    }

    #[must_use]
    pub fn selected_season(&self) -> Option<&Season> {
        self.selected_season.as_ref()
    }

    #[must_use]
    pub fn selected_episode(&self) -> Option<&Episode> {
        self.selected_episode.as_ref()
    }

    #[must_use]
    pub fn batch(&self) -> &BatchOrchestrator {
        &self.batch
    }

    /// Release-name filter of the last batch launch.
    #[must_use]
    pub fn batch_filter(&self) -> &str {
        &self.batch_filter
    }

    /// Batch tasks that have started their lookup, out of the total.
    #[must_use]
    pub fn batch_progress(&self) -> (usize, usize) {
        (self.batch_started, self.batch_total)
    }

    #[must_use]
    pub fn batch_cursor(&self) -> usize {
        self.batch_cursor
    }

    #[must_use]
    pub fn downloads(&self) -> &DownloadManager {
        &self.downloads
    }

    #[must_use]
    pub fn download_cursor(&self) -> usize {
        self.download_cursor
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ==================== Messages ====================

    fn clear_messages(&mut self) {
        self.error = None;
        self.status = None;
    }

    fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    fn navigate(&mut self, view: View) {
        debug!(from = ?self.view, to = ?view, "view transition");
        self.view = view;
    }

    // ==================== Lookups ====================

    /// Spawns one catalog lookup and raises the loading overlay for it.
    ///
    /// Any lookup still in flight is abandoned first.
    fn start_lookup<F>(&mut self, message: &str, fetch: F)
    where
        F: Future<Output = CatalogResult> + Send + 'static,
    {
        self.abandon_lookup();
        let lookup = self.next_lookup;
        self.next_lookup += 1;

        let task = TaskHandle::new(lookup);
        let token = task.token();
        let sink = self.sink.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {}
                result = fetch => {
                    sink.emit(AppEvent::Catalog(CatalogEvent { lookup, result }));
                }
            }
        });

        debug!(lookup, message, "lookup started");
        self.lookup_task = Some(task);
        self.loading = Some(Loading::lookup(lookup, message));
        self.clear_messages();
    }

    fn abandon_lookup(&mut self) {
        if let Some(task) = self.lookup_task.take() {
            task.cancel();
        }
    }

    fn search(&mut self, query: String) {
        let catalog = Arc::clone(&self.catalog);
        let limit = self.settings.search_limit;
        self.start_lookup("Searching...", async move {
            CatalogResult::Titles(catalog.search_titles(&query, limit).await)
        });
    }

    fn fetch_seasons(&mut self, title_id: String) {
        let catalog = Arc::clone(&self.catalog);
        self.start_lookup("Fetching seasons...", async move {
            CatalogResult::Seasons(catalog.list_seasons(&title_id).await)
        });
    }

    fn fetch_episodes(&mut self, title_id: String, season: String) {
        let catalog = Arc::clone(&self.catalog);
        self.start_lookup("Fetching episodes...", async move {
            CatalogResult::Episodes(catalog.list_episodes(&title_id, &season).await)
        });
    }

    fn fetch_streams(&mut self, item_id: String) {
        let provider = Arc::clone(&self.streams_provider);
        self.start_lookup("Fetching streams...", async move {
            CatalogResult::Streams(provider.list_streams(&item_id).await)
        });
    }

    #[instrument(skip(self, event), fields(lookup = event.lookup, kind = event.result.kind()))]
    fn on_catalog(&mut self, event: CatalogEvent) {
        let accepted = self
            .loading
            .as_ref()
            .is_some_and(|loading| loading.awaits_lookup(event.lookup));
        if !accepted {
            debug!("stale lookup result ignored");
            return;
        }
        self.loading = None;
        self.lookup_task = None;

        match event.result {
            CatalogResult::Titles(Ok(titles)) => {
                if titles.is_empty() {
                    self.set_error("No results found");
                    return;
                }
                self.titles = ListView::new(titles);
                self.navigate(View::TitleResults);
            }
            CatalogResult::Seasons(Ok(seasons)) => {
                if seasons.is_empty() {
                    // No seasons: treat the title as a movie.
                    if let Some(title_id) = self.selected_title.as_ref().map(|t| t.id.clone()) {
                        self.fetch_streams(title_id);
                    }
                    return;
                }
                self.seasons = ListView::new(seasons);
                self.navigate(View::SeasonList);
            }
            CatalogResult::Episodes(Ok(episodes)) => {
                if episodes.is_empty() {
                    self.set_error("No episodes found");
                    self.navigate(View::SeasonList);
                    return;
                }
                self.episodes = ListView::new(episodes);
                self.exit_filter_mode();
                self.navigate(View::EpisodeList);
            }
            CatalogResult::Streams(Ok(streams)) => {
                if streams.is_empty() {
                    self.set_error("No streams found");
                    let back = if self.selected_episode.is_some() {
                        View::EpisodeList
                    } else {
                        View::TitleResults
                    };
                    self.navigate(back);
                    return;
                }
                self.streams = ListView::new(streams);
                self.exit_filter_mode();
                self.navigate(View::StreamList);
            }
            CatalogResult::Titles(Err(e))
            | CatalogResult::Seasons(Err(e))
            | CatalogResult::Episodes(Err(e))
            | CatalogResult::Streams(Err(e)) => {
                warn!(error = %e, "lookup failed");
                self.set_error(e.to_string());
            }
        }
    }

    // ==================== Batch ====================

    fn launch_batch(&mut self, filter: String) {
        let Some(title_id) = self.selected_title.as_ref().map(|t| t.id.clone()) else {
            self.set_error("No title selected");
            return;
        };
        let episodes = self.episodes.visible_cloned();
        let total = episodes.len();
        match self.batch.launch(&title_id, episodes, &filter) {
            Launch::Started(id) => {
                self.clear_messages();
                self.batch_filter = filter;
                self.batch_started = 0;
                self.batch_total = total;
                self.batch_cursor = 0;
                self.loading = Some(Loading::batch(id, "Fetching streams for all episodes..."));
            }
            Launch::Empty => {
                self.set_error("No episodes to fetch");
                self.navigate(View::EpisodeList);
            }
        }
    }

    fn on_batch(&mut self, event: BatchEvent) {
        match event {
            BatchEvent::FetchStarted { batch, index } => {
                if self.batch.active_batch() == Some(batch) {
                    self.batch_started += 1;
                    debug!(batch, index, started = self.batch_started, "batch task started");
                }
            }
            BatchEvent::EpisodeResolved {
                batch,
                index,
                result,
            } => {
                let Some(outcome) = self.batch.on_resolved(batch, index, result) else {
                    return;
                };
                if self
                    .loading
                    .as_ref()
                    .is_some_and(|loading| loading.awaits_batch(batch))
                {
                    self.loading = None;
                }
                match outcome {
                    BatchOutcome::NoMatches => {
                        self.set_error(format!(
                            "No streams found matching '{}'",
                            self.batch_filter
                        ));
                        self.navigate(View::EpisodeList);
                    }
                    BatchOutcome::Ready { matched, failed } => {
                        info!(matched, failed, "batch ready for selection");
                        self.batch_cursor = 0;
                        self.navigate(View::BatchSelection);
                    }
                }
            }
        }
    }

    // ==================== Filter mode ====================

    fn exit_filter_mode(&mut self) {
        self.filtering = false;
        self.filter_input.clear();
    }

    fn apply_filter(&mut self) {
        match self.view {
            View::EpisodeList => self.episodes.set_query(&self.filter_input),
            View::StreamList => self.streams.set_query(&self.filter_input),
            _ => {}
        }
    }

    fn restore_filter(&mut self) {
        match self.view {
            View::EpisodeList => self.episodes.clear_filter(),
            View::StreamList => self.streams.clear_filter(),
            _ => {}
        }
    }
}
