#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::*;
use crate::catalog::{BehaviorHints, CatalogError};
use crate::download::{DownloadError, DownloadStatus, TransferHandle};
use crate::event::{self, CatalogEvent, CatalogResult};
use crate::player::PlayerError;

// ==================== Fakes ====================

#[derive(Default)]
struct FakeCatalog {
    titles: Vec<Title>,
    seasons: Vec<Season>,
    episodes: Vec<Episode>,
}

#[async_trait]
impl CatalogProvider for FakeCatalog {
    async fn search_titles(&self, _query: &str, limit: usize) -> Result<Vec<Title>, CatalogError> {
        Ok(self.titles.iter().take(limit).cloned().collect())
    }

    async fn list_seasons(&self, _title_id: &str) -> Result<Vec<Season>, CatalogError> {
        Ok(self.seasons.clone())
    }

    async fn list_episodes(
        &self,
        _title_id: &str,
        _season: &str,
    ) -> Result<Vec<Episode>, CatalogError> {
        Ok(self.episodes.clone())
    }
}

/// Unknown item ids fail with HTTP 503.
#[derive(Default)]
struct FakeStreams {
    by_item: HashMap<String, Vec<StreamCandidate>>,
}

#[async_trait]
impl StreamProvider for FakeStreams {
    async fn list_streams(&self, item_id: &str) -> Result<Vec<StreamCandidate>, CatalogError> {
        self.by_item
            .get(item_id)
            .cloned()
            .ok_or_else(|| CatalogError::http_status(item_id, 503))
    }
}

type Outcome = oneshot::Sender<Result<PathBuf, DownloadError>>;

#[derive(Default)]
struct IdleTransfer {
    started: Mutex<Vec<(String, PathBuf, Outcome)>>,
}

impl Transfer for IdleTransfer {
    fn start(&self, url: &str, dest: &Path, _cancel: CancellationToken) -> TransferHandle {
        let (handle, _progress, tx) = TransferHandle::channel();
        self.started
            .lock()
            .unwrap()
            .push((url.to_string(), dest.to_path_buf(), tx));
        handle
    }
}

#[derive(Default)]
struct FakePlayer {
    fail: bool,
    played: Mutex<Vec<String>>,
}

impl Player for FakePlayer {
    fn name(&self) -> &str {
        "fakeplayer"
    }

    fn play(&self, url: &str) -> Result<(), PlayerError> {
        if self.fail {
            return Err(PlayerError::spawn(
                "fakeplayer",
                std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            ));
        }
        self.played.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

// ==================== Fixtures ====================

fn title(id: &str, kind: &str, name: &str) -> Title {
    Title {
        id: id.to_string(),
        kind: kind.to_string(),
        primary_title: name.to_string(),
        original_title: name.to_string(),
    }
}

fn episode(number: u32, name: &str) -> Episode {
    Episode {
        id: format!("ep{number}"),
        title: name.to_string(),
        season: "1".to_string(),
        episode_number: number,
        ..Episode::default()
    }
}

fn stream(name: &str, url: &str) -> StreamCandidate {
    StreamCandidate {
        name: name.to_string(),
        url: url.to_string(),
        behavior_hints: BehaviorHints::default(),
        ..StreamCandidate::default()
    }
}

struct Harness {
    app: App,
    rx: mpsc::UnboundedReceiver<AppEvent>,
    transfer: Arc<IdleTransfer>,
    player: Arc<FakePlayer>,
}

impl Harness {
    fn new(catalog: FakeCatalog, streams: FakeStreams) -> Self {
        Self::with_player(catalog, streams, FakePlayer::default())
    }

    fn with_player(catalog: FakeCatalog, streams: FakeStreams, player: FakePlayer) -> Self {
        let (sink, rx) = event::channel();
        let transfer = Arc::new(IdleTransfer::default());
        let player = Arc::new(player);
        let services = Services {
            catalog: Arc::new(catalog),
            streams: Arc::new(streams),
            transfer: Arc::clone(&transfer) as Arc<dyn Transfer>,
            player: Arc::clone(&player) as Arc<dyn Player>,
        };
        let settings = Settings {
            batch_stagger: Duration::ZERO,
            ..Settings::default()
        };
        Self {
            app: App::new(services, settings, sink),
            rx,
            transfer,
            player,
        }
    }

    fn key(&mut self, key: Key) {
        self.app.handle_event(AppEvent::Key(key));
    }

    fn type_text(&mut self, text: &str) {
        for c in text.chars() {
            self.key(Key::Char(c));
        }
    }

    /// Feeds background events into the app until the loading overlay clears.
    async fn settle(&mut self) {
        while self.app.is_loading() {
            let event = tokio::time::timeout(Duration::from_secs(5), self.rx.recv())
                .await
                .unwrap()
                .unwrap();
            self.app.handle_event(event);
        }
    }

    async fn search(&mut self, query: &str) {
        self.type_text(query);
        self.key(Key::Enter);
        self.settle().await;
    }
}

fn series_catalog() -> FakeCatalog {
    FakeCatalog {
        titles: vec![title("tt1", "tvSeries", "Breaking Bad")],
        seasons: vec![Season {
            season: "1".to_string(),
            episode_count: 3,
        }],
        episodes: vec![
            episode(1, "Pilot"),
            episode(2, "Cat's in the Bag"),
            episode(3, "And the Bag's in the River"),
        ],
    }
}

fn series_streams() -> FakeStreams {
    let mut by_item = HashMap::new();
    by_item.insert(
        "tt1:1:1".to_string(),
        vec![stream("720p WEB", "https://cdn/1a"), stream("1080p BluRay", "https://cdn/1b")],
    );
    by_item.insert("tt1:1:2".to_string(), vec![stream("720p WEB", "https://cdn/2a")]);
    // tt1:1:3 is missing and fails
    FakeStreams { by_item }
}

/// Drives a series harness to its episode list.
async fn at_episode_list() -> Harness {
    let mut h = Harness::new(series_catalog(), series_streams());
    h.search("breaking").await;
    h.key(Key::Enter);
    h.settle().await;
    h.key(Key::Enter);
    h.settle().await;
    assert_eq!(h.app.view(), View::EpisodeList);
    h
}

// ==================== Lookup Tests ====================

#[tokio::test]
async fn test_search_moves_to_title_results() {
    let mut h = Harness::new(series_catalog(), FakeStreams::default());
    h.type_text("breaking");
    h.key(Key::Enter);
    assert_eq!(h.app.loading().unwrap().message, "Searching...");

    h.settle().await;
    assert_eq!(h.app.view(), View::TitleResults);
    assert_eq!(h.app.titles().visible_len(), 1);
    assert!(h.app.error().is_none());
}

#[tokio::test]
async fn test_blank_search_is_ignored() {
    let mut h = Harness::new(series_catalog(), FakeStreams::default());
    h.type_text("   ");
    h.key(Key::Enter);
    assert!(!h.app.is_loading());
    assert_eq!(h.app.view(), View::SearchEntry);
}

#[tokio::test]
async fn test_zero_titles_sets_error_and_stays() {
    let mut h = Harness::new(FakeCatalog::default(), FakeStreams::default());
    h.search("nothing").await;
    assert_eq!(h.app.view(), View::SearchEntry);
    assert_eq!(h.app.error(), Some("No results found"));
}

#[tokio::test]
async fn test_movie_fetches_streams_directly() {
    let catalog = FakeCatalog {
        titles: vec![title("tt9", "movie", "Heat")],
        ..FakeCatalog::default()
    };
    let mut by_item = HashMap::new();
    by_item.insert("tt9".to_string(), vec![stream("1080p", "https://cdn/heat")]);
    let mut h = Harness::new(catalog, FakeStreams { by_item });

    h.search("heat").await;
    h.key(Key::Enter);
    assert_eq!(h.app.loading().unwrap().message, "Fetching streams...");
    h.settle().await;
    assert_eq!(h.app.view(), View::StreamList);

    h.key(Key::Esc);
    assert_eq!(h.app.view(), View::TitleResults);
}

#[tokio::test]
async fn test_series_without_seasons_is_treated_as_movie() {
    let catalog = FakeCatalog {
        titles: vec![title("tt5", "tvMiniSeries", "Chernobyl")],
        ..FakeCatalog::default()
    };
    let mut by_item = HashMap::new();
    by_item.insert("tt5".to_string(), vec![stream("2160p", "https://cdn/c")]);
    let mut h = Harness::new(catalog, FakeStreams { by_item });

    h.search("chernobyl").await;
    h.key(Key::Enter);
    assert_eq!(h.app.loading().unwrap().message, "Fetching seasons...");
    h.settle().await;
    assert_eq!(h.app.view(), View::StreamList);
    assert_ne!(h.app.view(), View::SeasonList);
}

#[tokio::test]
async fn test_provider_error_clears_loading_and_keeps_view() {
    let mut h = at_episode_list().await;
    h.key(Key::Down);
    h.key(Key::Down);
    h.key(Key::Enter);
    h.settle().await;
    assert_eq!(h.app.view(), View::EpisodeList);
    assert_eq!(h.app.error(), Some("HTTP 503"));
}

#[tokio::test]
async fn test_empty_streams_for_episode_returns_to_episode_list() {
    let mut catalog = series_catalog();
    catalog.episodes = vec![episode(1, "Pilot")];
    let mut by_item = HashMap::new();
    by_item.insert("tt1:1:1".to_string(), Vec::new());
    let mut h = Harness::new(catalog, FakeStreams { by_item });
    h.search("breaking").await;
    h.key(Key::Enter);
    h.settle().await;
    h.key(Key::Enter);
    h.settle().await;

    h.key(Key::Enter);
    h.settle().await;
    assert_eq!(h.app.view(), View::EpisodeList);
    assert_eq!(h.app.error(), Some("No streams found"));
}

#[tokio::test]
async fn test_abandoned_lookup_result_is_ignored() {
    let mut h = Harness::new(series_catalog(), FakeStreams::default());
    h.type_text("breaking");
    h.key(Key::Enter);
    h.key(Key::Esc);
    assert!(!h.app.is_loading());

    // a result for the abandoned lookup arrives anyway
    h.app.handle_event(AppEvent::Catalog(CatalogEvent {
        lookup: 1,
        result: CatalogResult::Titles(Ok(vec![title("tt1", "movie", "Late")])),
    }));
    assert_eq!(h.app.view(), View::SearchEntry);
    assert!(h.app.titles().is_empty());
}

#[tokio::test]
async fn test_results_only_accepted_while_loading() {
    let mut h = Harness::new(series_catalog(), FakeStreams::default());
    h.app.handle_event(AppEvent::Catalog(CatalogEvent {
        lookup: 42,
        result: CatalogResult::Titles(Ok(vec![title("tt1", "movie", "Unasked")])),
    }));
    assert_eq!(h.app.view(), View::SearchEntry);
}

// ==================== Filter Mode Tests ====================

#[tokio::test]
async fn test_filter_confirm_keeps_subset_and_cancel_restores() {
    let mut h = at_episode_list().await;

    h.key(Key::Char('/'));
    assert!(h.app.is_filtering());
    h.type_text("bag");
    assert_eq!(h.app.episodes().visible_len(), 2);
    h.key(Key::Enter);
    assert!(!h.app.is_filtering());
    assert_eq!(h.app.episodes().visible_len(), 2);

    h.key(Key::Char('/'));
    h.type_text("river");
    assert_eq!(h.app.episodes().visible_len(), 1);
    h.key(Key::Esc);
    assert!(!h.app.is_filtering());
    assert_eq!(h.app.episodes().visible_len(), 3);
    assert_eq!(h.app.view(), View::EpisodeList);
}

#[tokio::test]
async fn test_filter_mode_swallows_navigation_keys() {
    let mut h = at_episode_list().await;
    h.key(Key::Char('/'));
    h.type_text("qb");
    assert!(!h.app.should_quit());
    assert_eq!(h.app.view(), View::EpisodeList);
    assert_eq!(h.app.filter_input(), "qb");

    h.key(Key::Tab);
    assert_eq!(h.app.section(), Section::Main);
}

// ==================== Quit and Section Tests ====================

#[tokio::test]
async fn test_quit_rules() {
    let mut h = at_episode_list().await;

    h.key(Key::Tab);
    assert_eq!(h.app.section(), Section::Downloads);
    h.key(Key::Char('q'));
    assert_eq!(h.app.section(), Section::Main);
    assert!(!h.app.should_quit());

    h.key(Key::Char('q'));
    assert!(h.app.should_quit());
}

#[tokio::test]
async fn test_q_is_text_in_search_entry() {
    let mut h = Harness::new(series_catalog(), FakeStreams::default());
    h.type_text("quiz");
    assert!(!h.app.should_quit());
    assert_eq!(h.app.search_input(), "quiz");

    h.key(Key::CtrlC);
    assert!(h.app.should_quit());
}

#[tokio::test]
async fn test_tab_ignored_while_loading() {
    let mut h = Harness::new(series_catalog(), FakeStreams::default());
    h.type_text("x");
    h.key(Key::Enter);
    h.key(Key::Tab);
    assert_eq!(h.app.section(), Section::Main);
}

#[tokio::test]
async fn test_downloads_section_preserves_view() {
    let mut h = at_episode_list().await;
    h.key(Key::Tab);
    h.key(Key::Tab);
    assert_eq!(h.app.section(), Section::Main);
    assert_eq!(h.app.view(), View::EpisodeList);
}

// ==================== Stream Actions ====================

#[tokio::test]
async fn test_download_and_cancel_from_overview() {
    let mut h = at_episode_list().await;
    h.key(Key::Enter);
    h.settle().await;
    assert_eq!(h.app.view(), View::StreamList);

    h.key(Key::Char('d'));
    assert_eq!(
        h.app.status(),
        Some("Download started - press Tab to view progress")
    );
    {
        let started = h.transfer.started.lock().unwrap();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].0, "https://cdn/1a");
        assert_eq!(started[0].1, PathBuf::from("downloads").join("720p WEB.mp4"));
    }

    h.key(Key::Tab);
    h.key(Key::Char('x'));
    let download = &h.app.downloads().downloads()[0];
    assert_eq!(download.status(), DownloadStatus::Cancelled);
    assert_eq!(h.app.downloads().active_count(), 0);
}

#[tokio::test]
async fn test_play_reports_status_or_error() {
    let mut h = at_episode_list().await;
    h.key(Key::Enter);
    h.settle().await;
    h.key(Key::Char('p'));
    assert_eq!(h.app.status(), Some("Playing in fakeplayer..."));
    assert_eq!(h.player.played.lock().unwrap().as_slice(), ["https://cdn/1a"]);

    let failing = FakePlayer {
        fail: true,
        ..FakePlayer::default()
    };
    let mut h = Harness::with_player(series_catalog(), series_streams(), failing);
    h.search("breaking").await;
    h.key(Key::Enter);
    h.settle().await;
    h.key(Key::Enter);
    h.settle().await;
    h.key(Key::Enter);
    h.settle().await;
    h.key(Key::Enter);
    assert_eq!(h.app.error(), Some("Failed to launch fakeplayer: not found"));
}

// ==================== Batch Tests ====================

#[tokio::test]
async fn test_batch_requires_release_name() {
    let mut h = at_episode_list().await;
    h.key(Key::Char('b'));
    assert_eq!(h.app.view(), View::BatchFilterEntry);
    h.key(Key::Enter);
    assert_eq!(h.app.error(), Some("Please enter a release name"));
    h.key(Key::Esc);
    assert_eq!(h.app.view(), View::EpisodeList);
}

#[tokio::test]
async fn test_batch_flow_collects_matches_and_failures() {
    let mut h = at_episode_list().await;
    h.key(Key::Char('b'));
    h.type_text("1080p");
    h.key(Key::Enter);
    assert!(h.app.is_loading());

    // a batch cannot be abandoned
    h.key(Key::Esc);
    assert!(h.app.is_loading());

    h.settle().await;
    assert_eq!(h.app.view(), View::BatchSelection);
    assert_eq!(h.app.batch().streams().len(), 1);
    assert_eq!(h.app.batch().failures().len(), 2);
    assert_eq!(h.app.batch_progress(), (3, 3));

    h.key(Key::Enter);
    assert_eq!(h.app.view(), View::EpisodeList);
    assert_eq!(h.app.status(), Some("Started 1 downloads - press Tab to view"));
    let download = &h.app.downloads().downloads()[0];
    assert_eq!(download.name(), "S1E01: 1080p BluRay");
    assert_eq!(
        download.path(),
        Path::new("downloads").join("S1E01_1080p BluRay.mp4")
    );
}

#[tokio::test]
async fn test_batch_selection_none_starts_nothing() {
    let mut h = at_episode_list().await;
    h.key(Key::Char('b'));
    h.type_text("WEB");
    h.key(Key::Enter);
    h.settle().await;
    assert_eq!(h.app.batch().streams().len(), 2);

    h.key(Key::Char('n'));
    h.key(Key::Char(' '));
    h.key(Key::Char(' '));
    h.key(Key::Enter);
    assert_eq!(h.app.status(), Some("No streams selected"));
    assert!(h.app.downloads().downloads().is_empty());
}

#[tokio::test]
async fn test_batch_runs_over_filtered_episodes() {
    let mut h = at_episode_list().await;
    h.key(Key::Char('/'));
    h.type_text("pilot");
    h.key(Key::Enter);

    h.key(Key::Char('b'));
    h.type_text("bluray");
    h.key(Key::Enter);
    h.settle().await;
    assert_eq!(h.app.batch_progress(), (1, 1));
    assert_eq!(h.app.batch().streams().len(), 1);
    assert!(h.app.batch().failures().is_empty());
}
