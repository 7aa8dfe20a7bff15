//! Batch fetch flow driven through the real event channel.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use streamdl_core::batch::{BatchOutcome, FailureReason, Launch};
use streamdl_core::catalog::BehaviorHints;
use streamdl_core::event::{self, AppEvent, BatchEvent};
use streamdl_core::{BatchOrchestrator, CatalogError, Episode, StreamCandidate, StreamProvider};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;

/// Provider answering from a fixed table; unknown items fail with 503.
struct TableProvider {
    streams: HashMap<String, Vec<StreamCandidate>>,
}

#[async_trait]
impl StreamProvider for TableProvider {
    async fn list_streams(&self, item_id: &str) -> Result<Vec<StreamCandidate>, CatalogError> {
        self.streams
            .get(item_id)
            .cloned()
            .ok_or_else(|| CatalogError::http_status(item_id, 503))
    }
}

/// Answers like the wrapped table, but only after `delay`.
struct SlowProvider {
    inner: TableProvider,
    delay: Duration,
}

#[async_trait]
impl StreamProvider for SlowProvider {
    async fn list_streams(&self, item_id: &str) -> Result<Vec<StreamCandidate>, CatalogError> {
        tokio::time::sleep(self.delay).await;
        self.inner.list_streams(item_id).await
    }
}

fn candidate(name: &str, filename: &str) -> StreamCandidate {
    StreamCandidate {
        name: name.to_string(),
        url: format!("https://cdn.example/{}.mkv", name.replace(' ', "_")),
        behavior_hints: BehaviorHints {
            filename: filename.to_string(),
            ..BehaviorHints::default()
        },
        ..StreamCandidate::default()
    }
}

fn episodes(n: u32) -> Vec<Episode> {
    (1..=n)
        .map(|number| Episode {
            id: format!("ep{number}"),
            title: format!("Episode {number}"),
            season: "1".to_string(),
            episode_number: number,
            ..Episode::default()
        })
        .collect()
}

/// Five episodes: three carry a 1080p stream, one only 720p, one errors.
fn mixed_provider() -> TableProvider {
    let mut streams = HashMap::new();
    for number in 1..=3 {
        streams.insert(
            format!("tt1:1:{number}"),
            vec![
                candidate("720p WEB", ""),
                candidate("1080p WEB-DL", &format!("Show.S01E0{number}.1080p.mkv")),
            ],
        );
    }
    streams.insert("tt1:1:4".to_string(), vec![candidate("720p WEB", "")]);
    TableProvider { streams }
}

/// Pumps batch events into the orchestrator until an outcome appears.
async fn drive(
    orchestrator: &mut BatchOrchestrator,
    rx: &mut UnboundedReceiver<AppEvent>,
) -> (BatchOutcome, usize) {
    let mut started = 0;
    loop {
        let event = tokio::time::timeout(Duration::from_secs(60), rx.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            AppEvent::Batch(BatchEvent::FetchStarted { .. }) => started += 1,
            AppEvent::Batch(BatchEvent::EpisodeResolved {
                batch,
                index,
                result,
            }) => {
                if let Some(outcome) = orchestrator.on_resolved(batch, index, result) {
                    return (outcome, started);
                }
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_mixed_batch_aggregates_once() {
    let (sink, mut rx) = event::channel();
    let mut orchestrator =
        BatchOrchestrator::new(Arc::new(mixed_provider()), sink, Duration::ZERO);

    let launch = orchestrator.launch("tt1", episodes(5), "1080P");
    assert!(matches!(launch, Launch::Started(_)));

    let (outcome, started) = drive(&mut orchestrator, &mut rx).await;

    assert_eq!(outcome, BatchOutcome::Ready { matched: 3, failed: 2 });
    assert_eq!(started, 5);
    assert_eq!(orchestrator.active_batch(), None);

    let matched: Vec<u32> = orchestrator
        .streams()
        .iter()
        .map(|s| s.episode.episode_number)
        .collect();
    assert_eq!(matched, vec![1, 2, 3]);
    assert!(orchestrator.streams().iter().all(|s| s.selected));
    assert!(orchestrator.streams()[0].stream.name.contains("1080p"));

    let failures = orchestrator.failures();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0].episode.episode_number, 4);
    assert_eq!(failures[0].reason, FailureReason::NoMatch("1080P".to_string()));
    assert_eq!(failures[1].episode.episode_number, 5);
    assert!(matches!(failures[1].reason, FailureReason::ProviderError(_)));

    // No second outcome ever follows.
    let extra = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
    assert!(extra.is_err());
}

#[tokio::test]
async fn test_batch_selection_commits_checked_streams() {
    let (sink, mut rx) = event::channel();
    let mut orchestrator =
        BatchOrchestrator::new(Arc::new(mixed_provider()), sink, Duration::ZERO);
    orchestrator.launch("tt1", episodes(5), "1080p");
    drive(&mut orchestrator, &mut rx).await;

    orchestrator.toggle(1);
    assert_eq!(orchestrator.selected_count(), 2);

    let chosen = orchestrator.take_selected();
    let numbers: Vec<u32> = chosen.iter().map(|s| s.episode.episode_number).collect();
    assert_eq!(numbers, vec![1, 3]);
    assert!(orchestrator.streams().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stagger_spaces_task_starts() {
    let (sink, mut rx) = event::channel();
    let mut orchestrator =
        BatchOrchestrator::new(Arc::new(mixed_provider()), sink, Duration::from_secs(5));

    let launched_at = Instant::now();
    orchestrator.launch("tt1", episodes(3), "1080p");

    let mut starts = Vec::new();
    while starts.len() < 3 {
        match rx.recv().await.unwrap() {
            AppEvent::Batch(BatchEvent::FetchStarted { index, .. }) => {
                starts.push((index, launched_at.elapsed()));
            }
            AppEvent::Batch(BatchEvent::EpisodeResolved {
                batch,
                index,
                result,
            }) => {
                orchestrator.on_resolved(batch, index, result);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    for (index, elapsed) in starts {
        let expected = Duration::from_secs(5) * u32::try_from(index).unwrap();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_secs(1),
            "task {index} started after {elapsed:?}, expected about {expected:?}"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_stagger_is_independent_of_lookup_duration() {
    let (sink, mut rx) = event::channel();
    let provider = SlowProvider {
        inner: mixed_provider(),
        delay: Duration::from_secs(30),
    };
    let mut orchestrator =
        BatchOrchestrator::new(Arc::new(provider), sink, Duration::from_secs(5));

    let launched_at = Instant::now();
    orchestrator.launch("tt1", episodes(3), "1080p");

    let mut starts = Vec::new();
    let outcome = loop {
        match rx.recv().await.unwrap() {
            AppEvent::Batch(BatchEvent::FetchStarted { index, .. }) => {
                starts.push((index, launched_at.elapsed()));
            }
            AppEvent::Batch(BatchEvent::EpisodeResolved {
                batch,
                index,
                result,
            }) => {
                if let Some(outcome) = orchestrator.on_resolved(batch, index, result) {
                    break outcome;
                }
            }
            other => panic!("unexpected event {other:?}"),
        }
    };
    let finished = launched_at.elapsed();

    // Every lookup takes 30s, yet the later tasks still start on the 5s grid.
    assert_eq!(starts.len(), 3);
    for (index, elapsed) in starts {
        let expected = Duration::from_secs(5) * u32::try_from(index).unwrap();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_secs(1),
            "task {index} started after {elapsed:?}, expected about {expected:?}"
        );
    }
    assert_eq!(outcome, BatchOutcome::Ready { matched: 3, failed: 0 });
    assert!(
        finished >= Duration::from_secs(40) && finished < Duration::from_secs(41),
        "batch finished after {finished:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_relaunch_ignores_previous_batch() {
    let (sink, mut rx) = event::channel();
    let mut orchestrator =
        BatchOrchestrator::new(Arc::new(mixed_provider()), sink, Duration::from_secs(5));

    let Launch::Started(first) = orchestrator.launch("tt1", episodes(5), "1080p") else {
        panic!("first launch should start");
    };
    let Launch::Started(second) = orchestrator.launch("tt1", episodes(2), "720p") else {
        panic!("second launch should start");
    };
    assert_ne!(first, second);

    let (outcome, _) = drive(&mut orchestrator, &mut rx).await;
    assert_eq!(outcome, BatchOutcome::Ready { matched: 2, failed: 0 });
    assert!(
        orchestrator
            .streams()
            .iter()
            .all(|s| s.stream.name == "720p WEB")
    );
}

#[tokio::test]
async fn test_empty_launch_spawns_nothing() {
    let (sink, mut rx) = event::channel();
    let mut orchestrator =
        BatchOrchestrator::new(Arc::new(mixed_provider()), sink, Duration::ZERO);

    assert_eq!(orchestrator.launch("tt1", Vec::new(), "1080p"), Launch::Empty);
    assert_eq!(orchestrator.active_batch(), None);
    assert!(rx.try_recv().is_err());
}
