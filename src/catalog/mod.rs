//! Catalog and stream-source lookups.
//!
//! The rest of the crate only talks to providers through the
//! [`CatalogProvider`] and [`StreamProvider`] traits; [`HttpCatalog`] and
//! [`HttpStreamProvider`] are the default JSON-over-HTTP implementations.
//!
//! All entity types are immutable values: nothing in the crate mutates a
//! [`Title`], [`Season`], [`Episode`] or [`StreamCandidate`] after decoding.

mod client;
mod error;

pub use client::{HttpCatalog, HttpStreamProvider};
pub use error::CatalogError;

use async_trait::async_trait;
use serde::Deserialize;

/// Default catalog API base URL.
pub const DEFAULT_CATALOG_URL: &str = "https://api.imdbapi.dev";

/// Default number of titles requested per search.
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// A searchable catalog title (movie, series, special...).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Title {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub primary_title: String,
    pub original_title: String,
}

impl Title {
    /// Series titles are browsed through seasons; everything else has streams directly.
    #[must_use]
    pub fn is_series(&self) -> bool {
        matches!(self.kind.as_str(), "tvSeries" | "tvMiniSeries")
    }

    /// Short human label for the title kind.
    #[must_use]
    pub fn kind_label(&self) -> &str {
        match self.kind.as_str() {
            "tvSeries" | "tvMiniSeries" => "TV",
            "movie" => "Movie",
            "tvMovie" => "TV Movie",
            "short" | "tvShort" => "Short",
            "tvSpecial" => "TV Special",
            other => other,
        }
    }
}

/// One season of a series. The season label is a string on the wire.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Season {
    pub season: String,
    pub episode_count: u32,
}

/// Aggregate rating attached to an episode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Rating {
    pub aggregate_rating: f64,
    pub vote_count: u64,
}

/// One episode of a season.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Episode {
    pub id: String,
    pub title: String,
    pub season: String,
    pub episode_number: u32,
    pub plot: String,
    pub rating: Rating,
}

impl Episode {
    /// Stream item id for this episode: `{title_id}:{season}:{episode_number}`.
    #[must_use]
    pub fn stream_id(&self, title_id: &str) -> String {
        format!("{title_id}:{}:{}", self.season, self.episode_number)
    }
}

/// Provider hints attached to a stream candidate.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BehaviorHints {
    pub binge_group: String,
    pub video_hash: String,
    pub video_size: u64,
    pub filename: String,
}

/// A playable/downloadable source for a title or episode.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamCandidate {
    pub name: String,
    pub description: String,
    pub url: String,
    pub behavior_hints: BehaviorHints,
}

impl StreamCandidate {
    /// Provider-given filename, if any.
    #[must_use]
    pub fn provider_filename(&self) -> Option<&str> {
        let filename = self.behavior_hints.filename.trim();
        (!filename.is_empty()).then_some(filename)
    }
}

/// Title search and series structure lookups.
///
/// An empty list is a valid, non-error response for every method.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Searches titles matching `query`, returning at most `limit` results.
    async fn search_titles(&self, query: &str, limit: usize) -> Result<Vec<Title>, CatalogError>;

    /// Lists the seasons of a title. Movies have none.
    async fn list_seasons(&self, title_id: &str) -> Result<Vec<Season>, CatalogError>;

    /// Lists the episodes of one season.
    async fn list_episodes(
        &self,
        title_id: &str,
        season: &str,
    ) -> Result<Vec<Episode>, CatalogError>;
}

/// Stream source lookups for a title or episode item id.
#[async_trait]
pub trait StreamProvider: Send + Sync {
    /// Lists stream candidates in provider order.
    async fn list_streams(&self, item_id: &str) -> Result<Vec<StreamCandidate>, CatalogError>;
}
