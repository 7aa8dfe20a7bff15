//! JSON-over-HTTP catalog and stream providers.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{CatalogError, CatalogProvider, Episode, Season, StreamCandidate, StreamProvider, Title};
use crate::http::{HttpTimeouts, build_http_client};
use crate::retry::{FailureType, RetryDecision, RetryPolicy};

#[derive(Deserialize)]
struct TitlesResponse {
    #[serde(default)]
    titles: Vec<Title>,
}

#[derive(Deserialize)]
struct SeasonsResponse {
    #[serde(default)]
    seasons: Vec<Season>,
}

#[derive(Deserialize)]
struct EpisodesResponse {
    #[serde(default)]
    episodes: Vec<Episode>,
}

#[derive(Deserialize)]
struct StreamsResponse {
    #[serde(default)]
    streams: Vec<StreamCandidate>,
}

fn validated_base(raw: &str) -> Result<String, CatalogError> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed).map_err(|_| CatalogError::invalid_url(trimmed))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CatalogError::invalid_url(trimmed));
    }
    Ok(trimmed.to_string())
}

async fn get_json<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T, CatalogError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| CatalogError::network(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(CatalogError::http_status(url, status.as_u16()));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| CatalogError::decode(url, e))
}

/// Catalog provider backed by the imdbapi-style REST API.
///
/// Catalog lookups are not retried; failures surface immediately.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: Client,
    base_url: String,
}

impl HttpCatalog {
    /// Creates a catalog client rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidUrl`] for a non-HTTP base URL and
    /// [`CatalogError::Client`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeouts: HttpTimeouts) -> Result<Self, CatalogError> {
        let base_url = validated_base(base_url)?.trim_end_matches('/').to_string();
        let client = build_http_client(timeouts).map_err(|source| CatalogError::Client { source })?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl CatalogProvider for HttpCatalog {
    #[instrument(skip(self), fields(base = %self.base_url))]
    async fn search_titles(&self, query: &str, limit: usize) -> Result<Vec<Title>, CatalogError> {
        let url = format!(
            "{}/search/titles?query={}&limit={limit}",
            self.base_url,
            urlencoding::encode(query)
        );
        let response: TitlesResponse = get_json(&self.client, &url).await?;
        debug!(count = response.titles.len(), "title search complete");
        Ok(response.titles)
    }

    #[instrument(skip(self), fields(base = %self.base_url))]
    async fn list_seasons(&self, title_id: &str) -> Result<Vec<Season>, CatalogError> {
        let url = format!(
            "{}/titles/{}/seasons",
            self.base_url,
            urlencoding::encode(title_id)
        );
        let response: SeasonsResponse = get_json(&self.client, &url).await?;
        Ok(response.seasons)
    }

    #[instrument(skip(self), fields(base = %self.base_url))]
    async fn list_episodes(
        &self,
        title_id: &str,
        season: &str,
    ) -> Result<Vec<Episode>, CatalogError> {
        let url = format!(
            "{}/titles/{}/episodes?season={}",
            self.base_url,
            urlencoding::encode(title_id),
            urlencoding::encode(season)
        );
        let response: EpisodesResponse = get_json(&self.client, &url).await?;
        Ok(response.episodes)
    }
}

/// Stream provider backed by a Stremio-style addon (`{addon}{item_id}.json`).
///
/// Rate-limit responses (HTTP 429) are retried with exponential backoff;
/// every other failure is returned immediately.
#[derive(Debug, Clone)]
pub struct HttpStreamProvider {
    client: Client,
    addon_url: Option<String>,
    retry_policy: RetryPolicy,
}

impl HttpStreamProvider {
    /// Creates a stream provider. With `addon_url = None` every lookup fails
    /// with [`CatalogError::NotConfigured`].
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidUrl`] for a non-HTTP addon URL and
    /// [`CatalogError::Client`] if the HTTP client cannot be built.
    pub fn new(addon_url: Option<&str>, timeouts: HttpTimeouts) -> Result<Self, CatalogError> {
        let addon_url = addon_url
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(validated_base)
            .transpose()?;
        let client = build_http_client(timeouts).map_err(|source| CatalogError::Client { source })?;
        Ok(Self {
            client,
            addon_url,
            retry_policy: RetryPolicy::rate_limit_only(),
        })
    }

    /// Replaces the retry policy (tests use millisecond delays).
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }
}

#[async_trait]
impl StreamProvider for HttpStreamProvider {
    #[instrument(skip(self))]
    async fn list_streams(&self, item_id: &str) -> Result<Vec<StreamCandidate>, CatalogError> {
        let Some(addon_url) = self.addon_url.as_deref() else {
            return Err(CatalogError::addon_not_configured());
        };
        let url = format!("{addon_url}{item_id}.json");

        let mut attempt = 1;
        loop {
            let error = match get_json::<StreamsResponse>(&self.client, &url).await {
                Ok(response) => {
                    debug!(count = response.streams.len(), attempt, "stream lookup complete");
                    return Ok(response.streams);
                }
                Err(error) => error,
            };

            let failure_type = error.failure_type();
            match self.retry_policy.should_retry(failure_type, attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next,
                } => {
                    warn!(
                        url = %url,
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "stream lookup rate limited; backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = next;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(url = %url, attempt, reason = %reason, "stream lookup failed");
                    if failure_type == FailureType::RateLimited {
                        return Err(CatalogError::rate_limited(url, attempt));
                    }
                    return Err(error);
                }
            }
        }
    }
}
