//! Error types for catalog and stream lookups.

use thiserror::Error;

use crate::retry::{FailureType, classify_http_status};

/// Errors that can occur while querying the catalog or stream provider.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("request failed for {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before a response arrived.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Non-success HTTP response.
    #[error("HTTP {status}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The provider kept answering 429 until the retry budget ran out.
    #[error("rate limited (429) after {attempts} attempts")]
    RateLimited {
        /// The URL that was rate limited.
        url: String,
        /// Number of attempts made.
        attempts: u32,
    },

    /// The response body was not the expected JSON shape.
    #[error("decode error: {source}")]
    Decode {
        /// The URL whose body failed to decode.
        url: String,
        /// The underlying decode error.
        #[source]
        source: reqwest::Error,
    },

    /// A provider endpoint is missing from configuration.
    #[error("{what} is not configured\n  Suggestion: set `{key}` in the config file or pass --{flag}")]
    NotConfigured {
        /// Human-readable name of the missing setting.
        what: &'static str,
        /// Config file key.
        key: &'static str,
        /// CLI flag name.
        flag: &'static str,
    },

    /// A configured endpoint is not a valid URL.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The HTTP client could not be constructed.
    #[error("HTTP client construction failed: {source}")]
    Client {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl CatalogError {
    /// Creates a network error, mapping reqwest timeouts to [`CatalogError::Timeout`].
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            return Self::Timeout { url: url.into() };
        }
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a rate-limit exhaustion error.
    pub fn rate_limited(url: impl Into<String>, attempts: u32) -> Self {
        Self::RateLimited {
            url: url.into(),
            attempts,
        }
    }

    /// Creates a decode error.
    pub fn decode(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Decode {
            url: url.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Error for a stream lookup without a configured addon endpoint.
    #[must_use]
    pub fn addon_not_configured() -> Self {
        Self::NotConfigured {
            what: "stream addon URL",
            key: "addon_url",
            flag: "addon-url",
        }
    }

    /// Classifies this error for retry decisions.
    #[must_use]
    pub fn failure_type(&self) -> FailureType {
        match self {
            Self::HttpStatus { status, .. } => classify_http_status(*status),
            Self::Network { .. } | Self::Timeout { .. } => FailureType::Transient,
            Self::RateLimited { .. } => FailureType::RateLimited,
            Self::Decode { .. }
            | Self::NotConfigured { .. }
            | Self::InvalidUrl { .. }
            | Self::Client { .. } => FailureType::Permanent,
        }
    }

    /// Returns whether the failure may go away on its own.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        !matches!(self.failure_type(), FailureType::Permanent)
    }
}
