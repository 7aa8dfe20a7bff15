//! Views, sections and the loading overlay.

use std::fmt;

use crate::batch::BatchId;

/// Main-section screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum View {
    #[default]
    SearchEntry,
    TitleResults,
    SeasonList,
    EpisodeList,
    StreamList,
    BatchFilterEntry,
    BatchSelection,
}

impl View {
    /// Heading shown above the view.
    #[must_use]
    pub fn heading(self) -> &'static str {
        match self {
            Self::SearchEntry => "Search",
            Self::TitleResults => "Search Results",
            Self::SeasonList => "Select Season",
            Self::EpisodeList => "Select Episode",
            Self::StreamList => "Available Streams",
            Self::BatchFilterEntry => "Batch Download",
            Self::BatchSelection => "Select Streams",
        }
    }

    /// Views whose keys are typed as text.
    #[must_use]
    pub fn is_text_entry(self) -> bool {
        matches!(self, Self::SearchEntry | Self::BatchFilterEntry)
    }

    /// Views that support filter mode.
    #[must_use]
    pub fn is_filterable(self) -> bool {
        matches!(self, Self::EpisodeList | Self::StreamList)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.heading())
    }
}

/// Top-level section. The downloads overview sits beside the main views and
/// leaves the current view untouched while shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Section {
    #[default]
    Main,
    Downloads,
}

impl Section {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Main => Self::Downloads,
            Self::Downloads => Self::Main,
        }
    }
}

/// What the loading overlay is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pending {
    /// A single catalog or stream lookup, identified by its sequence number.
    Lookup(u64),
    /// A batch run. Only its aggregate outcome clears the overlay.
    Batch(BatchId),
}

/// The loading overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loading {
    pub message: String,
    pub pending: Pending,
}

impl Loading {
    pub(crate) fn lookup(lookup: u64, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            pending: Pending::Lookup(lookup),
        }
    }

    pub(crate) fn batch(batch: BatchId, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            pending: Pending::Batch(batch),
        }
    }

    /// Whether a result for `lookup` is the one being waited for.
    #[must_use]
    pub fn awaits_lookup(&self, lookup: u64) -> bool {
        self.pending == Pending::Lookup(lookup)
    }

    /// Whether the overlay belongs to batch `batch`.
    #[must_use]
    pub fn awaits_batch(&self, batch: BatchId) -> bool {
        self.pending == Pending::Batch(batch)
    }
}
