//! List item presentation and list-bearing view state.
//!
//! [`Entry`] is the tagged union over every catalog value shown in a list.
//! [`ListView`] holds a fixed collection, its precomputed search text, the
//! currently visible subset and a cursor into that subset.

use crate::catalog::{Episode, Season, StreamCandidate, Title};
use crate::download::format_size;
use crate::filter::filter_indices;

/// Maximum characters of an episode plot shown in the description line.
const PLOT_PREVIEW_CHARS: usize = 80;

/// Borrowed view of any list item.
#[derive(Debug, Clone, Copy)]
pub enum Entry<'a> {
    Title(&'a Title),
    Season(&'a Season),
    Episode(&'a Episode),
    Stream(&'a StreamCandidate),
}

impl Entry<'_> {
    /// Primary line.
    #[must_use]
    pub fn title(&self) -> String {
        match self {
            Self::Title(title) => title.primary_title.clone(),
            Self::Season(season) => format!("Season {}", season.season),
            Self::Episode(episode) => format!("E{}: {}", episode.episode_number, episode.title),
            Self::Stream(stream) => {
                let size = stream.behavior_hints.video_size;
                if size > 0 {
                    format!("{} [{}]", stream.name, format_size(size))
                } else {
                    stream.name.clone()
                }
            }
        }
    }

    /// Secondary line.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::Title(title) => {
                let label = title.kind_label();
                if title.original_title.is_empty() || title.original_title == title.primary_title {
                    label.to_string()
                } else {
                    format!("{label} • {}", title.original_title)
                }
            }
            Self::Season(season) => format!("{} episodes", season.episode_count),
            Self::Episode(episode) => {
                let plot = truncate_chars(&episode.plot, PLOT_PREVIEW_CHARS);
                let rating = episode.rating.aggregate_rating;
                if rating > 0.0 {
                    format!("★ {rating:.1} • {plot}")
                } else {
                    plot
                }
            }
            Self::Stream(stream) => stream.description.clone(),
        }
    }

    /// Concatenation of the fields the filter engine matches against.
    #[must_use]
    pub fn search_text(&self) -> String {
        match self {
            Self::Title(title) => format!(
                "{} {} {}",
                title.primary_title, title.original_title, title.kind
            ),
            Self::Season(season) => format!("Season {}", season.season),
            Self::Episode(episode) => format!(
                "E{} {} {}",
                episode.episode_number, episode.title, episode.plot
            ),
            Self::Stream(stream) => format!(
                "{} {} {}",
                stream.name, stream.description, stream.behavior_hints.filename
            ),
        }
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max).collect();
    truncated.push_str("...");
    truncated
}

/// Values that can be shown as a list [`Entry`].
pub trait AsEntry {
    fn entry(&self) -> Entry<'_>;
}

impl AsEntry for Title {
    fn entry(&self) -> Entry<'_> {
        Entry::Title(self)
    }
}

impl AsEntry for Season {
    fn entry(&self) -> Entry<'_> {
        Entry::Season(self)
    }
}

impl AsEntry for Episode {
    fn entry(&self) -> Entry<'_> {
        Entry::Episode(self)
    }
}

impl AsEntry for StreamCandidate {
    fn entry(&self) -> Entry<'_> {
        Entry::Stream(self)
    }
}

/// A fixed collection with a filtered visible subset and a cursor.
#[derive(Debug, Clone)]
pub struct ListView<T> {
    items: Vec<T>,
    haystacks: Vec<String>,
    visible: Vec<usize>,
    query: String,
    cursor: usize,
}

impl<T> Default for ListView<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            haystacks: Vec::new(),
            visible: Vec::new(),
            query: String::new(),
            cursor: 0,
        }
    }
}

impl<T: AsEntry> ListView<T> {
    /// Replaces the collection, clearing any filter and resetting the cursor.
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        let haystacks = items
            .iter()
            .map(|item| item.entry().search_text().to_lowercase())
            .collect();
        let visible = (0..items.len()).collect();
        Self {
            items,
            haystacks,
            visible,
            query: String::new(),
            cursor: 0,
        }
    }
}

impl<T> ListView<T> {
    /// Full, unfiltered collection.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Visible items in original order.
    pub fn visible(&self) -> impl Iterator<Item = &T> {
        self.visible.iter().filter_map(|&index| self.items.get(index))
    }

    /// Clones of the visible items.
    #[must_use]
    pub fn visible_cloned(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.visible().cloned().collect()
    }

    #[must_use]
    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Current filter query.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Whether a non-empty filter is applied.
    #[must_use]
    pub fn is_filtered(&self) -> bool {
        !self.query.is_empty()
    }

    /// Position of the cursor within the visible subset.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Item under the cursor.
    #[must_use]
    pub fn selected(&self) -> Option<&T> {
        self.visible
            .get(self.cursor)
            .and_then(|&index| self.items.get(index))
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.cursor + 1 < self.visible.len() {
            self.cursor += 1;
        }
    }

    /// Applies `query` and recomputes the visible subset.
    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.visible = filter_indices(&self.haystacks, query);
        self.cursor = 0;
    }

    /// Restores the full collection.
    pub fn clear_filter(&mut self) {
        self.set_query("");
    }
}
