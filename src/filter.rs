//! Live list filtering.
//!
//! Filtering is a pure recomputation over a fixed collection: an item is
//! visible when its search text contains the lowercase query. Original order
//! is preserved and an empty query shows everything, so calling this on every
//! keystroke is safe.

/// Returns the indices of `haystacks` that contain `query`, case-insensitively.
///
/// `haystacks` are expected to be lowercase already (see
/// [`ListView`](crate::listing::ListView), which precomputes them).
///
/// ```
/// use streamdl_core::filter::filter_indices;
///
/// let items = ["pilot", "cat's in the bag", "...and the bag's in the river"];
/// assert_eq!(filter_indices(&items, "BAG"), vec![1, 2]);
/// assert_eq!(filter_indices(&items, ""), vec![0, 1, 2]);
/// ```
#[must_use]
pub fn filter_indices<S: AsRef<str>>(haystacks: &[S], query: &str) -> Vec<usize> {
    let needle = query.to_lowercase();
    haystacks
        .iter()
        .enumerate()
        .filter(|(_, haystack)| needle.is_empty() || haystack.as_ref().contains(&needle))
        .map(|(index, _)| index)
        .collect()
}
