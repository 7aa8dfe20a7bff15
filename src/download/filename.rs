//! Download filename derivation and human-readable sizes.

use crate::catalog::{Episode, StreamCandidate};

/// Extension appended to synthesized filenames.
pub const MEDIA_EXTENSION: &str = ".mp4";

/// Maximum length (in characters) of a synthesized filename stem.
pub const MAX_STEM_CHARS: usize = 100;

/// Stem used when a name sanitizes to nothing.
const FALLBACK_STEM: &str = "download";

/// Byte budget for a provider filename, well under the usual 255-byte
/// component limit.
const MAX_PROVIDER_FILENAME_BYTES: usize = 200;

/// Longest suffix after the last `.` that still counts as an extension.
const MAX_EXTENSION_CHARS: usize = 10;

fn replace_invalid_chars(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Sanitizes a display name into a media filename.
///
/// Replaces `/ \ : * ? " < > |` (and control characters) with `_`, trims
/// whitespace, truncates to 100 characters, substitutes `download` when
/// nothing is left, then appends `.mp4`.
///
/// ```
/// use streamdl_core::download::sanitize_filename;
///
/// assert_eq!(sanitize_filename("a/b:c*d"), "a_b_c_d.mp4");
/// assert_eq!(sanitize_filename("   "), "download.mp4");
/// ```
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let replaced = replace_invalid_chars(name);
    let trimmed = replaced.trim();
    let mut stem: String = trimmed.chars().take(MAX_STEM_CHARS).collect();
    if stem.is_empty() {
        stem = FALLBACK_STEM.to_string();
    }
    stem.push_str(MEDIA_EXTENSION);
    stem
}

/// Makes a provider-given filename safe as a single path component.
///
/// Keeps the provider's extension and shortens the stem so the whole name
/// fits in 200 bytes. Returns `None` when nothing usable remains.
#[must_use]
pub fn sanitize_provider_filename(filename: &str) -> Option<String> {
    let replaced = replace_invalid_chars(filename);
    let trimmed = replaced.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().all(|c| c == '.') {
        return Some(trimmed.replace('.', "_"));
    }
    Some(cap_provider_filename(trimmed))
}

fn cap_provider_filename(name: &str) -> String {
    if name.len() <= MAX_PROVIDER_FILENAME_BYTES {
        return name.to_string();
    }
    let (stem, extension) = match name.rfind('.') {
        Some(dot)
            if dot > 0
                && (1..=MAX_EXTENSION_CHARS).contains(&name[dot + 1..].chars().count()) =>
        {
            name.split_at(dot)
        }
        _ => (name, ""),
    };
    let budget = MAX_PROVIDER_FILENAME_BYTES.saturating_sub(extension.len());
    let end = stem
        .char_indices()
        .map(|(index, c)| index + c.len_utf8())
        .take_while(|&end| end <= budget)
        .last()
        .unwrap_or(0);
    format!("{}{extension}", stem[..end].trim_end())
}

/// Filename for a single stream download.
#[must_use]
pub fn stream_filename(stream: &StreamCandidate) -> String {
    stream
        .provider_filename()
        .and_then(sanitize_provider_filename)
        .unwrap_or_else(|| sanitize_filename(&stream.name))
}

/// Filename for a stream committed from a batch selection.
///
/// Without a provider filename: `S{season}E{episode:02}_{stream name}`, sanitized.
#[must_use]
pub fn batch_filename(episode: &Episode, stream: &StreamCandidate) -> String {
    stream
        .provider_filename()
        .and_then(sanitize_provider_filename)
        .unwrap_or_else(|| {
            sanitize_filename(&format!(
                "S{}E{:02}_{}",
                episode.season, episode.episode_number, stream.name
            ))
        })
}

/// Display name for a download started from a batch selection.
#[must_use]
pub fn batch_display_name(episode: &Episode, stream: &StreamCandidate) -> String {
    format!(
        "S{}E{:02}: {}",
        episode.season, episode.episode_number, stream.name
    )
}

/// Formats a byte count for display.
///
/// ```
/// use streamdl_core::download::format_size;
///
/// assert_eq!(format_size(500), "500 B");
/// assert_eq!(format_size(2048), "2 KB");
/// assert_eq!(format_size(1_572_864), "1.5 MB");
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.0} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::BehaviorHints;

    fn episode(season: &str, number: u32) -> Episode {
        Episode {
            season: season.to_string(),
            episode_number: number,
            ..Episode::default()
        }
    }

    fn stream(name: &str, filename: &str) -> StreamCandidate {
        StreamCandidate {
            name: name.to_string(),
            behavior_hints: BehaviorHints {
                filename: filename.to_string(),
                ..BehaviorHints::default()
            },
            ..StreamCandidate::default()
        }
    }

    // ==================== sanitize_filename Tests ====================

    #[test]
    fn test_sanitize_filename_replaces_invalid_chars() {
        assert_eq!(sanitize_filename("a/b:c*d"), "a_b_c_d.mp4");
        assert_eq!(sanitize_filename(r#"x\y?"z<w>|v"#), "x_y__z_w__v.mp4");
    }

    #[test]
    fn test_sanitize_filename_empty_uses_fallback() {
        assert_eq!(sanitize_filename(""), "download.mp4");
        assert_eq!(sanitize_filename("  \t "), "download.mp4");
    }

    #[test]
    fn test_sanitize_filename_truncates_long_names() {
        let name = "x".repeat(150);
        let sanitized = sanitize_filename(&name);
        assert_eq!(sanitized, format!("{}.mp4", "x".repeat(100)));
    }

    #[test]
    fn test_sanitize_filename_truncates_by_chars_not_bytes() {
        let name = "日".repeat(120);
        let sanitized = sanitize_filename(&name);
        assert_eq!(sanitized.chars().count(), 100 + MEDIA_EXTENSION.len());
    }

    #[test]
    fn test_sanitize_filename_trims_whitespace() {
        assert_eq!(sanitize_filename("  Movie 1080p  "), "Movie 1080p.mp4");
    }

    // ==================== Provider filename Tests ====================

    #[test]
    fn test_provider_filename_keeps_extension() {
        assert_eq!(
            sanitize_provider_filename("Show.S01E01.1080p.mkv"),
            Some("Show.S01E01.1080p.mkv".to_string())
        );
    }

    #[test]
    fn test_provider_filename_strips_path_separators() {
        assert_eq!(
            sanitize_provider_filename("../../etc/passwd"),
            Some(".._.._etc_passwd".to_string())
        );
        assert_eq!(sanitize_provider_filename(".."), Some("__".to_string()));
        assert_eq!(sanitize_provider_filename("   "), None);
    }

    #[test]
    fn test_provider_filename_long_name_is_capped_keeping_extension() {
        let long = format!("{}.mkv", "Show.S01E01.".repeat(40));
        let capped = sanitize_provider_filename(&long).unwrap();
        assert!(capped.len() <= MAX_PROVIDER_FILENAME_BYTES, "{} bytes", capped.len());
        assert!(capped.starts_with("Show.S01E01."));
        assert!(capped.ends_with(".mkv"));

        let wide = format!("{}.mp4", "日".repeat(120));
        let capped = sanitize_provider_filename(&wide).unwrap();
        assert!(capped.len() <= MAX_PROVIDER_FILENAME_BYTES);
        assert!(capped.ends_with(".mp4"));
        assert!(capped.starts_with('日'));
    }

    #[test]
    fn test_provider_filename_long_name_without_extension() {
        let capped = sanitize_provider_filename(&"x".repeat(300)).unwrap();
        assert_eq!(capped, "x".repeat(MAX_PROVIDER_FILENAME_BYTES));
    }

    #[test]
    fn test_stream_filename_prefers_provider_name() {
        assert_eq!(stream_filename(&stream("1080p", "movie.mkv")), "movie.mkv");
        assert_eq!(stream_filename(&stream("Torrentio 1080p", "")), "Torrentio 1080p.mp4");
    }

    #[test]
    fn test_batch_filename_synthesized_from_episode() {
        let ep = episode("2", 5);
        assert_eq!(batch_filename(&ep, &stream("WEB:DL", "")), "S2E05_WEB_DL.mp4");
        assert_eq!(batch_filename(&ep, &stream("WEB", "show.mkv")), "show.mkv");
    }

    #[test]
    fn test_batch_display_name() {
        assert_eq!(
            batch_display_name(&episode("1", 12), &stream("1080p", "")),
            "S1E12: 1080p"
        );
    }

    // ==================== format_size Tests ====================

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(2048), "2 KB");
        assert_eq!(format_size(1_572_864), "1.5 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024 / 2), "1.50 GB");
    }
}
