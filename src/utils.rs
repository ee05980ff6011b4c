//! Utility functions for size formatting and string normalization

use std::sync::OnceLock;

use regex::Regex;

/// Format a byte count into a human-readable string.
///
/// Uses 1024-based units with one decimal place. Zero means the size was not
/// reported and renders as "Unknown".
///
/// # Examples
///
/// ```
/// use media_dl::utils::format_size;
///
/// assert_eq!(format_size(0), "Unknown");
/// assert_eq!(format_size(512), "512.0 B");
/// assert_eq!(format_size(1536), "1.5 KB");
/// ```
#[must_use]
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "Unknown".to_string();
    }

    let mut value = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if value < 1024.0 {
            return format!("{value:.1} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.1} TB")
}

/// Strip ANSI color/style escape sequences from an engine-supplied string.
///
/// Engines decorate their speed and ETA strings for terminal output; the
/// escapes must not leak into progress events.
#[must_use]
#[allow(clippy::expect_used)] // pattern is a fixed literal
pub fn strip_ansi(input: &str) -> String {
    static ANSI: OnceLock<Regex> = OnceLock::new();
    let re =
        ANSI.get_or_init(|| Regex::new("\x1b\\[[0-9;]*m").expect("ANSI escape pattern is valid"));
    re.replace_all(input, "").into_owned()
}

/// Normalize a URL for equality matching.
///
/// Trims whitespace and a trailing slash; when the string parses as a URL the
/// parsed form is used so default ports and percent-encoding compare equal.
#[must_use]
pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim();
    let normalized = match url::Url::parse(trimmed) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => trimmed.to_string(),
    };
    normalized.trim_end_matches('/').to_string()
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_size_zero_is_unknown() {
        assert_eq!(format_size(0), "Unknown");
    }

    #[test]
    fn format_size_bytes_and_kilobytes() {
        assert_eq!(format_size(1), "1.0 B");
        assert_eq!(format_size(1023), "1023.0 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1536), "1.5 KB");
    }

    #[test]
    fn format_size_megabytes_and_above() {
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
        assert_eq!(format_size(2 * 1024 * 1024 * 1024 * 1024), "2.0 TB");
    }

    #[test]
    fn format_size_terabytes_do_not_roll_over() {
        // 5000 GB should render in TB, not a fifth unit
        let five_thousand_gb = 5000 * 1024 * 1024 * 1024_u64;
        assert_eq!(format_size(five_thousand_gb), "4.9 TB");
    }

    #[test]
    fn strip_ansi_removes_color_codes() {
        assert_eq!(strip_ansi("\x1b[32m1.2MiB/s\x1b[0m"), "1.2MiB/s");
        assert_eq!(strip_ansi("\x1b[0;33m00:42\x1b[0m"), "00:42");
    }

    #[test]
    fn strip_ansi_leaves_plain_strings_untouched() {
        assert_eq!(strip_ansi("3.4MiB/s"), "3.4MiB/s");
        assert_eq!(strip_ansi(""), "");
    }

    #[test]
    fn normalize_url_trims_whitespace_and_trailing_slash() {
        assert_eq!(
            normalize_url("  https://example.com/watch/  "),
            "https://example.com/watch"
        );
    }

    #[test]
    fn normalize_url_equates_parsed_variants() {
        // Default port and no-port forms compare equal after parsing
        assert_eq!(
            normalize_url("https://example.com:443/v"),
            normalize_url("https://example.com/v")
        );
    }

    #[test]
    fn normalize_url_falls_back_for_unparseable_input() {
        assert_eq!(normalize_url("not a url/"), "not a url");
    }
}
