//! Static subtitle language table
//!
//! Subtitle listings from the engine carry region-qualified codes like
//! `en-US` or `pt_BR`; matching happens on the base code. Languages outside
//! this table are dropped from the normalized metadata.

/// Base language codes paired with their English display names.
const LANGUAGE_NAMES: &[(&str, &str)] = &[
    ("ar", "Arabic"),
    ("bn", "Bengali"),
    ("cs", "Czech"),
    ("da", "Danish"),
    ("de", "German"),
    ("el", "Greek"),
    ("en", "English"),
    ("es", "Spanish"),
    ("fa", "Persian"),
    ("fi", "Finnish"),
    ("fr", "French"),
    ("he", "Hebrew"),
    ("hi", "Hindi"),
    ("hu", "Hungarian"),
    ("id", "Indonesian"),
    ("it", "Italian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("nl", "Dutch"),
    ("no", "Norwegian"),
    ("pl", "Polish"),
    ("pt", "Portuguese"),
    ("ro", "Romanian"),
    ("ru", "Russian"),
    ("sv", "Swedish"),
    ("th", "Thai"),
    ("tr", "Turkish"),
    ("uk", "Ukrainian"),
    ("vi", "Vietnamese"),
    ("zh", "Chinese"),
];

/// Reduce a language code to its base form: lowercase, stripped of region
/// qualifiers (`en-US` and `en_US` both become `en`).
fn base_code(language_code: &str) -> String {
    let lowered = language_code.to_lowercase();
    lowered
        .split(['-', '_'])
        .next()
        .unwrap_or(&lowered)
        .to_string()
}

/// Whether a language code (possibly region-qualified) is in the table.
#[must_use]
pub fn is_supported(language_code: &str) -> bool {
    let base = base_code(language_code);
    LANGUAGE_NAMES.iter().any(|(code, _)| *code == base)
}

/// Human-readable display name for a language code.
///
/// Known codes render as "Name (code)", preserving the original
/// qualification; unknown codes are uppercased.
#[must_use]
pub fn display_name(language_code: &str) -> String {
    let base = base_code(language_code);
    match LANGUAGE_NAMES.iter().find(|(code, _)| *code == base) {
        Some((_, name)) => format!("{name} ({language_code})"),
        None => language_code.to_uppercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_base_codes_are_supported() {
        assert!(is_supported("en"));
        assert!(is_supported("ja"));
        assert!(is_supported("pt"));
    }

    #[test]
    fn region_qualified_codes_match_their_base() {
        assert!(is_supported("en-US"));
        assert!(is_supported("pt_BR"));
        assert!(is_supported("ZH-Hans"));
    }

    #[test]
    fn unknown_codes_are_rejected() {
        assert!(!is_supported("tlh"));
        assert!(!is_supported(""));
        assert!(!is_supported("xx-YY"));
    }

    #[test]
    fn display_name_for_known_code_keeps_qualifier() {
        assert_eq!(display_name("en"), "English (en)");
        assert_eq!(display_name("en-GB"), "English (en-GB)");
        assert_eq!(display_name("pt_BR"), "Portuguese (pt_BR)");
    }

    #[test]
    fn display_name_for_unknown_code_uppercases() {
        assert_eq!(display_name("tlh"), "TLH");
    }
}
