//! Error types for media-dl
//!
//! Every failure a task can hit is funneled into [`Error`] at the task
//! boundary and delivered as exactly one terminal message; nothing crosses
//! into the controller as a panic or a second callback.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Maximum length of an engine error message surfaced to the caller.
///
/// Engine failures can carry multi-line tracebacks; anything past this is cut
/// and replaced with an ellipsis before the message reaches a queue item.
pub const MAX_ERROR_MESSAGE_LEN: usize = 100;

/// Main error type for media-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "target_ext")
        key: Option<String>,
    },

    /// Metadata extraction failed (network, unsupported URL, restricted content)
    #[error("metadata error: {0}")]
    Metadata(String),

    /// Engine transfer failed after its internal retries were exhausted
    #[error("transfer error: {0}")]
    Transfer(String),

    /// Transfer unwound because cancellation was requested
    ///
    /// Distinguished from [`Error::Transfer`] so the controller routes the
    /// item to `Status::Cancelled` instead of `Status::Error`.
    #[error("transfer cancelled")]
    Cancelled,

    /// Output artifact could not be located or placed after a transfer
    #[error("placement error: {0}")]
    Placement(#[from] PlacementError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation not supported (stub engine, missing binary)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error is the cancellation marker.
    ///
    /// The marker is how a terminal task message tells the controller "this
    /// item was cancelled, not broken".
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Render this error as a user-facing message, truncated to
    /// [`MAX_ERROR_MESSAGE_LEN`] characters.
    pub fn display_message(&self) -> String {
        truncate_message(&self.to_string())
    }
}

/// Truncate an error message to [`MAX_ERROR_MESSAGE_LEN`] characters,
/// appending an ellipsis when anything was cut.
pub fn truncate_message(message: &str) -> String {
    if message.chars().count() <= MAX_ERROR_MESSAGE_LEN {
        return message.to_string();
    }
    let truncated: String = message.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
    format!("{truncated}...")
}

/// Errors from locating or moving the produced artifact after a transfer
#[derive(Debug, Error)]
pub enum PlacementError {
    /// Scratch directory disappeared before placement could run
    #[error("scratch directory missing: {path}")]
    ScratchMissing {
        /// The scratch directory that was expected to exist
        path: PathBuf,
    },

    /// No output artifact was found in the scratch directory
    #[error("no output file found in {dir}")]
    ArtifactNotFound {
        /// The directory that was scanned
        dir: PathBuf,
    },

    /// Moving the artifact into the destination failed
    #[error("failed to move {source_path} to {dest_path}: {reason}")]
    MoveFailed {
        /// The source path of the file being moved
        source_path: PathBuf,
        /// The destination path where the file should land
        dest_path: PathBuf,
        /// The reason the move failed
        reason: String,
    },
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_marker_is_only_matched_by_cancelled_variant() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(
            !Error::Transfer("connection reset".into()).is_cancelled(),
            "a genuine transfer failure must not be treated as cancellation"
        );
        assert!(!Error::Metadata("unsupported URL".into()).is_cancelled());
        assert!(
            !Error::Other("cancel".into()).is_cancelled(),
            "the marker is the variant, not the word 'cancel' in a message"
        );
    }

    #[test]
    fn truncate_message_leaves_short_messages_untouched() {
        assert_eq!(truncate_message("disk full"), "disk full");
        let exactly_max = "x".repeat(MAX_ERROR_MESSAGE_LEN);
        assert_eq!(
            truncate_message(&exactly_max),
            exactly_max,
            "a message exactly at the limit must not gain an ellipsis"
        );
    }

    #[test]
    fn truncate_message_cuts_long_messages_and_appends_ellipsis() {
        let long = "e".repeat(MAX_ERROR_MESSAGE_LEN + 50);
        let truncated = truncate_message(&long);
        assert_eq!(truncated.chars().count(), MAX_ERROR_MESSAGE_LEN + 3);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn truncate_message_counts_characters_not_bytes() {
        // Multi-byte characters must not be split mid-codepoint
        let long = "ü".repeat(MAX_ERROR_MESSAGE_LEN + 10);
        let truncated = truncate_message(&long);
        assert_eq!(truncated.chars().count(), MAX_ERROR_MESSAGE_LEN + 3);
    }

    #[test]
    fn placement_error_display_includes_paths() {
        let err = Error::Placement(PlacementError::MoveFailed {
            source_path: PathBuf::from("/tmp/scratch/movie.mp4"),
            dest_path: PathBuf::from("/downloads/movie.mp4"),
            reason: "permission denied".into(),
        });
        let msg = err.to_string();
        assert!(msg.contains("/tmp/scratch/movie.mp4"));
        assert!(msg.contains("/downloads/movie.mp4"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn display_message_truncates_oversized_engine_errors() {
        let err = Error::Transfer("t".repeat(400));
        let msg = err.display_message();
        assert_eq!(msg.chars().count(), MAX_ERROR_MESSAGE_LEN + 3);
        assert!(msg.ends_with("..."));
    }
}
