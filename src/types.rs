//! Core types and events for media-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ItemOptions;

/// Lifecycle state of a queue item
///
/// Transitions are one-way: `Pending → Downloading → {Finished, Error,
/// Cancelled}`. A terminal item is never resurrected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Waiting for the controller to pick it up
    Pending,
    /// Metadata fetch or transfer in flight
    Downloading,
    /// Transfer completed and artifact placed
    Finished,
    /// Metadata fetch or transfer failed
    Error,
    /// Cancelled by the user before or during processing
    Cancelled,
}

impl Status {
    /// Whether an item in this state may be removed from the queue.
    ///
    /// Active items (`Downloading`) and items cancelled while active stay in
    /// the queue so the controller's bookkeeping is never pulled out from
    /// under it.
    pub fn is_removable(&self) -> bool {
        matches!(self, Status::Pending | Status::Finished | Status::Error)
    }

    /// Whether this is a terminal state swept by `clear_finished`.
    pub fn is_cleared_as_finished(&self) -> bool {
        matches!(self, Status::Finished | Status::Error | Status::Cancelled)
    }
}

/// What kind of artifact a queue item should produce
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Full video transfer (default)
    #[default]
    Video,
    /// Audio-only extraction
    Audio,
}

/// One user-requested job awaiting or undergoing metadata fetch and transfer
///
/// Identity is positional: items are addressed by index into the queue's
/// insertion-ordered sequence, and every mutation re-validates the index.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueItem {
    /// Source URL
    pub url: String,

    /// Current lifecycle state
    pub status: Status,

    /// Display name; starts as the URL, replaced by the fetched title
    pub title: String,

    /// Video or audio job
    pub mode: Mode,

    /// Options captured when the item was enqueued
    pub options: ItemOptions,

    /// Error message from the last failure (empty when none)
    pub error_message: String,

    /// Progress percentage, clamped to [0, 100]
    pub progress: f32,

    /// When the item was added to the queue
    pub created_at: DateTime<Utc>,
}

/// Subtitle track selection for a queue item
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "lang", rename_all = "lowercase")]
pub enum SubtitleSelection {
    /// No subtitles
    #[default]
    None,
    /// Every available language (manual plus auto-generated when enabled)
    All,
    /// One manually authored track
    Manual(String),
    /// One auto-generated track
    Auto(String),
}

impl SubtitleSelection {
    /// Whether any subtitle track was requested.
    pub fn is_some(&self) -> bool {
        !matches!(self, SubtitleSelection::None)
    }
}

/// One video format from a metadata fetch, filtered and annotated
///
/// Produced fresh per fetch and immutable thereafter; the controller consumes
/// these to resolve a transfer configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediaFormat {
    /// Engine-assigned format identifier
    pub format_id: String,

    /// Container extension (e.g., "mp4", "webm")
    pub extension: String,

    /// Video codec stripped of version/profile suffix ("av01.0.08M.08" → "av01")
    pub video_codec: String,

    /// Vertical resolution
    pub height: u32,

    /// Horizontal resolution, if reported
    pub width: Option<u32>,

    /// Frame rate rounded to the nearest integer, 0 if unknown
    pub fps_rounded: u32,

    /// Total bitrate in kbit/s, 0.0 if unknown
    pub bitrate: f64,

    /// Whether the stream carries its own audio track
    pub has_audio: bool,

    /// Size in bytes from `filesize` or `filesize_approx`, if reported
    pub size_bytes: Option<u64>,

    /// Human-readable size string ("Unknown" when no size was reported)
    pub size_display: String,
}

/// Normalized output of a metadata fetch
#[derive(Clone, Debug, Default)]
pub struct MediaInfo {
    /// Media title, if the engine reported one
    pub title: Option<String>,

    /// Canonical page URL, if reported
    pub webpage_url: Option<String>,

    /// Original request URL as echoed by the engine, if reported
    pub original_url: Option<String>,

    /// Video formats, highest quality first
    pub formats: Vec<MediaFormat>,

    /// Manually authored subtitle languages, sorted and deduplicated
    pub subtitle_languages: Vec<String>,

    /// Auto-generated caption languages, sorted and deduplicated
    pub auto_subtitle_languages: Vec<String>,
}

impl MediaInfo {
    /// Find a format by its engine identifier.
    pub fn find_format(&self, format_id: &str) -> Option<&MediaFormat> {
        self.formats.iter().find(|f| f.format_id == format_id)
    }
}

/// Counts reported when a queue run drains the last pending item
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSummary {
    /// Items that finished successfully
    pub finished: usize,
    /// Items that failed
    pub failed: usize,
    /// Items cancelled before or during processing
    pub cancelled: usize,
}

/// Event emitted during queue processing
///
/// Broadcast to all subscribers; dropped silently when nobody is listening.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The controller started processing a queue item
    ItemStarted {
        /// Queue index of the item
        index: usize,
        /// Source URL
        url: String,
    },

    /// Throttled progress update for the active item
    Progress {
        /// Queue index of the item
        index: usize,
        /// Progress percentage (0.0 to 100.0)
        percent: f32,
        /// Human-readable status line
        text: String,
    },

    /// The active item finished successfully
    ItemFinished {
        /// Queue index of the item
        index: usize,
        /// Completion message
        message: String,
    },

    /// The active item failed
    ItemFailed {
        /// Queue index of the item
        index: usize,
        /// Error message (already truncated)
        error: String,
    },

    /// The active item was cancelled
    ItemCancelled {
        /// Queue index of the item
        index: usize,
    },

    /// The queue's composition or an item's state changed
    QueueChanged,

    /// The run drained the last pending item
    QueueFinished {
        /// Final counts for the run
        summary: QueueSummary,
    },
}
