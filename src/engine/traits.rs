//! Engine trait and the raw record types it produces

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::TransferConfig;
use crate::error::Result;

/// Options for a metadata extraction call
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ExtractOptions {
    /// Resolve only the single item, never expand a collection
    pub no_playlist: bool,
    /// Skip resolving nested entries entirely (flat listing)
    pub extract_flat: bool,
}

impl ExtractOptions {
    /// Fast single-item mode: collection expansion disabled, nested entries
    /// fully resolved. This is the mode the metadata task always uses.
    pub fn single_item() -> Self {
        Self {
            no_playlist: true,
            extract_flat: false,
        }
    }
}

/// Raw metadata record returned by the engine
///
/// A serde mirror of the engine's JSON document. Only the fields this crate
/// consumes are typed; everything else is ignored on deserialization.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawMetadata {
    /// Media title
    #[serde(default)]
    pub title: Option<String>,

    /// Canonical page URL
    #[serde(default)]
    pub webpage_url: Option<String>,

    /// Original request URL as echoed by the engine
    #[serde(default)]
    pub original_url: Option<String>,

    /// All formats the engine discovered, unfiltered
    #[serde(default)]
    pub formats: Vec<RawFormat>,

    /// Manually authored subtitle tracks, keyed by language code
    #[serde(default)]
    pub subtitles: HashMap<String, Vec<RawSubtitleTrack>>,

    /// Auto-generated caption tracks, keyed by language code
    #[serde(default)]
    pub automatic_captions: HashMap<String, Vec<RawSubtitleTrack>>,
}

/// One format entry from the engine's raw listing
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawFormat {
    /// Engine-assigned format identifier
    #[serde(default)]
    pub format_id: String,

    /// Container extension
    #[serde(default)]
    pub ext: String,

    /// Video codec string; `"none"` marks an audio-only stream
    #[serde(default)]
    pub vcodec: Option<String>,

    /// Audio codec string; `"none"` marks a video-only stream
    #[serde(default)]
    pub acodec: Option<String>,

    /// Vertical resolution
    #[serde(default)]
    pub height: Option<u32>,

    /// Horizontal resolution
    #[serde(default)]
    pub width: Option<u32>,

    /// Frame rate
    #[serde(default)]
    pub fps: Option<f64>,

    /// Total bitrate in kbit/s
    #[serde(default)]
    pub tbr: Option<f64>,

    /// Exact size in bytes, when the engine knows it
    #[serde(default)]
    pub filesize: Option<u64>,

    /// Estimated size in bytes, when only an estimate is available
    #[serde(default)]
    pub filesize_approx: Option<u64>,
}

/// One subtitle track entry from the engine's raw listing
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawSubtitleTrack {
    /// Track format extension (srt, vtt, ...)
    #[serde(default)]
    pub ext: Option<String>,

    /// Track URL
    #[serde(default)]
    pub url: Option<String>,
}

/// One progress record delivered through the transfer hook
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressUpdate {
    /// Bytes are moving
    Transferring {
        /// Bytes transferred so far
        downloaded_bytes: u64,
        /// Total bytes, when the engine knows them
        total_bytes: Option<u64>,
        /// Engine-formatted transfer rate (may carry ANSI escapes)
        speed: Option<String>,
        /// Engine-formatted time remaining (may carry ANSI escapes)
        eta: Option<String>,
    },
    /// Raw transfer finished; merge/embed/convert steps are starting
    PostProcessing,
}

/// What the progress hook tells the engine to do next
///
/// [`HookAction::Abort`] is the cancellation sentinel: the engine binding
/// must stop the in-flight call and return [`crate::Error::Cancelled`] after
/// observing it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookAction {
    /// Keep going
    Continue,
    /// Unwind the in-flight call
    Abort,
}

/// Progress hook signature consumed by [`Engine::transfer`]
pub type ProgressHook<'a> = &'a (dyn Fn(ProgressUpdate) -> HookAction + Send + Sync);

/// Trait for external retrieval engines
///
/// Implementations wrap whatever actually fetches media (an external binary,
/// an embedded interpreter, a remote service). Both calls block their task
/// until the engine returns; the caller runs them on dedicated workers.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Extract the metadata record for a URL without transferring anything.
    ///
    /// # Errors
    ///
    /// Any engine-side failure (network, unsupported URL, restricted
    /// content) surfaces as a single error; this layer never retries.
    async fn extract_info(&self, url: &str, options: &ExtractOptions) -> Result<RawMetadata>;

    /// Perform a transfer, invoking `hook` for every progress record.
    ///
    /// The engine applies the resilience settings carried by `config`
    /// (bounded retries, socket inactivity timeout, bounded parallel
    /// fragments) internally.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Cancelled`] when the hook returned
    /// [`HookAction::Abort`], or a transfer error once the engine's internal
    /// retries are exhausted.
    async fn transfer(
        &self,
        url: &str,
        config: &TransferConfig,
        hook: ProgressHook<'_>,
    ) -> Result<()>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
