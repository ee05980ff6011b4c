//! Configuration types for media-dl
//!
//! The engine is driven by a typed [`TransferConfig`] built once per transfer
//! attempt from a queue item's captured [`ItemOptions`] and the fetched
//! format list, then never mutated. Building it through typed fields instead
//! of a loose key-value map means an option typo is a compile error, not a
//! silently ignored setting.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::ffmpeg_location;
use crate::error::{Error, Result};
use crate::types::{MediaFormat, MediaInfo, Mode, SubtitleSelection};

/// Crate-level configuration shared by all queue items
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Final destination directory for placed artifacts (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Root under which per-transfer scratch directories are created
    /// (default: "./temp")
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Transfer rate limit in KiB/s (None = unlimited)
    #[serde(default)]
    pub speed_limit_kib: Option<u64>,

    /// Whether auto-generated captions participate in subtitle selection
    #[serde(default = "default_true")]
    pub include_auto_subs: bool,

    /// Engine-level resilience settings applied to every transfer
    #[serde(default)]
    pub resilience: EngineResilience,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            temp_dir: default_temp_dir(),
            speed_limit_kib: None,
            include_auto_subs: true,
            resilience: EngineResilience::default(),
        }
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("./temp")
}

fn default_true() -> bool {
    true
}

/// Engine-level resilience settings for a transfer
///
/// These bound the engine's own recovery behavior; the orchestration layer
/// adds no retries of its own on top.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineResilience {
    /// Whole-job retry count
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Per-fragment retry count
    #[serde(default = "default_retries")]
    pub fragment_retries: u32,

    /// Socket inactivity timeout
    #[serde(default = "default_socket_timeout")]
    pub socket_timeout: Duration,

    /// Bounded parallel sub-fragment transfers
    #[serde(default = "default_concurrent_fragments")]
    pub concurrent_fragments: u32,

    /// Bounded retries when an output file is locked by another process
    #[serde(default = "default_file_access_retries")]
    pub file_access_retries: u32,
}

impl Default for EngineResilience {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            fragment_retries: default_retries(),
            socket_timeout: default_socket_timeout(),
            concurrent_fragments: default_concurrent_fragments(),
            file_access_retries: default_file_access_retries(),
        }
    }
}

fn default_retries() -> u32 {
    10
}

fn default_socket_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_concurrent_fragments() -> u32 {
    4
}

fn default_file_access_retries() -> u32 {
    5
}

/// Per-item options captured when a job is enqueued
///
/// A queue item is processed with the options it was enqueued with, even if
/// the caller's current selections have changed since.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ItemOptions {
    /// Video or audio job
    #[serde(default)]
    pub mode: Mode,

    /// Collection/batch transfer (engine fans out to the destination itself)
    #[serde(default)]
    pub playlist: bool,

    /// Subtitle track selection
    #[serde(default)]
    pub subtitle: SubtitleSelection,

    /// Audio codec/container for audio mode (e.g., "mp3")
    #[serde(default)]
    pub audio_format: Option<String>,

    /// Audio bitrate in kbit/s for audio mode
    #[serde(default)]
    pub audio_bitrate: Option<u32>,

    /// Chosen video format identifier, when a specific format was picked
    #[serde(default)]
    pub video_format_id: Option<String>,

    /// Container extension of the chosen video format
    #[serde(default)]
    pub video_ext: Option<String>,
}

/// Per-format capabilities of the audio extraction pipeline
#[derive(Clone, Copy, Debug)]
pub struct AudioFormatCaps {
    /// Whether a thumbnail can be embedded into this container
    pub thumbnail: bool,
    /// Whether tag metadata can be written into this container
    pub metadata: bool,
}

/// Audio containers the extraction pipeline supports
pub const AUDIO_FORMATS: &[(&str, AudioFormatCaps)] = &[
    ("mp3", AudioFormatCaps { thumbnail: true, metadata: true }),
    ("m4a", AudioFormatCaps { thumbnail: true, metadata: true }),
    ("flac", AudioFormatCaps { thumbnail: true, metadata: true }),
    ("opus", AudioFormatCaps { thumbnail: false, metadata: true }),
    ("wav", AudioFormatCaps { thumbnail: false, metadata: true }),
];

/// Look up the capability entry for an audio container.
#[must_use]
pub fn audio_format_caps(format: &str) -> Option<AudioFormatCaps> {
    AUDIO_FORMATS
        .iter()
        .find(|(name, _)| *name == format)
        .map(|(_, caps)| *caps)
}

/// One post-processing step requested from the engine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum PostProcessor {
    /// Extract the audio track into a standalone file
    ExtractAudio {
        /// Target codec/container
        codec: String,
        /// Target bitrate in kbit/s, when constrained
        quality: Option<u32>,
    },
    /// Embed the thumbnail image
    EmbedThumbnail,
    /// Write tag metadata (and optionally chapters)
    Metadata {
        /// Also write chapter markers
        add_chapters: bool,
    },
    /// Embed downloaded subtitle tracks into the container
    EmbedSubtitles,
}

/// Fully-built configuration for one transfer attempt
///
/// Built by [`TransferConfig::build`] and immutable once the transfer starts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Final destination directory
    pub destination_dir: PathBuf,

    /// Private scratch directory (None in batch mode, where the engine
    /// writes straight to the destination)
    pub scratch_dir: Option<PathBuf>,

    /// Output path template handed to the engine
    pub output_template: String,

    /// Format selector expression
    pub format_selector: String,

    /// Container to merge separate streams into, when merging is needed
    pub merge_output_format: Option<String>,

    /// Post-processing steps, in order
    pub post_processors: Vec<PostProcessor>,

    /// Subtitle languages to fetch
    pub subtitle_languages: Vec<String>,

    /// Write manually authored subtitle tracks
    pub write_subtitles: bool,

    /// Also write auto-generated captions
    pub write_auto_subtitles: bool,

    /// Embed fetched subtitles into the container
    pub embed_subtitles: bool,

    /// Convert fetched subtitles to this format before embedding
    pub convert_subtitles_to: Option<String>,

    /// Keep the bare video file alongside the subtitle-merged one
    pub keep_video: bool,

    /// Rate limit in bytes per second (None = unlimited)
    pub rate_limit_bps: Option<u64>,

    /// Explicit ffmpeg path, when the binary is not on PATH
    pub ffmpeg_location: Option<PathBuf>,

    /// Expected extension of the produced artifact
    pub target_ext: String,

    /// Sanitizable display suffix appended to the placed filename
    pub filename_suffix: Option<String>,

    /// Collection/batch transfer
    pub batch: bool,

    /// Engine-level resilience settings
    pub resilience: EngineResilience,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            destination_dir: default_download_dir(),
            scratch_dir: None,
            output_template: String::from("%(title)s.%(ext)s"),
            format_selector: String::from("bestvideo+bestaudio/best"),
            merge_output_format: None,
            post_processors: Vec::new(),
            subtitle_languages: Vec::new(),
            write_subtitles: false,
            write_auto_subtitles: false,
            embed_subtitles: false,
            convert_subtitles_to: None,
            keep_video: false,
            rate_limit_bps: None,
            ffmpeg_location: None,
            target_ext: String::from("mp4"),
            filename_suffix: None,
            batch: true,
            resilience: EngineResilience::default(),
        }
    }
}

impl TransferConfig {
    /// Build a transfer configuration from an item's captured options and its
    /// fetched metadata.
    ///
    /// `scratch_dir` is the private working directory for this attempt; it is
    /// required for single-artifact transfers and ignored in batch mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the inputs cannot produce a valid
    /// configuration (empty target extension, missing scratch directory for a
    /// single-artifact transfer, zero rate limit).
    pub fn build(
        config: &Config,
        options: &ItemOptions,
        info: &MediaInfo,
        scratch_dir: Option<&Path>,
    ) -> Result<Self> {
        let batch = options.playlist;

        let output_template = if batch {
            config
                .download_dir
                .join("%(playlist_title)s")
                .join("%(playlist_index)03d - %(title)s.%(ext)s")
                .to_string_lossy()
                .into_owned()
        } else {
            let scratch = scratch_dir.ok_or_else(|| Error::Config {
                message: "single-artifact transfers need a scratch directory".into(),
                key: Some("scratch_dir".into()),
            })?;
            scratch
                .join("%(title)s.%(ext)s")
                .to_string_lossy()
                .into_owned()
        };

        let mut built = Self {
            destination_dir: config.download_dir.clone(),
            scratch_dir: if batch {
                None
            } else {
                scratch_dir.map(Path::to_path_buf)
            },
            output_template,
            ffmpeg_location: ffmpeg_location().explicit_path().map(Path::to_path_buf),
            rate_limit_bps: config.speed_limit_kib.map(|kib| kib * 1024),
            batch,
            resilience: config.resilience.clone(),
            ..Self::default()
        };

        match options.mode {
            Mode::Audio => built.apply_audio_options(options),
            Mode::Video => built.apply_video_options(options, info),
        }
        built.apply_subtitle_options(config, options, info);

        built.validate()?;
        Ok(built)
    }

    fn apply_audio_options(&mut self, options: &ItemOptions) {
        let codec = options
            .audio_format
            .clone()
            .unwrap_or_else(|| "mp3".to_string());

        self.format_selector = "bestaudio/best".to_string();
        self.post_processors.push(PostProcessor::ExtractAudio {
            codec: codec.clone(),
            quality: options.audio_bitrate,
        });

        if let Some(caps) = audio_format_caps(&codec) {
            if caps.thumbnail {
                self.post_processors.push(PostProcessor::EmbedThumbnail);
            }
            if caps.metadata {
                self.post_processors
                    .push(PostProcessor::Metadata { add_chapters: false });
            }
        }

        let mut parts = vec![codec.to_lowercase()];
        if let Some(bitrate) = options.audio_bitrate {
            parts.push(format!("{bitrate}kbps"));
        }
        self.filename_suffix = Some(format!("[{}]", parts.join(" ")));
        self.target_ext = codec;
    }

    fn apply_video_options(&mut self, options: &ItemOptions, info: &MediaInfo) {
        if let Some(format_id) = options.video_format_id.as_deref() {
            let target_ext = options
                .video_ext
                .clone()
                .unwrap_or_else(|| "mp4".to_string());
            let selected = info.find_format(format_id);

            if selected.is_some_and(|f| f.has_audio) {
                self.format_selector = format_id.to_string();
            } else {
                let audio_selector = match target_ext.as_str() {
                    "mp4" => "bestaudio[ext=m4a]/bestaudio/best",
                    "webm" => "bestaudio[ext=webm]/bestaudio/best",
                    _ => "bestaudio/best",
                };
                self.format_selector = format!("{format_id}+{audio_selector}");
                self.merge_output_format = Some(target_ext.clone());
            }

            self.filename_suffix = selected.and_then(video_suffix);
            self.target_ext = target_ext;
        } else {
            self.format_selector = "bestvideo+bestaudio/best".to_string();
            self.merge_output_format = Some("mp4".to_string());
            self.target_ext = "mp4".to_string();
        }
    }

    fn apply_subtitle_options(&mut self, config: &Config, options: &ItemOptions, info: &MediaInfo) {
        let languages = match &options.subtitle {
            SubtitleSelection::None => return,
            SubtitleSelection::All => {
                let mut all: Vec<String> = info.subtitle_languages.clone();
                if config.include_auto_subs {
                    all.extend(info.auto_subtitle_languages.iter().cloned());
                }
                all.sort();
                all.dedup();
                all
            }
            SubtitleSelection::Manual(lang) | SubtitleSelection::Auto(lang) => {
                vec![lang.clone()]
            }
        };

        // Embedding needs a container that takes arbitrary subtitle streams
        self.merge_output_format = Some("mkv".to_string());
        self.target_ext = "mkv".to_string();
        self.write_subtitles = true;
        self.write_auto_subtitles = config.include_auto_subs;
        self.embed_subtitles = true;
        self.convert_subtitles_to = Some("srt".to_string());
        self.keep_video = true;
        self.subtitle_languages = languages;

        self.post_processors
            .push(PostProcessor::Metadata { add_chapters: true });
        self.post_processors.push(PostProcessor::EmbedThumbnail);
        self.post_processors.push(PostProcessor::EmbedSubtitles);
    }

    fn validate(&self) -> Result<()> {
        if self.target_ext.is_empty() {
            return Err(Error::Config {
                message: "target extension must not be empty".into(),
                key: Some("target_ext".into()),
            });
        }
        if self.format_selector.is_empty() {
            return Err(Error::Config {
                message: "format selector must not be empty".into(),
                key: Some("format_selector".into()),
            });
        }
        if !self.batch && self.scratch_dir.is_none() {
            return Err(Error::Config {
                message: "single-artifact transfers need a scratch directory".into(),
                key: Some("scratch_dir".into()),
            });
        }
        if self.rate_limit_bps == Some(0) {
            return Err(Error::Config {
                message: "rate limit of zero would stall every transfer".into(),
                key: Some("speed_limit_kib".into()),
            });
        }
        Ok(())
    }
}

/// Build the display suffix for a selected video format:
/// "[1920x1080 av01]", degrading to resolution-only or codec-only forms.
fn video_suffix(format: &MediaFormat) -> Option<String> {
    let resolution = format
        .width
        .map(|width| format!("{width}x{height}", height = format.height));

    let codec = if format.video_codec.is_empty() || format.video_codec == "none" {
        None
    } else {
        Some(format.video_codec.clone())
    };

    match (resolution, codec) {
        (Some(res), Some(codec)) => Some(format!("[{res} {codec}]")),
        (Some(res), None) => Some(format!("[{res}]")),
        (None, Some(codec)) => Some(format!("[{codec}]")),
        (None, None) => None,
    }
}
