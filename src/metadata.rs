//! Metadata fetch and normalization
//!
//! One in-flight metadata fetch: invoke the engine in fast single-item mode
//! and reduce its raw record to a clean, orderable [`MediaInfo`]. Audio-only
//! streams are excluded from the video format list; subtitle listings are
//! reduced to sorted language lists restricted to the static language table.
//! Engine failures surface as a single [`Error::Metadata`] message; retries
//! belong to the transfer layer.

use std::collections::HashMap;

use crate::engine::{Engine, ExtractOptions, RawFormat, RawMetadata, RawSubtitleTrack};
use crate::error::{Error, Result};
use crate::languages;
use crate::types::{MediaFormat, MediaInfo};
use crate::utils::format_size;

/// Fetch and normalize the metadata record for a URL.
///
/// Blocks its worker until the engine returns; the caller runs at most one
/// metadata fetch at a time.
///
/// # Errors
///
/// Any engine failure is collapsed into [`Error::Metadata`] carrying the
/// engine's message.
pub async fn fetch_metadata(engine: &dyn Engine, url: &str) -> Result<MediaInfo> {
    tracing::debug!(url, engine = engine.name(), "fetching metadata");

    let raw = engine
        .extract_info(url, &ExtractOptions::single_item())
        .await
        .map_err(|e| {
            tracing::warn!(url, error = %e, "metadata fetch failed");
            Error::Metadata(e.to_string())
        })?;

    Ok(normalize(raw))
}

/// Reduce a raw engine record to the normalized form.
fn normalize(raw: RawMetadata) -> MediaInfo {
    let mut formats: Vec<MediaFormat> = raw
        .formats
        .iter()
        .filter_map(annotate_video_format)
        .collect();

    // Highest quality first; sort_by is stable so engine order breaks ties
    formats.sort_by(|a, b| {
        (b.height, b.fps_rounded)
            .cmp(&(a.height, a.fps_rounded))
            .then(b.bitrate.total_cmp(&a.bitrate))
    });

    MediaInfo {
        title: raw.title,
        webpage_url: raw.webpage_url,
        original_url: raw.original_url,
        formats,
        subtitle_languages: subtitle_languages(&raw.subtitles),
        auto_subtitle_languages: subtitle_languages(&raw.automatic_captions),
    }
}

/// Annotate one raw format, or drop it when it is not a usable video stream.
///
/// A format is retained only when it carries a real video codec and a known
/// height; audio-only streams are selected through the format selector, not
/// listed.
fn annotate_video_format(raw: &RawFormat) -> Option<MediaFormat> {
    let codec = raw.vcodec.as_deref().filter(|c| *c != "none")?;
    let height = raw.height?;

    let size_bytes = raw.filesize.or(raw.filesize_approx);

    Some(MediaFormat {
        format_id: raw.format_id.clone(),
        extension: raw.ext.clone(),
        video_codec: codec.split('.').next().unwrap_or(codec).to_string(),
        height,
        width: raw.width,
        fps_rounded: raw.fps.map_or(0, |fps| fps.round() as u32),
        bitrate: raw.tbr.unwrap_or(0.0),
        has_audio: raw.acodec.as_deref().is_some_and(|a| a != "none"),
        size_bytes,
        size_display: format_size(size_bytes.unwrap_or(0)),
    })
}

/// Sorted, deduplicated language identifiers from a subtitle map, keeping
/// only languages with at least one track and a known base code.
fn subtitle_languages(tracks: &HashMap<String, Vec<RawSubtitleTrack>>) -> Vec<String> {
    let mut langs: Vec<String> = tracks
        .iter()
        .filter(|(lang, entries)| !entries.is_empty() && languages::is_supported(lang))
        .map(|(lang, _)| lang.clone())
        .collect();
    langs.sort();
    langs.dedup();
    langs
}
