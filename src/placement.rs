//! Artifact location and placement
//!
//! After a transfer the engine leaves its output in the scratch directory
//! under a name this crate never chose. Placement finds that artifact,
//! moves it into the destination, and applies the optional display suffix.
//! Batch transfers skip resolution entirely; the engine already wrote to the
//! destination and only the suffix pass runs, over files touched since the
//! task started.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

use crate::error::{PlacementError, Result};

/// Locate the produced artifact inside a scratch directory.
///
/// The first regular file whose extension matches `target_ext` exactly wins
/// (arbitrary among ties); when nothing matches, the largest regular file by
/// byte size is taken instead — a merge step may not have produced the
/// expected container.
///
/// # Errors
///
/// [`PlacementError::ScratchMissing`] when the directory is gone,
/// [`PlacementError::ArtifactNotFound`] when it holds no regular files.
pub fn resolve_artifact(scratch_dir: &Path, target_ext: &str) -> Result<PathBuf> {
    if !scratch_dir.is_dir() {
        return Err(PlacementError::ScratchMissing {
            path: scratch_dir.to_path_buf(),
        }
        .into());
    }

    let mut largest: Option<(u64, PathBuf)> = None;

    for entry in fs::read_dir(scratch_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        if path.extension().and_then(|e| e.to_str()) == Some(target_ext) {
            return Ok(path);
        }

        let Ok(meta) = entry.metadata() else {
            continue;
        };
        let size = meta.len();
        if largest.as_ref().is_none_or(|(max, _)| size > *max) {
            largest = Some((size, path));
        }
    }

    largest.map(|(_, path)| path).ok_or_else(|| {
        PlacementError::ArtifactNotFound {
            dir: scratch_dir.to_path_buf(),
        }
        .into()
    })
}

/// Sanitize a display suffix for use in a filename.
///
/// Characters illegal in filenames (and control characters) become
/// underscores; surrounding whitespace and trailing dots are trimmed. The
/// result may be empty, in which case no suffix is applied.
#[must_use]
pub fn sanitize_suffix(suffix: &str) -> String {
    let replaced: String = suffix
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if (c as u32) < 0x20 => '_',
            c => c,
        })
        .collect();
    replaced.trim().trim_end_matches('.').to_string()
}

/// Append a sanitized suffix to a file's base name: `clip.mp4` with suffix
/// `[1080p]` becomes `clip [1080p].mp4`.
///
/// No-op (returning the unchanged path) when the suffix sanitizes to
/// nothing, the base name already ends with it, or the path is not a regular
/// file — so re-running placement after a retry never doubles the suffix.
/// A pre-existing file under the new name is overwritten.
pub fn apply_suffix(path: &Path, suffix: &str) -> Result<PathBuf> {
    let safe_suffix = sanitize_suffix(suffix);
    if safe_suffix.is_empty() || !path.is_file() {
        return Ok(path.to_path_buf());
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    if stem.ends_with(&safe_suffix) {
        return Ok(path.to_path_buf());
    }

    let renamed_name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem} {safe_suffix}.{ext}"),
        None => format!("{stem} {safe_suffix}"),
    };
    let renamed = path.with_file_name(renamed_name);

    if renamed.exists() {
        fs::remove_file(&renamed)?;
    }
    fs::rename(path, &renamed)?;
    Ok(renamed)
}

/// Move a located artifact into the destination directory, overwriting any
/// pre-existing file of the same name, then apply the optional suffix.
///
/// Returns the final path of the placed file.
pub fn place_artifact(
    artifact: &Path,
    destination_dir: &Path,
    suffix: Option<&str>,
) -> Result<PathBuf> {
    let file_name = artifact.file_name().ok_or_else(|| {
        crate::error::Error::Placement(PlacementError::MoveFailed {
            source_path: artifact.to_path_buf(),
            dest_path: destination_dir.to_path_buf(),
            reason: "artifact has no file name".into(),
        })
    })?;
    let final_path = destination_dir.join(file_name);

    if final_path.exists() {
        fs::remove_file(&final_path)?;
    }
    move_file(artifact, &final_path)?;

    match suffix {
        Some(suffix) => apply_suffix(&final_path, suffix),
        None => Ok(final_path),
    }
}

/// Rename across filesystems: plain rename first, copy-and-delete when the
/// destination is on a different device.
fn move_file(source: &Path, dest: &Path) -> Result<()> {
    if fs::rename(source, dest).is_ok() {
        return Ok(());
    }
    fs::copy(source, dest).map_err(|e| {
        crate::error::Error::Placement(PlacementError::MoveFailed {
            source_path: source.to_path_buf(),
            dest_path: dest.to_path_buf(),
            reason: e.to_string(),
        })
    })?;
    if let Err(e) = fs::remove_file(source) {
        tracing::warn!(path = %source.display(), error = %e, "could not remove moved source file");
    }
    Ok(())
}

/// Apply the suffix pass across a destination tree after a batch transfer.
///
/// Walks `root` and renames every regular file whose extension matches
/// `target_ext` (case-insensitive) and whose modification time is at or
/// after `cutoff`. Per-file metadata errors skip that file. Returns how many
/// files were renamed.
///
/// This is a heuristic: an unrelated file of the same extension touched
/// inside the window is renamed too. The engine does not report which files
/// a collection transfer produced, so modification time is the best signal
/// available.
pub fn rename_recent_matches(
    root: &Path,
    target_ext: &str,
    cutoff: SystemTime,
    suffix: &str,
) -> usize {
    let expected = target_ext.trim_start_matches('.').to_lowercase();
    if expected.is_empty() {
        return 0;
    }

    let mut renamed = 0;
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let matches_ext = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.to_lowercase() == expected);
        if !matches_ext {
            continue;
        }

        let Some(modified) = entry.metadata().ok().and_then(|m| m.modified().ok()) else {
            continue;
        };
        if modified < cutoff {
            continue;
        }

        match apply_suffix(entry.path(), suffix) {
            Ok(new_path) if new_path != entry.path() => renamed += 1,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "suffix rename failed");
            }
        }
    }
    renamed
}
