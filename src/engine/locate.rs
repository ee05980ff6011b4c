//! Process-wide ffmpeg location cache
//!
//! Locating the post-processing binary touches the filesystem and PATH, so
//! the result is computed once per process and reused for every transfer.
//! The cache is an initialize-once cell with an explicit reset hook for
//! tests, not a bare global.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Where the post-processing binary was found
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolLocation {
    /// Found at an explicit path outside PATH; pass this path to the engine
    Found(PathBuf),
    /// Available on PATH; the engine resolves it itself
    SystemDefault,
    /// Not found anywhere; merge/convert steps will fail if attempted
    NotFound,
}

impl ToolLocation {
    /// The explicit path to hand the engine, when one is needed.
    pub fn explicit_path(&self) -> Option<&Path> {
        match self {
            ToolLocation::Found(path) => Some(path),
            _ => None,
        }
    }

    /// Whether the binary is usable at all.
    pub fn is_available(&self) -> bool {
        !matches!(self, ToolLocation::NotFound)
    }
}

static CACHE: Mutex<Option<ToolLocation>> = Mutex::new(None);

/// Locate the ffmpeg binary, computing the answer once per process.
///
/// Lookup order: a binary bundled next to the working directory, then PATH,
/// then conventional install locations. Invalidated only by process restart
/// (or [`reset_location_cache`] in tests).
pub fn ffmpeg_location() -> ToolLocation {
    let mut cache = match CACHE.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if let Some(location) = cache.as_ref() {
        return location.clone();
    }

    let location = locate_ffmpeg();
    tracing::info!(location = ?location, "ffmpeg detection result");
    *cache = Some(location.clone());
    location
}

/// Drop the cached location so the next call re-probes the filesystem.
#[cfg(test)]
pub(crate) fn reset_location_cache() {
    let mut cache = match CACHE.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *cache = None;
}

fn locate_ffmpeg() -> ToolLocation {
    let binary_name = if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" };

    // A binary dropped next to the application wins over PATH
    if let Ok(cwd) = std::env::current_dir() {
        let local = cwd.join(binary_name);
        if local.is_file() {
            return ToolLocation::Found(local);
        }
    }

    if which::which(binary_name).is_ok() {
        return ToolLocation::SystemDefault;
    }

    for candidate in conventional_candidates() {
        if candidate.is_file() {
            return ToolLocation::Found(candidate);
        }
    }

    ToolLocation::NotFound
}

#[cfg(windows)]
fn conventional_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(r"C:\ffmpeg\bin\ffmpeg.exe")];
    if let Ok(local_app_data) = std::env::var("LOCALAPPDATA") {
        candidates.push(
            PathBuf::from(local_app_data)
                .join("ffmpeg")
                .join("bin")
                .join("ffmpeg.exe"),
        );
    }
    candidates
}

#[cfg(not(windows))]
fn conventional_candidates() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/usr/local/bin/ffmpeg"),
        PathBuf::from("/opt/homebrew/bin/ffmpeg"),
    ]
}
