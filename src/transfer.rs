//! Transfer task
//!
//! [`TransferTask`] owns one in-flight transfer: the built configuration,
//! the cancellation token, progress emission, outcome classification, and
//! scratch cleanup. It reports through a channel: any number of progress
//! messages followed by exactly one terminal message, never more.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::TransferConfig;
use crate::engine::{Engine, HookAction, ProgressUpdate};
use crate::error::{Error, PlacementError, Result, truncate_message};
use crate::placement;
use crate::throttle::ProgressThrottle;
use crate::utils::{format_size, strip_ansi};

/// Slack subtracted from the task start time when matching batch-mode output
/// files by modification time.
const BATCH_CUTOFF_SLACK: Duration = Duration::from_secs(2);

/// Message sent from a transfer worker to the controller
#[derive(Debug)]
pub enum TaskMessage {
    /// Throttled progress update
    Progress {
        /// Progress percentage (0.0 to 100.0)
        percent: f32,
        /// Human-readable status line
        text: String,
    },
    /// Terminal outcome; always the last message for a task
    Done(Result<String>),
}

/// One in-flight transfer
pub struct TransferTask {
    url: String,
    config: TransferConfig,
    cancel: CancellationToken,
    started_at: SystemTime,
}

impl TransferTask {
    /// Create a task for `url` with a fully-built configuration.
    ///
    /// The token is the task's cancellation protocol: the progress hook
    /// consults it on every invocation and signals abort into the engine
    /// once it is cancelled.
    pub fn new(url: impl Into<String>, config: TransferConfig, cancel: CancellationToken) -> Self {
        Self {
            url: url.into(),
            config,
            cancel,
            started_at: SystemTime::now(),
        }
    }

    /// Run the transfer to completion, sending progress and exactly one
    /// terminal message through `tx`.
    ///
    /// Every exit path removes the scratch directory; a failed removal is
    /// logged and swallowed.
    pub async fn run(self, engine: &dyn Engine, tx: mpsc::UnboundedSender<TaskMessage>) {
        let _scratch_guard = ScratchGuard {
            dir: self.config.scratch_dir.clone(),
        };

        if let Some(scratch) = &self.config.scratch_dir
            && let Err(e) = fs::create_dir_all(scratch)
        {
            tx.send(TaskMessage::Done(Err(Error::Io(e)))).ok();
            return;
        }

        tracing::info!(
            url = %self.url,
            engine = engine.name(),
            target_ext = %self.config.target_ext,
            batch = self.config.batch,
            "transfer started"
        );

        let throttle = Mutex::new(ProgressThrottle::new());
        let hook_tx = tx.clone();
        let cancel = self.cancel.clone();
        let hook = move |update: ProgressUpdate| -> HookAction {
            if cancel.is_cancelled() {
                return HookAction::Abort;
            }
            match update {
                ProgressUpdate::Transferring {
                    downloaded_bytes,
                    total_bytes,
                    speed,
                    eta,
                } => {
                    let total = total_bytes.unwrap_or(0);
                    let percent = if total > 0 {
                        downloaded_bytes as f64 / total as f64 * 100.0
                    } else {
                        0.0
                    };

                    let should_emit = match throttle.lock() {
                        Ok(mut guard) => {
                            guard.should_emit(percent, downloaded_bytes, total_bytes)
                        }
                        Err(_) => false,
                    };
                    if should_emit {
                        let speed = clean_engine_string(speed.as_deref());
                        let eta = clean_engine_string(eta.as_deref());
                        let text = format!(
                            "Downloading: {} / {} | {} | ETA: {}",
                            format_size(downloaded_bytes),
                            format_size(total),
                            speed,
                            eta,
                        );
                        hook_tx
                            .send(TaskMessage::Progress {
                                percent: percent as f32,
                                text,
                            })
                            .ok();
                    }
                }
                ProgressUpdate::PostProcessing => {
                    hook_tx
                        .send(TaskMessage::Progress {
                            percent: 100.0,
                            text: "Processing / Converting...".to_string(),
                        })
                        .ok();
                }
            }
            HookAction::Continue
        };

        let outcome = engine.transfer(&self.url, &self.config, &hook).await;
        let terminal = self.classify(outcome);
        tx.send(TaskMessage::Done(terminal)).ok();
    }

    /// Turn the engine outcome into the terminal result, running placement
    /// on success.
    fn classify(&self, outcome: Result<()>) -> Result<String> {
        match outcome {
            Ok(()) => {
                if self.cancel.is_cancelled() {
                    // The artifact exists, but a cancel arrived before the
                    // success was observed; the controller decides routing
                    tracing::info!(url = %self.url, "transfer cancelled after engine returned");
                    return Err(Error::Cancelled);
                }
                self.place()
            }
            Err(e) if e.is_cancelled() || self.cancel.is_cancelled() => {
                tracing::info!(url = %self.url, "transfer cancelled");
                Err(Error::Cancelled)
            }
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "transfer failed");
                let message = match e {
                    Error::Transfer(msg) => msg,
                    other => other.to_string(),
                };
                Err(Error::Transfer(truncate_message(&message)))
            }
        }
    }

    /// Post-transfer file placement.
    fn place(&self) -> Result<String> {
        if self.config.batch {
            if let Some(suffix) = &self.config.filename_suffix {
                let cutoff = self.started_at - BATCH_CUTOFF_SLACK;
                let renamed = placement::rename_recent_matches(
                    &self.config.destination_dir,
                    &self.config.target_ext,
                    cutoff,
                    suffix,
                );
                tracing::debug!(renamed, "batch suffix pass complete");
            }
            return Ok("DONE! Collection saved.".to_string());
        }

        let scratch = self
            .config
            .scratch_dir
            .as_deref()
            .ok_or_else(|| PlacementError::ScratchMissing {
                path: PathBuf::new(),
            })?;

        let artifact = placement::resolve_artifact(scratch, &self.config.target_ext)?;
        let placed = placement::place_artifact(
            &artifact,
            &self.config.destination_dir,
            self.config.filename_suffix.as_deref(),
        )?;
        tracing::info!(path = %placed.display(), "artifact placed");
        Ok("DONE! File saved.".to_string())
    }
}

/// Normalize an engine-supplied speed/ETA fragment for display.
fn clean_engine_string(value: Option<&str>) -> String {
    let cleaned = value.map(strip_ansi).unwrap_or_default();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "N/A".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Removes the scratch directory on every exit path. Best-effort: a failed
/// removal is logged, never escalated.
struct ScratchGuard {
    dir: Option<PathBuf>,
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        if let Some(dir) = &self.dir
            && dir.is_dir()
            && let Err(e) = fs::remove_dir_all(dir)
        {
            tracing::warn!(path = %dir.display(), error = %e, "scratch directory cleanup failed");
        }
    }
}
