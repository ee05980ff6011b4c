//! Queue controller
//!
//! [`QueueController`] sequences queue items through a metadata fetch and a
//! transfer, one active item at a time: `Idle → Active → Idle` per run. Each
//! worker reports over a channel; the controller awaits those messages and
//! routes every outcome back into the queue, so callbacks for a task arrive
//! in order and the terminal message is always last.
//!
//! The queue itself is shared: external add/remove/clear calls may land
//! while a run is active. The controller therefore never caches an item
//! index across an await; the active item is re-resolved by scanning for
//! the single `Downloading` entry.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use chrono::Utc;
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::config::{Config, ItemOptions, TransferConfig};
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::metadata::fetch_metadata;
use crate::queue::QueueManager;
use crate::transfer::{TaskMessage, TransferTask};
use crate::types::{Event, MediaInfo, QueueSummary, Status};
use crate::utils::normalize_url;

/// Buffer size for the event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Monotonic counter disambiguating scratch directories created in the same
/// millisecond.
static SCRATCH_SEQ: AtomicU64 = AtomicU64::new(0);

/// Drives queue items through the two-phase pipeline
///
/// Cloneable: all shared state is Arc-wrapped, so a clone is a second handle
/// onto the same queue and run state, not a second queue.
#[derive(Clone)]
pub struct QueueController {
    engine: Arc<dyn Engine>,
    config: Config,
    queue: Arc<Mutex<QueueManager>>,
    event_tx: broadcast::Sender<Event>,
    /// Queue-wide cancel flag, consulted before starting each new item
    cancel_requested: Arc<AtomicBool>,
    /// Token of the in-flight transfer, when one exists
    active_transfer: Arc<Mutex<Option<CancellationToken>>>,
    /// Pending items bulk-cancelled outside the run loop, folded into the
    /// next summary
    bulk_cancelled: Arc<AtomicUsize>,
    /// Whether a run is active (one at a time across all clones)
    run_active: Arc<AtomicBool>,
}

impl QueueController {
    /// Create a controller over an empty queue.
    pub fn new(engine: Arc<dyn Engine>, config: Config) -> Self {
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            engine,
            config,
            queue: Arc::new(Mutex::new(QueueManager::new())),
            event_tx,
            cancel_requested: Arc::new(AtomicBool::new(false)),
            active_transfer: Arc::new(Mutex::new(None)),
            bulk_cancelled: Arc::new(AtomicUsize::new(0)),
            run_active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribe to controller events.
    ///
    /// Multiple subscribers are supported; a subscriber that falls behind by
    /// more than the channel capacity observes a lag error.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Shared handle to the underlying queue, for read access.
    pub fn queue(&self) -> Arc<Mutex<QueueManager>> {
        Arc::clone(&self.queue)
    }

    /// Fetch and normalize metadata for a URL without enqueueing anything.
    ///
    /// # Errors
    ///
    /// Engine failures surface as [`Error::Metadata`].
    pub async fn fetch_info(&self, url: &str) -> Result<MediaInfo> {
        fetch_metadata(self.engine.as_ref(), url).await
    }

    /// Enqueue a job. Returns its index at insertion time.
    pub async fn add(&self, url: impl Into<String>, options: ItemOptions) -> usize {
        let index = {
            let mut queue = self.queue.lock().await;
            queue.add(url, options)
        };
        self.emit(Event::QueueChanged);
        index
    }

    /// Enqueue a job with metadata already in hand.
    ///
    /// When the fetched record's canonical URLs match the enqueued URL, the
    /// item's title is set from the record immediately instead of waiting
    /// for the run-time fetch.
    pub async fn add_with_info(
        &self,
        url: impl Into<String>,
        options: ItemOptions,
        info: &MediaInfo,
    ) -> usize {
        let url = url.into();
        let title = known_title(&url, info);
        let index = {
            let mut queue = self.queue.lock().await;
            let index = queue.add(url, options);
            if let Some(title) = title {
                queue.update_title(index, title);
            }
            index
        };
        self.emit(Event::QueueChanged);
        index
    }

    /// Remove the item at `index`; see [`QueueManager::remove`] for the
    /// state rules.
    pub async fn remove(&self, index: usize) -> bool {
        let removed = {
            let mut queue = self.queue.lock().await;
            queue.remove(index)
        };
        if removed {
            self.emit(Event::QueueChanged);
        }
        removed
    }

    /// Remove every item in a terminal state.
    pub async fn clear_finished(&self) -> bool {
        let changed = {
            let mut queue = self.queue.lock().await;
            queue.clear_finished()
        };
        if changed {
            self.emit(Event::QueueChanged);
        }
        changed
    }

    /// Cancel the active item and remove everything, including active
    /// entries.
    pub async fn clear_all(&self) -> bool {
        self.request_cancel();
        let changed = {
            let mut queue = self.queue.lock().await;
            queue.clear_all()
        };
        if changed {
            self.emit(Event::QueueChanged);
        }
        changed
    }

    /// Cancel the active item.
    ///
    /// Sets the queue-wide flag and forwards cancellation into the in-flight
    /// transfer, if any. Advisory and cooperative: a transfer mid-operation
    /// may take time to unwind.
    pub fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
        if let Ok(active) = self.active_transfer.try_lock()
            && let Some(token) = active.as_ref()
        {
            token.cancel();
        }
        // Losing the try_lock race means the run loop is mid-swap; the flag
        // above is re-checked right after the token is registered
    }

    /// Cancel the active item and bulk-mark every still-Pending item
    /// Cancelled in one pass.
    pub async fn request_cancel_all(&self) {
        self.request_cancel();
        let marked = {
            let mut queue = self.queue.lock().await;
            queue.cancel_pending()
        };
        if marked > 0 {
            self.bulk_cancelled.fetch_add(marked, Ordering::SeqCst);
            self.emit(Event::QueueChanged);
        }
    }

    /// Process the queue until no Pending item remains.
    ///
    /// Marks each item Downloading, fetches metadata, builds the transfer
    /// configuration from the item's captured options, runs the transfer,
    /// and routes the outcome. Returns (and broadcasts) the summary counts.
    ///
    /// At most one run is active at a time across all clones; a second call
    /// while active returns an empty summary without touching the queue.
    pub async fn run(&self) -> QueueSummary {
        if self.run_active.swap(true, Ordering::SeqCst) {
            tracing::warn!("queue run already active, ignoring");
            return QueueSummary::default();
        }
        let summary = self.run_inner().await;
        self.run_active.store(false, Ordering::SeqCst);
        summary
    }

    async fn run_inner(&self) -> QueueSummary {
        let mut summary = QueueSummary::default();
        tracing::info!("queue run started");

        loop {
            let next = {
                let mut queue = self.queue.lock().await;
                let found = queue
                    .get_next_pending()
                    .map(|(index, item)| (index, item.url.clone(), item.options.clone()));
                if let Some((index, _, _)) = &found {
                    queue.update_status(*index, Status::Downloading, "");
                    queue.update_progress(*index, 0.0);
                }
                found
            };
            let Some((index, url, options)) = next else {
                break;
            };

            self.emit(Event::ItemStarted {
                index,
                url: url.clone(),
            });
            self.emit(Event::QueueChanged);

            // Queue-wide cancel arriving before the metadata fetch marks the
            // item without contacting the engine
            if self.cancel_requested.swap(false, Ordering::SeqCst) {
                if self
                    .finish_active(Status::Cancelled, "Cancelled by user")
                    .await
                    .is_some()
                {
                    summary.cancelled += 1;
                }
                continue;
            }

            let engine = Arc::clone(&self.engine);
            let fetch_url = url.clone();
            let fetched =
                match tokio::spawn(async move { fetch_metadata(engine.as_ref(), &fetch_url).await })
                    .await
                {
                    Ok(result) => result,
                    Err(join_error) => Err(Error::Metadata(join_error.to_string())),
                };

            if self.cancel_requested.swap(false, Ordering::SeqCst) {
                if self
                    .finish_active(Status::Cancelled, "Cancelled by user")
                    .await
                    .is_some()
                {
                    summary.cancelled += 1;
                }
                continue;
            }

            let info = match fetched {
                Ok(info) => info,
                Err(e) => {
                    if self
                        .finish_active(Status::Error, e.display_message())
                        .await
                        .is_some()
                    {
                        summary.failed += 1;
                    }
                    continue;
                }
            };

            if let Some(title) = info.title.as_deref().filter(|t| !t.trim().is_empty()) {
                let mut queue = self.queue.lock().await;
                if let Some(active) = downloading_index(&queue) {
                    queue.update_title(active, title);
                }
                drop(queue);
                self.emit(Event::QueueChanged);
            }

            let scratch_dir = (!options.playlist).then(|| self.new_scratch_dir());
            let transfer_config =
                match TransferConfig::build(&self.config, &options, &info, scratch_dir.as_deref()) {
                    Ok(config) => config,
                    Err(e) => {
                        if self
                            .finish_active(Status::Error, e.display_message())
                            .await
                            .is_some()
                        {
                            summary.failed += 1;
                        }
                        continue;
                    }
                };

            match self.run_transfer(&url, transfer_config).await {
                Ok(message) => {
                    if let Some(index) = self.finish_active(Status::Finished, "").await {
                        summary.finished += 1;
                        self.emit(Event::ItemFinished { index, message });
                    }
                }
                Err(e) if e.is_cancelled() => {
                    // The cancel that killed this transfer must not leak
                    // into the next item
                    self.cancel_requested.store(false, Ordering::SeqCst);
                    if self
                        .finish_active(Status::Cancelled, "Cancelled.")
                        .await
                        .is_some()
                    {
                        summary.cancelled += 1;
                    }
                }
                Err(e) => {
                    if self
                        .finish_active(Status::Error, e.display_message())
                        .await
                        .is_some()
                    {
                        summary.failed += 1;
                    }
                }
            }
        }

        summary.cancelled += self.bulk_cancelled.swap(0, Ordering::SeqCst);
        self.cancel_requested.store(false, Ordering::SeqCst);
        tracing::info!(
            finished = summary.finished,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "queue run complete"
        );
        self.emit(Event::QueueFinished { summary });
        summary
    }

    /// Run one non-queued transfer for `url`, reporting progress through
    /// `on_progress` and returning the terminal outcome directly.
    ///
    /// Metadata and transfer failures surface as the returned error instead
    /// of being recorded on a queue item. [`Self::request_cancel`] cancels a
    /// single download just like a queued one.
    pub async fn download_single<F>(
        &self,
        url: &str,
        options: ItemOptions,
        mut on_progress: F,
    ) -> Result<String>
    where
        F: FnMut(f32, String),
    {
        let info = fetch_metadata(self.engine.as_ref(), url).await?;

        let scratch_dir = (!options.playlist).then(|| self.new_scratch_dir());
        let transfer_config =
            TransferConfig::build(&self.config, &options, &info, scratch_dir.as_deref())?;

        let token = CancellationToken::new();
        *self.active_transfer.lock().await = Some(token.clone());
        if self.cancel_requested.load(Ordering::SeqCst) {
            token.cancel();
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = Arc::clone(&self.engine);
        let task = TransferTask::new(url, transfer_config, token);
        let worker = tokio::spawn(async move { task.run(engine.as_ref(), tx).await });

        let mut terminal: Option<Result<String>> = None;
        while let Some(message) = rx.recv().await {
            match message {
                TaskMessage::Progress { percent, text } => on_progress(percent, text),
                TaskMessage::Done(result) => terminal = Some(result),
            }
        }
        worker.await.ok();
        *self.active_transfer.lock().await = None;
        self.cancel_requested.store(false, Ordering::SeqCst);

        terminal.unwrap_or_else(|| {
            Err(Error::Other(
                "transfer worker ended without a terminal message".into(),
            ))
        })
    }

    /// Spawn the transfer worker for the active item and consume its
    /// messages until the terminal one.
    async fn run_transfer(&self, url: &str, config: TransferConfig) -> Result<String> {
        let token = CancellationToken::new();
        *self.active_transfer.lock().await = Some(token.clone());
        // A cancel that raced the token registration still lands
        if self.cancel_requested.load(Ordering::SeqCst) {
            token.cancel();
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = Arc::clone(&self.engine);
        let task = TransferTask::new(url, config, token);
        let worker = tokio::spawn(async move { task.run(engine.as_ref(), tx).await });

        let mut terminal: Option<Result<String>> = None;
        while let Some(message) = rx.recv().await {
            match message {
                TaskMessage::Progress { percent, text } => {
                    let mut queue = self.queue.lock().await;
                    if let Some(active) = downloading_index(&queue) {
                        queue.update_progress(active, percent);
                        drop(queue);
                        self.emit(Event::Progress {
                            index: active,
                            percent,
                            text,
                        });
                    }
                }
                TaskMessage::Done(result) => terminal = Some(result),
            }
        }
        // The worker has fully terminated before the next one may start
        worker.await.ok();
        *self.active_transfer.lock().await = None;

        terminal.unwrap_or_else(|| {
            Err(Error::Other(
                "transfer worker ended without a terminal message".into(),
            ))
        })
    }

    /// Move the active (Downloading) item into a terminal state.
    ///
    /// Returns the routed item's index, or None when the active entry
    /// vanished through an external `clear_all`. Finished items get their
    /// progress forced to 100.
    async fn finish_active(&self, status: Status, error_message: impl Into<String>) -> Option<usize> {
        let error_message = error_message.into();
        let index = {
            let mut queue = self.queue.lock().await;
            let index = downloading_index(&queue)?;
            queue.update_status(index, status, error_message.clone());
            if status == Status::Finished {
                queue.update_progress(index, 100.0);
            }
            index
        };

        match status {
            Status::Cancelled => self.emit(Event::ItemCancelled { index }),
            Status::Error => self.emit(Event::ItemFailed {
                index,
                error: error_message,
            }),
            _ => {}
        }
        self.emit(Event::QueueChanged);
        Some(index)
    }

    /// Unique scratch directory path for one transfer attempt.
    fn new_scratch_dir(&self) -> std::path::PathBuf {
        let seq = SCRATCH_SEQ.fetch_add(1, Ordering::Relaxed);
        self.config
            .temp_dir
            .join(format!("transfer-{}-{seq}", Utc::now().timestamp_millis()))
    }

    /// Broadcast an event, dropping it when nobody subscribes.
    fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}

/// Index of the single Downloading item, re-resolved by scanning so
/// concurrent queue mutation cannot misdirect an update.
fn downloading_index(queue: &QueueManager) -> Option<usize> {
    queue
        .items()
        .iter()
        .position(|item| item.status == Status::Downloading)
}

/// Title from a fetched record, but only when its canonical URLs match the
/// URL being enqueued.
fn known_title(url: &str, info: &MediaInfo) -> Option<String> {
    let title = info.title.as_deref()?.trim();
    if title.is_empty() {
        return None;
    }

    let normalized = normalize_url(url);
    let matches = [info.webpage_url.as_deref(), info.original_url.as_deref()]
        .into_iter()
        .flatten()
        .any(|candidate| normalize_url(candidate) == normalized);

    matches.then(|| title.to_string())
}
