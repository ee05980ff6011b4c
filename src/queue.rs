//! Queue state machine
//!
//! [`QueueManager`] owns the ordered list of jobs and exposes pure state
//! transitions over it. Identity is positional: every operation takes an
//! index into the insertion-ordered sequence and validates it before
//! mutating. Items are never reordered; "next pending" is always the
//! lowest-index Pending item.

use chrono::Utc;

use crate::config::ItemOptions;
use crate::types::{QueueItem, Status};

/// Ordered list of jobs and their lifecycle state
#[derive(Debug, Default)]
pub struct QueueManager {
    items: Vec<QueueItem>,
}

impl QueueManager {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new item with status Pending and return its index.
    ///
    /// The title starts as the URL and is replaced once metadata arrives.
    pub fn add(&mut self, url: impl Into<String>, options: ItemOptions) -> usize {
        let url = url.into();
        self.items.push(QueueItem {
            title: url.clone(),
            url,
            status: Status::Pending,
            mode: options.mode,
            options,
            error_message: String::new(),
            progress: 0.0,
            created_at: Utc::now(),
        });
        self.items.len() - 1
    }

    /// Remove the item at `index`.
    ///
    /// Succeeds only for Pending, Finished, and Error items; Downloading and
    /// Cancelled-while-active items stay put. Returns whether anything was
    /// removed.
    pub fn remove(&mut self, index: usize) -> bool {
        let Some(item) = self.items.get(index) else {
            return false;
        };
        if !item.status.is_removable() {
            return false;
        }
        self.items.remove(index);
        true
    }

    /// Remove every item in a terminal state (Finished, Error, Cancelled).
    ///
    /// Returns whether the queue changed.
    pub fn clear_finished(&mut self) -> bool {
        let before = self.items.len();
        self.items
            .retain(|item| !item.status.is_cleared_as_finished());
        self.items.len() != before
    }

    /// Remove everything unconditionally. Returns whether the queue was
    /// non-empty.
    pub fn clear_all(&mut self) -> bool {
        if self.items.is_empty() {
            return false;
        }
        self.items.clear();
        true
    }

    /// First item, in insertion order, with status Pending.
    pub fn get_next_pending(&self) -> Option<(usize, &QueueItem)> {
        self.items
            .iter()
            .enumerate()
            .find(|(_, item)| item.status == Status::Pending)
    }

    /// All items, in insertion order.
    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    /// Item at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<&QueueItem> {
        self.items.get(index)
    }

    /// Number of items with status Pending.
    pub fn count_pending(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.status == Status::Pending)
            .count()
    }

    /// Whether the queue holds no items at all.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Set the status (and error message) of the item at `index`.
    ///
    /// Returns false when the index is out of range.
    pub fn update_status(
        &mut self,
        index: usize,
        status: Status,
        error_message: impl Into<String>,
    ) -> bool {
        let Some(item) = self.items.get_mut(index) else {
            return false;
        };
        item.status = status;
        item.error_message = error_message.into();
        true
    }

    /// Set the display title of the item at `index`.
    pub fn update_title(&mut self, index: usize, title: impl Into<String>) -> bool {
        let Some(item) = self.items.get_mut(index) else {
            return false;
        };
        item.title = title.into();
        true
    }

    /// Set the progress of the item at `index`, clamped to [0, 100].
    pub fn update_progress(&mut self, index: usize, progress: f32) -> bool {
        let Some(item) = self.items.get_mut(index) else {
            return false;
        };
        item.progress = progress.clamp(0.0, 100.0);
        true
    }

    /// Mark every still-Pending item Cancelled in one pass.
    ///
    /// Returns how many items were marked.
    pub fn cancel_pending(&mut self) -> usize {
        let mut marked = 0;
        for item in &mut self.items {
            if item.status == Status::Pending {
                item.status = Status::Cancelled;
                marked += 1;
            }
        }
        marked
    }
}
