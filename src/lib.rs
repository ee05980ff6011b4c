//! # media-dl
//!
//! Queue-driven backend library for media download applications.
//!
//! ## Design Philosophy
//!
//! media-dl is designed to be:
//! - **Engine-agnostic** - the retrieval engine is a trait; bind whatever
//!   actually fetches media
//! - **Library-first** - no CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - consumers subscribe to events, no polling required
//! - **Cooperative** - cancellation is a token checked at the engine's hook
//!   boundary, never preemptive
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use media_dl::{Config, ItemOptions, NoOpEngine, QueueController};
//!
//! #[tokio::main]
//! async fn main() {
//!     // Substitute a real engine binding for NoOpEngine
//!     let controller = QueueController::new(Arc::new(NoOpEngine), Config::default());
//!
//!     // Subscribe to events
//!     let mut events = controller.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     controller
//!         .add("https://example.com/watch?v=abc", ItemOptions::default())
//!         .await;
//!     let summary = controller.run().await;
//!     println!(
//!         "{} finished, {} failed, {} cancelled",
//!         summary.finished, summary.failed, summary.cancelled
//!     );
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Queue controller
pub mod controller;
/// Retrieval engine abstraction
pub mod engine;
/// Error types
pub mod error;
/// Subtitle language table
pub mod languages;
/// Metadata fetch and normalization
pub mod metadata;
/// Artifact location and placement
pub mod placement;
/// Queue state machine
pub mod queue;
/// Progress event rate limiting
pub mod throttle;
/// Transfer task
pub mod transfer;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, EngineResilience, ItemOptions, PostProcessor, TransferConfig};
pub use controller::QueueController;
pub use engine::{
    Engine, ExtractOptions, HookAction, NoOpEngine, ProgressUpdate, RawFormat, RawMetadata,
    ToolLocation, ffmpeg_location,
};
pub use error::{Error, PlacementError, Result};
pub use metadata::fetch_metadata;
pub use queue::QueueManager;
pub use throttle::ProgressThrottle;
pub use transfer::{TaskMessage, TransferTask};
pub use types::{
    Event, MediaFormat, MediaInfo, Mode, QueueItem, QueueSummary, Status, SubtitleSelection,
};
