//! External retrieval engine abstraction
//!
//! The engine performs format discovery, protocol negotiation, and
//! transcoding; this crate only orchestrates it. The core abstraction is the
//! [`Engine`] trait, consumed by the metadata and transfer tasks through two
//! calls: a fast single-item metadata extraction and a transfer driven by a
//! progress hook. The hook's return value doubles as the cancellation
//! channel — returning [`HookAction::Abort`] tells the engine binding to
//! unwind the in-flight call.
//!
//! [`NoOpEngine`] ships for graceful degradation when no binding is wired up,
//! mirroring how a missing external tool degrades instead of panicking.

mod locate;
mod noop;
mod traits;

pub use locate::{ToolLocation, ffmpeg_location};
pub use noop::NoOpEngine;
pub use traits::{
    Engine, ExtractOptions, HookAction, ProgressHook, ProgressUpdate, RawFormat, RawMetadata,
    RawSubtitleTrack,
};
