//! End-to-end queue pipeline tests against the public API.
//!
//! A mock engine stands in for the real retrieval binding; everything else
//! (queue, controller, transfer tasks, placement) runs for real against
//! temporary directories.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tempfile::TempDir;

use media_dl::engine::ProgressHook;
use media_dl::{
    Config, Engine, Error, Event, ExtractOptions, HookAction, ItemOptions, ProgressUpdate,
    QueueController, QueueSummary, RawFormat, RawMetadata, Result, Status, TransferConfig,
};

/// Engine that serves one 1080p format and writes a merged mp4 artifact.
struct FakeEngine {
    transfers: AtomicUsize,
}

impl FakeEngine {
    fn new() -> Self {
        Self {
            transfers: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Engine for FakeEngine {
    async fn extract_info(&self, url: &str, options: &ExtractOptions) -> Result<RawMetadata> {
        assert!(options.no_playlist, "metadata fetches are single-item");
        if url.contains("restricted") {
            return Err(Error::Other(
                "Sign in to confirm your age. This video may be inappropriate for some users."
                    .into(),
            ));
        }
        Ok(RawMetadata {
            title: Some("Big Buck Bunny".into()),
            webpage_url: Some(url.to_string()),
            formats: vec![RawFormat {
                format_id: "137".into(),
                ext: "mp4".into(),
                vcodec: Some("avc1.640028".into()),
                acodec: Some("none".into()),
                height: Some(1080),
                width: Some(1920),
                fps: Some(30.0),
                tbr: Some(4500.0),
                ..Default::default()
            }],
            ..Default::default()
        })
    }

    async fn transfer(
        &self,
        url: &str,
        config: &TransferConfig,
        hook: ProgressHook<'_>,
    ) -> Result<()> {
        self.transfers.fetch_add(1, Ordering::SeqCst);
        if url.contains("broken") {
            return Err(Error::Transfer("HTTP Error 500: Internal Server Error".into()));
        }

        for downloaded in [0u64, 4 << 20, 8 << 20] {
            let action = hook(ProgressUpdate::Transferring {
                downloaded_bytes: downloaded,
                total_bytes: Some(8 << 20),
                speed: Some("2.0MiB/s".into()),
                eta: Some("00:04".into()),
            });
            if action == HookAction::Abort {
                return Err(Error::Cancelled);
            }
        }
        hook(ProgressUpdate::PostProcessing);

        let scratch = config.scratch_dir.as_ref().expect("single-artifact mode");
        std::fs::write(scratch.join("Big Buck Bunny.mp4"), vec![0u8; 64]).unwrap();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

fn controller_with(engine: Arc<FakeEngine>) -> (QueueController, TempDir, TempDir) {
    let dest = TempDir::new().unwrap();
    let temp = TempDir::new().unwrap();
    let config = Config {
        download_dir: dest.path().to_path_buf(),
        temp_dir: temp.path().to_path_buf(),
        ..Default::default()
    };
    (
        QueueController::new(engine as Arc<dyn Engine>, config),
        dest,
        temp,
    )
}

#[tokio::test]
async fn mixed_queue_routes_every_outcome_and_reports_summary() {
    let engine = Arc::new(FakeEngine::new());
    let (controller, dest, temp) = controller_with(engine.clone());

    controller
        .add("https://example.com/watch?v=ok1", ItemOptions::default())
        .await;
    controller
        .add("https://example.com/watch?v=restricted", ItemOptions::default())
        .await;
    controller
        .add("https://example.com/watch?v=broken", ItemOptions::default())
        .await;

    let mut events = controller.subscribe();
    let summary = controller.run().await;

    assert_eq!(
        summary,
        QueueSummary {
            finished: 1,
            failed: 2,
            cancelled: 0,
        }
    );

    let queue = controller.queue();
    let queue = queue.lock().await;
    assert_eq!(queue.get(0).unwrap().status, Status::Finished);
    assert_eq!(queue.get(0).unwrap().title, "Big Buck Bunny");
    assert_eq!(queue.get(0).unwrap().progress, 100.0);
    assert_eq!(queue.get(1).unwrap().status, Status::Error);
    assert!(queue.get(1).unwrap().error_message.contains("Sign in"));
    assert_eq!(queue.get(2).unwrap().status, Status::Error);
    drop(queue);

    // The metadata failure never reached the transfer stage
    assert_eq!(engine.transfers.load(Ordering::SeqCst), 2);

    // The artifact landed in the destination, scratch dirs are gone
    assert!(dest.path().join("Big Buck Bunny.mp4").is_file());
    assert_eq!(
        std::fs::read_dir(temp.path()).unwrap().count(),
        0,
        "every scratch directory is removed"
    );

    // The summary event is broadcast after the per-item events
    let mut saw_finished_event = false;
    let mut saw_summary = false;
    while let Ok(event) = events.try_recv() {
        match event {
            Event::ItemFinished { index, .. } => {
                assert_eq!(index, 0);
                saw_finished_event = true;
            }
            Event::QueueFinished { summary } => {
                assert_eq!(summary.finished, 1);
                saw_summary = true;
            }
            _ => {}
        }
    }
    assert!(saw_finished_event);
    assert!(saw_summary);
}

#[tokio::test]
async fn video_suffix_from_selected_format_reaches_the_placed_file() {
    let engine = Arc::new(FakeEngine::new());
    let (controller, dest, _temp) = controller_with(engine);

    let options = ItemOptions {
        video_format_id: Some("137".into()),
        video_ext: Some("mp4".into()),
        ..Default::default()
    };
    controller
        .add("https://example.com/watch?v=ok", options)
        .await;
    let summary = controller.run().await;

    assert_eq!(summary.finished, 1);
    assert!(
        dest.path()
            .join("Big Buck Bunny [1920x1080 avc1].mp4")
            .is_file(),
        "the selected format's resolution and codec are appended"
    );
}

#[tokio::test]
async fn rerunning_after_clear_finished_leaves_an_empty_queue() {
    let engine = Arc::new(FakeEngine::new());
    let (controller, _dest, _temp) = controller_with(engine);

    controller
        .add("https://example.com/watch?v=ok", ItemOptions::default())
        .await;
    controller.run().await;

    assert!(controller.clear_finished().await);
    let queue = controller.queue();
    assert!(queue.lock().await.is_empty());

    // A run over an empty queue reports an empty summary
    let summary = controller.run().await;
    assert_eq!(summary, QueueSummary::default());
}
