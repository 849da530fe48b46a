//! End-to-end runner test: real tempdir, real timers (shortened), watch
//! channel observed the way a presentation adapter would.

use std::fs;
use std::time::Duration;

use slideshow_helper::config::Configuration;
use slideshow_helper::events::EngineStatus;
use slideshow_helper::tasks::runner;
use tempfile::tempdir;
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// A valid minimal 1x1 RGBA PNG.
const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0xF8,
    0xCF, 0xC0, 0x00, 0x00, 0x03, 0x01, 0x01, 0x00, 0x18, 0xDD, 0x8D, 0x78, 0x00, 0x00, 0x00,
    0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

async fn wait_for(
    status_rx: &mut watch::Receiver<EngineStatus>,
    mut pred: impl FnMut(&EngineStatus) -> bool,
) -> EngineStatus {
    timeout(Duration::from_secs(10), async {
        loop {
            {
                let status = status_rx.borrow_and_update();
                if pred(&status) {
                    return status.clone();
                }
            }
            status_rx.changed().await.expect("runner dropped status channel");
        }
    })
    .await
    .expect("timed out waiting for engine status")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn runner_scans_publishes_and_advances() {
    let dir = tempdir().expect("tempdir");
    for name in ["a.png", "b.png", "c.png"] {
        fs::write(dir.path().join(name), PNG_BYTES).expect("write png");
    }
    fs::write(dir.path().join("note.txt"), "hello").expect("write txt");

    let cfg = Configuration {
        media_roots: vec![dir.path().to_path_buf()],
        advance_interval: Duration::from_millis(50),
        refresh_interval: Duration::from_millis(400),
        rng_seed: Some(1),
        ..Default::default()
    }
    .validated()
    .expect("valid test configuration");

    let (status_tx, mut status_rx) = watch::channel(EngineStatus::default());
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(runner::run(cfg, status_tx, cancel.clone()));

    // Startup scan lands and the first image is published.
    let status = wait_for(&mut status_rx, |s| s.current_path.is_some()).await;
    assert_eq!(status.matching_count, 3);
    assert_eq!(status.discovered_count, 3);
    assert_eq!(status.non_image_count, 1);
    assert_eq!(status.failed_count, 0);
    let first_version = status.version;

    // Advance boundaries keep bumping the version as the image changes.
    let status = wait_for(&mut status_rx, |s| s.version >= first_version + 2).await;
    assert!(status.current_path.is_some());

    cancel.cancel();
    handle
        .await
        .expect("runner task panicked")
        .expect("runner returned an error");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn runner_reports_empty_state_for_barren_roots() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("readme.md"), "no photos here").expect("write file");

    let cfg = Configuration {
        media_roots: vec![dir.path().to_path_buf()],
        advance_interval: Duration::from_millis(50),
        refresh_interval: Duration::from_millis(400),
        ..Default::default()
    }
    .validated()
    .expect("valid test configuration");

    let (status_tx, mut status_rx) = watch::channel(EngineStatus::default());
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(runner::run(cfg, status_tx, cancel.clone()));

    let status = wait_for(&mut status_rx, |s| s.non_image_count > 0).await;
    assert!(status.is_empty());
    assert_eq!(status.matching_count, 0);
    assert_eq!(status.discovered_count, 0);
    assert_eq!(status.non_image_count, 1);

    cancel.cancel();
    handle
        .await
        .expect("runner task panicked")
        .expect("runner returned an error");
}
