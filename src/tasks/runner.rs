//! Async tick loop driving the engine.
//!
//! Ticks fire at the advance cadence (the faster of the two timers). Scans
//! are blocking filesystem work, so they run on the blocking pool with at
//! most one in flight; rescan triggers that become due mid-scan are skipped,
//! not queued, and the late result is applied once it arrives.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Configuration;
use crate::engine::{EngineOptions, ScanTicket, SlideshowEngine};
use crate::events::EngineStatus;
use crate::filter::FilterPredicate;
use crate::meta::FileMetadataReader;
use crate::scan::{self, ScanSnapshot};

pub async fn run(
    cfg: Configuration,
    status_tx: watch::Sender<EngineStatus>,
    cancel: CancellationToken,
) -> Result<()> {
    let roots: Arc<Vec<PathBuf>> = Arc::new(cfg.media_roots.clone());
    let predicate = Arc::new(FilterPredicate::from_config(&cfg));
    let reader = Arc::new(FileMetadataReader);

    let mut engine = SlideshowEngine::new(
        EngineOptions::from_config(&cfg),
        cfg.rng_seed,
        Instant::now(),
    );

    let (results_tx, mut results_rx) = mpsc::channel::<(ScanTicket, ScanSnapshot)>(1);
    let mut scan_in_flight = false;

    let mut ticker = time::interval(cfg.advance_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        roots = roots.len(),
        advance = %humantime::format_duration(cfg.advance_interval),
        refresh = %humantime::format_duration(cfg.refresh_interval),
        "slideshow runner starting"
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting runner");
                break;
            }

            _ = ticker.tick() => {
                let outcome = engine.on_tick(Instant::now());
                if outcome.rescan_due {
                    if scan_in_flight {
                        debug!("rescan due while a scan is in flight; skipping");
                    } else {
                        let ticket = engine.begin_rescan(Instant::now());
                        spawn_scan(
                            ticket,
                            roots.clone(),
                            predicate.clone(),
                            reader.clone(),
                            results_tx.clone(),
                        );
                        scan_in_flight = true;
                    }
                }
                publish(&status_tx, &engine);
            }

            Some((ticket, snapshot)) = results_rx.recv() => {
                scan_in_flight = false;
                if engine.apply_scan(ticket, snapshot) {
                    publish(&status_tx, &engine);
                }
            }
        }
    }

    Ok(())
}

fn spawn_scan(
    ticket: ScanTicket,
    roots: Arc<Vec<PathBuf>>,
    predicate: Arc<FilterPredicate>,
    reader: Arc<FileMetadataReader>,
    results_tx: mpsc::Sender<(ScanTicket, ScanSnapshot)>,
) {
    tokio::task::spawn_blocking(move || {
        let snapshot = scan::scan(&roots, &predicate, reader.as_ref());
        if results_tx.blocking_send((ticket, snapshot)).is_err() {
            warn!("runner gone before scan result could be delivered");
        }
    });
}

fn publish(status_tx: &watch::Sender<EngineStatus>, engine: &SlideshowEngine) {
    let status = engine.status();
    status_tx.send_if_modified(|current| {
        if *current != status {
            *current = status;
            true
        } else {
            false
        }
    });
}
