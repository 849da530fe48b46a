//! Binary entrypoint for the slideshow helper.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

use slideshow_helper::config::Configuration;
use slideshow_helper::events::EngineStatus;
use slideshow_helper::filter::FilterPredicate;
use slideshow_helper::meta::FileMetadataReader;
use slideshow_helper::{scan, tasks};

#[derive(Debug, Parser)]
#[command(
    name = "slideshow-helper",
    about = "Metadata-filtered slideshow engine for a directory of photos"
)]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE", default_value = "config.yaml")]
    config: PathBuf,

    /// Run a single scan, print the matching images, and exit
    #[arg(long)]
    once: bool,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("slideshow_helper={level}").parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let cfg = Configuration::from_yaml_file(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?
        .validated()
        .context("validating configuration")?;

    if cli.once {
        return scan_once(cfg).await;
    }

    let (status_tx, status_rx) = watch::channel(EngineStatus::default());
    let cancel = CancellationToken::new();

    let logger = tokio::spawn(log_status_changes(status_rx, cancel.clone()));
    let runner = tokio::spawn(tasks::runner::run(cfg, status_tx, cancel.clone()));

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    cancel.cancel();

    runner.await?.context("runner task failed")?;
    let _ = logger.await;
    Ok(())
}

/// One scan pass outside the engine: report what matches and exit.
async fn scan_once(cfg: Configuration) -> Result<()> {
    let predicate = FilterPredicate::from_config(&cfg);
    let roots = cfg.media_roots.clone();
    let snapshot =
        tokio::task::spawn_blocking(move || scan::scan(&roots, &predicate, &FileMetadataReader))
            .await?;

    for record in &snapshot.matching {
        println!("{}", record.path.display());
    }
    info!(
        discovered = snapshot.discovered.len(),
        matching = snapshot.matching.len(),
        failed = snapshot.failed_count,
        non_image = snapshot.non_image_count,
        "scan complete"
    );
    Ok(())
}

/// Stand-in presentation adapter: log every image change.
async fn log_status_changes(mut status_rx: watch::Receiver<EngineStatus>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = status_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = status_rx.borrow_and_update().clone();
                match &status.current_path {
                    Some(path) => info!(
                        version = status.version,
                        matching = status.matching_count,
                        discovered = status.discovered_count,
                        image = %path.display(),
                        "current image"
                    ),
                    None => info!(
                        discovered = status.discovered_count,
                        failed = status.failed_count,
                        "no matching images"
                    ),
                }
            }
        }
    }
}
