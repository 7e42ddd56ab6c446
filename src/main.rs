//! icloud-album-rotator: show one photo at a time from public iCloud
//! shared albums.
//!
//! Each rotation cycle resolves the album's partition host from its share
//! token, lists the album through the shared streams API, picks a photo not
//! shown recently, and overwrites `{destination}/{id}.jpg` with it. A small
//! per-album log of past picks keeps repeats away.

#![warn(clippy::all)]

mod cli;
mod config;
mod download;
mod icloud;
pub mod retry;
mod rotation;
mod shutdown;
mod types;

use std::sync::Arc;

use clap::Parser;
use futures_util::future::join_all;
use tracing_subscriber::EnvFilter;

use cli::Command;
use icloud::StreamTransport;
use rotation::{AlbumRotator, CycleOutcome, CycleReport, DownloadStatus, Ledger};

/// Publish a finished cycle: structured log line plus a short terminal note.
async fn publish(rotator: &AlbumRotator, report: &CycleReport) {
    let settings = rotator.settings();
    if report.changed {
        let image_bytes = rotator
            .current_image(&report.status)
            .await
            .map(|b| b.len())
            .unwrap_or(0);
        tracing::info!(
            album = %settings.id,
            name = %settings.name,
            last_downloaded = report.status.last_downloaded.as_deref().unwrap_or("-"),
            downloaded_count = report.status.downloaded_count,
            last_download_timestamp = report.status.timestamp_iso().as_deref().unwrap_or("-"),
            image_bytes,
            "Status updated"
        );
    } else {
        tracing::debug!(album = %settings.id, "Status unchanged");
    }
    match &report.outcome {
        CycleOutcome::Downloaded {
            source_filename,
            file: Some(file),
            ..
        } => println!(
            "{}: now showing {} ({})",
            settings.name,
            source_filename,
            file.display()
        ),
        CycleOutcome::Downloaded {
            source_filename,
            file: None,
            ..
        } => println!("{}: failed to download {}", settings.name, source_filename),
        CycleOutcome::NoCandidates { .. } => {
            println!("{}: no new photos available", settings.name)
        }
        CycleOutcome::StreamFetchFailed { reason } => {
            println!("{}: could not reach the album ({})", settings.name, reason)
        }
    }
}

/// Run the rotate command.
async fn run_rotate(args: cli::RotateArgs) -> anyhow::Result<()> {
    let config = config::Config::from_cli(args)?;
    tracing::info!(albums = config.albums.len(), "Starting icloud-album-rotator");

    let transport: Arc<dyn StreamTransport> =
        Arc::new(icloud::transport::build_client(config.timeout_secs)?);
    let rotators: Vec<AlbumRotator> = config
        .albums
        .into_iter()
        .map(|settings| AlbumRotator::new(settings, transport.clone(), config.retry))
        .collect();
    let mut statuses = vec![DownloadStatus::default(); rotators.len()];

    let shutdown_token = shutdown::install_signal_handler()?;

    loop {
        // Albums rotate concurrently; each album has one cycle in flight.
        let results = join_all(
            rotators
                .iter()
                .zip(&statuses)
                .map(|(rotator, status)| rotator.run_cycle(status)),
        )
        .await;

        let mut failed = 0usize;
        for ((rotator, status), result) in rotators.iter().zip(statuses.iter_mut()).zip(results) {
            match result {
                Ok(report) => {
                    if matches!(report.outcome, CycleOutcome::StreamFetchFailed { .. }) {
                        failed += 1;
                    }
                    publish(rotator, &report).await;
                    *status = report.status;
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!(album = %rotator.settings().id, error = %e, "Rotation cycle failed");
                }
            }
        }

        let Some(interval) = config.watch_with_interval else {
            if failed > 0 {
                anyhow::bail!("{} of {} albums failed to rotate", failed, rotators.len());
            }
            break;
        };
        if shutdown_token.is_cancelled() {
            tracing::info!("Shutdown requested, exiting...");
            break;
        }
        tracing::info!("Waiting {} seconds...", interval);
        tokio::select! {
            _ = tokio::time::sleep(std::time::Duration::from_secs(interval)) => {}
            _ = shutdown_token.cancelled() => {
                tracing::info!("Shutdown during wait, exiting...");
                break;
            }
        }
    }

    Ok(())
}

/// Run the status command.
async fn run_status(args: cli::AlbumArgs) -> anyhow::Result<()> {
    let albums = config::load_albums(&args)?;

    for album in &albums {
        let ledger = Ledger::load(&album.ledger_path()).await?;
        println!("{} ({})", album.name, album.id);
        println!(
            "  Host:        {} (partition {})",
            album.token.host(),
            album.token.partition()
        );
        println!("  Destination: {}", album.destination.display());
        match tokio::fs::metadata(album.image_path()).await {
            Ok(meta) => println!(
                "  Image:       {} ({} bytes)",
                album.image_path().display(),
                meta.len()
            ),
            Err(_) => println!("  Image:       none yet"),
        }
        match album.policy.retention() {
            Some(limit) => println!("  History:     {} of {} entries", ledger.len(), limit),
            None => println!("  History:     {} entries", ledger.len()),
        }
        if ledger.is_empty() {
            println!("    no downloads yet");
        }
        for entry in ledger.entries() {
            println!(
                "    {}  {}",
                entry.guid(),
                entry.source_filename().unwrap_or("")
            );
        }
        println!();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    match cli.command {
        Command::Rotate(args) => run_rotate(args).await,
        Command::Status(args) => run_status(args).await,
    }
}
