//! Error types for a rotation cycle.

use std::path::PathBuf;

use thiserror::Error;

use crate::download::DownloadError;

/// Failures reading or rewriting an album's download log.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Failed to read download log {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write download log {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum CycleError {
    /// Every candidate is inside the ignore window, or the album is empty.
    #[error("No new photos available to download ({candidates} candidates, {ignored} ignored)")]
    NoEligibleCandidates { candidates: usize, ignored: usize },

    #[error("Destination is not a directory: {0}")]
    DestinationNotDirectory(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Download(#[from] DownloadError),
}
