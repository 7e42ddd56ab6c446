//! Photo rotation: pick one photo the album has not shown recently,
//! download it to a stable per-album file, and record it in the ledger.

pub mod error;
pub mod ledger;
pub mod selector;
pub mod status;

use std::path::PathBuf;

pub use ledger::Ledger;
pub use selector::AlbumRotator;
pub use status::{CycleOutcome, CycleReport, DownloadStatus};

use crate::icloud::ShareToken;

/// Repeat-avoidance and retention knobs. Zero disables either one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Size of the ignore window: the last `ignore` photos are not picked again.
    pub ignore: usize,
    /// Ledger length kept when no ignore window is set.
    pub log_downloads: usize,
}

impl RotationPolicy {
    /// Maximum ledger length, or `None` when the ledger is unbounded.
    pub fn retention(&self) -> Option<usize> {
        if self.ignore > 0 {
            Some(self.ignore)
        } else if self.log_downloads > 0 {
            Some(self.log_downloads)
        } else {
            None
        }
    }
}

/// Validated settings for one album.
#[derive(Debug, Clone)]
pub struct AlbumSettings {
    pub id: String,
    pub name: String,
    pub token: ShareToken,
    pub destination: PathBuf,
    pub policy: RotationPolicy,
}

impl AlbumSettings {
    /// `{destination}/{id}.jpg`, overwritten every cycle.
    pub fn image_file_name(&self) -> String {
        format!("{}.jpg", self.id)
    }

    pub fn image_path(&self) -> PathBuf {
        self.destination.join(self.image_file_name())
    }

    pub fn ledger_path(&self) -> PathBuf {
        Ledger::path_for(&self.destination, &self.id)
    }
}
