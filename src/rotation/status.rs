use std::path::PathBuf;

use chrono::{DateTime, Local};

/// Per-album status published after every cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadStatus {
    pub last_downloaded: Option<String>,
    pub downloaded_count: u64,
    pub last_download_timestamp: Option<DateTime<Local>>,
}

impl DownloadStatus {
    /// ISO-8601 form of the last download time.
    pub fn timestamp_iso(&self) -> Option<String> {
        self.last_download_timestamp.map(|t| t.to_rfc3339())
    }

    /// Status after a cycle that wrote `image_file`.
    pub(crate) fn downloaded(&self, image_file: String, at: DateTime<Local>) -> Self {
        Self {
            last_downloaded: Some(image_file),
            downloaded_count: self.downloaded_count + 1,
            last_download_timestamp: Some(at),
        }
    }

    /// Status after a cycle that found nothing to download. Count and
    /// timestamp are kept.
    pub(crate) fn cleared(&self) -> Self {
        Self {
            last_downloaded: None,
            ..self.clone()
        }
    }
}

/// What a completed cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A photo was chosen and recorded. `file` is the written image, or
    /// `None` when fetching its bytes failed; the ledger still records the
    /// attempt.
    Downloaded {
        guid: String,
        source_filename: String,
        file: Option<PathBuf>,
    },
    NoCandidates { candidates: usize, ignored: usize },
    /// The album listing could not be fetched. Nothing on disk was touched.
    StreamFetchFailed { reason: String },
}

/// Result of one cycle, handed back to the caller for publishing.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub status: DownloadStatus,
    /// Whether `status` differs from the status the cycle started with.
    pub changed: bool,
}

impl CycleReport {
    pub(crate) fn new(
        outcome: CycleOutcome,
        previous: &DownloadStatus,
        status: DownloadStatus,
    ) -> Self {
        Self {
            changed: status != *previous,
            outcome,
            status,
        }
    }
}
