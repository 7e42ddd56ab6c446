use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, error, info, warn};

use super::error::CycleError;
use super::ledger::{Ledger, LedgerEntry};
use super::status::{CycleOutcome, CycleReport, DownloadStatus};
use super::AlbumSettings;
use crate::download;
use crate::icloud::assets::source_filename;
use crate::icloud::{CandidateSet, SharedStreamClient, StreamTransport};
use crate::retry::RetryConfig;

/// Uniformly pick one candidate GUID outside the ignore set.
pub fn select_photo<'a, R: Rng + ?Sized>(
    candidates: &'a CandidateSet,
    ignore: &HashSet<String>,
    rng: &mut R,
) -> Result<&'a str, CycleError> {
    // Sorted so a seeded rng gives the same pick regardless of map order.
    let mut eligible: Vec<&str> = candidates
        .keys()
        .map(String::as_str)
        .filter(|guid| !ignore.contains(*guid))
        .collect();
    eligible.sort_unstable();
    debug!(available = eligible.len(), "Eligible photos");
    eligible
        .choose(rng)
        .copied()
        .ok_or(CycleError::NoEligibleCandidates {
            candidates: candidates.len(),
            ignored: candidates.len() - eligible.len(),
        })
}

/// Create the destination directory if needed; refuse a non-directory path.
async fn ensure_destination(destination: &Path) -> Result<(), CycleError> {
    let io_err = |source| CycleError::Io {
        path: destination.to_path_buf(),
        source,
    };
    match tokio::fs::metadata(destination).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(CycleError::DestinationNotDirectory(
            destination.to_path_buf(),
        )),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tokio::fs::create_dir_all(destination).await.map_err(io_err)
        }
        Err(e) => Err(io_err(e)),
    }
}

/// Runs rotation cycles for one album. Holds no state between cycles other
/// than what lives on disk; the caller owns the [`DownloadStatus`].
pub struct AlbumRotator {
    settings: AlbumSettings,
    client: SharedStreamClient,
    transport: Arc<dyn StreamTransport>,
}

impl std::fmt::Debug for AlbumRotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlbumRotator")
            .field("id", &self.settings.id)
            .field("destination", &self.settings.destination)
            .field("policy", &self.settings.policy)
            .finish_non_exhaustive()
    }
}

impl AlbumRotator {
    pub fn new(
        settings: AlbumSettings,
        transport: Arc<dyn StreamTransport>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            client: SharedStreamClient::new(transport.clone(), retry),
            settings,
            transport,
        }
    }

    pub fn settings(&self) -> &AlbumSettings {
        &self.settings
    }

    /// Run one cycle: fetch candidates, pick one outside the ignore window,
    /// download it over the album image, then append to and trim the ledger.
    ///
    /// A failed album listing is a `StreamFetchFailed` outcome with `status`
    /// unchanged. `Err` is reserved for local failures (destination, ledger,
    /// disk); `status` still stands then too.
    pub async fn run_cycle(&self, status: &DownloadStatus) -> Result<CycleReport, CycleError> {
        let settings = &self.settings;
        debug!(album = %settings.id, host = %settings.token.host(), "Starting rotation cycle");

        let candidates = match self.client.fetch_candidates(&settings.token).await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!(album = %settings.id, error = %e, "Could not retrieve item stream");
                return Ok(CycleReport::new(
                    CycleOutcome::StreamFetchFailed {
                        reason: e.to_string(),
                    },
                    status,
                    status.clone(),
                ));
            }
        };
        ensure_destination(&settings.destination).await?;

        let mut ledger = Ledger::load(&settings.ledger_path()).await?;
        let ignore = ledger.ignore_set(settings.policy.ignore);
        debug!(album = %settings.id, ignored = ignore.len(), history = ledger.len(), "Loaded ledger");

        let selection = select_photo(&candidates, &ignore, &mut rand::thread_rng());
        let guid = match selection {
            Ok(guid) => guid.to_string(),
            Err(CycleError::NoEligibleCandidates {
                candidates,
                ignored,
            }) => {
                warn!(album = %settings.id, candidates, ignored, "No new photos available to download");
                ledger.save().await?;
                return Ok(CycleReport::new(
                    CycleOutcome::NoCandidates {
                        candidates,
                        ignored,
                    },
                    status,
                    status.cleared(),
                ));
            }
            Err(e) => return Err(e),
        };

        // `filter_best_assets` only admits complete locations.
        let url = candidates[&guid].download_url().unwrap_or_default();
        let source = source_filename(&url).unwrap_or_else(|| {
            warn!(%url, "Could not derive a source filename");
            String::new()
        });
        debug!(album = %settings.id, %guid, %url, "Downloading photo");

        let image_path = settings.image_path();
        let result = download::download_file(self.transport.as_ref(), &url, &image_path).await;
        let file = match result {
            Ok(_) => Some(image_path),
            Err(e) if e.aborts_cycle() => return Err(e.into()),
            Err(e) => {
                error!(album = %settings.id, %guid, error = %e, "Failed to download a photo");
                None
            }
        };

        ledger.append(LedgerEntry::new(&guid, &source));
        let dropped = ledger.trim(&settings.policy);
        ledger.save().await?;

        let next = status.downloaded(settings.image_file_name(), Local::now());
        info!(
            album = %settings.id,
            %guid,
            source = %source,
            saved = file.is_some(),
            dropped,
            count = next.downloaded_count,
            "Rotated photo"
        );
        Ok(CycleReport::new(
            CycleOutcome::Downloaded {
                guid,
                source_filename: source,
                file,
            },
            status,
            next,
        ))
    }

    /// Bytes of the image currently published for this album, if any.
    pub async fn current_image(&self, status: &DownloadStatus) -> Option<Vec<u8>> {
        let name = status.last_downloaded.as_deref()?;
        let path = self.settings.destination.join(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                error!(path = %path.display(), error = %e, "Image file not found");
                None
            }
        }
    }
}
