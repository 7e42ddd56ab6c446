use thiserror::Error;

use crate::icloud::StreamError;

/// Failures while fetching an asset's bytes and storing them.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP error {status} downloading {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Transport error downloading {url}: {source}")]
    Transport { url: String, source: StreamError },

    #[error("Disk error: {0}")]
    Disk(#[from] std::io::Error),
}

impl DownloadError {
    /// Whether this failure ends the rotation cycle.
    ///
    /// Remote failures are only logged: the cycle still records the attempted
    /// photo in the ledger. A local write failure leaves nothing sensible to
    /// record, so it aborts.
    pub fn aborts_cycle(&self) -> bool {
        matches!(self, DownloadError::Disk(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_does_not_abort() {
        let e = DownloadError::HttpStatus {
            status: 404,
            url: "x".into(),
        };
        assert!(!e.aborts_cycle());
        assert_eq!(e.to_string(), "HTTP error 404 downloading x");
    }

    #[test]
    fn test_transport_does_not_abort() {
        let e = DownloadError::Transport {
            url: "x".into(),
            source: StreamError::UnexpectedResponse {
                status: 599,
                url: "x".into(),
            },
        };
        assert!(!e.aborts_cycle());
    }

    #[test]
    fn test_disk_aborts() {
        let e = DownloadError::Disk(std::io::Error::other("disk full"));
        assert!(e.aborts_cycle());
    }
}
