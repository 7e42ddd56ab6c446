use thiserror::Error;

/// Errors raised while talking to the shared streams service.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Invalid share token '{token}': {reason}")]
    InvalidToken { token: String, reason: &'static str },

    #[error("Unexpected response from {url} (HTTP {status})")]
    UnexpectedResponse { status: u16, url: String },

    #[error("Redirect from {url} did not name a new host")]
    MissingRedirectHost { url: String },

    #[error("Gave up after {hops} redirects (last host: {host})")]
    TooManyRedirects { hops: u32, host: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl StreamError {
    /// Whether a webstream attempt that failed with this error is worth repeating.
    ///
    /// Token and redirect-chain errors are deterministic; everything else
    /// (transport faults, odd status codes, truncated JSON) may be transient.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            StreamError::InvalidToken { .. } | StreamError::TooManyRedirects { .. }
        )
    }
}
