//! Shared streams protocol client.
//!
//! Fetching a public album takes two POSTs against the album's partition
//! host: `webstream` lists the photos and their derivatives, then
//! `webasseturls` maps derivative checksums to CDN locations. A 330 reply to
//! `webstream` moves the album to another host.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use super::assets::{filter_best_assets, CandidateSet};
use super::error::StreamError;
use super::partition::ShareToken;
use super::responses::{AssetUrlsResponse, RedirectResponse, StreamPhoto, WebStreamResponse};
use super::transport::StreamTransport;
use crate::retry::{self, RetryAction, RetryConfig};

/// Redirect hops followed before giving up on an album.
pub const MAX_REDIRECTS: u32 = 5;

const STATUS_OK: u16 = 200;
const STATUS_REDIRECT: u16 = 330;

/// Outcome of one `webstream` call.
#[derive(Debug)]
enum WebStream {
    Photos(Vec<StreamPhoto>),
    Redirect(String),
}

pub struct SharedStreamClient {
    transport: Arc<dyn StreamTransport>,
    retry: RetryConfig,
}

impl std::fmt::Debug for SharedStreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedStreamClient")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

fn webstream_url(host: &str, token: &ShareToken) -> String {
    format!("https://{host}/{token}/sharedstreams/webstream")
}

fn asset_urls_url(host: &str, token: &ShareToken) -> String {
    format!("https://{host}/{token}/sharedstreams/webasseturls")
}

impl SharedStreamClient {
    pub fn new(transport: Arc<dyn StreamTransport>, retry: RetryConfig) -> Self {
        Self { transport, retry }
    }

    /// Fetch the album and reduce it to one best-quality location per photo.
    ///
    /// Each host gets the full retry budget for its `webstream` call. A
    /// redirect switches hosts for good: later retries never go back to a
    /// host that redirected. The `webasseturls` call is made once.
    pub async fn fetch_candidates(&self, token: &ShareToken) -> Result<CandidateSet, StreamError> {
        let mut host = token.host();
        let mut hops = 0;
        loop {
            let page = retry::retry_with_backoff(
                &self.retry,
                |e: &StreamError| {
                    if e.is_retryable() {
                        RetryAction::Retry
                    } else {
                        RetryAction::Abort
                    }
                },
                || self.webstream(&host, token),
            )
            .await
            .inspect_err(|e| tracing::error!(%host, error = %e, "webstream failed"))?;

            match page {
                WebStream::Redirect(new_host) => {
                    hops += 1;
                    if hops > MAX_REDIRECTS {
                        return Err(StreamError::TooManyRedirects {
                            hops,
                            host: new_host,
                        });
                    }
                    debug!(from = %host, to = %new_host, hops, "Album moved to another host");
                    host = new_host;
                }
                WebStream::Photos(photos) => {
                    let guids: Vec<&str> = photos.iter().map(|p| p.photo_guid.as_str()).collect();
                    let asset_urls = self.asset_urls(&host, token, &guids).await?;
                    let candidates = filter_best_assets(&photos, &asset_urls.items);
                    debug!(
                        photos = photos.len(),
                        candidates = candidates.len(),
                        "Built candidate set"
                    );
                    return Ok(candidates);
                }
            }
        }
    }

    async fn webstream(&self, host: &str, token: &ShareToken) -> Result<WebStream, StreamError> {
        let url = webstream_url(host, token);
        let reply = self
            .transport
            .post_json(&url, &json!({ "streamCtag": Value::Null }))
            .await?;
        debug!(status = reply.status, %url, "webstream response");
        match reply.status {
            STATUS_REDIRECT => {
                let redirect: RedirectResponse = serde_json::from_slice(&reply.body)?;
                match redirect.host {
                    Some(new_host) if !new_host.is_empty() => Ok(WebStream::Redirect(new_host)),
                    _ => Err(StreamError::MissingRedirectHost { url }),
                }
            }
            STATUS_OK => {
                let stream: WebStreamResponse = serde_json::from_slice(&reply.body)?;
                Ok(WebStream::Photos(stream.photos))
            }
            status => Err(StreamError::UnexpectedResponse { status, url }),
        }
    }

    async fn asset_urls(
        &self,
        host: &str,
        token: &ShareToken,
        guids: &[&str],
    ) -> Result<AssetUrlsResponse, StreamError> {
        let url = asset_urls_url(host, token);
        let reply = self
            .transport
            .post_json(&url, &json!({ "photoGuids": guids }))
            .await?;
        debug!(status = reply.status, %url, "webasseturls response");
        if reply.status != STATUS_OK {
            return Err(StreamError::UnexpectedResponse {
                status: reply.status,
                url,
            });
        }
        Ok(serde_json::from_slice(&reply.body)?)
    }
}
