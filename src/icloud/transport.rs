use std::time::Duration;

use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, USER_AGENT};
use serde_json::Value;

use super::error::StreamError;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

/// Raw HTTP reply: status code plus the undecoded body.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Body chunks of a streamed GET, in arrival order.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, StreamError>>;

/// Status of a GET plus its body, not yet read.
pub struct StreamingReply {
    pub status: u16,
    pub body: ByteStream,
}

/// Minimal async HTTP surface used by the stream client and the asset download.
/// The production implementation is `reqwest::Client`; tests script replies.
#[async_trait::async_trait]
pub trait StreamTransport: Send + Sync {
    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpReply, StreamError>;

    /// Start a GET; the body is streamed so large assets never sit in memory whole.
    async fn get(&self, url: &str) -> Result<StreamingReply, StreamError>;
}

#[async_trait::async_trait]
impl StreamTransport for reqwest::Client {
    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpReply, StreamError> {
        let resp = self.post(url).json(body).send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?.to_vec();
        Ok(HttpReply { status, body })
    }

    async fn get(&self, url: &str) -> Result<StreamingReply, StreamError> {
        let resp = reqwest::Client::get(self, url).send().await?;
        let status = resp.status().as_u16();
        let body = resp
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(StreamError::from))
            .boxed();
        Ok(StreamingReply { status, body })
    }
}

/// Build the shared HTTP client. Standard 3xx redirects (CDN hops) are left
/// to reqwest; the 330 host move is not a redirect status and reaches the
/// stream client untouched.
pub fn build_client(timeout_secs: u64) -> Result<reqwest::Client, StreamError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    headers.insert(ORIGIN, HeaderValue::from_static("https://www.icloud.com"));
    let client = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_client() {
        assert!(build_client(30).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_http_error() {
        let client = build_client(2).unwrap();
        let Err(err) = StreamTransport::get(&client, "http://127.0.0.1:1").await else {
            panic!("expected a connection error");
        };
        assert!(matches!(err, StreamError::Http(_)));
        assert!(err.is_retryable());
    }
}
