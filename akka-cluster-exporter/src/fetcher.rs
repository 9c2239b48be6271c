//! Fetching the cluster members document from Akka Management.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use thiserror::Error;
use tracing::trace;

/// Errors raised while building a fetcher or fetching the members route.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid scrape URI {uri:?}: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("Unsupported scheme: {0:?}")]
    UnsupportedScheme(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("HTTP request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("HTTP status {0}")]
    UpstreamStatus(u16),

    #[error("Failed to read response body: {0}")]
    Body(#[source] reqwest::Error),
}

/// A response body that has not been consumed yet.
///
/// Dropping the body releases the underlying connection.
#[async_trait]
pub trait ResponseBody: Send {
    /// Read the remaining body to the end.
    async fn read_all(&mut self) -> Result<Vec<u8>, FetchError>;
}

#[async_trait]
impl ResponseBody for reqwest::Response {
    async fn read_all(&mut self) -> Result<Vec<u8>, FetchError> {
        let mut buf = Vec::new();
        while let Some(chunk) = self.chunk().await.map_err(FetchError::Body)? {
            buf.extend_from_slice(&chunk);
        }
        Ok(buf)
    }
}

#[cfg(test)]
#[async_trait]
impl ResponseBody for Vec<u8> {
    async fn read_all(&mut self) -> Result<Vec<u8>, FetchError> {
        Ok(std::mem::take(self))
    }
}

/// Source of the cluster members document.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// The URI being fetched, for diagnostics.
    fn uri(&self) -> &str;

    /// Perform one fetch. A successful result has a 2xx status.
    async fn fetch(&self) -> Result<Box<dyn ResponseBody>, FetchError>;
}

/// Fetches the members route over HTTP(S) with a bounded timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    uri: String,
    url: Url,
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher for `uri`.
    ///
    /// Fails if the URI does not parse or its scheme is not http or https.
    /// The timeout bounds the whole exchange, body included.
    pub fn new(uri: &str, timeout: Duration) -> Result<Self, FetchError> {
        let url = Url::parse(uri).map_err(|e| FetchError::InvalidUri {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(FetchError::UnsupportedScheme(other.to_string())),
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            uri: uri.to_string(),
            url,
            client,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn uri(&self) -> &str {
        &self.uri
    }

    async fn fetch(&self) -> Result<Box<dyn ResponseBody>, FetchError> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = response.status();
        trace!(uri = %self.uri, status = status.as_u16(), "Fetched members route");

        if !status.is_success() {
            return Err(FetchError::UpstreamStatus(status.as_u16()));
        }

        Ok(Box::new(response))
    }
}
