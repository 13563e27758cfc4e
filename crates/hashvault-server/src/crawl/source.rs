//! Remote hash-list source
//!
//! [`HashListSource::open`] resolves a file name to a byte stream. It fails
//! before yielding any bytes when the transport fails or the server answers
//! with a non-success status, so callers never create a local file for a
//! missing resource.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::Client;
use std::time::Duration;

/// Chunked response body
pub type ByteStream = BoxStream<'static, Result<Bytes, FetchError>>;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Body error: {0}")]
    Body(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Where hash lists are fetched from
#[async_trait]
pub trait HashListSource: Send + Sync {
    async fn open(&self, file_name: &str) -> Result<ByteStream, FetchError>;
}

/// HTTP(S) source: `file_name` is appended to a base URL
#[derive(Debug, Clone)]
pub struct HttpHashListSource {
    client: Client,
    base_url: String,
}

impl HttpHashListSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hashvault-crawler/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn url_for(&self, file_name: &str) -> String {
        format!("{}{}", self.base_url, file_name)
    }
}

#[async_trait]
impl HashListSource for HttpHashListSource {
    async fn open(&self, file_name: &str) -> Result<ByteStream, FetchError> {
        let url = self.url_for(file_name);
        let url = reqwest::Url::parse(&url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(response.bytes_stream().map_err(FetchError::from).boxed())
    }
}
