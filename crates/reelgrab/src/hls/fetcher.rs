// HLS Segment Fetcher: downloads one segment's bytes with bounded retries.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use url::Url;

use crate::DownloadError;
use crate::config::DownloaderConfig;
use crate::hls::retry::{RetryAction, RetryPolicy, retry_with_backoff};

#[async_trait]
pub trait SegmentDownloader: Send + Sync {
    /// Fetch the full body at `url`. Fails only once retries are exhausted.
    async fn fetch(&self, url: &str, token: &CancellationToken) -> Result<Bytes, DownloadError>;
}

/// reqwest-backed [`SegmentDownloader`]. Stateless apart from the pooled client.
#[derive(Debug, Clone)]
pub struct SegmentFetcher {
    http_client: Client,
    retry: RetryPolicy,
    request_timeout: Duration,
}

impl SegmentFetcher {
    pub fn new(http_client: Client, config: &DownloaderConfig) -> Self {
        Self {
            http_client,
            retry: config.retry.clone(),
            request_timeout: config.request_timeout,
        }
    }

    async fn attempt(&self, url: &Url) -> Result<Bytes, DownloadError> {
        let timeout = self.request_timeout;
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                DownloadError::Timeout {
                    url: url.to_string(),
                    after: timeout,
                }
            } else {
                DownloadError::from(e)
            }
        };

        let response = self
            .http_client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(map_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(status, url.as_str()));
        }
        trace!(url = %url, http_version = ?response.version(), "Segment response received");

        response.bytes().await.map_err(map_err)
    }
}

#[async_trait]
impl SegmentDownloader for SegmentFetcher {
    async fn fetch(&self, url: &str, token: &CancellationToken) -> Result<Bytes, DownloadError> {
        let segment_url = Url::parse(url).map_err(|e| DownloadError::invalid_url(url, e.to_string()))?;
        let started = Instant::now();

        let bytes = retry_with_backoff(&self.retry, token, url, |_attempt| {
            let segment_url = &segment_url;
            async move {
                match self.attempt(segment_url).await {
                    Ok(bytes) => RetryAction::Success(bytes),
                    Err(err) if err.is_retryable() => RetryAction::Retry(err),
                    Err(err) => RetryAction::Fail(err),
                }
            }
        })
        .await?;

        debug!(
            url,
            size = bytes.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Downloaded segment"
        );
        Ok(bytes)
    }
}
