// Direct Fetcher: single-file download streamed straight to disk.

use std::path::Path;
use std::time::{Duration, Instant};

use futures::StreamExt;
use reqwest::{Client, Response};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::DownloadError;
use crate::config::DownloaderConfig;
use crate::error::{AssemblyError, AssemblyResult};
use crate::hls::{part_path, remove_part_file};
use crate::progress::{ProgressCallback, ProgressEvent, emit};

/// Downloads a non-segmented stream in one pass. There is no retry: a failed
/// transfer would have to restart from byte 0.
#[derive(Clone)]
pub struct DirectFetcher {
    http_client: Client,
    /// Idle ceiling for the response headers and for each body chunk.
    request_timeout: Duration,
    on_progress: Option<ProgressCallback>,
}

impl DirectFetcher {
    pub fn new(http_client: Client, config: &DownloaderConfig) -> Self {
        Self {
            http_client,
            request_timeout: config.request_timeout,
            on_progress: None,
        }
    }

    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    /// Stream `url` into `destination` through a `.part` file renamed on success.
    #[instrument(skip(self, token), fields(destination = %destination.display()))]
    pub async fn download(
        &self,
        url: &str,
        destination: &Path,
        token: &CancellationToken,
    ) -> AssemblyResult {
        let url = Url::parse(url)
            .map_err(|e| AssemblyError::Fetch(DownloadError::invalid_url(url, e.to_string())))?;
        let destination =
            std::path::absolute(destination).map_err(|e| AssemblyError::io(destination, e))?;
        let part_path = part_path(&destination);

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => Err(AssemblyError::Cancelled),
            result = self.transfer(&url, &part_path) => result,
        };

        match outcome {
            Ok(size) => {
                if let Err(e) = tokio::fs::rename(&part_path, &destination).await {
                    remove_part_file(&part_path).await;
                    return Err(AssemblyError::io(&destination, e));
                }
                info!(url = %url, size, path = %destination.display(), "Direct download finished");
                emit(
                    self.on_progress.as_ref(),
                    ProgressEvent::Finished {
                        path: destination.clone(),
                    },
                );
                Ok(destination)
            }
            Err(err) => {
                remove_part_file(&part_path).await;
                warn!(url = %url, error = %err, "Direct download failed");
                Err(err)
            }
        }
    }

    async fn send(&self, url: &Url) -> Result<Response, DownloadError> {
        let response = tokio::time::timeout(
            self.request_timeout,
            self.http_client.get(url.clone()).send(),
        )
        .await
        .map_err(|_| self.timeout_error(url))??;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(status, url.as_str()));
        }
        Ok(response)
    }

    /// Returns the number of bytes written to `part_path`.
    async fn transfer(&self, url: &Url, part_path: &Path) -> Result<u64, AssemblyError> {
        let response = self.send(url).await.map_err(AssemblyError::Fetch)?;
        let started = Instant::now();

        let file = File::create(part_path)
            .await
            .map_err(|e| AssemblyError::io(part_path, e))?;
        let mut writer = BufWriter::new(file);

        let downloaded = match response.content_length() {
            Some(total) => {
                info!(url = %url, size = total, "Direct download started");
                self.copy_metered(url, response, total, &mut writer, part_path)
                    .await?
            }
            None => {
                debug!(url = %url, "Content length not available, reading body at once");
                let body = tokio::time::timeout(self.request_timeout, response.bytes())
                    .await
                    .map_err(|_| AssemblyError::Fetch(self.timeout_error(url)))?
                    .map_err(|e| AssemblyError::Fetch(DownloadError::from(e)))?;
                writer
                    .write_all(&body)
                    .await
                    .map_err(|e| AssemblyError::io(part_path, e))?;
                body.len() as u64
            }
        };

        writer
            .flush()
            .await
            .map_err(|e| AssemblyError::io(part_path, e))?;
        writer
            .into_inner()
            .sync_all()
            .await
            .map_err(|e| AssemblyError::io(part_path, e))?;

        debug!(
            url = %url,
            size = downloaded,
            latency_ms = started.elapsed().as_millis() as u64,
            "Body written"
        );
        Ok(downloaded)
    }

    async fn copy_metered(
        &self,
        url: &Url,
        response: Response,
        total: u64,
        writer: &mut BufWriter<File>,
        part_path: &Path,
    ) -> Result<u64, AssemblyError> {
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        loop {
            let next = tokio::time::timeout(self.request_timeout, stream.next())
                .await
                .map_err(|_| AssemblyError::Fetch(self.timeout_error(url)))?;
            let Some(chunk) = next else { break };
            let chunk = chunk.map_err(|e| AssemblyError::Fetch(DownloadError::from(e)))?;

            writer
                .write_all(&chunk)
                .await
                .map_err(|e| AssemblyError::io(part_path, e))?;
            downloaded += chunk.len() as u64;
            emit(
                self.on_progress.as_ref(),
                ProgressEvent::BytesReceived {
                    downloaded,
                    total: Some(total),
                },
            );
        }

        Ok(downloaded)
    }

    fn timeout_error(&self, url: &Url) -> DownloadError {
        DownloadError::Timeout {
            url: url.to_string(),
            after: self.request_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn invalid_url_is_a_fetch_failure() {
        let dir = TempDir::new().unwrap();
        let config = DownloaderConfig::default();
        let fetcher = DirectFetcher::new(Client::new(), &config);
        let destination = dir.path().join("video.mp4");

        let err = fetcher
            .download("not a url", &destination, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AssemblyError::Fetch(DownloadError::InvalidUrl { .. })
        ));
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn cancelled_before_start_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let config = DownloaderConfig::default();
        let fetcher = DirectFetcher::new(Client::new(), &config);
        let destination = dir.path().join("video.mp4");
        let token = CancellationToken::new();
        token.cancel();

        let err = fetcher
            .download("http://127.0.0.1:9/video.mp4", &destination, &token)
            .await
            .unwrap_err();

        assert!(matches!(err, AssemblyError::Cancelled));
        assert!(!destination.exists());
        assert!(!part_path(&destination).exists());
    }
}
