// Video Downloader: dispatches a resolved stream to the segmented or direct pipeline.

use std::path::Path;
use std::sync::Arc;

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use url::Url;

use crate::DownloadError;
use crate::config::{DownloaderConfig, create_client};
use crate::direct::DirectFetcher;
use crate::error::{AssemblyError, AssemblyResult};
use crate::hls::{
    SegmentDownloader, SegmentFetcher, SegmentReference, StreamAssembler, is_master_playlist,
    parse, resolve_url, select_best_variant,
};
use crate::progress::ProgressCallback;
use crate::source::{StreamSource, StreamType};

pub struct VideoDownloader {
    http_client: Client,
    config: DownloaderConfig,
    segment_downloader: Arc<dyn SegmentDownloader>,
    on_progress: Option<ProgressCallback>,
}

impl VideoDownloader {
    pub fn new(config: DownloaderConfig) -> Result<Self, DownloadError> {
        let http_client = create_client(&config)?;
        Ok(Self::with_client(http_client, config))
    }

    /// Reuse an existing client, e.g. one already used for page resolution.
    pub fn with_client(http_client: Client, config: DownloaderConfig) -> Self {
        let segment_downloader = Arc::new(SegmentFetcher::new(http_client.clone(), &config));
        Self {
            http_client,
            config,
            segment_downloader,
            on_progress: None,
        }
    }

    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    /// Download `source` into `destination`.
    #[instrument(skip(self, token), fields(stream_type = %source.stream_type, url = %source.stream_url))]
    pub async fn download(
        &self,
        source: &StreamSource,
        destination: &Path,
        token: &CancellationToken,
    ) -> AssemblyResult {
        match source.stream_type {
            StreamType::Segmented => {
                let segments = self.load_segments(&source.stream_url, token).await?;
                self.download_segments(&segments, destination, token).await
            }
            StreamType::Direct => {
                self.download_direct(&source.stream_url, destination, token)
                    .await
            }
        }
    }

    /// Fetch the playlist at `playlist_url` and return its media segments.
    ///
    /// A master playlist is followed to its highest-bandwidth variant, whose URL
    /// becomes the base for resolving segment references.
    pub async fn load_segments(
        &self,
        playlist_url: &str,
        token: &CancellationToken,
    ) -> Result<Vec<SegmentReference>, AssemblyError> {
        let load = async {
            let mut base_url = playlist_url.to_string();
            let mut document = self.fetch_playlist(&base_url).await?;

            if is_master_playlist(&document) {
                let variant = select_best_variant(&document)?;
                let parsed_base = Url::parse(&base_url)
                    .map_err(|e| DownloadError::invalid_url(&base_url, e.to_string()))?;
                base_url = resolve_url(&variant, &parsed_base)?;
                info!(variant = %base_url, "Master playlist detected, using best variant");
                document = self.fetch_playlist(&base_url).await?;
            }

            parse(&document, &base_url)
        };

        let segments = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(AssemblyError::Cancelled),
            result = load => result.map_err(AssemblyError::Playlist)?,
        };

        info!(segments = segments.len(), "Playlist parsed");
        Ok(segments)
    }

    pub async fn download_segments(
        &self,
        segments: &[SegmentReference],
        destination: &Path,
        token: &CancellationToken,
    ) -> AssemblyResult {
        let mut assembler =
            StreamAssembler::new(Arc::clone(&self.segment_downloader), self.config.max_workers);
        if let Some(on_progress) = &self.on_progress {
            assembler = assembler.with_progress(Arc::clone(on_progress));
        }
        assembler.assemble(segments, destination, token).await
    }

    pub async fn download_direct(
        &self,
        url: &str,
        destination: &Path,
        token: &CancellationToken,
    ) -> AssemblyResult {
        let mut fetcher = DirectFetcher::new(self.http_client.clone(), &self.config);
        if let Some(on_progress) = &self.on_progress {
            fetcher = fetcher.with_progress(Arc::clone(on_progress));
        }
        fetcher.download(url, destination, token).await
    }

    /// Single status-checked GET of a playlist document.
    async fn fetch_playlist(&self, url: &str) -> Result<String, DownloadError> {
        let timeout = self.config.request_timeout;
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

        let parsed = Url::parse(url).map_err(|e| DownloadError::invalid_url(url, e.to_string()))?;
        let response = self
            .http_client
            .get(parsed)
            .timeout(timeout)
            .send()
            .await
            .map_err(map_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(status, url));
        }

        let body = response.text().await.map_err(map_err)?;
        debug!(url, size = body.len(), "Playlist fetched");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_playlist_url_is_a_playlist_error() {
        let downloader = VideoDownloader::new(DownloaderConfig::default()).unwrap();
        let err = downloader
            .load_segments("not a url", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AssemblyError::Playlist(DownloadError::InvalidUrl { .. })
        ));
        assert!(err.to_string().starts_with("failed to load playlist: "));
    }

    #[test]
    fn rejects_invalid_worker_count() {
        let config = DownloaderConfig::default().with_max_workers(0);
        assert!(matches!(
            VideoDownloader::new(config),
            Err(DownloadError::Configuration { .. })
        ));
    }
}
