use std::time::Duration;

use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::debug;

use crate::DownloadError;
use crate::hls::RetryPolicy;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

/// Default number of concurrent segment fetches.
pub const DEFAULT_MAX_WORKERS: usize = 5;

/// Configurable options for the downloader
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Ceiling for a single request attempt (playlist, segment or direct stream)
    pub request_timeout: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    /// User agent string
    pub user_agent: String,

    /// Custom HTTP headers for requests
    pub headers: HeaderMap,

    /// Maximum number of segments fetched at the same time
    pub max_workers: usize,

    /// Retry behaviour for segment fetches
    pub retry: RetryPolicy,

    /// Maximum idle connections to keep per host
    pub pool_max_idle_per_host: usize,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: DownloaderConfig::get_default_headers(),
            max_workers: DEFAULT_MAX_WORKERS,
            retry: RetryPolicy::default(),
            pool_max_idle_per_host: 10,
        }
    }
}

impl DownloaderConfig {
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Merge extra headers over the defaults. Custom headers win on conflicts.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in headers.iter() {
            self.headers.insert(name.clone(), value.clone());
        }
        self
    }

    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.max_workers == 0 {
            return Err(DownloadError::configuration(
                "max_workers must be at least 1",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(DownloadError::configuration(
                "retry policy needs at least one attempt",
            ));
        }
        Ok(())
    }

    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));

        // Accept-Encoding is left to reqwest so it keeps decompressing bodies.
        default_headers.insert(
            reqwest::header::CONNECTION,
            HeaderValue::from_static("keep-alive"),
        );

        default_headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.5,ru;q=0.3"),
        );
        default_headers
    }
}

/// Create a reqwest Client with the provided configuration.
///
/// A single client is shared by all fetchers so connections are pooled.
pub fn create_client(config: &DownloaderConfig) -> Result<Client, DownloadError> {
    config.validate()?;

    let mut client_builder = Client::builder()
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        });

    if !config.connect_timeout.is_zero() {
        client_builder = client_builder.connect_timeout(config.connect_timeout);
    }

    debug!(
        max_workers = config.max_workers,
        request_timeout = ?config.request_timeout,
        "Building HTTP client"
    );

    client_builder.build().map_err(DownloadError::from)
}
