// Page Resolver: turns a video id into a stream location by scraping the public watch page.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::DownloadError;
use crate::config::DownloaderConfig;
use crate::page::fields::{first_present_field, scalar_to_string};
use crate::source::StreamSource;

static EVENT_DATA_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"var TEMPLATE_EVENT_DATA = JSON\.parse\('(\{[^']+\})'\);").unwrap()
});
static SERVERS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"var GET_SERVERS = JSON\.parse\('(\[[^\]]+\])'\);").unwrap());
static SCRIPT_BODY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>(.*?)</script>").unwrap());
static M3U8_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"'<>]+\.m3u8[^\s"'<>]*"#).unwrap());
static VIDEO_TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<video\b([^>]*)>").unwrap());
static SOURCE_TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<source\b([^>]*)>").unwrap());
static SRC_ATTR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)(?:^|\s)src\s*=\s*["']([^"']+)["']"#).unwrap());

/// Keys that may carry the event id inside `TEMPLATE_EVENT_DATA`, in priority order.
const EVENT_ID_FIELDS: &[&str] = &["id", "event_id", "eventId"];

/// What the watch page reveals about a video.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchPage {
    /// Event id from the embedded event data. Chat history is keyed by it.
    pub event_id: Option<String>,
    pub stream_url: Option<String>,
}

impl WatchPage {
    pub fn parse(html: &str) -> Self {
        Self {
            event_id: extract_event_id(html),
            stream_url: extract_stream_url(html),
        }
    }

    pub fn stream_source(&self) -> Result<StreamSource, DownloadError> {
        self.stream_url
            .as_deref()
            .map(StreamSource::from_url)
            .ok_or_else(|| {
                DownloadError::metadata(
                    "no stream URL found on the video page; the video may be unavailable or removed",
                )
            })
    }
}

pub struct PageResolver {
    http_client: Client,
    base_url: String,
    request_timeout: Duration,
}

impl PageResolver {
    const BASE_URL: &str = "https://facecast.net";

    pub fn new(http_client: Client, config: &DownloaderConfig) -> Self {
        Self {
            http_client,
            base_url: Self::BASE_URL.to_string(),
            request_timeout: config.request_timeout,
        }
    }

    /// Point the resolver at another host serving the same page layout.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn page_url(&self, video_id: &str) -> String {
        format!("{}/w/{}", self.base_url, video_id)
    }

    /// Fetch the watch page and read everything it exposes.
    #[instrument(skip(self))]
    pub async fn inspect(&self, video_id: &str) -> Result<WatchPage, DownloadError> {
        let page_url = self.page_url(video_id);
        let html = self.fetch_page(&page_url).await?;
        let page = WatchPage::parse(&html);
        debug!(event_id = ?page.event_id, stream_url = ?page.stream_url, "Watch page inspected");
        Ok(page)
    }

    pub async fn resolve(&self, video_id: &str) -> Result<StreamSource, DownloadError> {
        let source = self.inspect(video_id).await?.stream_source()?;
        debug!(
            stream_url = %source.stream_url,
            stream_type = %source.stream_type,
            "Resolved stream"
        );
        Ok(source)
    }

    async fn fetch_page(&self, page_url: &str) -> Result<String, DownloadError> {
        let page_error = |cause: &dyn std::fmt::Display| {
            DownloadError::metadata(format!("failed to fetch video page: {cause}"))
        };

        let response = self
            .http_client
            .get(page_url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| page_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(page_error(&DownloadError::http_status(status, page_url)));
        }

        response.text().await.map_err(|e| page_error(&e))
    }
}

/// Find the stream URL in a watch page, trying the embedded event data first,
/// then any `.m3u8` link inside a script, then the `<video>` element.
pub fn extract_stream_url(html: &str) -> Option<String> {
    from_event_data(html)
        .or_else(|| from_scripts(html))
        .or_else(|| from_video_tag(html))
}

/// Event id carried by the page's `TEMPLATE_EVENT_DATA` blob.
pub fn extract_event_id(html: &str) -> Option<String> {
    let event_data = event_data(html)?;
    first_present_field(&event_data, EVENT_ID_FIELDS).and_then(scalar_to_string)
}

fn event_data(html: &str) -> Option<Map<String, Value>> {
    let caps = EVENT_DATA_REGEX.captures(html)?;
    match serde_json::from_str(&caps[1].replace('\\', "")) {
        Ok(data) => Some(data),
        Err(e) => {
            debug!(error = %e, "Unparsable TEMPLATE_EVENT_DATA");
            None
        }
    }
}

fn from_event_data(html: &str) -> Option<String> {
    let event_id = extract_event_id(html)?;
    let servers = SERVERS_REGEX.captures(html)?;
    let servers: Vec<Value> = match serde_json::from_str(&servers[1].replace('\\', "")) {
        Ok(servers) => servers,
        Err(e) => {
            debug!(error = %e, "Unparsable GET_SERVERS");
            return None;
        }
    };

    let server = servers
        .iter()
        .find(|s| s.get("cdn").and_then(Value::as_i64) == Some(1))
        .or_else(|| servers.first())
        .and_then(|s| s.get("src"))
        .and_then(Value::as_str)
        .filter(|src| !src.is_empty())?;

    Some(format!("https://{server}/public/{event_id}.m3u8"))
}

fn from_scripts(html: &str) -> Option<String> {
    SCRIPT_BODY_REGEX
        .captures_iter(html)
        .filter_map(|caps| M3U8_URL_REGEX.find(caps.get(1)?.as_str()))
        .map(|m| m.as_str().to_string())
        .next()
}

fn from_video_tag(html: &str) -> Option<String> {
    let video = VIDEO_TAG_REGEX.captures(html)?;
    if let Some(src) = src_attribute(&video[1]) {
        return Some(src);
    }

    let tag_end = video.get(0)?.end();
    let rest = &html[tag_end..];
    let body = match rest.to_ascii_lowercase().find("</video>") {
        Some(close) => &rest[..close],
        None => rest,
    };
    let source = SOURCE_TAG_REGEX.captures(body)?;
    src_attribute(&source[1])
}

fn src_attribute(attributes: &str) -> Option<String> {
    SRC_ATTR_REGEX
        .captures(attributes)
        .map(|caps| caps[1].to_string())
}
