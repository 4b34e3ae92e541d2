// Chat Fetcher: pulls an event's chat history from the hosting service.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::header::{ACCEPT, REFERER};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::DownloadError;
use crate::chat::transcript::{ChatMessage, parse_chat_data};
use crate::config::DownloaderConfig;
use crate::page::fields::first_present_field;

static CHAT_DATA_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)var\s+chatData\s*=\s*(\[.*?\]);").unwrap());

/// Top-level keys of the event API response that hold the chat.
const EVENT_CHAT_FIELDS: &[&str] = &["chat", "messages"];

pub struct ChatFetcher {
    http_client: Client,
    base_url: String,
    request_timeout: Duration,
}

impl ChatFetcher {
    const BASE_URL: &str = "https://facecast.net";

    pub fn new(http_client: Client, config: &DownloaderConfig) -> Self {
        Self {
            http_client,
            base_url: Self::BASE_URL.to_string(),
            request_timeout: config.request_timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Chat history of `event_id`, read from the event API and, failing that,
    /// from the embedded chat page.
    ///
    /// A disabled or unavailable chat is not an error: the result is empty.
    #[instrument(skip(self, code))]
    pub async fn fetch(&self, event_id: &str, code: Option<&str>) -> Vec<ChatMessage> {
        match self.from_event_api(event_id, code).await {
            Ok(messages) if !messages.is_empty() => {
                info!(messages = messages.len(), "Chat loaded from event API");
                return messages;
            }
            Ok(_) => debug!("Event API carried no chat messages"),
            Err(e) => debug!(error = %e, "Event API chat lookup failed"),
        }

        match self.from_chat_page(event_id, code).await {
            Ok(messages) => {
                info!(messages = messages.len(), "Chat loaded from chat page");
                messages
            }
            Err(e) => {
                debug!(error = %e, "Chat page lookup failed");
                Vec::new()
            }
        }
    }

    async fn from_event_api(
        &self,
        event_id: &str,
        code: Option<&str>,
    ) -> Result<Vec<ChatMessage>, DownloadError> {
        let url = format!("{}/api/event/{}", self.base_url, event_id);
        let mut request = self
            .http_client
            .get(&url)
            .header(ACCEPT, "application/json");
        if let Some(code) = code {
            request = request.query(&[("key", code)]);
        }

        let data: Value = self.send(request, &url).await?.json().await?;
        let payload = match &data {
            Value::Object(map) => first_present_field(map, EVENT_CHAT_FIELDS).unwrap_or(&data),
            _ => &data,
        };
        Ok(parse_chat_data(payload))
    }

    async fn from_chat_page(
        &self,
        event_id: &str,
        code: Option<&str>,
    ) -> Result<Vec<ChatMessage>, DownloadError> {
        let mut url = format!("{}/w/chat.html?{}", self.base_url, event_id);
        if let Some(code) = code {
            url.push_str("&key=");
            url.push_str(code);
        }

        let request = self.http_client.get(&url);
        let html = self.send(request, &url).await?.text().await?;
        let Some(caps) = CHAT_DATA_REGEX.captures(&html) else {
            return Ok(Vec::new());
        };
        let data: Value = serde_json::from_str(&caps[1])
            .map_err(|e| DownloadError::metadata(format!("unparsable chat data: {e}")))?;
        Ok(parse_chat_data(&data))
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> Result<Response, DownloadError> {
        let response = request
            .header(REFERER, format!("{}/", self.base_url))
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(status, url));
        }
        Ok(response)
    }
}
