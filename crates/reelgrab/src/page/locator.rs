use std::sync::LazyLock;

use regex::Regex;

use crate::DownloadError;

pub static FACECAST_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?facecast\.net/w/([a-zA-Z0-9_-]+)/?$").unwrap()
});
pub static OPENDEMO_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https?://(?:www\.)?opendemo\.ru/live\?id=([a-zA-Z0-9_-]+)(?:&code=([a-zA-Z0-9_-]+))?$",
    )
    .unwrap()
});

const ACCEPTED_FORMS: &str =
    "expected https://facecast.net/w/{video_id} or https://opendemo.ru/live?id={video_id}&code={code}";

/// Identifier of a hosted video, extracted from its public page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoLocator {
    pub video_id: String,
    /// Access code carried by opendemo.ru links.
    pub code: Option<String>,
}

impl VideoLocator {
    pub fn parse(url: &str) -> Result<Self, DownloadError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(DownloadError::invalid_url(url, "URL must not be empty"));
        }

        if let Some(caps) = OPENDEMO_URL_REGEX.captures(url) {
            return Ok(Self {
                video_id: caps[1].to_string(),
                code: caps.get(2).map(|m| m.as_str().to_string()),
            });
        }

        if let Some(caps) = FACECAST_URL_REGEX.captures(url) {
            return Ok(Self {
                video_id: caps[1].to_string(),
                code: None,
            });
        }

        Err(DownloadError::invalid_url(url, ACCEPTED_FORMS))
    }
}
