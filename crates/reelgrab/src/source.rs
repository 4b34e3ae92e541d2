use std::fmt;

/// How a stream is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamType {
    /// HLS playlist pointing at many segments.
    Segmented,
    /// A single file served over plain HTTP.
    Direct,
}

impl StreamType {
    /// A URL mentioning `.m3u8` anywhere (case-insensitive) is treated as a playlist.
    pub fn detect(url: &str) -> Self {
        if url.to_ascii_lowercase().contains(".m3u8") {
            Self::Segmented
        } else {
            Self::Direct
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Segmented => "segmented",
            Self::Direct => "direct",
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved stream location, the input of [`crate::VideoDownloader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSource {
    pub stream_type: StreamType,
    pub stream_url: String,
}

impl StreamSource {
    /// Build a source whose type is inferred from the URL.
    pub fn from_url(stream_url: impl Into<String>) -> Self {
        let stream_url = stream_url.into();
        Self {
            stream_type: StreamType::detect(&stream_url),
            stream_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://cdn.example/public/abc.m3u8", StreamType::Segmented)]
    #[case("https://cdn.example/public/ABC.M3U8?token=1", StreamType::Segmented)]
    #[case("https://cdn.example/video.mp4", StreamType::Direct)]
    #[case("https://cdn.example/m3u8/video.ts", StreamType::Direct)]
    fn detects_stream_type(#[case] url: &str, #[case] expected: StreamType) {
        assert_eq!(StreamType::detect(url), expected);
    }

    #[test]
    fn source_from_url_infers_type() {
        let source = StreamSource::from_url("https://cdn.example/x.m3u8");
        assert_eq!(source.stream_type, StreamType::Segmented);
        assert_eq!(source.stream_type.to_string(), "segmented");
    }
}
