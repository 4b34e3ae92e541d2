use std::path::PathBuf;
use std::time::Duration;

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("download cancelled")]
    Cancelled,

    #[error("invalid URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("playlist parse error: {reason}")]
    Parse { reason: String },

    #[error("failed to fetch {url} after {attempts} attempts: {source}")]
    Fetch {
        url: String,
        attempts: u32,
        #[source]
        source: Box<DownloadError>,
    },

    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("request failed with HTTP {status} for {url}")]
    HttpStatus { status: StatusCode, url: String },

    #[error("request to {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("metadata extraction failed: {reason}")]
    Metadata { reason: String },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },
}

impl DownloadError {
    pub fn invalid_url(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
        }
    }

    pub fn http_status(status: StatusCode, url: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
        }
    }

    pub fn metadata(reason: impl Into<String>) -> Self {
        Self::Metadata {
            reason: reason.into(),
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Transport failures are worth another attempt; anything caused by the
    /// input itself is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::HttpStatus { .. } | Self::Timeout { .. } => true,
            Self::Cancelled
            | Self::InvalidUrl { .. }
            | Self::Parse { .. }
            | Self::Fetch { .. }
            | Self::Io { .. }
            | Self::Metadata { .. }
            | Self::Configuration { .. } => false,
        }
    }
}

/// Terminal failure of a download attempt.
///
/// The `Display` output is the human-readable cause shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("empty segment list")]
    EmptySegmentList,

    #[error("segment {position}/{total} failed: {source}")]
    Segment {
        /// 1-based position of the failing segment.
        position: usize,
        total: usize,
        #[source]
        source: DownloadError,
    },

    #[error("failed to write output file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load playlist: {0}")]
    Playlist(#[source] DownloadError),

    #[error("download failed: {0}")]
    Fetch(#[source] DownloadError),

    #[error("segment worker failed: {reason}")]
    Worker { reason: String },

    #[error("download cancelled")]
    Cancelled,
}

impl AssemblyError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Outcome of a download: the absolute path of the finished file, or the
/// reason nothing was written.
pub type AssemblyResult = Result<PathBuf, AssemblyError>;
