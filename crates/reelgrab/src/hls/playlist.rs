// HLS Playlist Parser: classifies playlist documents, picks the best variant of a
// master playlist and turns media playlists into ordered segment references.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};
use url::Url;

use crate::DownloadError;

const STREAM_INF_TAG: &str = "#EXT-X-STREAM-INF";

// Anchored on the attribute separator so AVERAGE-BANDWIDTH is never mistaken for BANDWIDTH.
static BANDWIDTH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[:,])\s*BANDWIDTH=(\d+)").unwrap());

/// One rendition listed in a master playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantStream {
    pub bandwidth: u64,
    /// Reference exactly as written in the playlist (may be relative).
    pub url: String,
}

/// A media segment and its fixed position in playback order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentReference {
    /// 0-based playback position, assigned from line order.
    pub sequence_index: usize,
    /// Absolute segment URL.
    pub url: String,
}

/// True iff the document carries a variant-stream-info directive.
pub fn is_master_playlist(doc: &str) -> bool {
    doc.lines()
        .any(|line| line.trim_start().starts_with(STREAM_INF_TAG))
}

/// Collect every `#EXT-X-STREAM-INF` directive that has a parsable bandwidth
/// and a URL line after it, in document order.
///
/// The URL is the next non-blank line that is not a comment. Reaching another
/// stream-info directive first means the directive has no URL.
pub fn variant_streams(doc: &str) -> Vec<VariantStream> {
    let lines: Vec<&str> = doc.lines().map(str::trim).collect();
    let mut variants = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let Some(attributes) = line.strip_prefix(STREAM_INF_TAG) else {
            continue;
        };
        let Some(bandwidth) = BANDWIDTH_REGEX
            .captures(attributes)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
        else {
            trace!(directive = %line, "Skipping variant without a usable BANDWIDTH");
            continue;
        };

        let url = lines[i + 1..]
            .iter()
            .take_while(|next| !next.starts_with(STREAM_INF_TAG))
            .find(|next| !next.is_empty() && !next.starts_with('#'));

        if let Some(url) = url {
            variants.push(VariantStream {
                bandwidth,
                url: (*url).to_string(),
            });
        }
    }

    variants
}

/// Pick the variant URL with the strictly greatest bandwidth; ties keep the
/// first one listed. The returned URL is not resolved.
pub fn select_best_variant(doc: &str) -> Result<String, DownloadError> {
    let mut best: Option<VariantStream> = None;
    for variant in variant_streams(doc) {
        if best
            .as_ref()
            .is_none_or(|current| variant.bandwidth > current.bandwidth)
        {
            best = Some(variant);
        }
    }

    let best = best.ok_or_else(|| {
        DownloadError::parse("no variant with a BANDWIDTH attribute and URL in master playlist")
    })?;
    debug!(
        bandwidth = best.bandwidth,
        uri = %best.url,
        "Selected best quality stream from master playlist"
    );
    Ok(best.url)
}

/// Resolve a playlist reference against the URL the playlist was fetched from.
///
/// `http://` and `https://` references are returned untouched.
pub fn resolve_url(reference: &str, base_url: &Url) -> Result<String, DownloadError> {
    if reference.starts_with("http://") || reference.starts_with("https://") {
        return Ok(reference.to_string());
    }
    base_url
        .join(reference)
        .map(String::from)
        .map_err(|e| DownloadError::parse(format!("cannot resolve `{reference}`: {e}")))
}

/// Turn a media playlist into segment references in line order.
///
/// Blank lines and `#` lines are skipped without interpretation; every other
/// line is a segment reference.
pub fn parse(doc: &str, base_url: &str) -> Result<Vec<SegmentReference>, DownloadError> {
    if doc.trim().is_empty() {
        return Err(DownloadError::parse("playlist is empty"));
    }
    let base = Url::parse(base_url).map_err(|e| DownloadError::invalid_url(base_url, e.to_string()))?;

    let segments = doc
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .enumerate()
        .map(|(sequence_index, line)| {
            Ok(SegmentReference {
                sequence_index,
                url: resolve_url(line, &base)?,
            })
        })
        .collect::<Result<Vec<_>, DownloadError>>()?;

    if segments.is_empty() {
        return Err(DownloadError::parse("no segments found in playlist"));
    }

    debug!(segments = segments.len(), base_url = %base, "Parsed media playlist");
    Ok(segments)
}
