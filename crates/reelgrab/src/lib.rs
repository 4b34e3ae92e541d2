//! Download engine for hosted videos delivered as HLS playlists or single files.
//!
//! ## Component Overview
//!
//! - `hls`: playlist parsing, segment fetching with retry, ordered concurrent assembly
//! - `direct`: streamed single-file downloads
//! - `page`: video URL parsing and stream discovery on the watch page
//! - `chat`: event chat history and transcript files
//! - `downloader`: dispatch of a resolved stream to the right pipeline
//!
//! Every download ends in an [`AssemblyResult`]: the absolute path of the
//! finished file, or the cause of failure with nothing left on disk.

pub mod chat;
pub mod config;
pub mod direct;
pub mod downloader;
pub mod error;
pub mod hls;
pub mod page;
pub mod progress;
pub mod source;

pub use chat::{ChatFetcher, ChatFormat, ChatMessage, save_transcript};
pub use config::{DownloaderConfig, create_client};
pub use direct::DirectFetcher;
pub use downloader::VideoDownloader;
pub use error::{AssemblyError, AssemblyResult, DownloadError};
pub use hls::{RetryPolicy, SegmentDownloader, SegmentFetcher, SegmentReference, StreamAssembler};
pub use page::{PageResolver, VideoLocator, WatchPage};
pub use progress::{ProgressCallback, ProgressEvent};
pub use source::{StreamSource, StreamType};

pub use tokio_util::sync::CancellationToken;
