// Segmented (HLS) download pipeline: playlist parsing, segment fetching and ordered assembly

mod assembler;
mod fetcher;
pub mod playlist;
mod retry;

// Re-exports for easier access
pub use assembler::StreamAssembler;
pub use fetcher::{SegmentDownloader, SegmentFetcher};
pub use playlist::{
    SegmentReference, VariantStream, is_master_playlist, parse, resolve_url,
    select_best_variant, variant_streams,
};
pub use retry::{RetryAction, RetryPolicy, retry_with_backoff};

pub(crate) use assembler::{part_path, remove_part_file};
