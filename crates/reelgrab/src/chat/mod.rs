//! Chat history of a hosted event.
//!
//! - `transcript`: `ChatMessage` and parsing of loosely shaped chat payloads
//! - `fetcher`: retrieval over the event API, falling back to the embedded chat page
//! - `writer`: plain text, JSON and HTML transcripts

pub mod fetcher;
pub mod transcript;
pub mod writer;

pub use fetcher::ChatFetcher;
pub use transcript::{ChatMessage, parse_chat_data};
pub use writer::{ChatFormat, save_transcript};
