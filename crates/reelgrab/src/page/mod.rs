//! Locating a video's stream from its public page URL.
//!
//! - `locator`: extracts the video id (and optional access code) from a page URL
//! - `resolver`: fetches the watch page and finds the stream URL and event id inside it
//! - `fields`: prioritized lookups over loosely-typed JSON records

pub mod fields;
pub mod locator;
pub mod resolver;

pub use fields::{first_present_field, first_text_field};
pub use locator::VideoLocator;
pub use resolver::{PageResolver, WatchPage, extract_event_id, extract_stream_url};
