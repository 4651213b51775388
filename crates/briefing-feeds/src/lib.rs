//! RSS/Atom fetching with tiered fallback.
//!
//! [`FeedFetcher`] turns a [`briefing_core::FeedSource`] into a
//! [`briefing_core::ParsedFeed`] without ever failing: a strict parse is tried
//! first, then a sanitized lenient parse of a direct fetch, then the same
//! through a CORS proxy.

pub mod error;
pub mod fetcher;
pub mod parse;
pub mod sanitize;

pub use error::FeedError;
pub use fetcher::{FeedFetcher, FetcherSettings, MAX_ITEMS_PER_FEED};
pub use parse::{parse_feed_date, parse_lenient, parse_strict, ParsedDocument};
pub use sanitize::sanitize_feed_body;
