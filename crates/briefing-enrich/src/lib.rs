//! Article enrichment, deduplication and result-set aggregation.
//!
//! Every AI-backed operation here has a deterministic local fallback, so a
//! missing API key or an unavailable provider degrades quality, never
//! availability.

pub mod ai;
pub mod dedupe;
pub mod enricher;
pub mod error;
pub mod keywords;
pub mod lexicon;
pub mod summary;
pub mod topics;

pub use ai::{AiClient, AiSentiment, AiSettings};
pub use dedupe::dedupe;
pub use enricher::Enricher;
pub use error::AiError;
pub use keywords::{extract_keywords, local_summary};
pub use lexicon::{keyword_score, keyword_sentiment};
pub use summary::{master_summary, NO_ARTICLES_SUMMARY, SUMMARY_PLACEHOLDER};
pub use topics::{trending_local, trending_with_ai, TRENDING_TOPICS};
