//! Shared data model for the aggregation pipeline.
//!
//! Everything here is plain data. JSON field names are camelCase because the
//! aggregate view is served as-is to the browser client.

use std::collections::BTreeMap;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::text::strip_html;

/// Title used when a feed item omits one.
pub const UNTITLED: &str = "Untitled";

/// Link used when neither the item nor the source provides one.
pub const MISSING_LINK: &str = "#";

/// One configured feed. Identity is `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSource {
    pub url: String,
    pub display_name: String,
    pub category: String,
}

/// Display metadata for a category of sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub key: String,
    pub title: String,
    pub description: String,
}

/// One entry from a parsed feed, before enrichment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub full_content: Option<String>,
    pub content: Option<String>,
    pub snippet: Option<String>,
    pub description: Option<String>,
}

impl RawItem {
    /// The richest non-empty content variant, cascading
    /// `full_content -> content -> snippet -> description -> ""`.
    #[must_use]
    pub fn richest_content(&self) -> &str {
        [
            &self.full_content,
            &self.content,
            &self.snippet,
            &self.description,
        ]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .find(|s| !s.trim().is_empty())
        .unwrap_or("")
    }

    /// [`Self::richest_content`] as plain text. The snippet is already
    /// stripped by the parser, so only the HTML-bearing variants are
    /// stripped here; stripping twice would read a decoded `&lt;` as a tag.
    #[must_use]
    pub fn plain_content(&self) -> String {
        let is_snippet = [&self.full_content, &self.content]
            .into_iter()
            .flatten()
            .all(|s| s.trim().is_empty())
            && self.snippet.as_deref().is_some_and(|s| !s.trim().is_empty());
        if is_snippet {
            self.richest_content().trim().to_string()
        } else {
            strip_html(self.richest_content())
        }
    }

    /// Item title, or [`UNTITLED`] when missing or blank.
    #[must_use]
    pub fn title_or_default(&self) -> &str {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNTITLED)
    }
}

/// Result of fetching one source. Always produced, even when every fetch
/// tier failed; in that case `items` is empty and `description` says why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedFeed {
    pub source_name: String,
    pub source_url: String,
    pub category: Option<String>,
    pub title: String,
    pub description: String,
    pub items: Vec<RawItem>,
}

impl ParsedFeed {
    /// A degraded feed with no items.
    #[must_use]
    pub fn degraded(source: &FeedSource, reason: impl Into<String>) -> Self {
        Self {
            source_name: source.display_name.clone(),
            source_url: source.url.clone(),
            category: Some(source.category.clone()),
            title: source.display_name.clone(),
            description: reason.into(),
            items: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// Bucket a score in `[0, 1]`: above 0.67 is positive, below 0.33 negative.
    #[must_use]
    pub fn from_score(score: f32) -> Self {
        if score > 0.67 {
            Self::Positive
        } else if score < 0.33 {
            Self::Negative
        } else {
            Self::Neutral
        }
    }

    /// Lenient parse of a label emitted by an external classifier.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "negative" => Some(Self::Negative),
            "neutral" | "mixed" => Some(Self::Neutral),
            _ => None,
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SentimentLabel::Positive => write!(f, "positive"),
            SentimentLabel::Negative => write!(f, "negative"),
            SentimentLabel::Neutral => write!(f, "neutral"),
        }
    }
}

/// The unit stored in the cache and shown to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedArticle {
    pub title: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
    pub content: String,
    pub summary: String,
    pub sentiment_label: SentimentLabel,
    /// In `[0, 1]`; 0.5 is neutral.
    pub sentiment_score: f32,
    pub source_name: String,
    pub category: String,
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBucket {
    pub title: String,
    pub description: String,
    pub sources: Vec<String>,
    pub items: Vec<EnrichedArticle>,
}

impl CategoryBucket {
    #[must_use]
    pub fn from_info(info: &CategoryInfo) -> Self {
        Self {
            title: info.title.clone(),
            description: info.description.clone(),
            sources: Vec::new(),
            items: Vec::new(),
        }
    }

    /// Add a source name unless it is already listed.
    pub fn add_source(&mut self, name: &str) {
        if !self.sources.iter().any(|s| s == name) {
            self.sources.push(name.to_string());
        }
    }

    /// Drop every article from `source_name` and append `fresh` in its place.
    pub fn replace_source_items(&mut self, source_name: &str, fresh: Vec<EnrichedArticle>) {
        self.items.retain(|a| a.source_name != source_name);
        self.items.extend(fresh);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingTopic {
    pub topic: String,
    pub count: u32,
}

/// The externally served artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResponse {
    pub feeds_by_category: BTreeMap<String, CategoryBucket>,
    pub all_articles: Vec<EnrichedArticle>,
    pub trending_topics: Vec<TrendingTopic>,
    pub master_summary: String,
    pub generated_at: DateTime<Utc>,
}

impl AggregateResponse {
    /// A structurally valid response with no content.
    #[must_use]
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            feeds_by_category: BTreeMap::new(),
            all_articles: Vec::new(),
            trending_topics: Vec::new(),
            master_summary: message.into(),
            generated_at: Utc::now(),
        }
    }
}

/// Cache state owned by the cache store and used as the persistence payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    pub current: Option<AggregateResponse>,
    pub snapshot_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub per_source_last_refresh: HashMap<String, DateTime<Utc>>,
}

/// Sort articles newest-first. `sort_by` is stable, so ties keep input order.
pub fn sort_newest_first(articles: &mut [EnrichedArticle]) {
    articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn article(title: &str, source: &str, published_at: DateTime<Utc>) -> EnrichedArticle {
        EnrichedArticle {
            title: title.to_string(),
            link: format!("https://example.com/{title}"),
            published_at,
            content: String::new(),
            summary: String::new(),
            sentiment_label: SentimentLabel::Neutral,
            sentiment_score: 0.5,
            source_name: source.to_string(),
            category: "economy".to_string(),
            topics: vec![],
        }
    }

    #[test]
    fn richest_content_cascades_past_blank_fields() {
        let item = RawItem {
            full_content: Some("   ".to_string()),
            content: None,
            snippet: Some("snippet text".to_string()),
            description: Some("description text".to_string()),
            ..RawItem::default()
        };
        assert_eq!(item.richest_content(), "snippet text");
        assert_eq!(RawItem::default().richest_content(), "");
    }

    #[test]
    fn plain_content_decodes_entities_once() {
        let html = RawItem {
            full_content: Some("<p>Rates &lt; 2% for savers</p>".to_string()),
            ..RawItem::default()
        };
        assert_eq!(html.plain_content(), "Rates < 2% for savers");

        let snippet = RawItem {
            snippet: Some("Rates < 2% for savers".to_string()),
            description: Some("<p>Rates &lt; 2%</p>".to_string()),
            ..RawItem::default()
        };
        assert_eq!(snippet.plain_content(), "Rates < 2% for savers");
    }

    #[test]
    fn title_defaults_to_untitled() {
        let item = RawItem {
            title: Some("  ".to_string()),
            ..RawItem::default()
        };
        assert_eq!(item.title_or_default(), UNTITLED);
    }

    #[test]
    fn sentiment_label_buckets() {
        assert_eq!(SentimentLabel::from_score(0.9), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_score(0.1), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::from_score(0.5), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(0.67), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::parse(" Positive "), Some(SentimentLabel::Positive));
        assert_eq!(SentimentLabel::parse("bullish"), None);
    }

    #[test]
    fn bucket_sources_stay_unique() {
        let mut bucket = CategoryBucket::default();
        bucket.add_source("BBC");
        bucket.add_source("BBC");
        bucket.add_source("FT");
        assert_eq!(bucket.sources, vec!["BBC", "FT"]);
    }

    #[test]
    fn replace_source_items_only_touches_that_source() {
        let now = Utc::now();
        let mut bucket = CategoryBucket::default();
        bucket.items = vec![article("old-a", "A", now), article("b", "B", now)];
        bucket.replace_source_items("A", vec![article("new-a", "A", now)]);
        let titles: Vec<&str> = bucket.items.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "new-a"]);
    }

    #[test]
    fn sort_is_newest_first_and_stable() {
        let now = Utc::now();
        let mut articles = vec![
            article("older", "A", now - Duration::hours(2)),
            article("tie-1", "A", now),
            article("tie-2", "B", now),
        ];
        sort_newest_first(&mut articles);
        let titles: Vec<&str> = articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["tie-1", "tie-2", "older"]);
    }

    #[test]
    fn aggregate_response_serializes_camel_case() {
        let json = serde_json::to_value(AggregateResponse::empty("nothing yet")).expect("json");
        assert_eq!(json["masterSummary"], "nothing yet");
        assert!(json["allArticles"].as_array().expect("array").is_empty());
        assert!(json.get("feedsByCategory").is_some());
    }
}
