//! Per-article enrichment: summary, sentiment and topics.

use std::sync::Arc;
use std::time::Duration;

use briefing_core::types::MISSING_LINK;
use briefing_core::{EnrichedArticle, FeedSource, RawItem, SentimentLabel};
use chrono::Utc;

use crate::ai::AiClient;
use crate::keywords::{extract_keywords, local_summary, SHORT_TEXT_CHARS};
use crate::lexicon::keyword_sentiment;

/// Keywords kept per article.
pub const TOPICS_PER_ARTICLE: usize = 5;

const NEUTRAL_SCORE: f32 = 0.5;

pub struct Enricher {
    ai: Arc<AiClient>,
    timeout: Duration,
}

impl Enricher {
    /// `timeout` bounds the whole AI path for one article.
    #[must_use]
    pub fn new(ai: Arc<AiClient>, timeout: Duration) -> Self {
        Self { ai, timeout }
    }

    /// Build an [`EnrichedArticle`]. Never fails.
    ///
    /// The local summary and topics are always computed. The AI summary and
    /// sentiment calls run concurrently under one timeout; on expiry the
    /// local summary is used with neutral sentiment.
    pub async fn enrich(&self, item: &RawItem, source: &FeedSource) -> EnrichedArticle {
        let title = item.title_or_default().to_string();
        let content = item.plain_content();
        let local = local_summary(&content);
        let topics = extract_keywords(&title, &content, TOPICS_PER_ARTICLE);

        let ai_path = async {
            tokio::join!(
                self.ai_summary(&title, &content),
                self.sentiment(&title, &content)
            )
        };
        let (summary, (sentiment_label, sentiment_score)) =
            match tokio::time::timeout(self.timeout, ai_path).await {
                Ok((summary, sentiment)) => (summary.unwrap_or_else(|| local.clone()), sentiment),
                Err(_) => {
                    tracing::debug!(
                        source = %source.url,
                        title = %title,
                        timeout_secs = self.timeout.as_secs(),
                        "enrich: AI path timed out, using local result"
                    );
                    (local.clone(), (SentimentLabel::Neutral, NEUTRAL_SCORE))
                }
            };

        EnrichedArticle {
            link: resolve_link(item, source),
            published_at: item.published_at.unwrap_or_else(Utc::now),
            summary,
            sentiment_label,
            sentiment_score,
            source_name: source.display_name.clone(),
            category: source.category.clone(),
            topics,
            title,
            content,
        }
    }

    async fn ai_summary(&self, title: &str, content: &str) -> Option<String> {
        if content.trim().is_empty() {
            return None;
        }
        match self.ai.summarize(title, content).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::debug!(error = %e, "enrich: AI summary unavailable");
                None
            }
        }
    }

    async fn sentiment(&self, title: &str, content: &str) -> (SentimentLabel, f32) {
        let heuristic = || keyword_sentiment(&format!("{title} {content}"));
        if content.chars().count() < SHORT_TEXT_CHARS {
            return heuristic();
        }
        match self.ai.sentiment(title, content).await {
            Ok(s) => (s.label, s.score),
            Err(e) => {
                tracing::debug!(error = %e, "enrich: AI sentiment unavailable, using keywords");
                heuristic()
            }
        }
    }
}

fn resolve_link(item: &RawItem, source: &FeedSource) -> String {
    [item.link.as_deref(), Some(source.url.as_str())]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or(MISSING_LINK)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::AiSettings;

    fn source() -> FeedSource {
        FeedSource {
            url: "https://feeds.example.com/money".to_string(),
            display_name: "Example Money".to_string(),
            category: "personal-finance".to_string(),
        }
    }

    fn offline_enricher() -> Enricher {
        let ai = AiClient::new(AiSettings::disabled()).expect("client");
        Enricher::new(Arc::new(ai), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn offline_enrichment_uses_local_results() {
        let item = RawItem {
            title: Some("Savings rates rise again".to_string()),
            link: Some("https://news.example.com/savings".to_string()),
            snippet: Some("Easy access savings rates rise as banks compete.".to_string()),
            ..RawItem::default()
        };
        let article = offline_enricher().enrich(&item, &source()).await;

        assert_eq!(article.title, "Savings rates rise again");
        assert_eq!(article.link, "https://news.example.com/savings");
        assert_eq!(article.summary, "Easy access savings rates rise as banks compete.");
        assert_eq!(article.sentiment_label, SentimentLabel::Positive);
        assert_eq!(article.source_name, "Example Money");
        assert_eq!(article.category, "personal-finance");
        assert_eq!(article.topics[0], "savings");
        assert!(article.topics.len() <= TOPICS_PER_ARTICLE);
    }

    #[tokio::test]
    async fn escaped_markup_survives_into_local_summary() {
        let item = RawItem {
            title: Some("Savers finally gain ground".to_string()),
            full_content: Some(
                "<p>Inflation is now &lt; 2% so savers finally gain ground. \
                 Banks are raising rates on easy-access accounts.</p>"
                    .to_string(),
            ),
            ..RawItem::default()
        };
        let article = offline_enricher().enrich(&item, &source()).await;

        assert!(article.content.starts_with("Inflation is now < 2% so savers"));
        assert_eq!(
            article.summary,
            "Inflation is now < 2% so savers finally gain ground. \
             Banks are raising rates on easy-access accounts."
        );
    }

    #[tokio::test]
    async fn missing_fields_get_defaults() {
        let before = Utc::now();
        let article = offline_enricher().enrich(&RawItem::default(), &source()).await;

        assert_eq!(article.title, "Untitled");
        assert_eq!(article.link, "https://feeds.example.com/money");
        assert!(article.published_at >= before);
        assert!(article.content.is_empty());
        assert_eq!(article.sentiment_label, SentimentLabel::Neutral);
        assert!((article.sentiment_score - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn link_falls_back_to_placeholder() {
        let src = FeedSource {
            url: " ".to_string(),
            ..source()
        };
        assert_eq!(resolve_link(&RawItem::default(), &src), MISSING_LINK);
    }
}
