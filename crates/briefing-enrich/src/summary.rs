//! Master summary over the newest articles.

use briefing_core::text::truncate_chars;
use briefing_core::EnrichedArticle;

use crate::ai::AiClient;

/// Served when the AI summary cannot be produced.
pub const SUMMARY_PLACEHOLDER: &str =
    "Summary is being prepared. Check back shortly for the latest briefing.";

/// Served when there are no articles to summarise.
pub const NO_ARTICLES_SUMMARY: &str =
    "No articles available right now. Feeds will be refreshed shortly.";

const SUMMARY_ARTICLES: usize = 8;

/// Summarise the newest articles. Never empty.
///
/// `articles` should already be sorted newest-first.
pub async fn master_summary(ai: &AiClient, articles: &[EnrichedArticle]) -> String {
    if articles.is_empty() {
        return NO_ARTICLES_SUMMARY.to_string();
    }

    let digest = articles
        .iter()
        .take(SUMMARY_ARTICLES)
        .map(|a| {
            format!(
                "- [{}] {} ({}): {}",
                a.category,
                a.title,
                a.source_name,
                truncate_chars(&a.summary, 300)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    match ai
        .complete(
            "You write a short daily briefing on UK tax, pensions and personal finance news. \
             Summarise the key themes of these articles in one paragraph of at most five sentences. \
             Plain text only.",
            &digest,
            400,
        )
        .await
    {
        Ok(summary) => summary,
        Err(e) => {
            tracing::debug!(error = %e, "summary: AI summary unavailable, using placeholder");
            SUMMARY_PLACEHOLDER.to_string()
        }
    }
}
