//! Trending topics across a result set.

use std::collections::HashMap;

use briefing_core::text::truncate_chars;
use briefing_core::{EnrichedArticle, TrendingTopic};
use serde_json::Value;

use crate::ai::{extract_json_array, AiClient};

/// Topics returned by either variant.
pub const TRENDING_TOPICS: usize = 10;

/// Articles fed into the AI prompt.
const AI_TOPIC_ARTICLES: usize = 10;

/// Count the precomputed per-article topics and keep the top `n`.
///
/// Ties rank by first appearance.
#[must_use]
pub fn trending_local(articles: &[EnrichedArticle], n: usize) -> Vec<TrendingTopic> {
    let mut counts: HashMap<&str, (u32, usize)> = HashMap::new();
    for (order, topic) in articles.iter().flat_map(|a| &a.topics).enumerate() {
        counts.entry(topic.as_str()).or_insert((0, order)).0 += 1;
    }
    let mut ranked: Vec<(&str, (u32, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked
        .into_iter()
        .take(n)
        .map(|(topic, (count, _))| TrendingTopic {
            topic: topic.to_string(),
            count,
        })
        .collect()
}

/// Ask the AI provider for trending topics over the newest articles.
///
/// `articles` should already be sorted newest-first. Falls back to
/// [`trending_local`] on any transport or parse failure.
pub async fn trending_with_ai(ai: &AiClient, articles: &[EnrichedArticle]) -> Vec<TrendingTopic> {
    if articles.is_empty() {
        return Vec::new();
    }
    if !ai.is_enabled() {
        return trending_local(articles, TRENDING_TOPICS);
    }

    let prompt = articles
        .iter()
        .take(AI_TOPIC_ARTICLES)
        .map(|a| format!("- {}: {}", a.title, truncate_chars(&a.summary, 200)))
        .collect::<Vec<_>>()
        .join("\n");

    let reply = ai
        .complete(
            "Identify the trending personal finance topics in these UK news headlines. \
             Reply only with a JSON array of objects: [{\"topic\": string, \"count\": number}]. \
             Use short lowercase topics of one to three words.",
            &prompt,
            300,
        )
        .await;

    let topics = match reply {
        Ok(text) => parse_topics(&text, articles),
        Err(e) => {
            tracing::debug!(error = %e, "topics: AI request failed, counting locally");
            Vec::new()
        }
    };
    if topics.is_empty() {
        return trending_local(articles, TRENDING_TOPICS);
    }
    topics
}

/// Accepts both `["topic", ...]` and `[{"topic": .., "count": ..}, ...]`.
/// Bare strings are counted against the articles' own topics and titles.
fn parse_topics(reply: &str, articles: &[EnrichedArticle]) -> Vec<TrendingTopic> {
    let Some(values) = extract_json_array(reply) else {
        tracing::debug!("topics: AI reply had no JSON array");
        return Vec::new();
    };

    values
        .into_iter()
        .filter_map(|value| match value {
            Value::String(topic) => Some((topic, None)),
            Value::Object(map) => {
                let topic = map
                    .get("topic")
                    .or_else(|| map.get("name"))
                    .and_then(Value::as_str)?
                    .to_string();
                let count = map
                    .get("count")
                    .and_then(Value::as_u64)
                    .map(|c| u32::try_from(c).unwrap_or(u32::MAX));
                Some((topic, count))
            }
            _ => None,
        })
        .map(|(topic, count)| (topic.trim().to_lowercase(), count))
        .filter(|(topic, _)| !topic.is_empty())
        .take(TRENDING_TOPICS)
        .map(|(topic, count)| {
            let count = count.unwrap_or_else(|| mentions(&topic, articles)).max(1);
            TrendingTopic { topic, count }
        })
        .collect()
}

fn mentions(topic: &str, articles: &[EnrichedArticle]) -> u32 {
    let n = articles
        .iter()
        .filter(|a| {
            a.topics.iter().any(|t| t == topic) || a.title.to_lowercase().contains(topic)
        })
        .count();
    u32::try_from(n).unwrap_or(u32::MAX)
}
