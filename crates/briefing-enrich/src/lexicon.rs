//! Keyword sentiment heuristic for UK personal finance headlines.
//!
//! Used when an article is too short to be worth an AI call, or when the AI
//! call fails.

use briefing_core::SentimentLabel;

/// Words that read as good news for savers, earners and pensioners.
pub(crate) const POSITIVE: &[&str] = &[
    "boost",
    "boosted",
    "bonus",
    "gain",
    "gains",
    "growth",
    "grow",
    "improve",
    "improved",
    "increase",
    "rise",
    "rises",
    "record",
    "recovery",
    "relief",
    "refund",
    "rebate",
    "saving",
    "savings",
    "strong",
    "surge",
    "win",
    "windfall",
    "higher",
    "protect",
    "protected",
    "support",
    "benefit",
];

/// Words that read as bad news.
pub(crate) const NEGATIVE: &[&str] = &[
    "crisis",
    "cut",
    "cuts",
    "debt",
    "decline",
    "drop",
    "drops",
    "fall",
    "falls",
    "fear",
    "fine",
    "fined",
    "fraud",
    "freeze",
    "frozen",
    "hike",
    "inflation",
    "loss",
    "losses",
    "penalty",
    "recession",
    "scam",
    "shortfall",
    "slump",
    "squeeze",
    "warning",
    "worse",
    "lower",
];

/// Score `text` as `positive / (positive + negative)` keyword hits.
///
/// Returns `0.5` when no keyword matches.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn keyword_score(text: &str) -> f32 {
    let mut positive = 0u32;
    let mut negative = 0u32;
    for word in text.split_whitespace() {
        let w = word
            .trim_matches(|c: char| !c.is_alphabetic())
            .to_lowercase();
        if POSITIVE.contains(&w.as_str()) {
            positive += 1;
        } else if NEGATIVE.contains(&w.as_str()) {
            negative += 1;
        }
    }
    let total = positive + negative;
    if total == 0 {
        return 0.5;
    }
    positive as f32 / total as f32
}

/// Label and score from [`keyword_score`].
#[must_use]
pub fn keyword_sentiment(text: &str) -> (SentimentLabel, f32) {
    let score = keyword_score(text);
    (SentimentLabel::from_score(score), score)
}
