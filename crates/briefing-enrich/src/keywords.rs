//! Local text analysis: tokenizer, stopwords, keyword ranking and the
//! first-sentences summary.

use std::collections::HashMap;


/// Content shorter than this is used as its own summary.
pub const SHORT_TEXT_CHARS: usize = 100;

const SUMMARY_SENTENCES: usize = 3;
const TITLE_WEIGHT: u32 = 3;

/// Words that carry no topic on their own. Anything of three characters or
/// fewer is dropped before this list is consulted.
const STOPWORDS: &[&str] = &[
    "about", "after", "again", "against", "also", "among", "around", "because", "been",
    "before", "being", "below", "between", "both", "could", "does", "doing", "down", "during",
    "each", "every", "from", "further", "have", "having", "here", "into", "just", "last",
    "like", "made", "make", "many", "more", "most", "much", "must", "news", "only", "other",
    "over", "said", "same", "says", "should", "since", "some", "still", "such", "than",
    "that", "their", "them", "then", "there", "these", "they", "this", "those", "through",
    "under", "until", "very", "want", "week", "were", "what", "when", "where", "which",
    "while", "will", "with", "would", "year", "years", "your", "told", "according",
    "people", "today", "latest", "first", "time", "take", "three", "well", "even",
];

/// Lowercase alphanumeric tokens longer than three characters, minus stopwords.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .map(|w| w.trim_matches('\'').to_lowercase())
        .filter(|w| w.chars().count() > 3)
        .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
}

/// Top `n` keywords, title tokens weighted three times body tokens.
///
/// Ties rank by first appearance, so the result is deterministic.
#[must_use]
pub fn extract_keywords(title: &str, body: &str, n: usize) -> Vec<String> {
    let mut counts: HashMap<String, (u32, usize)> = HashMap::new();
    let mut order = 0usize;
    let weighted = tokenize(title)
        .map(|w| (w, TITLE_WEIGHT))
        .chain(tokenize(body).map(|w| (w, 1)));
    for (word, weight) in weighted {
        let entry = counts.entry(word).or_insert_with(|| {
            order += 1;
            (0, order)
        });
        entry.0 += weight;
    }

    let mut ranked: Vec<(String, (u32, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked.into_iter().take(n).map(|(word, _)| word).collect()
}

/// First three sentences of already-plain `text`, or the whole text when it
/// is shorter than [`SHORT_TEXT_CHARS`].
#[must_use]
pub fn local_summary(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() < SHORT_TEXT_CHARS {
        return text.to_string();
    }
    split_sentences(text)
        .into_iter()
        .take(SUMMARY_SENTENCES)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split after `.`, `!` or `?` when followed by whitespace or end of text.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        if !matches!(ch, '.' | '!' | '?') {
            continue;
        }
        let at_boundary = chars.peek().is_none_or(|(_, next)| next.is_whitespace());
        if at_boundary {
            let end = idx + ch.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}
