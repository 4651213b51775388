//! Near-duplicate collapse by title-prefix containment.
//!
//! Two articles are duplicates when the lowercased first five words of one
//! title contain those of the other. The newer article survives; on equal
//! timestamps the one seen first does. When a survivor starts matching a
//! further group, the groups merge, so no two survivors ever match and
//! `dedupe(dedupe(x)) == dedupe(x)`.
//!
//! O(n²) in the number of articles.

use briefing_core::EnrichedArticle;

const TITLE_PREFIX_WORDS: usize = 5;

struct Entry {
    article: EnrichedArticle,
    title_prefix: String,
}

impl Entry {
    fn new(article: EnrichedArticle) -> Self {
        let title_prefix = title_prefix(&article.title);
        Self {
            article,
            title_prefix,
        }
    }

    fn matches(&self, other: &Entry) -> bool {
        if self.title_prefix.is_empty() || other.title_prefix.is_empty() {
            return false;
        }
        self.title_prefix.contains(&other.title_prefix)
            || other.title_prefix.contains(&self.title_prefix)
    }

    fn is_newer_than(&self, other: &Entry) -> bool {
        self.article.published_at > other.article.published_at
    }
}

fn title_prefix(title: &str) -> String {
    title
        .split_whitespace()
        .take(TITLE_PREFIX_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Collapse near-duplicates, keeping first-seen group order.
#[must_use]
pub fn dedupe(articles: Vec<EnrichedArticle>) -> Vec<EnrichedArticle> {
    let mut kept: Vec<Entry> = Vec::with_capacity(articles.len());

    for article in articles {
        let mut current = Entry::new(article);
        // Group `current` stands for once it has matched; that slot in `kept`
        // is stale until it is overwritten below.
        let mut slot: Option<usize> = None;

        while let Some(j) =
            (0..kept.len()).find(|&i| Some(i) != slot && kept[i].matches(&current))
        {
            match slot {
                None => {
                    if !current.is_newer_than(&kept[j]) {
                        std::mem::swap(&mut current, &mut kept[j]);
                    }
                    slot = Some(j);
                }
                Some(s) => {
                    let removed = kept.remove(s.max(j));
                    let other = if s < j {
                        removed
                    } else {
                        std::mem::replace(&mut kept[j], removed)
                    };
                    let (earlier, later) = if s < j {
                        (current, other)
                    } else {
                        (other, current)
                    };
                    current = if later.is_newer_than(&earlier) {
                        later
                    } else {
                        earlier
                    };
                    slot = Some(s.min(j));
                }
            }
        }

        match slot {
            Some(s) => kept[s] = current,
            None => kept.push(current),
        }
    }

    kept.into_iter().map(|e| e.article).collect()
}
