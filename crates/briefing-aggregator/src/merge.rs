//! Folding freshly enriched feeds into category buckets.

use std::collections::BTreeMap;

use briefing_core::{
    sort_newest_first, CategoryBucket, EnrichedArticle, FeedSource, SourceRegistry,
};
use briefing_enrich::dedupe;

/// Replace `source`'s articles in its category bucket with `articles`.
///
/// The bucket is created from the registry's category info on first sight.
/// Articles of other sources in the bucket are kept as they are.
pub fn merge_source(
    buckets: &mut BTreeMap<String, CategoryBucket>,
    registry: &SourceRegistry,
    source: &FeedSource,
    articles: Vec<EnrichedArticle>,
) {
    let bucket = buckets
        .entry(source.category.clone())
        .or_insert_with(|| match registry.category(&source.category) {
            Some(info) => CategoryBucket::from_info(info),
            None => CategoryBucket {
                title: source.category.clone(),
                ..CategoryBucket::default()
            },
        });
    bucket.add_source(&source.display_name);
    bucket.replace_source_items(&source.display_name, articles);
}

/// Deduplicate and sort each bucket, then build the flattened article list
/// the same way.
///
/// Articles that lose the cross-category dedupe are dropped from their bucket
/// too, so every bucket item also appears in the returned list.
pub fn finalize(buckets: &mut BTreeMap<String, CategoryBucket>) -> Vec<EnrichedArticle> {
    for bucket in buckets.values_mut() {
        let mut items = dedupe(std::mem::take(&mut bucket.items));
        sort_newest_first(&mut items);
        bucket.items = items;
    }
    let mut all = dedupe(
        buckets
            .values()
            .flat_map(|b| b.items.iter().cloned())
            .collect(),
    );
    sort_newest_first(&mut all);
    for bucket in buckets.values_mut() {
        bucket.items.retain(|item| all.contains(item));
    }
    all
}

#[cfg(test)]
mod tests {
    use briefing_core::{CategoryInfo, SentimentLabel};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::*;

    fn registry() -> SourceRegistry {
        SourceRegistry::new(
            vec![CategoryInfo {
                key: "tax".to_string(),
                title: "Tax".to_string(),
                description: "Tax news".to_string(),
            }],
            vec![
                source("https://a.example.com/rss", "A"),
                source("https://b.example.com/rss", "B"),
            ],
        )
        .expect("valid registry")
    }

    fn source(url: &str, name: &str) -> FeedSource {
        FeedSource {
            url: url.to_string(),
            display_name: name.to_string(),
            category: "tax".to_string(),
        }
    }

    fn at(hours: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 6, 8, 0, 0).unwrap() + Duration::hours(hours)
    }

    fn article(title: &str, source: &str, published_at: DateTime<Utc>) -> EnrichedArticle {
        EnrichedArticle {
            title: title.to_string(),
            link: "#".to_string(),
            published_at,
            content: String::new(),
            summary: String::new(),
            sentiment_label: SentimentLabel::Neutral,
            sentiment_score: 0.5,
            source_name: source.to_string(),
            category: "tax".to_string(),
            topics: vec![],
        }
    }

    #[test]
    fn first_merge_seeds_bucket_from_registry() {
        let registry = registry();
        let mut buckets = BTreeMap::new();
        merge_source(
            &mut buckets,
            &registry,
            &registry.sources()[0],
            vec![article("Budget day", "A", at(0))],
        );
        let bucket = &buckets["tax"];
        assert_eq!(bucket.title, "Tax");
        assert_eq!(bucket.description, "Tax news");
        assert_eq!(bucket.sources, vec!["A"]);
        assert_eq!(bucket.items.len(), 1);
    }

    #[test]
    fn remerge_replaces_only_that_source() {
        let registry = registry();
        let (a, b) = (&registry.sources()[0], &registry.sources()[1]);
        let mut buckets = BTreeMap::new();
        merge_source(&mut buckets, &registry, a, vec![article("Old A story", "A", at(0))]);
        merge_source(&mut buckets, &registry, b, vec![article("B story", "B", at(1))]);
        merge_source(&mut buckets, &registry, a, vec![article("New A story", "A", at(2))]);

        let bucket = &buckets["tax"];
        assert_eq!(bucket.sources, vec!["A", "B"]);
        let titles: Vec<&str> = bucket.items.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["B story", "New A story"]);
    }

    #[test]
    fn finalize_sorts_and_dedupes() {
        let registry = registry();
        let (a, b) = (&registry.sources()[0], &registry.sources()[1]);
        let mut buckets = BTreeMap::new();
        merge_source(
            &mut buckets,
            &registry,
            a,
            vec![
                article("Pension changes announced", "A", at(0)),
                article("Stamp duty cut", "A", at(3)),
            ],
        );
        merge_source(
            &mut buckets,
            &registry,
            b,
            vec![article("Pension changes announced today", "B", at(1))],
        );

        let all = finalize(&mut buckets);
        let titles: Vec<&str> = all.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Stamp duty cut", "Pension changes announced today"]);
        assert!(all
            .windows(2)
            .all(|w| w[0].published_at >= w[1].published_at));
        assert_eq!(buckets["tax"].items.len(), 2);
    }

    #[test]
    fn cross_category_duplicate_leaves_its_bucket() {
        let registry = registry();
        let pensions = FeedSource {
            category: "pensions".to_string(),
            ..source("https://c.example.com/rss", "C")
        };
        let mut buckets = BTreeMap::new();
        merge_source(
            &mut buckets,
            &registry,
            &registry.sources()[0],
            vec![article("State pension age review", "A", at(0))],
        );
        let mut newer = article("State pension age review published", "C", at(2));
        newer.category = "pensions".to_string();
        merge_source(&mut buckets, &registry, &pensions, vec![newer]);

        let all = finalize(&mut buckets);

        assert_eq!(all.len(), 1);
        assert_eq!(all[0].source_name, "C");
        assert!(buckets["tax"].items.is_empty());
        assert_eq!(buckets["pensions"].items, all);
        for bucket in buckets.values() {
            assert!(bucket.items.iter().all(|item| all.contains(item)));
        }
    }
}
