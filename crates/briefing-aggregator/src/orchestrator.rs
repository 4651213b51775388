//! Incremental, time-budgeted refresh of the cached aggregate.
//!
//! A pass selects stale sources, fetches them in small batches, enriches and
//! merges their articles, re-derives topics and the master summary, and
//! commits the result to the [`CacheStore`]. Each stage is gated by a
//! [`Checkpoint`] of the pass [`Deadline`]; a stage that runs out of budget is
//! skipped and the pass still returns a valid aggregate.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use briefing_core::{
    AggregateResponse, AppConfig, CategoryBucket, EnrichedArticle, FeedSource, ParsedFeed,
    SourceRegistry, TrendingTopic,
};
use briefing_enrich::{
    master_summary, trending_local, trending_with_ai, AiClient, Enricher, NO_ARTICLES_SUMMARY,
    SUMMARY_PLACEHOLDER, TRENDING_TOPICS,
};
use briefing_feeds::FeedFetcher;
use chrono::Utc;
use futures::FutureExt;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::cache::CacheStore;
use crate::deadline::{Checkpoint, Deadline};
use crate::merge::{finalize, merge_source};

/// Served when a pass fails and there is no earlier snapshot to fall back on.
pub const REFRESH_FAILED_SUMMARY: &str =
    "The briefing could not be refreshed. Please try again shortly.";

#[derive(Debug, Clone)]
pub struct RefreshSettings {
    pub time_budget: Duration,
    /// Sources fetched per unforced pass, taken in registry order.
    pub max_sources_per_pass: usize,
    pub batch_size: usize,
    pub batch_delay: Duration,
    /// Pause between enriching consecutive articles.
    pub enrich_delay: Duration,
}

impl RefreshSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            time_budget: Duration::from_secs(config.time_budget_secs),
            max_sources_per_pass: config.max_sources_per_pass,
            batch_size: config.fetch_batch_size,
            batch_delay: Duration::from_millis(config.batch_delay_ms),
            enrich_delay: Duration::from_millis(config.enrich_delay_ms),
        }
    }
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_secs(600),
            max_sources_per_pass: 8,
            batch_size: 2,
            batch_delay: Duration::from_secs(1),
            enrich_delay: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// New articles were merged and committed.
    Refreshed,
    /// Nothing was stale, or nothing new could be fetched; the cached
    /// aggregate is returned unchanged.
    Cached,
    /// The pass panicked; the last good aggregate (or an empty one) is
    /// returned.
    Failed,
}

#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub response: AggregateResponse,
    pub articles_processed: usize,
    pub sources_fetched: usize,
    pub categories: usize,
    pub duration: Duration,
    pub outcome: RefreshOutcome,
}

impl RefreshReport {
    fn new(
        response: AggregateResponse,
        articles_processed: usize,
        sources_fetched: usize,
        started: Instant,
        outcome: RefreshOutcome,
    ) -> Self {
        Self {
            categories: response.feeds_by_category.len(),
            response,
            articles_processed,
            sources_fetched,
            duration: started.elapsed(),
            outcome,
        }
    }
}

pub struct Orchestrator {
    registry: Arc<SourceRegistry>,
    cache: Arc<CacheStore>,
    fetcher: Arc<FeedFetcher>,
    enricher: Arc<Enricher>,
    ai: Arc<AiClient>,
    settings: RefreshSettings,
    /// Serializes passes so the cache has a single writer.
    guard: Mutex<()>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        registry: Arc<SourceRegistry>,
        cache: Arc<CacheStore>,
        fetcher: Arc<FeedFetcher>,
        enricher: Arc<Enricher>,
        ai: Arc<AiClient>,
        settings: RefreshSettings,
    ) -> Self {
        Self {
            registry,
            cache,
            fetcher,
            enricher,
            ai,
            settings,
            guard: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    /// Run one refresh pass. Never fails.
    ///
    /// Concurrent calls wait for the running pass to finish, then run their
    /// own (which usually finds nothing stale).
    pub async fn refresh(&self, force: bool) -> RefreshReport {
        let _guard = self.guard.lock().await;
        let started = Instant::now();
        tracing::info!(force, "refresh: pass started");

        match AssertUnwindSafe(self.run_pass(force, started))
            .catch_unwind()
            .await
        {
            Ok(report) => {
                tracing::info!(
                    outcome = ?report.outcome,
                    articles = report.articles_processed,
                    sources = report.sources_fetched,
                    categories = report.categories,
                    elapsed_ms = u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
                    "refresh: pass finished"
                );
                report
            }
            Err(_) => {
                tracing::error!("refresh: pass panicked, serving last good snapshot");
                let response = self
                    .cache
                    .current()
                    .await
                    .unwrap_or_else(|| AggregateResponse::empty(REFRESH_FAILED_SUMMARY));
                RefreshReport::new(response, 0, 0, started, RefreshOutcome::Failed)
            }
        }
    }

    async fn run_pass(&self, force: bool, started: Instant) -> RefreshReport {
        let deadline = Deadline::start(self.settings.time_budget);
        let previous = self.cache.current().await;

        let mut stale: Vec<FeedSource> = Vec::new();
        for source in self.registry.sources() {
            if self.cache.is_stale(&source.url, force).await {
                stale.push(source.clone());
            }
        }

        if stale.is_empty() {
            if let Some(previous) = previous {
                tracing::debug!("refresh: no stale sources, serving cache");
                return RefreshReport::new(previous, 0, 0, started, RefreshOutcome::Cached);
            }
        }
        if !force && stale.len() > self.settings.max_sources_per_pass {
            tracing::debug!(
                stale = stale.len(),
                limit = self.settings.max_sources_per_pass,
                "refresh: limiting sources for this pass"
            );
            stale.truncate(self.settings.max_sources_per_pass);
        }

        let fetched = self.fetch_batches(&stale, &deadline).await;
        let sources_fetched = fetched.iter().filter(|(_, feed)| !feed.is_empty()).count();

        if sources_fetched == 0 {
            if let Some(previous) = previous {
                tracing::warn!(
                    attempted = fetched.len(),
                    "refresh: no source returned items, keeping cached aggregate"
                );
                return RefreshReport::new(previous, 0, 0, started, RefreshOutcome::Cached);
            }
        }

        let warm = previous.is_some();
        let (mut buckets, previous_topics, previous_summary) = match previous {
            Some(prev) => (
                prev.feeds_by_category,
                Some(prev.trending_topics),
                Some(prev.master_summary),
            ),
            None => (BTreeMap::new(), None, None),
        };

        let (articles_processed, refreshed_urls) =
            self.process_feeds(&mut buckets, fetched, &deadline).await;
        let all_articles = finalize(&mut buckets);

        let (trending_topics, master_summary) = self
            .reaggregate(&all_articles, previous_topics, previous_summary, &deadline)
            .await;

        let now = Utc::now();
        let response = AggregateResponse {
            feeds_by_category: buckets,
            all_articles,
            trending_topics: dedupe_topics(trending_topics),
            master_summary,
            generated_at: now,
        };
        self.cache
            .commit(response.clone(), &refreshed_urls, now)
            .await;
        self.cache.persist().await;

        tracing::debug!(warm, refreshed = refreshed_urls.len(), "refresh: committed");
        RefreshReport::new(
            response,
            articles_processed,
            sources_fetched,
            started,
            RefreshOutcome::Refreshed,
        )
    }

    /// Trending topics and master summary for `articles`, each gated by its
    /// checkpoint. A closed checkpoint keeps the previous value when there is
    /// one; the summary also needs the topics checkpoint to have been open.
    async fn reaggregate(
        &self,
        articles: &[EnrichedArticle],
        previous_topics: Option<Vec<TrendingTopic>>,
        previous_summary: Option<String>,
        deadline: &Deadline,
    ) -> (Vec<TrendingTopic>, String) {
        let topics_allowed = deadline.allows(Checkpoint::Topics);
        let topics = if topics_allowed {
            trending_with_ai(&self.ai, articles).await
        } else if let Some(topics) = previous_topics {
            tracing::debug!("refresh: topics budget spent, keeping previous topics");
            topics
        } else {
            trending_local(articles, TRENDING_TOPICS)
        };

        let summary = if articles.is_empty() {
            NO_ARTICLES_SUMMARY.to_string()
        } else if topics_allowed && deadline.allows(Checkpoint::Summary) {
            master_summary(&self.ai, articles).await
        } else if let Some(summary) = previous_summary {
            tracing::debug!("refresh: summary budget spent, keeping previous summary");
            summary
        } else {
            SUMMARY_PLACEHOLDER.to_string()
        };

        (topics, summary)
    }

    /// Fetch `sources` in batches, stopping at the fetch checkpoint.
    async fn fetch_batches(
        &self,
        sources: &[FeedSource],
        deadline: &Deadline,
    ) -> Vec<(FeedSource, ParsedFeed)> {
        let mut fetched = Vec::with_capacity(sources.len());
        for (idx, batch) in sources.chunks(self.settings.batch_size.max(1)).enumerate() {
            if idx > 0 && !self.settings.batch_delay.is_zero() {
                tokio::time::sleep(self.settings.batch_delay).await;
            }
            if !deadline.allows(Checkpoint::Fetch) {
                tracing::warn!(
                    fetched = fetched.len(),
                    remaining = sources.len() - fetched.len(),
                    "refresh: fetch budget spent, skipping remaining sources"
                );
                break;
            }
            let feeds = self.fetcher.fetch_all(batch).await;
            fetched.extend(batch.iter().cloned().zip(feeds));
        }
        fetched
    }

    /// Enrich and merge every feed with items, stopping at the process
    /// checkpoint. Returns the article count and the URLs actually merged.
    async fn process_feeds(
        &self,
        buckets: &mut BTreeMap<String, CategoryBucket>,
        fetched: Vec<(FeedSource, ParsedFeed)>,
        deadline: &Deadline,
    ) -> (usize, Vec<String>) {
        let mut processed = 0;
        let mut refreshed_urls = Vec::new();

        for (source, feed) in fetched {
            if feed.is_empty() {
                tracing::debug!(source = %source.url, reason = %feed.description, "refresh: no items from source");
                continue;
            }
            if !deadline.allows(Checkpoint::Process) {
                tracing::warn!(source = %source.url, "refresh: process budget spent, skipping feed");
                continue;
            }

            let mut articles = Vec::with_capacity(feed.items.len());
            for (idx, item) in feed.items.iter().enumerate() {
                if idx > 0 && !self.settings.enrich_delay.is_zero() {
                    tokio::time::sleep(self.settings.enrich_delay).await;
                }
                articles.push(self.enricher.enrich(item, &source).await);
            }

            processed += articles.len();
            merge_source(buckets, &self.registry, &source, articles);
            refreshed_urls.push(source.url);
        }

        (processed, refreshed_urls)
    }
}

/// The AI can repeat a topic; keep the first occurrence.
fn dedupe_topics(topics: Vec<TrendingTopic>) -> Vec<TrendingTopic> {
    let mut seen = std::collections::HashSet::new();
    topics
        .into_iter()
        .filter(|t| seen.insert(t.topic.clone()))
        .collect()
}
