//! Tiered feed fetcher.
//!
//! [`FeedFetcher::fetch`] never fails: each tier either produces a
//! [`ParsedFeed`] or hands over to the next one, and exhausting every tier
//! yields a degraded feed with no items.
//!
//! | Tier | Request | Parser |
//! |------|---------|--------|
//! | primary | browser headers | `feed-rs` |
//! | direct | browser headers, body sanitized | lenient scan |
//! | proxy | via CORS proxy, body sanitized | lenient scan |
//!
//! Every tier runs under `tokio::time::timeout`; expiry drops the in-flight
//! request, which cancels it and releases the connection.

use std::future::Future;
use std::time::Duration;

use briefing_core::{AppConfig, FeedSource, ParsedFeed, RawItem};
use chrono::Utc;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::header::ACCEPT;
use reqwest::Client;

use crate::error::FeedError;
use crate::parse::{parse_lenient, parse_strict, ParsedDocument};
use crate::sanitize::sanitize_feed_body;

pub const FEED_ACCEPT: &str =
    "application/rss+xml, application/xml, text/xml, application/atom+xml";

/// Items kept per feed, taken in feed order.
pub const MAX_ITEMS_PER_FEED: usize = 6;

/// Timing and endpoint settings for [`FeedFetcher`].
#[derive(Debug, Clone)]
pub struct FetcherSettings {
    pub request_timeout: Duration,
    pub tier_deadline: Duration,
    pub fetch_all_deadline: Duration,
    pub inter_fetch_delay: Duration,
    /// Prefix the percent-encoded feed URL is appended to. `None` disables
    /// the proxy tier.
    pub proxy_url: Option<String>,
    pub user_agent: String,
    pub max_items: usize,
}

impl FetcherSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            request_timeout: Duration::from_secs(config.feed_request_timeout_secs),
            tier_deadline: Duration::from_secs(config.feed_tier_deadline_secs),
            fetch_all_deadline: Duration::from_secs(config.fetch_all_deadline_secs),
            inter_fetch_delay: Duration::from_millis(config.inter_fetch_delay_ms),
            proxy_url: Some(config.proxy_url.clone()).filter(|p| !p.trim().is_empty()),
            user_agent: config.user_agent.clone(),
            max_items: MAX_ITEMS_PER_FEED,
        }
    }
}

impl Default for FetcherSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(15),
            tier_deadline: Duration::from_secs(20),
            fetch_all_deadline: Duration::from_secs(45),
            inter_fetch_delay: Duration::from_millis(500),
            proxy_url: Some(briefing_core::config::DEFAULT_PROXY_URL.to_string()),
            user_agent: briefing_core::config::DEFAULT_USER_AGENT.to_string(),
            max_items: MAX_ITEMS_PER_FEED,
        }
    }
}

/// Why the direct tier gave up, which decides whether the proxy is tried.
enum DirectFailure {
    /// The body arrived but could not be parsed. Terminal.
    Parse(FeedError),
    /// Transport, status, or deadline failure. Falls through to the proxy.
    Fetch(FeedError),
}

pub struct FeedFetcher {
    client: Client,
    settings: FetcherSettings,
}

impl FeedFetcher {
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(settings: FetcherSettings) -> Result<Self, FeedError> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, settings })
    }

    #[must_use]
    pub fn settings(&self) -> &FetcherSettings {
        &self.settings
    }

    /// Fetch one source through the fallback tiers. Never fails.
    pub async fn fetch(&self, source: &FeedSource) -> ParsedFeed {
        let url = source.url.as_str();

        let primary_err = match self.tier(self.fetch_primary(url)).await {
            Ok(doc) => {
                tracing::debug!(source = url, items = doc.items.len(), "feed: primary tier ok");
                return self.finish(source, doc);
            }
            Err(e) if e.is_timeout() => {
                tracing::warn!(source = url, error = %e, "feed: primary tier timed out");
                return ParsedFeed::degraded(
                    source,
                    format!("Timed out fetching feed from {url}: {e}"),
                );
            }
            Err(e) => e,
        };
        tracing::debug!(source = url, error = %primary_err, "feed: primary tier failed, trying direct fetch");

        let direct_err = match self.fetch_direct(url).await {
            Ok(doc) => {
                tracing::info!(source = url, items = doc.items.len(), "feed: recovered via direct lenient parse");
                return self.finish(source, doc);
            }
            Err(DirectFailure::Parse(e)) => {
                tracing::warn!(source = url, error = %e, "feed: body unparseable after sanitizing");
                return ParsedFeed::degraded(
                    source,
                    format!("Failed to parse feed from {url}: {e}"),
                );
            }
            Err(DirectFailure::Fetch(e)) => e,
        };

        if let Some(proxy) = self.settings.proxy_url.as_deref() {
            let proxied = format!("{proxy}{}", utf8_percent_encode(url, NON_ALPHANUMERIC));
            match self.tier(self.fetch_lenient(&proxied)).await {
                Ok(doc) => {
                    tracing::info!(source = url, items = doc.items.len(), "feed: recovered via proxy");
                    return self.finish(source, doc);
                }
                Err(e) => {
                    tracing::warn!(source = url, error = %e, "feed: proxy tier failed");
                }
            }
        }

        tracing::warn!(source = url, error = %direct_err, "feed: all tiers failed");
        ParsedFeed::degraded(source, format!("Unable to fetch feed from {url}"))
    }

    /// Fetch sources one at a time with a fixed delay between them.
    ///
    /// Always returns exactly one [`ParsedFeed`] per input source, in input
    /// order. If the batch deadline expires, sources not yet fetched get a
    /// degraded "timed out" feed.
    pub async fn fetch_all(&self, sources: &[FeedSource]) -> Vec<ParsedFeed> {
        let mut collected = Vec::with_capacity(sources.len());
        let deadline = self.settings.fetch_all_deadline;

        if tokio::time::timeout(deadline, self.fetch_sequential(sources, &mut collected))
            .await
            .is_err()
        {
            tracing::warn!(
                fetched = collected.len(),
                total = sources.len(),
                deadline_secs = deadline.as_secs(),
                "feed: batch deadline reached, returning partial results"
            );
        }

        for source in &sources[collected.len()..] {
            collected.push(ParsedFeed::degraded(
                source,
                format!(
                    "Timed out before fetching feed from {} (batch deadline {}s)",
                    source.url,
                    deadline.as_secs()
                ),
            ));
        }
        collected
    }

    async fn fetch_sequential(&self, sources: &[FeedSource], out: &mut Vec<ParsedFeed>) {
        for (idx, source) in sources.iter().enumerate() {
            if idx > 0 && !self.settings.inter_fetch_delay.is_zero() {
                tokio::time::sleep(self.settings.inter_fetch_delay).await;
            }
            out.push(self.fetch(source).await);
        }
    }

    async fn tier<F>(&self, fut: F) -> Result<ParsedDocument, FeedError>
    where
        F: Future<Output = Result<ParsedDocument, FeedError>>,
    {
        tokio::time::timeout(self.settings.tier_deadline, fut)
            .await
            .unwrap_or(Err(FeedError::Timeout {
                secs: self.settings.tier_deadline.as_secs(),
            }))
    }

    async fn fetch_primary(&self, url: &str) -> Result<ParsedDocument, FeedError> {
        let body = self.get_bytes(url).await?;
        parse_strict(&body, self.settings.max_items)
    }

    async fn fetch_direct(&self, url: &str) -> Result<ParsedDocument, DirectFailure> {
        let body = self
            .tier_text(url)
            .await
            .map_err(DirectFailure::Fetch)?;
        parse_lenient(&sanitize_feed_body(&body), self.settings.max_items)
            .map_err(DirectFailure::Parse)
    }

    async fn fetch_lenient(&self, url: &str) -> Result<ParsedDocument, FeedError> {
        let body = self.get_text(url).await?;
        parse_lenient(&sanitize_feed_body(&body), self.settings.max_items)
    }

    async fn tier_text(&self, url: &str) -> Result<String, FeedError> {
        tokio::time::timeout(self.settings.tier_deadline, self.get_text(url))
            .await
            .unwrap_or(Err(FeedError::Timeout {
                secs: self.settings.tier_deadline.as_secs(),
            }))
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response, FeedError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, FEED_ACCEPT)
            .timeout(self.settings.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        Ok(self.send(url).await?.bytes().await?.to_vec())
    }

    async fn get_text(&self, url: &str) -> Result<String, FeedError> {
        Ok(self.send(url).await?.text().await?)
    }

    /// Apply field defaults and build the final feed.
    fn finish(&self, source: &FeedSource, doc: ParsedDocument) -> ParsedFeed {
        let now = Utc::now();
        let items = doc
            .items
            .into_iter()
            .take(self.settings.max_items)
            .map(|item| RawItem {
                title: Some(item.title_or_default().to_string()),
                link: item
                    .link
                    .clone()
                    .filter(|l| !l.trim().is_empty())
                    .or_else(|| Some(source.url.clone())),
                published_at: Some(item.published_at.unwrap_or(now)),
                ..item
            })
            .collect();

        ParsedFeed {
            source_name: source.display_name.clone(),
            source_url: source.url.clone(),
            category: Some(source.category.clone()),
            title: doc
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| source.display_name.clone()),
            description: doc.description.unwrap_or_default(),
            items,
        }
    }
}
