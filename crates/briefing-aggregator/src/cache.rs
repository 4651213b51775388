//! The cache store: last served aggregate plus per-source refresh times.
//!
//! One `CacheStore` is built at startup and shared through `Arc` by the
//! orchestrator (the only writer) and the HTTP layer (readers).

use std::sync::Arc;

use briefing_core::{AggregateResponse, AppConfig, CacheSnapshot};
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::sink::SnapshotSink;

#[derive(Debug, Clone, Copy)]
pub struct CacheSettings {
    /// A source refreshed longer ago than this is stale.
    pub stale_after: Duration,
    /// A snapshot older than this is reported as expired.
    pub snapshot_ttl: Duration,
}

impl CacheSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            stale_after: secs(config.stale_after_secs),
            snapshot_ttl: secs(config.snapshot_ttl_secs),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            stale_after: Duration::hours(2),
            snapshot_ttl: Duration::hours(8),
        }
    }
}

fn secs(value: u64) -> Duration {
    Duration::seconds(i64::try_from(value).unwrap_or(i64::MAX))
}

pub struct CacheStore {
    state: RwLock<CacheSnapshot>,
    sink: Arc<dyn SnapshotSink>,
    settings: CacheSettings,
}

impl CacheStore {
    #[must_use]
    pub fn new(sink: Arc<dyn SnapshotSink>, settings: CacheSettings) -> Self {
        Self {
            state: RwLock::new(CacheSnapshot::default()),
            sink,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> CacheSettings {
        self.settings
    }

    #[must_use]
    pub fn sink_name(&self) -> &'static str {
        self.sink.name()
    }

    pub async fn is_stale(&self, url: &str, force: bool) -> bool {
        self.is_stale_at(url, force, Utc::now()).await
    }

    /// `force`, never refreshed, or refreshed more than `stale_after` before `now`.
    pub async fn is_stale_at(&self, url: &str, force: bool, now: DateTime<Utc>) -> bool {
        if force {
            return true;
        }
        let state = self.state.read().await;
        match state.per_source_last_refresh.get(url) {
            Some(last) => now - *last > self.settings.stale_after,
            None => true,
        }
    }

    pub async fn expired(&self) -> bool {
        self.expired_at(Utc::now()).await
    }

    /// True when there is no snapshot or it is older than `snapshot_ttl`.
    pub async fn expired_at(&self, now: DateTime<Utc>) -> bool {
        let state = self.state.read().await;
        match state.snapshot_at {
            Some(at) => now - at > self.settings.snapshot_ttl,
            None => true,
        }
    }

    pub async fn current(&self) -> Option<AggregateResponse> {
        self.state.read().await.current.clone()
    }

    pub async fn snapshot(&self) -> CacheSnapshot {
        self.state.read().await.clone()
    }

    /// Install a new aggregate and stamp `refreshed_urls` with `now`.
    ///
    /// Timestamps of sources not in `refreshed_urls` are left untouched.
    pub async fn commit(
        &self,
        response: AggregateResponse,
        refreshed_urls: &[String],
        now: DateTime<Utc>,
    ) {
        let mut state = self.state.write().await;
        state.current = Some(response);
        state.snapshot_at = Some(now);
        for url in refreshed_urls {
            state.per_source_last_refresh.insert(url.clone(), now);
        }
    }

    /// Save the current state through the sink. Failures are logged only.
    pub async fn persist(&self) {
        let snapshot = self.snapshot().await;
        match self.sink.store(&snapshot).await {
            Ok(()) => tracing::debug!(sink = self.sink.name(), "cache: snapshot persisted"),
            Err(e) => {
                tracing::warn!(sink = self.sink.name(), error = %e, "cache: failed to persist snapshot");
            }
        }
    }

    /// Replace the in-memory state with the stored snapshot, if any.
    ///
    /// Returns `true` when a snapshot was loaded. Failures are logged only.
    pub async fn hydrate(&self) -> bool {
        match self.sink.load().await {
            Ok(Some(snapshot)) => {
                let articles = snapshot
                    .current
                    .as_ref()
                    .map_or(0, |c| c.all_articles.len());
                *self.state.write().await = snapshot;
                tracing::info!(sink = self.sink.name(), articles, "cache: hydrated from stored snapshot");
                true
            }
            Ok(None) => {
                tracing::debug!(sink = self.sink.name(), "cache: no stored snapshot");
                false
            }
            Err(e) => {
                tracing::warn!(sink = self.sink.name(), error = %e, "cache: failed to load stored snapshot");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::sink::{NoopSink, SinkError};

    const URL: &str = "https://feeds.example.com/tax";

    fn store() -> CacheStore {
        CacheStore::new(Arc::new(NoopSink), CacheSettings::default())
    }

    #[derive(Default)]
    struct MemorySink {
        stored: Mutex<Option<CacheSnapshot>>,
    }

    #[async_trait]
    impl SnapshotSink for MemorySink {
        async fn load(&self) -> Result<Option<CacheSnapshot>, SinkError> {
            Ok(self.stored.lock().unwrap().clone())
        }

        async fn store(&self, snapshot: &CacheSnapshot) -> Result<(), SinkError> {
            *self.stored.lock().unwrap() = Some(snapshot.clone());
            Ok(())
        }

        fn name(&self) -> &'static str {
            "memory"
        }
    }

    struct BrokenSink;

    #[async_trait]
    impl SnapshotSink for BrokenSink {
        async fn load(&self) -> Result<Option<CacheSnapshot>, SinkError> {
            Err(SinkError::Kv("unavailable".to_string()))
        }

        async fn store(&self, _snapshot: &CacheSnapshot) -> Result<(), SinkError> {
            Err(SinkError::Status(503))
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[tokio::test]
    async fn force_is_always_stale() {
        let cache = store();
        let now = Utc::now();
        cache
            .commit(AggregateResponse::empty("x"), &[URL.to_string()], now)
            .await;
        assert!(cache.is_stale_at(URL, true, now).await);
    }

    #[tokio::test]
    async fn never_refreshed_is_stale() {
        assert!(store().is_stale(URL, false).await);
    }

    #[tokio::test]
    async fn fresh_until_two_hours_pass() {
        let cache = store();
        let now = Utc::now();
        cache
            .commit(AggregateResponse::empty("x"), &[URL.to_string()], now)
            .await;

        assert!(!cache.is_stale_at(URL, false, now).await);
        assert!(!cache.is_stale_at(URL, false, now + Duration::hours(2)).await);
        assert!(
            cache
                .is_stale_at(URL, false, now + Duration::hours(2) + Duration::seconds(1))
                .await
        );
    }

    #[tokio::test]
    async fn commit_only_stamps_refreshed_sources() {
        let cache = store();
        let t0 = Utc::now();
        let other = "https://feeds.example.com/pensions";
        cache
            .commit(
                AggregateResponse::empty("first"),
                &[URL.to_string(), other.to_string()],
                t0,
            )
            .await;
        let t1 = t0 + Duration::hours(3);
        cache
            .commit(AggregateResponse::empty("second"), &[URL.to_string()], t1)
            .await;

        assert!(!cache.is_stale_at(URL, false, t1).await);
        assert!(cache.is_stale_at(other, false, t1).await);
        let snapshot = cache.snapshot().await;
        assert_eq!(snapshot.snapshot_at, Some(t1));
        assert_eq!(
            snapshot.current.map(|c| c.master_summary).as_deref(),
            Some("second")
        );
    }

    #[tokio::test]
    async fn expiry_follows_snapshot_ttl() {
        let cache = store();
        let now = Utc::now();
        assert!(cache.expired_at(now).await);
        cache.commit(AggregateResponse::empty("x"), &[], now).await;
        assert!(!cache.expired_at(now + Duration::hours(8)).await);
        assert!(cache.expired_at(now + Duration::hours(9)).await);
    }

    #[tokio::test]
    async fn persist_then_hydrate_restores_state() {
        let sink = Arc::new(MemorySink::default());
        let writer = CacheStore::new(sink.clone(), CacheSettings::default());
        let now = Utc::now();
        writer
            .commit(AggregateResponse::empty("saved"), &[URL.to_string()], now)
            .await;
        writer.persist().await;

        let reader = CacheStore::new(sink, CacheSettings::default());
        assert!(reader.hydrate().await);
        assert_eq!(
            reader.current().await.map(|c| c.master_summary).as_deref(),
            Some("saved")
        );
        assert!(!reader.is_stale_at(URL, false, now).await);
    }

    #[tokio::test]
    async fn sink_failures_are_swallowed() {
        let cache = CacheStore::new(Arc::new(BrokenSink), CacheSettings::default());
        cache.persist().await;
        assert!(!cache.hydrate().await);
        assert!(cache.current().await.is_none());
    }
}
