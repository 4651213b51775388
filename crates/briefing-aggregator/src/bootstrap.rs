//! Wiring an [`Orchestrator`] from [`AppConfig`], shared by both binaries.

use std::sync::Arc;
use std::time::Duration;

use briefing_core::{load_registry, AppConfig, ConfigError, SourceRegistry};
use briefing_enrich::{AiClient, AiError, AiSettings, Enricher};
use briefing_feeds::{FeedError, FeedFetcher, FetcherSettings};
use thiserror::Error;

use crate::cache::{CacheSettings, CacheStore};
use crate::orchestrator::{Orchestrator, RefreshSettings};
use crate::sink::{KvSink, NoopSink, SinkError, SnapshotSink};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("source registry: {0}")]
    Registry(#[from] ConfigError),

    #[error("feed fetcher: {0}")]
    Fetcher(#[from] FeedError),

    #[error("AI client: {0}")]
    Ai(#[from] AiError),

    #[error("snapshot sink: {0}")]
    Sink(#[from] SinkError),
}

/// The configured YAML registry, or the built-in one when no path is set.
///
/// # Errors
///
/// Returns [`BootstrapError::Registry`] if the file cannot be loaded.
pub fn registry_from_config(config: &AppConfig) -> Result<SourceRegistry, BootstrapError> {
    match &config.sources_path {
        Some(path) => {
            let registry = load_registry(path)?;
            tracing::info!(path = %path.display(), sources = registry.len(), "bootstrap: loaded source registry");
            Ok(registry)
        }
        None => Ok(SourceRegistry::builtin()),
    }
}

/// KV persistence when both URL and token are configured, otherwise none.
///
/// # Errors
///
/// Returns [`BootstrapError::Sink`] if the KV HTTP client cannot be built.
pub fn sink_from_config(config: &AppConfig) -> Result<Arc<dyn SnapshotSink>, BootstrapError> {
    match config.kv_credentials() {
        Some((url, token)) => {
            let ttl = Duration::from_secs(config.snapshot_ttl_secs);
            Ok(Arc::new(KvSink::new(url, token, &config.kv_key, ttl)?))
        }
        None => {
            tracing::info!("bootstrap: KV credentials not set, snapshot persistence disabled");
            Ok(Arc::new(NoopSink))
        }
    }
}

/// Build the full refresh pipeline for `config`.
///
/// # Errors
///
/// Returns [`BootstrapError`] if the registry cannot be loaded or an HTTP
/// client cannot be constructed.
pub fn build_orchestrator(config: &AppConfig) -> Result<Orchestrator, BootstrapError> {
    let registry = registry_from_config(config)?;
    let fetcher = FeedFetcher::new(FetcherSettings::from_app_config(config))?;
    let ai = Arc::new(AiClient::new(AiSettings::from_app_config(config))?);
    if !ai.is_enabled() {
        tracing::info!("bootstrap: no AI key configured, using local summaries and sentiment");
    }
    let enricher = Enricher::new(
        Arc::clone(&ai),
        Duration::from_secs(config.ai_timeout_secs),
    );
    let cache = CacheStore::new(
        sink_from_config(config)?,
        CacheSettings::from_app_config(config),
    );

    Ok(Orchestrator::new(
        Arc::new(registry),
        Arc::new(cache),
        Arc::new(fetcher),
        Arc::new(enricher),
        ai,
        RefreshSettings::from_app_config(config),
    ))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use briefing_core::config::build_app_config;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        build_app_config(|key| vars.get(key).cloned().ok_or(std::env::VarError::NotPresent))
            .expect("valid config")
    }

    #[test]
    fn defaults_use_builtin_registry_and_no_persistence() {
        let orchestrator = build_orchestrator(&config(&[])).expect("orchestrator");
        assert_eq!(
            orchestrator.registry().len(),
            SourceRegistry::builtin().len()
        );
        assert_eq!(orchestrator.cache().sink_name(), "none");
    }

    #[test]
    fn kv_credentials_enable_kv_sink() {
        let config = config(&[
            ("BRIEFING_KV_URL", "https://kv.example.com"),
            ("BRIEFING_KV_TOKEN", "token"),
        ]);
        let sink = sink_from_config(&config).expect("sink");
        assert_eq!(sink.name(), "kv");
    }

    #[test]
    fn missing_sources_file_is_a_registry_error() {
        let config = config(&[("BRIEFING_SOURCES_PATH", "/nonexistent/sources.yaml")]);
        assert!(matches!(
            registry_from_config(&config),
            Err(BootstrapError::Registry(_))
        ));
    }
}
