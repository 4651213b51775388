use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub sources_path: Option<PathBuf>,
    pub refresh_secret: Option<String>,
    pub refresh_cron: String,
    pub time_budget_secs: u64,
    pub max_sources_per_pass: usize,
    pub fetch_batch_size: usize,
    pub batch_delay_ms: u64,
    pub enrich_delay_ms: u64,
    pub feed_request_timeout_secs: u64,
    pub feed_tier_deadline_secs: u64,
    pub fetch_all_deadline_secs: u64,
    pub inter_fetch_delay_ms: u64,
    pub proxy_url: String,
    pub user_agent: String,
    pub ai_base_url: String,
    pub ai_api_key: Option<String>,
    pub ai_model: String,
    pub ai_timeout_secs: u64,
    pub ai_rate_limit_backoff_secs: u64,
    pub kv_url: Option<String>,
    pub kv_token: Option<String>,
    pub kv_key: String,
    pub stale_after_secs: u64,
    pub snapshot_ttl_secs: u64,
}

impl AppConfig {
    /// Persistence is enabled only when both the KV URL and token are set.
    #[must_use]
    pub fn kv_credentials(&self) -> Option<(&str, &str)> {
        match (self.kv_url.as_deref(), self.kv_token.as_deref()) {
            (Some(url), Some(token)) => Some((url, token)),
            _ => None,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("sources_path", &self.sources_path)
            .field(
                "refresh_secret",
                &self.refresh_secret.as_ref().map(|_| "[redacted]"),
            )
            .field("refresh_cron", &self.refresh_cron)
            .field("time_budget_secs", &self.time_budget_secs)
            .field("max_sources_per_pass", &self.max_sources_per_pass)
            .field("fetch_batch_size", &self.fetch_batch_size)
            .field("batch_delay_ms", &self.batch_delay_ms)
            .field("enrich_delay_ms", &self.enrich_delay_ms)
            .field("feed_request_timeout_secs", &self.feed_request_timeout_secs)
            .field("feed_tier_deadline_secs", &self.feed_tier_deadline_secs)
            .field("fetch_all_deadline_secs", &self.fetch_all_deadline_secs)
            .field("inter_fetch_delay_ms", &self.inter_fetch_delay_ms)
            .field("proxy_url", &self.proxy_url)
            .field("user_agent", &self.user_agent)
            .field("ai_base_url", &self.ai_base_url)
            .field("ai_api_key", &self.ai_api_key.as_ref().map(|_| "[redacted]"))
            .field("ai_model", &self.ai_model)
            .field("ai_timeout_secs", &self.ai_timeout_secs)
            .field(
                "ai_rate_limit_backoff_secs",
                &self.ai_rate_limit_backoff_secs,
            )
            .field("kv_url", &self.kv_url)
            .field("kv_token", &self.kv_token.as_ref().map(|_| "[redacted]"))
            .field("kv_key", &self.kv_key)
            .field("stale_after_secs", &self.stale_after_secs)
            .field("snapshot_ttl_secs", &self.snapshot_ttl_secs)
            .finish()
    }
}
