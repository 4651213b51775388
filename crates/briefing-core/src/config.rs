use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

pub const DEFAULT_PROXY_URL: &str = "https://api.allorigins.win/raw?url=";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if values are present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every variable has a default, so an empty environment yields a working
/// development config with AI and persistence disabled.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Blank values count as unset so `FOO=` in a .env file disables a feature.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("BRIEFING_ENV", "development"))?;

    let bind_addr = or_default("BRIEFING_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("BRIEFING_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("BRIEFING_LOG_LEVEL", "info");
    let sources_path = optional("BRIEFING_SOURCES_PATH").map(PathBuf::from);
    let refresh_secret = optional("BRIEFING_REFRESH_SECRET");
    let refresh_cron = or_default("BRIEFING_REFRESH_CRON", "0 */30 * * * *");

    let time_budget_secs = parse_u64("BRIEFING_TIME_BUDGET_SECS", "600")?;
    let max_sources_per_pass = parse_usize("BRIEFING_MAX_SOURCES_PER_PASS", "8")?;
    let fetch_batch_size = parse_usize("BRIEFING_FETCH_BATCH_SIZE", "2")?;
    if fetch_batch_size == 0 {
        return Err(invalid(
            "BRIEFING_FETCH_BATCH_SIZE",
            "must be at least 1".to_string(),
        ));
    }
    let batch_delay_ms = parse_u64("BRIEFING_BATCH_DELAY_MS", "1000")?;
    let enrich_delay_ms = parse_u64("BRIEFING_ENRICH_DELAY_MS", "200")?;

    let feed_request_timeout_secs = parse_u64("BRIEFING_FEED_REQUEST_TIMEOUT_SECS", "15")?;
    let feed_tier_deadline_secs = parse_u64("BRIEFING_FEED_TIER_DEADLINE_SECS", "20")?;
    let fetch_all_deadline_secs = parse_u64("BRIEFING_FETCH_ALL_DEADLINE_SECS", "45")?;
    let inter_fetch_delay_ms = parse_u64("BRIEFING_INTER_FETCH_DELAY_MS", "500")?;
    let proxy_url = or_default("BRIEFING_PROXY_URL", DEFAULT_PROXY_URL);
    let user_agent = or_default("BRIEFING_USER_AGENT", DEFAULT_USER_AGENT);

    let ai_base_url = or_default("BRIEFING_AI_BASE_URL", "https://api.openai.com/v1");
    let ai_api_key = optional("BRIEFING_AI_API_KEY");
    let ai_model = or_default("BRIEFING_AI_MODEL", "gpt-4o-mini");
    let ai_timeout_secs = parse_u64("BRIEFING_AI_TIMEOUT_SECS", "15")?;
    let ai_rate_limit_backoff_secs = parse_u64("BRIEFING_AI_RATE_LIMIT_BACKOFF_SECS", "60")?;

    let kv_url = optional("BRIEFING_KV_URL");
    let kv_token = optional("BRIEFING_KV_TOKEN");
    let kv_key = or_default("BRIEFING_KV_KEY", "briefing:snapshot");

    let stale_after_secs = parse_u64("BRIEFING_STALE_AFTER_SECS", "7200")?;
    let snapshot_ttl_secs = parse_u64("BRIEFING_SNAPSHOT_TTL_SECS", "28800")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        sources_path,
        refresh_secret,
        refresh_cron,
        time_budget_secs,
        max_sources_per_pass,
        fetch_batch_size,
        batch_delay_ms,
        enrich_delay_ms,
        feed_request_timeout_secs,
        feed_tier_deadline_secs,
        fetch_all_deadline_secs,
        inter_fetch_delay_ms,
        proxy_url,
        user_agent,
        ai_base_url,
        ai_api_key,
        ai_model,
        ai_timeout_secs,
        ai_rate_limit_backoff_secs,
        kv_url,
        kv_token,
        kv_key,
        stale_after_secs,
        snapshot_ttl_secs,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "BRIEFING_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
