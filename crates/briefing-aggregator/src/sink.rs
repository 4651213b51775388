//! Best-effort persistence of the cache snapshot.

use std::time::Duration;

use async_trait::async_trait;
use briefing_core::CacheSnapshot;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("KV store returned status {0}")]
    Status(u16),

    #[error("snapshot (de)serialization failed: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("KV store error: {0}")]
    Kv(String),
}

/// Where snapshots are saved between process restarts.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    /// The stored snapshot, or `None` if nothing has been stored yet.
    async fn load(&self) -> Result<Option<CacheSnapshot>, SinkError>;

    async fn store(&self, snapshot: &CacheSnapshot) -> Result<(), SinkError>;

    fn name(&self) -> &'static str;
}

/// Sink used when persistence is not configured.
pub struct NoopSink;

#[async_trait]
impl SnapshotSink for NoopSink {
    async fn load(&self) -> Result<Option<CacheSnapshot>, SinkError> {
        Ok(None)
    }

    async fn store(&self, _snapshot: &CacheSnapshot) -> Result<(), SinkError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Key-value store speaking a `["SET", key, value]` / `["GET", key]` command
/// API over HTTP, answered with `{"result": ...}` or `{"error": ...}`.
pub struct KvSink {
    client: Client,
    url: String,
    token: String,
    key: String,
    ttl: Duration,
}

#[derive(Deserialize)]
struct KvResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

impl KvSink {
    /// `ttl` is passed as `EX` so the store drops snapshots nobody refreshes.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(url: &str, token: &str, key: &str, ttl: Duration) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            token: token.to_string(),
            key: key.to_string(),
            ttl,
        })
    }

    async fn command(&self, command: Value) -> Result<Value, SinkError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&command)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Status(status.as_u16()));
        }
        let body: KvResponse = response.json().await?;
        if let Some(error) = body.error {
            return Err(SinkError::Kv(error));
        }
        Ok(body.result)
    }
}

#[async_trait]
impl SnapshotSink for KvSink {
    async fn load(&self) -> Result<Option<CacheSnapshot>, SinkError> {
        match self.command(json!(["GET", self.key])).await? {
            Value::Null => Ok(None),
            Value::String(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            other => Err(SinkError::Kv(format!(
                "unexpected GET result type: {}",
                json_kind(&other)
            ))),
        }
    }

    async fn store(&self, snapshot: &CacheSnapshot) -> Result<(), SinkError> {
        let payload = serde_json::to_string(snapshot)?;
        let command = json!(["SET", self.key, payload, "EX", self.ttl.as_secs().to_string()]);
        self.command(command).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "kv"
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
