//! Client for an OpenAI-compatible chat completion endpoint.
//!
//! The client is always constructed; without an API key every call returns
//! [`AiError::Disabled`] so callers take their local fallback path without a
//! separate configuration check.

use std::time::Duration;

use briefing_core::text::truncate_chars;
use briefing_core::{AppConfig, SentimentLabel};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AiError;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Longest user payload sent for any single task.
const MAX_PAYLOAD_CHARS: usize = 4000;

#[derive(Debug, Clone)]
pub struct AiSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// Fixed sleep before the single retry after a `429`.
    pub rate_limit_backoff: Duration,
}

impl AiSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.ai_base_url.clone(),
            api_key: config.ai_api_key.clone(),
            model: config.ai_model.clone(),
            timeout: Duration::from_secs(config.ai_timeout_secs),
            rate_limit_backoff: Duration::from_secs(config.ai_rate_limit_backoff_secs),
        }
    }

    /// Settings with no key, for tests and offline runs.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout: Duration::from_secs(15),
            rate_limit_backoff: Duration::from_secs(60),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Sentiment as classified by the provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AiSentiment {
    pub label: SentimentLabel,
    pub score: f32,
}

pub struct AiClient {
    client: Client,
    settings: AiSettings,
    endpoint: String,
}

impl AiClient {
    /// # Errors
    ///
    /// Returns [`AiError::Http`] if the underlying `reqwest::Client` cannot be
    /// constructed.
    pub fn new(settings: AiSettings) -> Result<Self, AiError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        let endpoint = format!("{}/chat/completions", settings.base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            settings,
            endpoint,
        })
    }

    /// Point at a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Same as [`AiClient::new`].
    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self, AiError> {
        Self::new(AiSettings {
            base_url: base_url.to_string(),
            api_key: Some(api_key.to_string()),
            ..AiSettings::disabled()
        })
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.settings.api_key.is_some()
    }

    #[must_use]
    pub fn settings(&self) -> &AiSettings {
        &self.settings
    }

    /// Run one chat completion and return the trimmed assistant text.
    ///
    /// A `429` sleeps for the configured backoff and retries exactly once.
    ///
    /// # Errors
    ///
    /// - [`AiError::Disabled`] when no API key is configured.
    /// - [`AiError::RateLimited`] when the retry is also rate limited.
    /// - [`AiError::Status`] / [`AiError::Http`] on any other failure.
    /// - [`AiError::EmptyResponse`] when the completion has no text.
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<String, AiError> {
        let Some(api_key) = self.settings.api_key.as_deref() else {
            return Err(AiError::Disabled);
        };
        let user = truncate_chars(user, MAX_PAYLOAD_CHARS);
        let request = ChatRequest {
            model: &self.settings.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.3,
            max_tokens,
        };

        let mut retried = false;
        loop {
            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(api_key)
                .json(&request)
                .send()
                .await?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                let backoff = self.settings.rate_limit_backoff;
                if retried {
                    return Err(AiError::RateLimited {
                        retry_after_secs: backoff.as_secs(),
                    });
                }
                retried = true;
                tracing::warn!(
                    backoff_secs = backoff.as_secs(),
                    "ai: rate limited, backing off before single retry"
                );
                tokio::time::sleep(backoff).await;
                continue;
            }
            if !status.is_success() {
                return Err(AiError::Status(status.as_u16()));
            }

            let body: ChatResponse = response.json().await?;
            return body
                .choices
                .into_iter()
                .find_map(|c| c.message.content)
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .ok_or(AiError::EmptyResponse);
        }
    }

    /// Two or three sentence summary of one article.
    ///
    /// # Errors
    ///
    /// Any [`AiError`] from [`AiClient::complete`].
    pub async fn summarize(&self, title: &str, content: &str) -> Result<String, AiError> {
        let user = format!(
            "Title: {title}\n\nArticle:\n{}",
            truncate_chars(content, 2000)
        );
        self.complete(
            "You summarise UK personal finance news. Reply with a plain-text summary of two or three sentences. No preamble.",
            &user,
            160,
        )
        .await
    }

    /// Classify sentiment, expecting a `{"sentiment": ..., "score": ...}` object.
    ///
    /// # Errors
    ///
    /// [`AiError::Parse`] if the reply carries no usable object, plus any
    /// error from [`AiClient::complete`].
    pub async fn sentiment(&self, title: &str, content: &str) -> Result<AiSentiment, AiError> {
        let user = format!(
            "Title: {title}\n\nArticle:\n{}",
            truncate_chars(content, 1000)
        );
        let reply = self
            .complete(
                "Classify the sentiment of this finance news article for an ordinary UK saver. \
                 Reply only with JSON: {\"sentiment\": \"positive\"|\"negative\"|\"neutral\", \"score\": number between 0 and 1}.",
                &user,
                60,
            )
            .await?;
        parse_sentiment(&reply)
    }
}

fn parse_sentiment(reply: &str) -> Result<AiSentiment, AiError> {
    let value = extract_json_object(reply)
        .ok_or_else(|| AiError::Parse("no JSON object in sentiment reply".to_string()))?;

    let label = value
        .get("sentiment")
        .or_else(|| value.get("label"))
        .and_then(Value::as_str)
        .and_then(SentimentLabel::parse);
    #[allow(clippy::cast_possible_truncation)]
    let score = value
        .get("score")
        .and_then(Value::as_f64)
        .filter(|s| s.is_finite())
        .map(|s| s.clamp(0.0, 1.0) as f32);

    match (label, score) {
        (Some(label), Some(score)) => Ok(AiSentiment { label, score }),
        (Some(label), None) => Ok(AiSentiment {
            label,
            score: match label {
                SentimentLabel::Positive => 0.8,
                SentimentLabel::Negative => 0.2,
                SentimentLabel::Neutral => 0.5,
            },
        }),
        (None, Some(score)) => Ok(AiSentiment {
            label: SentimentLabel::from_score(score),
            score,
        }),
        (None, None) => Err(AiError::Parse(format!(
            "sentiment reply has neither label nor score: {}",
            truncate_chars(reply, 120)
        ))),
    }
}

/// Parse the outermost `{...}` span of a model reply.
///
/// Models wrap JSON in prose or code fences often enough that the reply is
/// never parsed whole.
#[must_use]
pub fn extract_json_object(text: &str) -> Option<Value> {
    extract_span(text, '{', '}').filter(Value::is_object)
}

/// Parse the outermost `[...]` span of a model reply.
#[must_use]
pub fn extract_json_array(text: &str) -> Option<Vec<Value>> {
    match extract_span(text, '[', ']')? {
        Value::Array(values) => Some(values),
        _ => None,
    }
}

fn extract_span(text: &str, open: char, close: char) -> Option<Value> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}
