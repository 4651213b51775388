use std::sync::Arc;

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use briefing_core::{AppConfig, Environment};
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Shared secret guarding the refresh trigger.
#[derive(Clone)]
pub struct RefreshAuth {
    secret: Option<Arc<str>>,
}

impl std::fmt::Debug for RefreshAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshAuth")
            .field("secret", &self.secret.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl RefreshAuth {
    /// Builds auth from `BRIEFING_REFRESH_SECRET`.
    ///
    /// In development a missing secret leaves the trigger open for local
    /// iteration. In other environments a missing secret fails startup.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        match config.refresh_secret.as_deref() {
            Some(secret) => Ok(Self::with_secret(secret)),
            None if config.env == Environment::Development => {
                tracing::warn!(
                    "BRIEFING_REFRESH_SECRET not set; refresh endpoint is open in development environment"
                );
                Ok(Self { secret: None })
            }
            None => anyhow::bail!(
                "BRIEFING_REFRESH_SECRET is required outside development; set a shared secret for the refresh endpoint"
            ),
        }
    }

    #[must_use]
    pub fn with_secret(secret: &str) -> Self {
        Self {
            secret: Some(Arc::from(secret)),
        }
    }

    /// Constant-time comparison of `candidate` against the configured secret.
    pub fn allows(&self, candidate: Option<&str>) -> bool {
        let Some(secret) = self.secret.as_deref() else {
            return true;
        };
        candidate.is_some_and(|c| bool::from(c.as_bytes().ct_eq(secret.as_bytes())))
    }
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

pub fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_bearer_token_accepts_valid_header() {
        let header = HeaderValue::from_static("Bearer test-token");
        assert_eq!(extract_bearer_token(Some(&header)), Some("test-token"));
    }

    #[test]
    fn extract_bearer_token_rejects_non_bearer_header() {
        let header = HeaderValue::from_static("Basic abc123");
        assert_eq!(extract_bearer_token(Some(&header)), None);
    }

    #[test]
    fn secret_must_match_exactly() {
        let auth = RefreshAuth::with_secret("s3cret");
        assert!(auth.allows(Some("s3cret")));
        assert!(!auth.allows(Some("s3cret-longer")));
        assert!(!auth.allows(Some("s3cre")));
        assert!(!auth.allows(None));
    }

    #[test]
    fn missing_secret_is_open_only_in_development() {
        let mut config = briefing_core::config::build_app_config(|_| {
            Err(std::env::VarError::NotPresent)
        })
        .expect("defaults");

        let auth = RefreshAuth::from_config(&config).expect("dev should allow missing secret");
        assert!(auth.allows(None));

        config.env = Environment::Production;
        assert!(RefreshAuth::from_config(&config).is_err());
    }
}
