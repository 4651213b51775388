use axum::{
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap},
    Extension, Json,
};
use briefing_aggregator::RefreshOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::middleware::{extract_bearer_token, RequestId};

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct RefreshQuery {
    pub secret: Option<String>,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RefreshSummary {
    pub success: bool,
    pub articles_processed: usize,
    pub categories: usize,
    /// Wall time of the pass, e.g. `"8421ms"`.
    pub duration: String,
    pub generated_at: DateTime<Utc>,
}

/// Run one refresh pass. The secret may come from `?secret=` or a bearer
/// token; the query parameter wins when both are present.
pub(super) async fn trigger_refresh(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<RefreshQuery>,
    headers: HeaderMap,
) -> Result<Json<RefreshSummary>, ApiError> {
    let candidate = query
        .secret
        .as_deref()
        .or_else(|| extract_bearer_token(headers.get(AUTHORIZATION)));
    if !state.auth.allows(candidate) {
        tracing::warn!(request_id = %req_id.0, "refresh: rejected trigger with bad secret");
        return Err(ApiError::new(
            req_id.0,
            "unauthorized",
            "missing or invalid refresh secret",
        ));
    }

    let report = state.orchestrator.refresh(query.force).await;
    if report.outcome == RefreshOutcome::Failed {
        return Err(ApiError::new(
            req_id.0,
            "internal_error",
            "refresh pass failed; serving last good aggregate",
        ));
    }

    Ok(Json(RefreshSummary {
        success: true,
        articles_processed: report.articles_processed,
        categories: report.categories,
        duration: format!("{}ms", report.duration.as_millis()),
        generated_at: report.response.generated_at,
    }))
}
