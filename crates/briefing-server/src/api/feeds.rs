use axum::{extract::State, Json};
use briefing_core::AggregateResponse;
use briefing_enrich::SUMMARY_PLACEHOLDER;

use super::AppState;

/// The cached aggregate as-is. Never triggers a refresh; before the first
/// pass completes an empty aggregate with the placeholder summary is served.
pub(super) async fn get_feeds(State(state): State<AppState>) -> Json<AggregateResponse> {
    let response = state
        .orchestrator
        .cache()
        .current()
        .await
        .unwrap_or_else(|| AggregateResponse::empty(SUMMARY_PLACEHOLDER));
    Json(response)
}
