use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::shell::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CorrelationParams {
    pub expected: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationResponse {
    pub trace_id: String,
    pub events: Vec<serde_json::Value>,
}

/// Lists the events observed for a trace id. With `expected`, the wait ends
/// as soon as that many have been observed.
pub async fn handle(
    State(state): State<AppState>,
    Path(trace_id): Path<String>,
    Query(params): Query<CorrelationParams>,
) -> impl IntoResponse {
    let records = match params.expected {
        Some(expected) => {
            state
                .observer
                .events_for_expecting(&trace_id, expected)
                .await
        }
        None => state.observer.events_for(&trace_id).await,
    };
    let events = records
        .iter()
        .filter_map(|record| serde_json::from_str(&record.payload).ok())
        .collect();
    Json(CorrelationResponse { trace_id, events })
}
