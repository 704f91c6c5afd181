//! Minor "getter" endpoints: distinct values for the dashboard's filter
//! dropdowns, plus per-pod frame counts for the fleet overview.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::Query, extract::State, routing::get, Json, Router,
};
use chrono::Utc;
use futures::future::try_join_all;
use serde::Deserialize;
use tracing::debug;

use super::AppState;
use crate::binning::{current_window, MAX_SPAN_HOURS};
use crate::error::AppError;
use crate::filters::{csv_list, FilterSet};
use crate::models::DATE_FORMAT;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/podIDs", get(pod_ids))
        .route("/swarms", get(swarms))
        .route("/runs", get(runs))
        .route("/dates", get(dates))
        .route("/frame_counts", get(frame_counts))
}

// ---

async fn pod_ids(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    // ---
    Ok(Json(state.source.distinct_pod_ids().await?))
}

async fn swarms(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    // ---
    Ok(Json(state.source.distinct_swarm_names().await?))
}

async fn runs(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    // ---
    Ok(Json(state.source.distinct_run_names().await?))
}

/// Calendar dates with specimen activity, as `YYYY-MM-DD` strings.
async fn dates(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    // ---
    let days = state.source.distinct_dates().await?;
    Ok(Json(
        days.iter()
            .map(|d| d.format(DATE_FORMAT).to_string())
            .collect(),
    ))
}

// ---

/// Query parameters for `/frame_counts`.
#[derive(Debug, Deserialize)]
struct FrameCountsQuery {
    /// Comma-separated pod IDs (e.g., "pod-1,pod-2").
    #[serde(rename = "podIDs")]
    pod_ids: Option<String>,
    /// Trailing window length; defaults to 24 hours.
    hours: Option<i64>,
}

/// Handle `GET /frame_counts` — frame count per requested pod over the
/// trailing window. With no pods requested, counts every known pod.
async fn frame_counts(
    Query(params): Query<FrameCountsQuery>,
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, i64>>, AppError> {
    // ---
    debug!("GET /frame_counts: {:?}", params);

    let hours = params.hours.unwrap_or(24);
    if !(1..=MAX_SPAN_HOURS).contains(&hours) {
        return Err(AppError::Validation(format!(
            "hours must be between 1 and {MAX_SPAN_HOURS}, got {hours}"
        )));
    }

    let now = Utc::now();
    let (start, end) = current_window(now, hours);

    let mut pods = csv_list(params.pod_ids.as_deref());
    if pods.is_empty() {
        pods = state.source.distinct_pod_ids().await?;
    }

    // The per-pod counts are independent, so they go out concurrently.
    let lookups = pods.into_iter().map(|pod| {
        let filter = FilterSet::new()
            .with_window(start, end)
            .with_pods(vec![pod.clone()]);
        let source = Arc::clone(&state.source);
        async move { source.frame_count(&filter).await.map(|count| (pod, count)) }
    });
    let counts: BTreeMap<String, i64> = try_join_all(lookups).await?.into_iter().collect();
    Ok(Json(counts))
}
