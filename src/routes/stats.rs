//! Combined trend statistics endpoint.
//!
//! For each fixed span (24h and 72h) independently: frame and specimen
//! counts over the trailing window versus the immediately preceding
//! equal-length window, with the percentage change the dashboard renders as
//! a trend arrow. The eight count sub-queries have no data dependency on
//! each other, so they run concurrently and join before assembly; any
//! failure fails the whole response.

use axum::{
    extract::Query, extract::State, routing::get, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::AppState;
use crate::binning::{current_window, previous_window, ComparisonResult};
use crate::error::AppError;
use crate::filters::{csv_list, FilterSet};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/stats", get(stats))
}

/// Query parameters for `/api/stats`.
#[derive(Debug, Deserialize)]
struct StatsQuery {
    /// Comma-separated pod IDs.
    #[serde(rename = "podID")]
    pod_id: Option<String>,
    /// Comma-separated swarm names.
    swarm: Option<String>,
    /// Comma-separated run names.
    run: Option<String>,
}

#[derive(Debug, Serialize)]
struct SpanStats {
    frames: ComparisonResult,
    specimens: ComparisonResult,
}

/// Results per span are independent and sit side by side, keyed by span.
#[derive(Debug, Serialize)]
struct StatsResponse {
    #[serde(rename = "24_hours")]
    day: SpanStats,
    #[serde(rename = "72_hours")]
    three_days: SpanStats,
}

// ---

/// Current-vs-previous comparison for one record kind over one span.
async fn span_stats(
    state: &AppState,
    base: &FilterSet,
    now: DateTime<Utc>,
    span_hours: i64,
) -> Result<SpanStats, AppError> {
    // ---
    let (cur_start, cur_end) = current_window(now, span_hours);
    let (prev_start, prev_end) = previous_window(now, span_hours);

    let cur = base.clone().with_window(cur_start, cur_end);
    let prev = base.clone().with_window(prev_start, prev_end);

    let (frames_cur, frames_prev, specimens_cur, specimens_prev) = tokio::try_join!(
        state.source.frame_count(&cur),
        state.source.frame_count(&prev),
        state.source.specimen_count(&cur),
        state.source.specimen_count(&prev),
    )?;

    Ok(SpanStats {
        frames: ComparisonResult::new(frames_cur, frames_prev),
        specimens: ComparisonResult::new(specimens_cur, specimens_prev),
    })
}

/// Handle `GET /api/stats`.
async fn stats(
    Query(params): Query<StatsQuery>,
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, AppError> {
    // ---
    debug!("GET /api/stats: {:?}", params);

    let base = FilterSet::new()
        .with_pods(csv_list(params.pod_id.as_deref()))
        .with_swarms(csv_list(params.swarm.as_deref()))
        .with_runs(csv_list(params.run.as_deref()));

    // One clock capture for both spans.
    let now = Utc::now();
    let (day, three_days) = tokio::try_join!(
        span_stats(&state, &base, now, 24),
        span_stats(&state, &base, now, 72),
    )?;

    Ok(Json(StatsResponse { day, three_days }))
}
