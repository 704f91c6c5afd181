//! Clade activity endpoint: per-bin counts of specimens whose classified
//! lineage matches a named clade at a given taxonomic rank.

use axum::{
    extract::Query, extract::State, routing::get, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use super::AppState;
use crate::binning::{activity_points, assign, make_bins, ActivityPoint};
use crate::error::AppError;
use crate::filters::{CladeFilter, FilterSet};
use crate::models::TaxonRank;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/clade-activity-array-data", get(clade_activity))
}

/// Query parameters for `/api/clade-activity-array-data`.
#[derive(Debug, Deserialize)]
struct CladeActivityQuery {
    clade: String,
    /// Classifier rank code; defaults to 10 (species).
    #[serde(rename = "taxonRank")]
    taxon_rank: Option<i32>,
    hours: Option<i64>,
    n_bins: Option<usize>,
    start_date: Option<String>,
    end_date: Option<String>,
    #[serde(rename = "S1_score_thresh")]
    s1_score_thresh: Option<f64>,
    #[serde(rename = "S2_score_thresh")]
    s2_score_thresh: Option<f64>,
    #[serde(rename = "S2a_score_thresh")]
    s2a_score_thresh: Option<f64>,
}

/// Handle `GET /api/clade-activity-array-data` — dense `[midpoint, count]`
/// tuples over the trailing window. An optional date range narrows which
/// records count, but the bin axis stays anchored at the request's `now`.
async fn clade_activity(
    Query(params): Query<CladeActivityQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<ActivityPoint>>, AppError> {
    // ---
    debug!("GET /api/clade-activity-array-data: {:?}", params);

    let rank_code = params.taxon_rank.unwrap_or(TaxonRank::Species.code());
    let rank = TaxonRank::from_code(rank_code).ok_or_else(|| {
        AppError::Validation(format!(
            "taxonRank must be one of 10, 20, 30, 40, 50; got {rank_code}"
        ))
    })?;

    if params.clade.trim().is_empty() {
        return Err(AppError::Validation("clade must not be empty".into()));
    }
    let known = state.source.distinct_taxa(rank).await?;
    if !known.iter().any(|t| t == &params.clade) {
        return Err(AppError::Validation(format!(
            "unknown clade '{}' at rank {rank_code}",
            params.clade
        )));
    }

    let now = Utc::now();
    let bins = make_bins(
        now,
        params.hours.unwrap_or(24),
        params.n_bins.unwrap_or(10),
    )?;

    let mut filter = FilterSet::new()
        .with_dates(params.start_date.as_deref(), params.end_date.as_deref())?
        .with_scores(
            params.s1_score_thresh,
            params.s2_score_thresh,
            params.s2a_score_thresh,
        )
        .with_clade(CladeFilter {
            name: params.clade.clone(),
            rank,
        });

    // Intersect the optional date range with the bin window; the range can
    // only narrow it.
    let (w_start, w_end) = (bins[0].start, now);
    filter.start = Some(filter.start.map_or(w_start, |s| s.max(w_start)));
    filter.end_exclusive = Some(filter.end_exclusive.map_or(w_end, |e| e.min(w_end)));

    let specimens = state.source.specimens(&filter).await?;
    let assigned = assign(&bins, &specimens);
    Ok(Json(activity_points(&bins, &assigned)))
}
