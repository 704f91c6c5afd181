//! Binned log endpoints: frame counts, specimen counts, and weather means
//! over a trailing window divided into equal bins.
//!
//! All three are dense — the client plots on a fixed axis and does no
//! gap-filling of its own, so every bin appears in the output even when it
//! holds no records.

use axum::{
    extract::Query, extract::State, response::IntoResponse, response::Response, routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use super::AppState;
use crate::binning::{
    assign, count_points, make_bins, weather_means, CountPoint, WeatherLitePoint, WeatherPoint,
};
use crate::error::AppError;
use crate::filters::{csv_list, FilterSet};

// ---

const DEFAULT_SPAN_HOURS: i64 = 24;
const DEFAULT_BIN_COUNT: usize = 10;

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/api/frame-log", get(frame_log))
        .route("/api/specimen-log", get(specimen_log))
        .route("/api/weather-log", get(weather_log))
}

// ---

/// Query parameters shared by the binned log endpoints.
#[derive(Debug, Deserialize)]
struct LogQuery {
    /// Trailing window length; defaults to 24.
    hours: Option<i64>,
    /// Number of bins; defaults to 10.
    n_bins: Option<usize>,
    /// Comma-separated pod IDs.
    #[serde(rename = "podID")]
    pod_id: Option<String>,
    /// Comma-separated swarm names.
    swarm: Option<String>,
    /// Comma-separated run names.
    run: Option<String>,
    // Specimen-log only; ignored by frame-log and weather-log.
    species_only: Option<bool>,
    #[serde(rename = "S1_score_thresh")]
    s1_score_thresh: Option<f64>,
    #[serde(rename = "S2_score_thresh")]
    s2_score_thresh: Option<f64>,
    #[serde(rename = "S2a_score_thresh")]
    s2a_score_thresh: Option<f64>,
    // Weather-log only.
    lite: Option<bool>,
}

impl LogQuery {
    fn identity_filter(&self) -> FilterSet {
        // ---
        FilterSet::new()
            .with_pods(csv_list(self.pod_id.as_deref()))
            .with_swarms(csv_list(self.swarm.as_deref()))
            .with_runs(csv_list(self.run.as_deref()))
    }
}

// ---

/// Handle `GET /api/frame-log` — dense `[midpoint, count, pod_id]` tuples.
async fn frame_log(
    Query(params): Query<LogQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<CountPoint>>, AppError> {
    // ---
    debug!("GET /api/frame-log: {:?}", params);

    let now = Utc::now();
    let bins = make_bins(
        now,
        params.hours.unwrap_or(DEFAULT_SPAN_HOURS),
        params.n_bins.unwrap_or(DEFAULT_BIN_COUNT),
    )?;
    let filter = params.identity_filter().with_window(bins[0].start, now);

    let frames = state.source.frames(&filter).await?;
    let assigned = assign(&bins, &frames);
    Ok(Json(count_points(&bins, &assigned, &filter.pod_ids)))
}

/// Handle `GET /api/specimen-log` — same shape as the frame log, with the
/// specimen-side filters (species flag, confidence thresholds) applied.
async fn specimen_log(
    Query(params): Query<LogQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<CountPoint>>, AppError> {
    // ---
    debug!("GET /api/specimen-log: {:?}", params);

    let now = Utc::now();
    let bins = make_bins(
        now,
        params.hours.unwrap_or(DEFAULT_SPAN_HOURS),
        params.n_bins.unwrap_or(DEFAULT_BIN_COUNT),
    )?;
    let filter = params
        .identity_filter()
        .with_species_only(params.species_only.unwrap_or(false))
        .with_scores(
            params.s1_score_thresh,
            params.s2_score_thresh,
            params.s2a_score_thresh,
        )
        .with_window(bins[0].start, now);

    let specimens = state.source.specimens(&filter).await?;
    let assigned = assign(&bins, &specimens);
    Ok(Json(count_points(&bins, &assigned, &filter.pod_ids)))
}

/// Handle `GET /api/weather-log` — per-bin field means of the sensor
/// telemetry. `lite=true` drops the AQI sub-index columns.
async fn weather_log(
    Query(params): Query<LogQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    // ---
    debug!("GET /api/weather-log: {:?}", params);

    let now = Utc::now();
    let bins = make_bins(
        now,
        params.hours.unwrap_or(DEFAULT_SPAN_HOURS),
        params.n_bins.unwrap_or(DEFAULT_BIN_COUNT),
    )?;
    let filter = params.identity_filter().with_window(bins[0].start, now);

    let readings = state.source.sensor_readings(&filter).await?;
    let assigned = assign(&bins, &readings);

    if params.lite.unwrap_or(false) {
        let rows: Vec<WeatherLitePoint> = bins
            .iter()
            .zip(&assigned)
            .map(|(bin, slot)| WeatherLitePoint::from_bin(bin, &weather_means(slot)))
            .collect();
        Ok(Json(rows).into_response())
    } else {
        let rows: Vec<WeatherPoint> = bins
            .iter()
            .zip(&assigned)
            .map(|(bin, slot)| WeatherPoint::from_bin(bin, &weather_means(slot)))
            .collect();
        Ok(Json(rows).into_response())
    }
}
