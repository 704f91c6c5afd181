//! Specimen timeline endpoint: the filtered detection list the dashboard
//! renders as its main feed, optionally with per-record thumbnails.

use axum::{
    extract::Query, extract::State, routing::get, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::AppState;
use crate::error::AppError;
use crate::filters::{csv_list, FilterSet};
use crate::models::{SpecimenRecord, DATETIME_FORMAT};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/timeline-data", get(timeline_data))
}

/// Query parameters for `/api/timeline-data`. Wire names follow the
/// dashboard client's existing conventions.
#[derive(Debug, Deserialize)]
struct TimelineQuery {
    start_date: Option<String>,
    end_date: Option<String>,
    /// Comma-separated pod IDs.
    #[serde(rename = "podID")]
    pod_id: Option<String>,
    location: Option<String>,
    species_only: Option<bool>,
    #[serde(rename = "S1_score_thresh")]
    s1_score_thresh: Option<f64>,
    #[serde(rename = "S2_score_thresh")]
    s2_score_thresh: Option<f64>,
    #[serde(rename = "S2a_score_thresh")]
    s2a_score_thresh: Option<f64>,
    incl_images: Option<bool>,
}

/// One timeline row. `image` is absent when images were not requested,
/// null when the referenced media is missing from the image store, and a
/// base64 JPEG string otherwise.
#[derive(Debug, Serialize)]
struct TimelineEntry {
    id: i32,
    timestamp: String,
    pod_id: String,
    swarm_name: String,
    run_name: String,
    loc_name: Option<String>,
    loc_lat: Option<f64>,
    loc_lon: Option<f64>,
    taxon_str: Option<String>,
    taxon_score: f64,
    taxon_rank: i32,
    s1_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<Option<String>>,
}

impl TimelineEntry {
    fn from_record(r: &SpecimenRecord, image: Option<Option<String>>) -> Self {
        // ---
        TimelineEntry {
            id: r.id,
            timestamp: r.timestamp.format(DATETIME_FORMAT).to_string(),
            pod_id: r.pod_id.clone(),
            swarm_name: r.swarm_name.clone(),
            run_name: r.run_name.clone(),
            loc_name: r.loc_name.clone(),
            loc_lat: r.lat,
            loc_lon: r.lon,
            taxon_str: r.s2_taxon_str.clone(),
            taxon_score: r.s2_taxon_score,
            taxon_rank: r.s2_taxon_rank,
            s1_class: r.s1_class.clone(),
            image,
        }
    }
}

/// Handle `GET /api/timeline-data`.
async fn timeline_data(
    Query(params): Query<TimelineQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<TimelineEntry>>, AppError> {
    // ---
    debug!("GET /api/timeline-data: {:?}", params);

    let filter = FilterSet::new()
        .with_dates(params.start_date.as_deref(), params.end_date.as_deref())?
        .with_pods(csv_list(params.pod_id.as_deref()))
        .with_location(params.location.clone())
        .with_species_only(params.species_only.unwrap_or(false))
        .with_scores(
            params.s1_score_thresh,
            params.s2_score_thresh,
            params.s2a_score_thresh,
        );

    let records = state.source.specimens(&filter).await?;
    let incl_images = params.incl_images.unwrap_or(false);

    let mut entries = Vec::with_capacity(records.len());
    for r in &records {
        let image = if incl_images {
            // A missing thumbnail degrades this one record to a null image;
            // transport failures abort the whole response.
            let thumb = state
                .thumbs
                .thumbnail(r)
                .await
                .map_err(|e| AppError::Internal(format!("thumbnail fetch failed: {e}")))?;
            Some(thumb)
        } else {
            None
        };
        entries.push(TimelineEntry::from_record(r, image));
    }

    info!("GET /api/timeline-data: returning {} entries", entries.len());
    Ok(Json(entries))
}
