//! Fleet status endpoint: one entry per known pod.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::debug;

use super::AppState;
use crate::error::AppError;
use crate::models::{PodRecord, DATETIME_FORMAT};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/swarm-status", get(swarm_status))
}

/// One pod's dashboard status row. Field set is fixed; nullable fields stay
/// null rather than being dropped, so the client renders a stable table.
#[derive(Debug, Serialize)]
struct PodStatusEntry {
    pod_id: String,
    connection_status: Option<String>,
    stream_type: Option<String>,
    loc_name: Option<String>,
    loc_lat: Option<f64>,
    loc_lon: Option<f64>,
    queue_length: Option<i32>,
    total_frames: Option<i64>,
    total_specimens: Option<i64>,
    last_s1_class: Option<String>,
    last_s2_class: Option<String>,
    last_specimen_at: Option<String>,
    battery_level: Option<f64>,
    rssi: Option<f64>,
}

impl From<PodRecord> for PodStatusEntry {
    fn from(r: PodRecord) -> Self {
        // ---
        PodStatusEntry {
            pod_id: r.name,
            connection_status: r.connection_status,
            stream_type: r.stream_type,
            loc_name: r.loc_name,
            loc_lat: r.lat,
            loc_lon: r.lon,
            queue_length: r.queue_length,
            total_frames: r.total_frames,
            total_specimens: r.total_specimens,
            last_s1_class: r.last_s1_class,
            last_s2_class: r.last_s2_class,
            last_specimen_at: r
                .last_specimen_at
                .map(|ts| ts.format(DATETIME_FORMAT).to_string()),
            battery_level: r.battery_level,
            rssi: r.rssi,
        }
    }
}

/// Handle `GET /api/swarm-status`.
async fn swarm_status(
    State(state): State<AppState>,
) -> Result<Json<Vec<PodStatusEntry>>, AppError> {
    // ---
    debug!("GET /api/swarm-status");
    let pods = state.source.pods().await?;
    Ok(Json(pods.into_iter().map(PodStatusEntry::from).collect()))
}
