//! In-process API tests: the full router mounted over the in-memory record
//! source, driven with `tower::ServiceExt::oneshot`. No server, no database.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;

use swarmdash::models::{FrameRecord, PodRecord, SensorRecord, SpecimenRecord};
use swarmdash::routes::{router, AppState};
use swarmdash::source::MemorySource;
use swarmdash::thumbs::NoThumbs;

// ---

fn specimen(id: i32, ts: DateTime<Utc>, pod: &str) -> SpecimenRecord {
    // ---
    SpecimenRecord {
        id,
        bbox_ll_x: 10,
        bbox_ll_y: 10,
        bbox_ur_x: 90,
        bbox_ur_y: 90,
        s1_score: 0.9,
        s1_tag: None,
        s1_class: Some("insect".into()),
        s2_taxon_id: Some(format!("taxon-{id}")),
        s2_taxon_str: Some("Bombus terrestris".into()),
        s2_taxon_score: 0.8,
        s2_taxon_rank: 10,
        l10_taxon_str: Some("Bombus terrestris".into()),
        l10_taxon_score: Some(0.8),
        l20_taxon_str: Some("Bombus".into()),
        l20_taxon_score: Some(0.9),
        l30_taxon_str: Some("Apidae".into()),
        l30_taxon_score: Some(0.95),
        l40_taxon_str: Some("Hymenoptera".into()),
        l40_taxon_score: Some(0.97),
        l50_taxon_str: Some("Insecta".into()),
        l50_taxon_score: Some(0.99),
        s2a_score: 0.7,
        s2a_tag: None,
        media_id: format!("media-{id}"),
        media_type: Some("jpg".into()),
        width_px: Some(1920),
        height_px: Some(1080),
        timestamp: ts,
        run_name: "run-a".into(),
        pod_id: pod.into(),
        swarm_name: "swarm-east".into(),
        lat: Some(51.0),
        lon: Some(4.0),
        loc_name: Some("meadow".into()),
    }
}

fn frame(id: i32, ts: DateTime<Utc>, pod: &str) -> FrameRecord {
    // ---
    FrameRecord {
        id,
        media_id: format!("frame-{id}"),
        media_type: Some("jpg".into()),
        width_px: Some(1920),
        height_px: Some(1080),
        timestamp: ts,
        run_name: "run-a".into(),
        pod_id: pod.into(),
        swarm_name: "swarm-east".into(),
        lat: Some(51.0),
        lon: Some(4.0),
        loc_name: Some("meadow".into()),
        processed: true,
        queued: false,
    }
}

fn sensor(id: i32, ts: DateTime<Utc>, temp: f64) -> SensorRecord {
    // ---
    SensorRecord {
        id,
        timestamp: ts,
        pod_id: "pod-1".into(),
        cloud_coverage: Some(40.0),
        rain_1h: Some(0.0),
        wind_deg: Some(180.0),
        wind_speed: Some(3.5),
        humidity: Some(55.0),
        pressure: Some(1013.0),
        temperature: Some(temp),
        aqi_pm2_5: Some(8.0),
        aqi_pm10: Some(12.0),
        aqi_o3: Some(30.0),
        aqi_no2: Some(10.0),
        aqi_so2: Some(2.0),
        aqi_co: Some(0.3),
        battery_level: Some(0.8),
        rssi: Some(-60.0),
    }
}

fn pod(id: i32, name: &str) -> PodRecord {
    // ---
    PodRecord {
        id,
        name: name.into(),
        swarm_name: Some("swarm-east".into()),
        connection_status: Some("connected".into()),
        stream_type: Some("rtsp".into()),
        loc_name: Some("meadow".into()),
        lat: Some(51.0),
        lon: Some(4.0),
        queue_length: Some(3),
        total_frames: Some(1200),
        total_specimens: Some(55),
        last_s1_class: Some("insect".into()),
        last_s2_class: Some("Bombus terrestris".into()),
        last_specimen_at: Some(Utc.with_ymd_and_hms(2025, 6, 15, 11, 30, 0).unwrap()),
        last_seen: Some(Utc.with_ymd_and_hms(2025, 6, 15, 11, 59, 0).unwrap()),
        battery_level: Some(0.8),
        rssi: Some(-60.0),
    }
}

fn app(source: MemorySource) -> axum::Router {
    // ---
    router(AppState::new(Arc::new(source), Arc::new(NoThumbs)))
}

async fn get_json(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    // ---
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

// ---

#[tokio::test]
async fn health_is_ok() {
    // ---
    let app = app(MemorySource::new());
    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn pod_ids_are_sorted_distinct() {
    // ---
    let now = Utc::now();
    let source = MemorySource::new().with_specimens(vec![
        specimen(1, now - Duration::hours(1), "pod-b"),
        specimen(2, now - Duration::hours(2), "pod-a"),
        specimen(3, now - Duration::hours(3), "pod-b"),
    ]);
    let app = app(source);
    let (status, body) = get_json(&app, "/podIDs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!(["pod-a", "pod-b"]));
}

#[tokio::test]
async fn malformed_date_is_validation_error() {
    // ---
    let app = app(MemorySource::new());
    let (status, body) = get_json(&app, "/api/timeline-data?start_date=15/06/2025").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["message"].as_str().unwrap().contains("invalid date"));
}

#[tokio::test]
async fn nonpositive_bins_are_rejected() {
    // ---
    let app = app(MemorySource::new());
    let (status, _) = get_json(&app, "/api/specimen-log?n_bins=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get_json(&app, "/api/frame-log?hours=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn extreme_window_params_are_rejected() {
    // ---
    // Absurd spans and bin counts are client errors; the handler must never
    // reach duration arithmetic or bin allocation with them.
    let app = app(MemorySource::new());

    let (status, body) =
        get_json(&app, "/api/specimen-log?hours=9223372036854775807").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = get_json(&app, "/api/frame-log?n_bins=300000000").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = get_json(&app, "/frame_counts?hours=9999999999").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    // With a known clade, the failure must come from the window params.
    let seeded = self::app(
        MemorySource::new()
            .with_specimens(vec![specimen(1, Utc::now() - Duration::hours(1), "pod-1")]),
    );
    let (status, body) = get_json(
        &seeded,
        "/api/clade-activity-array-data?clade=Apidae&taxonRank=30&hours=9999999999",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn specimen_log_is_dense_and_sums_to_total() {
    // ---
    let now = Utc::now();
    // 10 specimens spread across the trailing 24h, one pod.
    let specimens: Vec<SpecimenRecord> = (0..10)
        .map(|i| {
            specimen(
                i,
                now - Duration::minutes(30 + i64::from(i) * 140),
                "pod-1",
            )
        })
        .collect();
    let app = app(MemorySource::new().with_specimens(specimens));

    let (status, body) = get_json(&app, "/api/specimen-log?hours=24&n_bins=4").await;
    assert_eq!(status, StatusCode::OK);

    let rows = body.as_array().unwrap();
    // Dense: 4 bins x 1 observed pod.
    assert_eq!(rows.len(), 4);
    let mut total = 0;
    for row in rows {
        let tuple = row.as_array().unwrap();
        assert_eq!(tuple.len(), 3);
        assert!(tuple[0].is_string());
        total += tuple[1].as_i64().unwrap();
        assert_eq!(tuple[2], "pod-1");
    }
    assert_eq!(total, 10);
}

#[tokio::test]
async fn specimen_log_zero_threshold_equals_omitted() {
    // ---
    let now = Utc::now();
    let mut low = specimen(1, now - Duration::hours(1), "pod-1");
    low.s1_score = 0.05;
    let app = app(MemorySource::new().with_specimens(vec![low]));

    let (_, with_zero) =
        get_json(&app, "/api/specimen-log?hours=24&n_bins=2&S1_score_thresh=0.0").await;
    let (_, omitted) = get_json(&app, "/api/specimen-log?hours=24&n_bins=2").await;
    assert_eq!(with_zero, omitted);

    // A real threshold filters the record out; the axis placeholder remains.
    let (_, with_real) =
        get_json(&app, "/api/specimen-log?hours=24&n_bins=2&S1_score_thresh=0.5").await;
    let total: i64 = with_real
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row.as_array().unwrap()[1].as_i64().unwrap())
        .sum();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn frame_log_breaks_down_by_pod() {
    // ---
    let now = Utc::now();
    let app = app(MemorySource::new().with_frames(vec![
        frame(1, now - Duration::hours(1), "pod-a"),
        frame(2, now - Duration::hours(1), "pod-a"),
        frame(3, now - Duration::hours(1), "pod-b"),
    ]));

    let (status, body) = get_json(&app, "/api/frame-log?hours=2&n_bins=1").await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    // 1 bin x 2 observed pods, ordered by pod.
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].as_array().unwrap()[1], 2);
    assert_eq!(rows[0].as_array().unwrap()[2], "pod-a");
    assert_eq!(rows[1].as_array().unwrap()[1], 1);
    assert_eq!(rows[1].as_array().unwrap()[2], "pod-b");
}

#[tokio::test]
async fn weather_log_full_and_lite_arity() {
    // ---
    let now = Utc::now();
    let app = app(MemorySource::new().with_sensors(vec![
        sensor(1, now - Duration::minutes(30), 20.0),
        sensor(2, now - Duration::minutes(40), 22.0),
    ]));

    let (status, full) = get_json(&app, "/api/weather-log?hours=2&n_bins=2").await;
    assert_eq!(status, StatusCode::OK);
    let rows = full.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    // midpoint + 7 weather fields + 6 AQI sub-indices
    assert_eq!(rows[0].as_array().unwrap().len(), 14);

    // Both readings fall in the second bin; the first is all nulls.
    let empty_bin = rows[0].as_array().unwrap();
    assert!(empty_bin[1..].iter().all(Value::is_null));
    let busy_bin = rows[1].as_array().unwrap();
    assert_eq!(busy_bin[7].as_f64().unwrap(), 21.0); // mean temperature

    let (_, lite) = get_json(&app, "/api/weather-log?hours=2&n_bins=2&lite=true").await;
    let rows = lite.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    // midpoint + 7 weather fields, no AQI columns
    assert_eq!(rows[0].as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn stats_null_change_when_no_previous_activity() {
    // ---
    let now = Utc::now();
    // 5 specimens in the current 24h window, none before it.
    let specimens: Vec<SpecimenRecord> = (0..5)
        .map(|i| specimen(i, now - Duration::hours(2) - Duration::minutes(i64::from(i)), "pod-1"))
        .collect();
    let app = app(MemorySource::new().with_specimens(specimens));

    let (status, body) = get_json(&app, "/api/stats").await;
    assert_eq!(status, StatusCode::OK);

    let day = &body["24_hours"]["specimens"];
    assert_eq!(day["current"], 5);
    assert_eq!(day["previous"], 0);
    assert!(day["change_pct"].is_null());

    // No frames at all: zero counts, null change.
    let frames = &body["24_hours"]["frames"];
    assert_eq!(frames["current"], 0);
    assert_eq!(frames["previous"], 0);
    assert!(frames["change_pct"].is_null());

    // Spans are reported independently.
    assert_eq!(body["72_hours"]["specimens"]["current"], 5);
}

#[tokio::test]
async fn stats_change_pct_against_previous_window() {
    // ---
    let now = Utc::now();
    let mut specimens = Vec::new();
    // 2 in the previous 24h window, 3 in the current one.
    specimens.push(specimen(1, now - Duration::hours(30), "pod-1"));
    specimens.push(specimen(2, now - Duration::hours(26), "pod-1"));
    specimens.push(specimen(3, now - Duration::hours(20), "pod-1"));
    specimens.push(specimen(4, now - Duration::hours(10), "pod-1"));
    specimens.push(specimen(5, now - Duration::hours(1), "pod-1"));
    let app = app(MemorySource::new().with_specimens(specimens));

    let (_, body) = get_json(&app, "/api/stats").await;
    let day = &body["24_hours"]["specimens"];
    assert_eq!(day["current"], 3);
    assert_eq!(day["previous"], 2);
    assert_eq!(day["change_pct"].as_f64().unwrap(), 50.0);
}

#[tokio::test]
async fn clade_activity_counts_matching_rank() {
    // ---
    let now = Utc::now();
    let mut other = specimen(3, now - Duration::hours(1), "pod-2");
    other.l30_taxon_str = Some("Syrphidae".into());
    let app = app(MemorySource::new().with_specimens(vec![
        specimen(1, now - Duration::hours(1), "pod-1"),
        specimen(2, now - Duration::hours(5), "pod-1"),
        other,
    ]));

    let (status, body) = get_json(
        &app,
        "/api/clade-activity-array-data?clade=Apidae&taxonRank=30&hours=24&n_bins=4",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 4);
    let total: i64 = rows
        .iter()
        .map(|row| row.as_array().unwrap()[1].as_i64().unwrap())
        .sum();
    assert_eq!(total, 2);
}

#[tokio::test]
async fn unknown_clade_is_validation_error() {
    // ---
    let now = Utc::now();
    let app = app(
        MemorySource::new().with_specimens(vec![specimen(1, now - Duration::hours(1), "pod-1")]),
    );

    let (status, body) =
        get_json(&app, "/api/clade-activity-array-data?clade=Vespidae&taxonRank=30").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) =
        get_json(&app, "/api/clade-activity-array-data?clade=Apidae&taxonRank=33").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn swarm_status_lists_every_pod() {
    // ---
    let app = app(MemorySource::new().with_pods(vec![pod(1, "pod-b"), pod(2, "pod-a")]));
    let (status, body) = get_json(&app, "/api/swarm-status").await;
    assert_eq!(status, StatusCode::OK);

    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    // Sorted by pod name, fixed field set, formatted nullable timestamp.
    assert_eq!(rows[0]["pod_id"], "pod-a");
    assert_eq!(rows[1]["pod_id"], "pod-b");
    assert_eq!(rows[0]["connection_status"], "connected");
    assert_eq!(rows[0]["last_specimen_at"], "2025-06-15 11:30:00");
}

#[tokio::test]
async fn frame_counts_per_pod() {
    // ---
    let now = Utc::now();
    let app = app(MemorySource::new().with_frames(vec![
        frame(1, now - Duration::hours(1), "pod-a"),
        frame(2, now - Duration::hours(2), "pod-a"),
        frame(3, now - Duration::hours(30), "pod-a"), // outside 24h
        frame(4, now - Duration::hours(1), "pod-b"),
    ]));

    let (status, body) = get_json(&app, "/frame_counts?podIDs=pod-a,pod-b,pod-c&hours=24").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pod-a"], 2);
    assert_eq!(body["pod-b"], 1);
    assert_eq!(body["pod-c"], 0);
}

#[tokio::test]
async fn timeline_returns_typed_entries() {
    // ---
    let now = Utc::now();
    let app = app(MemorySource::new().with_specimens(vec![
        specimen(1, now - Duration::hours(1), "pod-1"),
        specimen(2, now - Duration::hours(2), "pod-2"),
    ]));

    let (status, body) = get_json(&app, "/api/timeline-data?podID=pod-1").await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["pod_id"], "pod-1");
    assert_eq!(rows[0]["taxon_str"], "Bombus terrestris");
    // Images were not requested: field absent entirely.
    assert!(rows[0].get("image").is_none());

    // With images requested but no image store configured, the field is
    // present and null (per-record degradation, not an error).
    let (status, body) = get_json(&app, "/api/timeline-data?podID=pod-1&incl_images=true").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap()[0]["image"].is_null());
}
