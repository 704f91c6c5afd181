//! Database schema management for `swarmdash`.
//!
//! Ensures required tables and indexes exist before serving requests.
//! Applied once on startup from `main.rs` (EMBP: single gateway call).
//! The ingest side (PodOS) owns the data; these definitions only have to
//! agree with it, so everything is `IF NOT EXISTS` and idempotent.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates the four record tables the dashboard reads: frames, specimens,
/// sensor telemetry, and per-pod status. Safe to call on every startup;
/// no-op if objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // Raw captured frames, one row per camera frame
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS frame_records (
            id          SERIAL PRIMARY KEY,
            media_id    TEXT        NOT NULL,
            media_type  TEXT,
            width_px    INTEGER,
            height_px   INTEGER,
            timestamp   TIMESTAMPTZ NOT NULL,
            run_name    TEXT        NOT NULL,
            pod_id      TEXT        NOT NULL,
            swarm_name  TEXT        NOT NULL,
            lat         DOUBLE PRECISION,
            lon         DOUBLE PRECISION,
            loc_name    TEXT,
            processed   BOOLEAN     NOT NULL DEFAULT FALSE,
            queued      BOOLEAN     NOT NULL DEFAULT FALSE
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Detected-and-classified specimens derived from frames
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS specimen_records (
            id              SERIAL PRIMARY KEY,

            bbox_ll_x       INTEGER     NOT NULL,
            bbox_ll_y       INTEGER     NOT NULL,
            bbox_ur_x       INTEGER     NOT NULL,
            bbox_ur_y       INTEGER     NOT NULL,
            s1_score        DOUBLE PRECISION NOT NULL,
            s1_tag          TEXT,
            s1_class        TEXT,

            s2_taxon_id     TEXT,
            s2_taxon_str    TEXT,
            s2_taxon_score  DOUBLE PRECISION NOT NULL,
            s2_taxon_rank   INTEGER     NOT NULL,

            l10_taxon_str   TEXT,
            l10_taxon_score DOUBLE PRECISION,
            l20_taxon_str   TEXT,
            l20_taxon_score DOUBLE PRECISION,
            l30_taxon_str   TEXT,
            l30_taxon_score DOUBLE PRECISION,
            l40_taxon_str   TEXT,
            l40_taxon_score DOUBLE PRECISION,
            l50_taxon_str   TEXT,
            l50_taxon_score DOUBLE PRECISION,

            s2a_score       DOUBLE PRECISION NOT NULL,
            s2a_tag         TEXT,

            media_id        TEXT        NOT NULL,
            media_type      TEXT,
            width_px        INTEGER,
            height_px       INTEGER,

            timestamp       TIMESTAMPTZ NOT NULL,
            run_name        TEXT        NOT NULL,
            pod_id          TEXT        NOT NULL,
            swarm_name      TEXT        NOT NULL,

            lat             DOUBLE PRECISION,
            lon             DOUBLE PRECISION,
            loc_name        TEXT
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Environmental telemetry samples
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sensor_records (
            id             SERIAL PRIMARY KEY,
            timestamp      TIMESTAMPTZ NOT NULL,
            pod_id         TEXT        NOT NULL,

            cloud_coverage DOUBLE PRECISION,
            rain_1h        DOUBLE PRECISION,
            wind_deg       DOUBLE PRECISION,
            wind_speed     DOUBLE PRECISION,
            humidity       DOUBLE PRECISION,
            pressure       DOUBLE PRECISION,
            temperature    DOUBLE PRECISION,

            aqi_pm2_5      DOUBLE PRECISION,
            aqi_pm10       DOUBLE PRECISION,
            aqi_o3         DOUBLE PRECISION,
            aqi_no2        DOUBLE PRECISION,
            aqi_so2        DOUBLE PRECISION,
            aqi_co         DOUBLE PRECISION,

            battery_level  DOUBLE PRECISION,
            rssi           DOUBLE PRECISION
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Last-known pod status, one row per pod
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pod_records (
            id                SERIAL PRIMARY KEY,
            name              TEXT NOT NULL UNIQUE,
            swarm_name        TEXT,
            connection_status TEXT,
            stream_type       TEXT,
            loc_name          TEXT,
            lat               DOUBLE PRECISION,
            lon               DOUBLE PRECISION,
            queue_length      INTEGER,
            total_frames      BIGINT,
            total_specimens   BIGINT,
            last_s1_class     TEXT,
            last_s2_class     TEXT,
            last_specimen_at  TIMESTAMPTZ,
            last_seen         TIMESTAMPTZ,
            battery_level     DOUBLE PRECISION,
            rssi              DOUBLE PRECISION
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Indexes for the window + identity queries every endpoint issues
    for stmt in [
        "CREATE INDEX IF NOT EXISTS idx_frame_records_timestamp ON frame_records (timestamp);",
        "CREATE INDEX IF NOT EXISTS idx_frame_records_pod_id ON frame_records (pod_id);",
        "CREATE INDEX IF NOT EXISTS idx_specimen_records_timestamp ON specimen_records (timestamp);",
        "CREATE INDEX IF NOT EXISTS idx_specimen_records_pod_id ON specimen_records (pod_id);",
        "CREATE INDEX IF NOT EXISTS idx_specimen_records_s2_taxon_rank ON specimen_records (s2_taxon_rank);",
        "CREATE INDEX IF NOT EXISTS idx_sensor_records_timestamp ON sensor_records (timestamp);",
        "CREATE INDEX IF NOT EXISTS idx_sensor_records_pod_id ON sensor_records (pod_id);",
    ] {
        sqlx::query(stmt).execute(&mut *tx).await?;
    }

    tx.commit().await?;
    Ok(())
}
