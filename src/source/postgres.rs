//! Postgres-backed record source.
//!
//! Compiles [`FilterSet`] predicates to SQL with `sqlx::QueryBuilder`. The
//! predicate translation must stay in lockstep with the in-memory
//! `matches_*` functions in `filters.rs` — same columns, same comparison
//! directions, same empty-list-matches-all rule.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{RecordSource, SourceResult};
use crate::filters::FilterSet;
use crate::models::{FrameRecord, PodRecord, SensorRecord, SpecimenRecord, TaxonRank};

// ---

#[derive(Clone)]
pub struct PgSource {
    pool: PgPool,
}

impl PgSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ---

/// Predicates shared by all record tables: time range and pod identity.
fn push_common_filters(qb: &mut QueryBuilder<'_, Postgres>, f: &FilterSet) {
    // ---
    if let Some(start) = f.start {
        qb.push(" AND timestamp >= ").push_bind(start);
    }
    if let Some(end) = f.end_exclusive {
        qb.push(" AND timestamp < ").push_bind(end);
    }
    if !f.pod_ids.is_empty() {
        qb.push(" AND pod_id = ANY(").push_bind(f.pod_ids.clone()).push(")");
    }
}

/// Identity predicates carried by frames and specimens.
fn push_identity_filters(qb: &mut QueryBuilder<'_, Postgres>, f: &FilterSet) {
    // ---
    if !f.swarm_names.is_empty() {
        qb.push(" AND swarm_name = ANY(")
            .push_bind(f.swarm_names.clone())
            .push(")");
    }
    if !f.run_names.is_empty() {
        qb.push(" AND run_name = ANY(")
            .push_bind(f.run_names.clone())
            .push(")");
    }
    if let Some(loc) = &f.location {
        qb.push(" AND loc_name = ").push_bind(loc.clone());
    }
}

/// Specimen-only predicates: rank flag, confidence thresholds, clade.
fn push_specimen_filters(qb: &mut QueryBuilder<'_, Postgres>, f: &FilterSet) {
    // ---
    if f.species_only {
        qb.push(" AND s2_taxon_rank = ")
            .push_bind(TaxonRank::Species.code());
    }
    if let Some(t) = f.s1_score {
        qb.push(" AND s1_score >= ").push_bind(t);
    }
    if let Some(t) = f.s2_score {
        qb.push(" AND s2_taxon_score >= ").push_bind(t);
    }
    if let Some(t) = f.s2a_score {
        qb.push(" AND s2a_score >= ").push_bind(t);
    }
    if let Some(clade) = &f.clade {
        // Column name comes from the TaxonRank enum, never from user input.
        qb.push(format!(" AND {} = ", clade.rank.taxon_column()))
            .push_bind(clade.name.clone());
    }
}

// ---

#[async_trait]
impl RecordSource for PgSource {
    async fn frames(&self, filter: &FilterSet) -> SourceResult<Vec<FrameRecord>> {
        // ---
        let mut qb = QueryBuilder::new("SELECT * FROM frame_records WHERE TRUE");
        push_common_filters(&mut qb, filter);
        push_identity_filters(&mut qb, filter);
        qb.push(" ORDER BY timestamp, id");
        let rows = qb
            .build_query_as::<FrameRecord>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn frame_count(&self, filter: &FilterSet) -> SourceResult<i64> {
        // ---
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM frame_records WHERE TRUE");
        push_common_filters(&mut qb, filter);
        push_identity_filters(&mut qb, filter);
        let count = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn specimens(&self, filter: &FilterSet) -> SourceResult<Vec<SpecimenRecord>> {
        // ---
        let mut qb = QueryBuilder::new("SELECT * FROM specimen_records WHERE TRUE");
        push_common_filters(&mut qb, filter);
        push_identity_filters(&mut qb, filter);
        push_specimen_filters(&mut qb, filter);
        qb.push(" ORDER BY timestamp, id");
        let rows = qb
            .build_query_as::<SpecimenRecord>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn specimen_count(&self, filter: &FilterSet) -> SourceResult<i64> {
        // ---
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM specimen_records WHERE TRUE");
        push_common_filters(&mut qb, filter);
        push_identity_filters(&mut qb, filter);
        push_specimen_filters(&mut qb, filter);
        let count = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn sensor_readings(&self, filter: &FilterSet) -> SourceResult<Vec<SensorRecord>> {
        // ---
        let mut qb = QueryBuilder::new("SELECT * FROM sensor_records WHERE TRUE");
        push_common_filters(&mut qb, filter);
        qb.push(" ORDER BY timestamp, id");
        let rows = qb
            .build_query_as::<SensorRecord>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn pods(&self) -> SourceResult<Vec<PodRecord>> {
        // ---
        let rows = sqlx::query_as::<_, PodRecord>("SELECT * FROM pod_records ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn distinct_pod_ids(&self) -> SourceResult<Vec<String>> {
        // ---
        let rows = sqlx::query_scalar(
            "SELECT DISTINCT pod_id FROM specimen_records ORDER BY pod_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn distinct_swarm_names(&self) -> SourceResult<Vec<String>> {
        // ---
        let rows = sqlx::query_scalar(
            "SELECT DISTINCT swarm_name FROM specimen_records ORDER BY swarm_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn distinct_run_names(&self) -> SourceResult<Vec<String>> {
        // ---
        let rows = sqlx::query_scalar(
            "SELECT DISTINCT run_name FROM specimen_records ORDER BY run_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn distinct_dates(&self) -> SourceResult<Vec<NaiveDate>> {
        // ---
        let rows = sqlx::query_scalar(
            "SELECT DISTINCT CAST(timestamp AS DATE) AS day FROM specimen_records ORDER BY day",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn distinct_taxa(&self, rank: TaxonRank) -> SourceResult<Vec<String>> {
        // ---
        let col = rank.taxon_column();
        let sql = format!(
            "SELECT DISTINCT {col} FROM specimen_records WHERE {col} IS NOT NULL ORDER BY {col}"
        );
        let rows = sqlx::query_scalar(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }
}
