//! Record source abstraction.
//!
//! The aggregation core never talks to a database directly; it consumes a
//! [`RecordSource`] handed in per request. Production wires up the Postgres
//! implementation, tests and local development the in-memory one — both
//! filter through the same [`FilterSet`](crate::filters::FilterSet)
//! semantics, which is what makes the core testable without a live server.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::filters::FilterSet;
use crate::models::{FrameRecord, PodRecord, SensorRecord, SpecimenRecord, TaxonRank};

mod memory;
mod postgres;

pub use memory::MemorySource;
pub use postgres::PgSource;

// ---

/// Record source failure. Never retried here; the caller reports it.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("record source query failed: {0}")]
    Query(#[from] sqlx::Error),
}

pub type SourceResult<T> = Result<T, SourceError>;

// ---

/// Filtered range queries over the persisted records.
///
/// All methods are read-only; implementations may be queried concurrently
/// by independent requests without coordination. List-returning methods
/// yield deterministic (sorted) order, and record queries ascend by
/// timestamp, so identical requests produce byte-identical responses.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn frames(&self, filter: &FilterSet) -> SourceResult<Vec<FrameRecord>>;

    async fn frame_count(&self, filter: &FilterSet) -> SourceResult<i64>;

    async fn specimens(&self, filter: &FilterSet) -> SourceResult<Vec<SpecimenRecord>>;

    async fn specimen_count(&self, filter: &FilterSet) -> SourceResult<i64>;

    async fn sensor_readings(&self, filter: &FilterSet) -> SourceResult<Vec<SensorRecord>>;

    /// All known pods with their last-reported status.
    async fn pods(&self) -> SourceResult<Vec<PodRecord>>;

    /// Distinct pod IDs with specimen activity, sorted.
    async fn distinct_pod_ids(&self) -> SourceResult<Vec<String>>;

    /// Distinct swarm names with specimen activity, sorted.
    async fn distinct_swarm_names(&self) -> SourceResult<Vec<String>>;

    /// Distinct run names with specimen activity, sorted.
    async fn distinct_run_names(&self) -> SourceResult<Vec<String>>;

    /// Distinct calendar dates with specimen activity, sorted.
    async fn distinct_dates(&self) -> SourceResult<Vec<NaiveDate>>;

    /// Distinct taxon names resolved at the given rank, sorted. Drives the
    /// clade dropdown and unknown-clade validation.
    async fn distinct_taxa(&self, rank: TaxonRank) -> SourceResult<Vec<String>>;
}
