//! In-memory record source for tests and local development.
//!
//! Filters through the `FilterSet::matches_*` predicates, so the binning
//! core and the HTTP surface can be exercised without a database.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{RecordSource, SourceResult};
use crate::filters::FilterSet;
use crate::models::{FrameRecord, PodRecord, SensorRecord, SpecimenRecord, TaxonRank};

// ---

#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    frames: Vec<FrameRecord>,
    specimens: Vec<SpecimenRecord>,
    sensors: Vec<SensorRecord>,
    pods: Vec<PodRecord>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frames(mut self, frames: Vec<FrameRecord>) -> Self {
        self.frames = frames;
        self
    }

    pub fn with_specimens(mut self, specimens: Vec<SpecimenRecord>) -> Self {
        self.specimens = specimens;
        self
    }

    pub fn with_sensors(mut self, sensors: Vec<SensorRecord>) -> Self {
        self.sensors = sensors;
        self
    }

    pub fn with_pods(mut self, pods: Vec<PodRecord>) -> Self {
        self.pods = pods;
        self
    }
}

fn sorted(values: BTreeSet<String>) -> Vec<String> {
    // BTreeSet iteration is already ordered.
    values.into_iter().collect()
}

// ---

#[async_trait]
impl RecordSource for MemorySource {
    async fn frames(&self, filter: &FilterSet) -> SourceResult<Vec<FrameRecord>> {
        // ---
        let mut rows: Vec<FrameRecord> = self
            .frames
            .iter()
            .filter(|r| filter.matches_frame(r))
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.timestamp, r.id));
        Ok(rows)
    }

    async fn frame_count(&self, filter: &FilterSet) -> SourceResult<i64> {
        // ---
        Ok(self.frames.iter().filter(|r| filter.matches_frame(r)).count() as i64)
    }

    async fn specimens(&self, filter: &FilterSet) -> SourceResult<Vec<SpecimenRecord>> {
        // ---
        let mut rows: Vec<SpecimenRecord> = self
            .specimens
            .iter()
            .filter(|r| filter.matches_specimen(r))
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.timestamp, r.id));
        Ok(rows)
    }

    async fn specimen_count(&self, filter: &FilterSet) -> SourceResult<i64> {
        // ---
        Ok(self
            .specimens
            .iter()
            .filter(|r| filter.matches_specimen(r))
            .count() as i64)
    }

    async fn sensor_readings(&self, filter: &FilterSet) -> SourceResult<Vec<SensorRecord>> {
        // ---
        let mut rows: Vec<SensorRecord> = self
            .sensors
            .iter()
            .filter(|r| filter.matches_sensor(r))
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.timestamp, r.id));
        Ok(rows)
    }

    async fn pods(&self) -> SourceResult<Vec<PodRecord>> {
        // ---
        let mut rows = self.pods.clone();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn distinct_pod_ids(&self) -> SourceResult<Vec<String>> {
        // ---
        Ok(sorted(
            self.specimens.iter().map(|r| r.pod_id.clone()).collect(),
        ))
    }

    async fn distinct_swarm_names(&self) -> SourceResult<Vec<String>> {
        // ---
        Ok(sorted(
            self.specimens.iter().map(|r| r.swarm_name.clone()).collect(),
        ))
    }

    async fn distinct_run_names(&self) -> SourceResult<Vec<String>> {
        // ---
        Ok(sorted(
            self.specimens.iter().map(|r| r.run_name.clone()).collect(),
        ))
    }

    async fn distinct_dates(&self) -> SourceResult<Vec<NaiveDate>> {
        // ---
        let days: BTreeSet<NaiveDate> = self
            .specimens
            .iter()
            .map(|r| r.timestamp.date_naive())
            .collect();
        Ok(days.into_iter().collect())
    }

    async fn distinct_taxa(&self, rank: TaxonRank) -> SourceResult<Vec<String>> {
        // ---
        Ok(sorted(
            self.specimens
                .iter()
                .filter_map(|r| r.taxon_str_at(rank).map(String::from))
                .collect(),
        ))
    }
}
