//! Filter composition for record queries.
//!
//! A [`FilterSet`] is a conjunction of optional predicates built from query
//! params. Every criterion is optional; an absent criterion contributes no
//! predicate, so the empty set matches every record. The same `FilterSet`
//! drives both the in-memory source (via the `matches_*` predicates here)
//! and the Postgres source (compiled to SQL in `source::postgres`) — the two
//! must stay in agreement.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::error::AppError;
use crate::models::{
    FrameRecord, SensorRecord, SpecimenRecord, TaxonRank, DATETIME_FORMAT, DATE_FORMAT,
};

// ---

/// Clade criterion: the taxon name at `rank` must equal `name`.
#[derive(Debug, Clone, PartialEq)]
pub struct CladeFilter {
    pub name: String,
    pub rank: TaxonRank,
}

/// Conjunction of optional predicates over record attributes.
///
/// List-valued identity criteria OR within the field and AND across fields.
/// An empty list means "match all" for that field — the documented behavior
/// for present-but-empty lists, applied uniformly. Predicates over
/// attributes a record kind does not carry (e.g. `run_name` on sensor
/// samples) are skipped for that kind.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    pub start: Option<DateTime<Utc>>,
    /// Exclusive upper bound. Inclusive wire inputs are normalized on parse.
    pub end_exclusive: Option<DateTime<Utc>>,
    pub pod_ids: Vec<String>,
    pub swarm_names: Vec<String>,
    pub run_names: Vec<String>,
    pub location: Option<String>,
    pub species_only: bool,
    pub s1_score: Option<f64>,
    pub s2_score: Option<f64>,
    pub s2a_score: Option<f64>,
    pub clade: Option<CladeFilter>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the inclusive wire date range, normalizing the end bound to
    /// an exclusive instant (datetime inputs get +1s, date-only inputs the
    /// following midnight). A malformed string is a client error — never
    /// silently ignored.
    pub fn with_dates(
        mut self,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Self, AppError> {
        // ---
        if let Some(s) = start {
            self.start = Some(parse_start_bound(s)?);
        }
        if let Some(s) = end {
            self.end_exclusive = Some(parse_end_bound(s)?);
        }
        Ok(self)
    }

    /// Install an explicit half-open window `[start, end)`. Used by the
    /// binned endpoints and the period comparator, which work on windows
    /// anchored at the request's `now`.
    pub fn with_window(mut self, start: DateTime<Utc>, end_exclusive: DateTime<Utc>) -> Self {
        // ---
        self.start = Some(start);
        self.end_exclusive = Some(end_exclusive);
        self
    }

    pub fn with_pods(mut self, pod_ids: Vec<String>) -> Self {
        self.pod_ids = pod_ids;
        self
    }

    pub fn with_swarms(mut self, swarm_names: Vec<String>) -> Self {
        self.swarm_names = swarm_names;
        self
    }

    pub fn with_runs(mut self, run_names: Vec<String>) -> Self {
        self.run_names = run_names;
        self
    }

    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }

    pub fn with_species_only(mut self, species_only: bool) -> Self {
        self.species_only = species_only;
        self
    }

    /// Install the three confidence thresholds, each passed through
    /// [`threshold`] so a wire value of `0.0` behaves as "unset".
    pub fn with_scores(
        mut self,
        s1: Option<f64>,
        s2: Option<f64>,
        s2a: Option<f64>,
    ) -> Self {
        // ---
        self.s1_score = threshold(s1);
        self.s2_score = threshold(s2);
        self.s2a_score = threshold(s2a);
        self
    }

    pub fn with_clade(mut self, clade: CladeFilter) -> Self {
        self.clade = Some(clade);
        self
    }

    /// Half-open range check shared by all record kinds.
    fn in_range(&self, ts: DateTime<Utc>) -> bool {
        // ---
        if let Some(start) = self.start {
            if ts < start {
                return false;
            }
        }
        if let Some(end) = self.end_exclusive {
            if ts >= end {
                return false;
            }
        }
        true
    }

    pub fn matches_specimen(&self, r: &SpecimenRecord) -> bool {
        // ---
        self.in_range(r.timestamp)
            && list_matches(&self.pod_ids, &r.pod_id)
            && list_matches(&self.swarm_names, &r.swarm_name)
            && list_matches(&self.run_names, &r.run_name)
            && self
                .location
                .as_deref()
                .map_or(true, |loc| r.loc_name.as_deref() == Some(loc))
            && (!self.species_only || r.is_species_level())
            && self.s1_score.map_or(true, |t| r.s1_score >= t)
            && self.s2_score.map_or(true, |t| r.s2_taxon_score >= t)
            && self.s2a_score.map_or(true, |t| r.s2a_score >= t)
            && self
                .clade
                .as_ref()
                .map_or(true, |c| r.taxon_str_at(c.rank) == Some(c.name.as_str()))
    }

    pub fn matches_frame(&self, r: &FrameRecord) -> bool {
        // ---
        self.in_range(r.timestamp)
            && list_matches(&self.pod_ids, &r.pod_id)
            && list_matches(&self.swarm_names, &r.swarm_name)
            && list_matches(&self.run_names, &r.run_name)
            && self
                .location
                .as_deref()
                .map_or(true, |loc| r.loc_name.as_deref() == Some(loc))
    }

    pub fn matches_sensor(&self, r: &SensorRecord) -> bool {
        // ---
        self.in_range(r.timestamp) && list_matches(&self.pod_ids, &r.pod_id)
    }
}

// ---

/// Normalize a wire threshold to its three-state meaning: absent or exactly
/// `0.0` means "no filter"; only a positive value installs a `>=` predicate.
/// The zero convention is load-bearing — dashboard clients send `0.0` for
/// untouched slider controls and expect an unfiltered result.
pub fn threshold(value: Option<f64>) -> Option<f64> {
    // ---
    value.filter(|t| *t > 0.0)
}

/// Split a comma-separated identity param into a list, dropping empties.
/// `None`, `""` and `","` all yield an empty list (match all).
pub fn csv_list(value: Option<&str>) -> Vec<String> {
    // ---
    value
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn list_matches(list: &[String], value: &str) -> bool {
    // ---
    list.is_empty() || list.iter().any(|v| v == value)
}

/// Parse an inclusive start bound: full datetime, or date-only (midnight).
pub fn parse_start_bound(s: &str) -> Result<DateTime<Utc>, AppError> {
    // ---
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, DATETIME_FORMAT) {
        return Ok(dt.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
        return Ok(d.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc());
    }
    Err(bad_date(s))
}

/// Parse an inclusive end bound into its exclusive equivalent.
pub fn parse_end_bound(s: &str) -> Result<DateTime<Utc>, AppError> {
    // ---
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, DATETIME_FORMAT) {
        return Ok(dt.and_utc() + Duration::seconds(1));
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
        let midnight = d.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
        return Ok(midnight + Duration::days(1));
    }
    Err(bad_date(s))
}

fn bad_date(s: &str) -> AppError {
    // ---
    AppError::Validation(format!(
        "invalid date '{s}': expected '{DATETIME_FORMAT}' or '{DATE_FORMAT}'"
    ))
}
