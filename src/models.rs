//! Typed record models for the pod swarm dashboard.
//!
//! These mirror the persisted tables one-to-one (see `schema.rs`). Records
//! are read-only from this service's point of view: the ingest side (PodOS)
//! owns all writes, the dashboard only queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---

/// Wire format for datetimes in query params and response payloads.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Wire format for date-only query params (`/dates`, bare range bounds).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ---

/// Taxonomic rank levels used by the classifier, most specific first.
///
/// The numeric codes are the classifier's own level codes (L10..L50) and
/// appear verbatim in query params (`taxonRank=10`) and in the per-rank
/// taxon columns of [`SpecimenRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaxonRank {
    Species,
    Genus,
    Family,
    Order,
    Class,
}

impl TaxonRank {
    /// Parse a classifier level code (10, 20, 30, 40, 50).
    pub fn from_code(code: i32) -> Option<TaxonRank> {
        // ---
        match code {
            10 => Some(TaxonRank::Species),
            20 => Some(TaxonRank::Genus),
            30 => Some(TaxonRank::Family),
            40 => Some(TaxonRank::Order),
            50 => Some(TaxonRank::Class),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        // ---
        match self {
            TaxonRank::Species => 10,
            TaxonRank::Genus => 20,
            TaxonRank::Family => 30,
            TaxonRank::Order => 40,
            TaxonRank::Class => 50,
        }
    }

    /// Column holding the taxon name at this rank.
    pub fn taxon_column(self) -> &'static str {
        // ---
        match self {
            TaxonRank::Species => "l10_taxon_str",
            TaxonRank::Genus => "l20_taxon_str",
            TaxonRank::Family => "l30_taxon_str",
            TaxonRank::Order => "l40_taxon_str",
            TaxonRank::Class => "l50_taxon_str",
        }
    }
}

// ---

/// Anything carrying an event timestamp; lets the binning engine work over
/// frames, specimens and sensor readings uniformly.
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Anything attributable to a single pod; used for per-pod breakdowns.
pub trait PodScoped {
    fn pod_id(&self) -> &str;
}

// ---

/// One captured camera frame, before any detection ran on it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FrameRecord {
    // ---
    pub id: i32,
    pub media_id: String,
    pub media_type: Option<String>,
    pub width_px: Option<i32>,
    pub height_px: Option<i32>,
    pub timestamp: DateTime<Utc>,
    pub run_name: String,
    pub pod_id: String,
    pub swarm_name: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub loc_name: Option<String>,
    pub processed: bool,
    pub queued: bool,
}

/// A detected-and-classified specimen derived from a frame.
///
/// Stage 1 is the detector (`s1_*`), stage 2 the classifier (`s2_*`), and
/// `s2a_*` the plausibility check. The `l10..l50` columns carry the taxon
/// name and score at each rank level of the classified lineage; coarser
/// ranks stay populated even when the classifier stops above species.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SpecimenRecord {
    // ---
    pub id: i32,

    // Stage 1 (detection)
    pub bbox_ll_x: i32,
    pub bbox_ll_y: i32,
    pub bbox_ur_x: i32,
    pub bbox_ur_y: i32,
    pub s1_score: f64,
    pub s1_tag: Option<String>,
    pub s1_class: Option<String>,

    // Stage 2 (classification)
    pub s2_taxon_id: Option<String>,
    pub s2_taxon_str: Option<String>,
    pub s2_taxon_score: f64,
    pub s2_taxon_rank: i32,

    // Per-rank taxa
    pub l10_taxon_str: Option<String>,
    pub l10_taxon_score: Option<f64>,
    pub l20_taxon_str: Option<String>,
    pub l20_taxon_score: Option<f64>,
    pub l30_taxon_str: Option<String>,
    pub l30_taxon_score: Option<f64>,
    pub l40_taxon_str: Option<String>,
    pub l40_taxon_score: Option<f64>,
    pub l50_taxon_str: Option<String>,
    pub l50_taxon_score: Option<f64>,

    // Plausibility
    pub s2a_score: f64,
    pub s2a_tag: Option<String>,

    // Media reference
    pub media_id: String,
    pub media_type: Option<String>,
    pub width_px: Option<i32>,
    pub height_px: Option<i32>,

    // Frame context
    pub timestamp: DateTime<Utc>,
    pub run_name: String,
    pub pod_id: String,
    pub swarm_name: String,

    // Location
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub loc_name: Option<String>,
}

impl SpecimenRecord {
    /// Taxon name at the given rank, if the classifier resolved one.
    pub fn taxon_str_at(&self, rank: TaxonRank) -> Option<&str> {
        // ---
        let s = match rank {
            TaxonRank::Species => &self.l10_taxon_str,
            TaxonRank::Genus => &self.l20_taxon_str,
            TaxonRank::Family => &self.l30_taxon_str,
            TaxonRank::Order => &self.l40_taxon_str,
            TaxonRank::Class => &self.l50_taxon_str,
        };
        s.as_deref()
    }

    /// True when the classification reached species level.
    pub fn is_species_level(&self) -> bool {
        // ---
        self.s2_taxon_rank == TaxonRank::Species.code()
    }
}

/// One environmental telemetry sample from a pod's sensor suite.
///
/// Every reading is nullable: pods report whichever sensors they carry.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SensorRecord {
    // ---
    pub id: i32,
    pub timestamp: DateTime<Utc>,
    pub pod_id: String,

    // Weather
    pub cloud_coverage: Option<f64>,
    pub rain_1h: Option<f64>,
    pub wind_deg: Option<f64>,
    pub wind_speed: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub temperature: Option<f64>,

    // Air quality sub-indices
    pub aqi_pm2_5: Option<f64>,
    pub aqi_pm10: Option<f64>,
    pub aqi_o3: Option<f64>,
    pub aqi_no2: Option<f64>,
    pub aqi_so2: Option<f64>,
    pub aqi_co: Option<f64>,

    // Pod health
    pub battery_level: Option<f64>,
    pub rssi: Option<f64>,
}

/// Last-known state of one pod, maintained by the ingest side.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PodRecord {
    // ---
    pub id: i32,
    pub name: String,
    pub swarm_name: Option<String>,
    pub connection_status: Option<String>,
    pub stream_type: Option<String>,
    pub loc_name: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub queue_length: Option<i32>,
    pub total_frames: Option<i64>,
    pub total_specimens: Option<i64>,
    pub last_s1_class: Option<String>,
    pub last_s2_class: Option<String>,
    pub last_specimen_at: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    pub battery_level: Option<f64>,
    pub rssi: Option<f64>,
}

// ---

impl Timestamped for FrameRecord {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl Timestamped for SpecimenRecord {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl Timestamped for SensorRecord {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl PodScoped for FrameRecord {
    fn pod_id(&self) -> &str {
        &self.pod_id
    }
}

impl PodScoped for SpecimenRecord {
    fn pod_id(&self) -> &str {
        &self.pod_id
    }
}

impl PodScoped for SensorRecord {
    fn pod_id(&self) -> &str {
        &self.pod_id
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_taxon_rank_codes_round_trip() {
        // ---
        for code in [10, 20, 30, 40, 50] {
            let rank = TaxonRank::from_code(code).unwrap();
            assert_eq!(rank.code(), code);
        }
        assert!(TaxonRank::from_code(0).is_none());
        assert!(TaxonRank::from_code(15).is_none());
        assert!(TaxonRank::from_code(60).is_none());
    }

    #[test]
    fn test_taxon_columns_are_distinct() {
        // ---
        let cols = [
            TaxonRank::Species.taxon_column(),
            TaxonRank::Genus.taxon_column(),
            TaxonRank::Family.taxon_column(),
            TaxonRank::Order.taxon_column(),
            TaxonRank::Class.taxon_column(),
        ];
        for (i, a) in cols.iter().enumerate() {
            for b in &cols[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
