//! Time-windowed binning, aggregation and period comparison.
//!
//! This is the heart of the dashboard backend: everything here is pure over
//! an injected `now`, so handlers capture the clock exactly once per request
//! and tests pin it to a fixed instant. Bins are half-open `[start, end)`
//! intervals covering `[now - span, now)` with no gaps or overlaps; the
//! charting client plots them on a fixed axis, so every binned endpoint
//! emits one entry per bin even when the bin is empty (dense mode).

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::AppError;
use crate::models::{PodScoped, SensorRecord, Timestamped, DATETIME_FORMAT};

// ---

/// One half-open time interval `[start, end)` of a bin axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub midpoint: DateTime<Utc>,
}

impl Bin {
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        // ---
        ts >= self.start && ts < self.end
    }

    /// Midpoint in the wire datetime format.
    pub fn midpoint_str(&self) -> String {
        // ---
        self.midpoint.format(DATETIME_FORMAT).to_string()
    }
}

/// Widest span a client may request. Far beyond any dashboard use, and
/// small enough that `span * MAX_BIN_COUNT` stays within i64 microseconds.
pub const MAX_SPAN_HOURS: i64 = 100_000;

/// Most bins a client may request per window.
pub const MAX_BIN_COUNT: usize = 10_000;

/// Divide the trailing window `[now - span, now)` into `bin_count` equal
/// bins. Edges sit on the microsecond lattice (`edge_i = start + total * i /
/// n`), so the first edge is exactly `now - span`, the last exactly `now`,
/// and adjacent bins share an edge regardless of whether the span divides
/// evenly.
///
/// Both parameters are wire-supplied, so they are range-checked before any
/// duration arithmetic: out-of-range values are a client error, never a
/// panic or an unbounded allocation.
pub fn make_bins(
    now: DateTime<Utc>,
    span_hours: i64,
    bin_count: usize,
) -> Result<Vec<Bin>, AppError> {
    // ---
    if !(1..=MAX_SPAN_HOURS).contains(&span_hours) {
        return Err(AppError::Validation(format!(
            "span must be between 1 and {MAX_SPAN_HOURS} hours, got {span_hours}"
        )));
    }
    if !(1..=MAX_BIN_COUNT).contains(&bin_count) {
        return Err(AppError::Validation(format!(
            "bin count must be between 1 and {MAX_BIN_COUNT}, got {bin_count}"
        )));
    }

    let start = now - Duration::hours(span_hours);
    let total_us = (now - start)
        .num_microseconds()
        .ok_or_else(|| AppError::Validation(format!("span of {span_hours}h overflows")))?;
    let n = bin_count as i64;

    let edge = |i: i64| start + Duration::microseconds(total_us * i / n);

    let bins = (0..n)
        .map(|i| {
            let (s, e) = (edge(i), edge(i + 1));
            Bin {
                start: s,
                end: e,
                midpoint: s + (e - s) / 2,
            }
        })
        .collect();
    Ok(bins)
}

/// Assign each record to the unique bin containing its timestamp.
///
/// Dense: the result always has one slot per bin. Records outside
/// `[bins.first().start, bins.last().end)` — stale data, clock-skewed
/// futures, or a timestamp landing exactly on `now` — are dropped, not
/// snapped to the nearest bin.
pub fn assign<'a, R: Timestamped>(bins: &[Bin], records: &'a [R]) -> Vec<Vec<&'a R>> {
    // ---
    let mut slots: Vec<Vec<&R>> = vec![Vec::new(); bins.len()];
    for r in records {
        let ts = r.timestamp();
        let idx = bins.partition_point(|b| b.end <= ts);
        if let Some(bin) = bins.get(idx) {
            if bin.contains(ts) {
                slots[idx].push(r);
            }
        }
    }
    slots
}

// ---

/// One flat count entry: `[midpoint, count, pod_id]`.
///
/// The charting client consumes these as parallel per-pod series over a
/// shared time axis, hence flat tuples rather than nesting.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CountPoint(pub String, pub i64, pub String);

/// One clade-activity entry: `[midpoint, count]`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActivityPoint(pub String, pub i64);

/// Per-bin counts broken down by pod, dense over both axes.
///
/// The pod axis is `requested_pods` when non-empty, otherwise the set of
/// pods observed anywhere in the window; every bin × pod combination gets an
/// entry, zero-filled where the bin holds nothing for that pod. When there
/// are no pods at all, each bin still emits a single `[midpoint, 0, ""]`
/// placeholder so the time axis survives. BTreeSet keeps pod order
/// deterministic, which keeps identical requests byte-identical.
pub fn count_points<R: Timestamped + PodScoped>(
    bins: &[Bin],
    assigned: &[Vec<&R>],
    requested_pods: &[String],
) -> Vec<CountPoint> {
    // ---
    let mut axis: BTreeSet<String> = requested_pods.iter().cloned().collect();
    if axis.is_empty() {
        for slot in assigned {
            for r in slot {
                axis.insert(r.pod_id().to_string());
            }
        }
    }

    let mut points = Vec::new();
    for (bin, slot) in bins.iter().zip(assigned) {
        if axis.is_empty() {
            points.push(CountPoint(bin.midpoint_str(), 0, String::new()));
            continue;
        }
        for pod in &axis {
            let count = slot.iter().filter(|r| r.pod_id() == pod).count() as i64;
            points.push(CountPoint(bin.midpoint_str(), count, pod.clone()));
        }
    }
    points
}

/// Per-bin totals, dense.
pub fn activity_points<R: Timestamped>(bins: &[Bin], assigned: &[Vec<&R>]) -> Vec<ActivityPoint> {
    // ---
    bins.iter()
        .zip(assigned)
        .map(|(bin, slot)| ActivityPoint(bin.midpoint_str(), slot.len() as i64))
        .collect()
}

// ---

/// Per-bin means of the sensor telemetry fields. A field with zero present
/// readings in the bin is `None` — callers must be able to tell "no data"
/// from a measured zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherMeans {
    pub cloud_coverage: Option<f64>,
    pub rain_1h: Option<f64>,
    pub wind_deg: Option<f64>,
    pub wind_speed: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub temperature: Option<f64>,
    pub aqi_pm2_5: Option<f64>,
    pub aqi_pm10: Option<f64>,
    pub aqi_o3: Option<f64>,
    pub aqi_no2: Option<f64>,
    pub aqi_so2: Option<f64>,
    pub aqi_co: Option<f64>,
}

fn mean_of(records: &[&SensorRecord], field: impl Fn(&SensorRecord) -> Option<f64>) -> Option<f64> {
    // ---
    let mut sum = 0.0;
    let mut n = 0usize;
    for r in records {
        if let Some(v) = field(r) {
            sum += v;
            n += 1;
        }
    }
    (n > 0).then(|| sum / n as f64)
}

/// Field-wise arithmetic means over the readings in one bin.
pub fn weather_means(records: &[&SensorRecord]) -> WeatherMeans {
    // ---
    WeatherMeans {
        cloud_coverage: mean_of(records, |r| r.cloud_coverage),
        rain_1h: mean_of(records, |r| r.rain_1h),
        wind_deg: mean_of(records, |r| r.wind_deg),
        wind_speed: mean_of(records, |r| r.wind_speed),
        humidity: mean_of(records, |r| r.humidity),
        pressure: mean_of(records, |r| r.pressure),
        temperature: mean_of(records, |r| r.temperature),
        aqi_pm2_5: mean_of(records, |r| r.aqi_pm2_5),
        aqi_pm10: mean_of(records, |r| r.aqi_pm10),
        aqi_o3: mean_of(records, |r| r.aqi_o3),
        aqi_no2: mean_of(records, |r| r.aqi_no2),
        aqi_so2: mean_of(records, |r| r.aqi_so2),
        aqi_co: mean_of(records, |r| r.aqi_co),
    }
}

/// Full weather row. Field order: midpoint, cloud_coverage, rain_1h,
/// wind_deg, wind_speed, humidity, pressure, temperature, aqi_pm2_5,
/// aqi_pm10, aqi_o3, aqi_no2, aqi_so2, aqi_co.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WeatherPoint(
    pub String,
    pub Option<f64>,
    pub Option<f64>,
    pub Option<f64>,
    pub Option<f64>,
    pub Option<f64>,
    pub Option<f64>,
    pub Option<f64>,
    pub Option<f64>,
    pub Option<f64>,
    pub Option<f64>,
    pub Option<f64>,
    pub Option<f64>,
    pub Option<f64>,
);

/// Lite weather row: the full row minus the AQI sub-indices. Field order:
/// midpoint, cloud_coverage, rain_1h, wind_deg, wind_speed, humidity,
/// pressure, temperature.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WeatherLitePoint(
    pub String,
    pub Option<f64>,
    pub Option<f64>,
    pub Option<f64>,
    pub Option<f64>,
    pub Option<f64>,
    pub Option<f64>,
    pub Option<f64>,
);

impl WeatherPoint {
    pub fn from_bin(bin: &Bin, m: &WeatherMeans) -> Self {
        // ---
        WeatherPoint(
            bin.midpoint_str(),
            m.cloud_coverage,
            m.rain_1h,
            m.wind_deg,
            m.wind_speed,
            m.humidity,
            m.pressure,
            m.temperature,
            m.aqi_pm2_5,
            m.aqi_pm10,
            m.aqi_o3,
            m.aqi_no2,
            m.aqi_so2,
            m.aqi_co,
        )
    }
}

impl WeatherLitePoint {
    pub fn from_bin(bin: &Bin, m: &WeatherMeans) -> Self {
        // ---
        WeatherLitePoint(
            bin.midpoint_str(),
            m.cloud_coverage,
            m.rain_1h,
            m.wind_deg,
            m.wind_speed,
            m.humidity,
            m.pressure,
            m.temperature,
        )
    }
}

// ---

/// Count comparison between the requested window and the immediately
/// preceding equal-length window.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ComparisonResult {
    pub current: i64,
    pub previous: i64,
    pub change_pct: Option<f64>,
}

impl ComparisonResult {
    pub fn new(current: i64, previous: i64) -> Self {
        // ---
        ComparisonResult {
            current,
            previous,
            change_pct: change_pct(current, previous),
        }
    }
}

/// Percentage change, `None` when the previous period had no records —
/// there is no meaningful baseline, and `null` is what the trend indicator
/// renders as "new activity" (never infinity, never an error).
pub fn change_pct(current: i64, previous: i64) -> Option<f64> {
    // ---
    (previous > 0).then(|| (current - previous) as f64 / previous as f64 * 100.0)
}

/// The trailing window `[now - span, now)`.
pub fn current_window(now: DateTime<Utc>, span_hours: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    // ---
    (now - Duration::hours(span_hours), now)
}

/// The window immediately before the trailing one:
/// `[now - 2*span, now - span)`. Window-aligned, not calendar-aligned.
pub fn previous_window(now: DateTime<Utc>, span_hours: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    // ---
    (
        now - Duration::hours(2 * span_hours),
        now - Duration::hours(span_hours),
    )
}
