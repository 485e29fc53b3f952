// ============================================================
// Layer 4 — Feature Engineering
// ============================================================
// Turns chronologically ordered RawEvents into a FeatureMatrix.
//
//   RawEvent[]
//       │  time delta, calendar fields, sin/cos encodings
//       │  geodesic distance to the previous epicentre
//       │  k-means region id over (lat, lon)
//       │  lagged / rolling magnitude statistics (Extended only)
//       ▼
//   FeatureMatrix (unscaled) ──StandardScaler──► FeatureMatrix (scaled)
//
// Missing values (first-row deltas, incomplete rolling windows,
// absent depth) are filled with 0.
//
// Magnitude-derived columns read only magnitudes of earlier events,
// so the magnitude of event t never appears in row t. The label of a
// window is the magnitude of its last row; without the lag the
// model could read the answer straight out of its input.

use std::collections::HashMap;
use std::f64::consts::PI;

use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};

use crate::data::clustering::RegionClusters;
use crate::data::geo::distances_from_previous;
use crate::data::scaler::StandardScaler;
use crate::domain::error::PipelineError;
use crate::domain::event::RawEvent;
use crate::domain::feature::{FeatureMatrix, FeatureSet};

/// Number of spatial regions fitted by k-means
pub const REGION_COUNT: usize = 10;

/// Trailing window for Cumulative_Magnitude / Avg_Magnitude
const SHORT_WINDOW: usize = 5;

/// Trailing window for Rolling_Magnitude_Month
const MONTH_WINDOW: usize = 30;

/// (sin, cos) of `value` on a cycle of length `period`
pub fn cyclic_encode(value: f64, period: f64) -> (f64, f64) {
    let angle = 2.0 * PI * value / period;
    (angle.sin(), angle.cos())
}

/// Everything fitted on the training catalogue that inference must reuse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedFeatureState {
    pub feature_set:    FeatureSet,
    pub regions:        RegionClusters,
    pub mean_magnitude: f64,
    pub scaler:         StandardScaler,
}

impl FittedFeatureState {
    /// Engineer and scale features for new events with the fitted
    /// regions and scaler. Per-year counts and means are computed
    /// over `events` themselves.
    pub fn prepare(&self, events: &[RawEvent]) -> Result<FeatureMatrix, PipelineError> {
        let raw = engineer_features(events, self.feature_set, &self.regions, self.mean_magnitude)?;
        self.scaler.transform(&raw)
    }
}

/// Output of fitting the feature pipeline on a catalogue
#[derive(Debug, Clone)]
pub struct EngineeredData {
    /// Scaled features, one row per event
    pub features: FeatureMatrix,
    /// Magnitude of each event, unscaled
    pub labels: Vec<f32>,
    pub state: FittedFeatureState,
}

pub struct FeatureEngineer {
    feature_set:  FeatureSet,
    region_count: usize,
    seed:         u64,
}

impl FeatureEngineer {
    pub fn new(feature_set: FeatureSet, seed: u64) -> Self {
        Self { feature_set, region_count: REGION_COUNT, seed }
    }

    /// Fit regions, magnitude mean and scaler on `events`, then
    /// produce the scaled feature matrix and labels.
    pub fn fit(&self, events: &[RawEvent]) -> Result<EngineeredData, PipelineError> {
        let points: Vec<[f64; 2]> = events.iter().map(|e| [e.latitude, e.longitude]).collect();
        let regions = RegionClusters::fit(&points, self.region_count, self.seed);
        tracing::debug!("Fitted {} region clusters", regions.len());

        let mean_magnitude = if events.is_empty() {
            0.0
        } else {
            events.iter().map(|e| e.magnitude).sum::<f64>() / events.len() as f64
        };

        let raw    = engineer_features(events, self.feature_set, &regions, mean_magnitude)?;
        let scaler = StandardScaler::fit(&raw);
        let features = scaler.transform(&raw)?;
        let labels = events.iter().map(|e| e.magnitude as f32).collect();

        tracing::info!(
            "Engineered {} rows x {} '{}' features",
            features.len(),
            features.feature_count(),
            self.feature_set,
        );

        Ok(EngineeredData {
            features,
            labels,
            state: FittedFeatureState {
                feature_set: self.feature_set,
                regions,
                mean_magnitude,
                scaler,
            },
        })
    }
}

/// Unscaled feature matrix for `events` in `feature_set` column order.
pub fn engineer_features(
    events:         &[RawEvent],
    feature_set:    FeatureSet,
    regions:        &RegionClusters,
    mean_magnitude: f64,
) -> Result<FeatureMatrix, PipelineError> {
    let n = events.len();

    // ── Inter-event timing ────────────────────────────────────────────────────
    let time_delta: Vec<f64> = (0..n)
        .map(|i| {
            if i == 0 {
                0.0
            } else {
                let d = events[i].timestamp.signed_duration_since(events[i - 1].timestamp);
                d.num_milliseconds() as f64 / 1000.0
            }
        })
        .collect();
    let time_delta_lag1 = lag(&time_delta);

    // ── Calendar fields and cyclic encodings ──────────────────────────────────
    let year:    Vec<f64> = events.iter().map(|e| e.timestamp.year() as f64).collect();
    let month:   Vec<f64> = events.iter().map(|e| e.timestamp.month() as f64).collect();
    let day:     Vec<f64> = events.iter().map(|e| e.timestamp.day() as f64).collect();
    let weekday: Vec<f64> = events
        .iter()
        .map(|e| e.timestamp.weekday().num_days_from_monday() as f64)
        .collect();
    let hour:    Vec<f64> = events.iter().map(|e| e.timestamp.hour() as f64).collect();
    let doy:     Vec<f64> = events.iter().map(|e| e.timestamp.ordinal() as f64).collect();

    let (hour_sin, hour_cos)   = encode_series(&hour, 24.0);
    let (doy_sin, doy_cos)     = encode_series(&doy, 365.0);
    let (month_sin, month_cos) = encode_series(&month, 12.0);
    let (day_sin, day_cos)     = encode_series(&day, 31.0);

    // ── Spatial ───────────────────────────────────────────────────────────────
    let latitude:  Vec<f64> = events.iter().map(|e| e.latitude).collect();
    let longitude: Vec<f64> = events.iter().map(|e| e.longitude).collect();
    let coords: Vec<(f64, f64)> = events.iter().map(|e| (e.latitude, e.longitude)).collect();
    let geodesic = distances_from_previous(&coords);
    let region: Vec<f64> = events
        .iter()
        .map(|e| regions.assign([e.latitude, e.longitude]) as f64)
        .collect();
    let region_time: Vec<f64> = region.iter().zip(&time_delta).map(|(r, t)| r * t).collect();
    let cumulative_quakes: Vec<f64> = (1..=n).map(|i| i as f64).collect();

    let mut series: HashMap<&'static str, Vec<f64>> = HashMap::from([
        ("Latitude", latitude),
        ("Longitude", longitude),
        ("Time_Delta", time_delta),
        ("Hour_Sin", hour_sin),
        ("Hour_Cos", hour_cos),
        ("DayOfYear", doy),
        ("DayOfYear_Sin", doy_sin),
        ("DayOfYear_Cos", doy_cos),
        ("Month_Sin", month_sin),
        ("Month_Cos", month_cos),
        ("Day_Sin", day_sin),
        ("Day_Cos", day_cos),
        ("Geodesic_Distance", geodesic),
        ("Time_Delta_Lag1", time_delta_lag1),
        ("Region_Time", region_time),
        ("Cumulative_Quakes", cumulative_quakes),
        ("Day", day),
        ("Weekday", weekday),
        ("Hour", hour),
    ]);

    if feature_set == FeatureSet::Extended {
        let depth: Vec<f64> = events.iter().map(RawEvent::depth_or_zero).collect();
        let magnitude: Vec<f64> = events.iter().map(|e| e.magnitude).collect();
        let mag_lag1 = lag(&magnitude);

        let deviation: Vec<f64> = mag_lag1
            .iter()
            .enumerate()
            .map(|(i, m)| if i == 0 { 0.0 } else { m - mean_magnitude })
            .collect();

        let (year_count, yearly_avg) = per_year_stats(&year, &magnitude);

        series.insert("Cumulative_Magnitude", trailing_sum(&magnitude, SHORT_WINDOW));
        series.insert("Avg_Magnitude", trailing_mean(&magnitude, SHORT_WINDOW));
        series.insert("Rolling_Magnitude_Month", trailing_mean(&magnitude, MONTH_WINDOW));
        series.insert("Deviation_From_Avg", deviation);
        series.insert("Magnitude_Depth", mag_lag1.iter().zip(&depth).map(|(m, d)| m * d).collect());
        series.insert("Magnitude_Year", mag_lag1.iter().zip(&year).map(|(m, y)| m * y).collect());
        series.insert("Depth_Month", depth.iter().zip(&month).map(|(d, m)| d * m).collect());
        series.insert("Year_Count", year_count);
        series.insert("Yearly_Avg_Magnitude", yearly_avg);
        series.insert("Magnitude_Lag1", mag_lag1);
        series.insert("Depth", depth);
    }

    series.insert("Year", year);
    series.insert("Month", month);
    series.insert("Region_Cluster", region);

    order_columns(feature_set.columns(), series)
}

/// Arrange engineered series in schema order. A schema column with no
/// series behind it is an error, never a silent zero column.
fn order_columns(
    columns: &[&'static str],
    mut series: HashMap<&'static str, Vec<f64>>,
) -> Result<FeatureMatrix, PipelineError> {
    let ordered = columns
        .iter()
        .map(|c| {
            series.remove(c).ok_or_else(|| {
                PipelineError::ShapeMismatch(format!("no series engineered for column '{c}'"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(FeatureMatrix::from_columns(columns, &ordered))
}

fn encode_series(values: &[f64], period: f64) -> (Vec<f64>, Vec<f64>) {
    values.iter().map(|v| cyclic_encode(*v, period)).unzip()
}

/// Shift by one row; the first row becomes 0
fn lag(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    if !values.is_empty() {
        out.push(0.0);
        out.extend_from_slice(&values[..values.len() - 1]);
    }
    out
}

/// Sum of the `window` values strictly before each row; 0 until a full window exists
fn trailing_sum(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![0.0; values.len()];
    let mut acc = 0.0;
    for i in 0..values.len() {
        if i >= window {
            out[i] = acc;
            acc -= values[i - window];
        }
        acc += values[i];
    }
    out
}

fn trailing_mean(values: &[f64], window: usize) -> Vec<f64> {
    trailing_sum(values, window).into_iter().map(|s| s / window as f64).collect()
}

/// Per-row count of events in that row's year, and the running mean of
/// `values` over the earlier rows of the same year (0 for a year's first row)
fn per_year_stats(year: &[f64], values: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for y in year {
        *counts.entry(*y as i64).or_insert(0) += 1;
    }

    let mut running: HashMap<i64, (usize, f64)> = HashMap::new();
    year.iter()
        .zip(values)
        .map(|(y, v)| {
            let key = *y as i64;
            let total = counts.get(&key).copied().unwrap_or_default();
            let seen = running.entry(key).or_insert((0, 0.0));
            let mean = if seen.0 == 0 { 0.0 } else { seen.1 / seen.0 as f64 };
            seen.0 += 1;
            seen.1 += v;
            (total as f64, mean)
        })
        .unzip()
}
