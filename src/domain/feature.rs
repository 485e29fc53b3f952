// ============================================================
// Layer 3 — Feature Schema and FeatureMatrix
// ============================================================
// A FeatureMatrix is one row per retained event, in time order,
// with a fixed column order. The model's input layer is sized from
// `feature_count()`, so changing a column list below invalidates
// every trained checkpoint.
//
// Two named column sets exist:
//   Basic    — calendar, spatial and inter-event timing features
//   Extended — Basic plus depth and lagged magnitude statistics
//
// Reference: Rust Book §8 (Vectors), §6 (Enums)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const BASIC_COLUMNS: &[&str] = &[
    "Latitude",
    "Longitude",
    "Time_Delta",
    "Year",
    "Month",
    "Day",
    "Weekday",
    "Hour",
    "Hour_Sin",
    "Hour_Cos",
    "DayOfYear",
    "DayOfYear_Sin",
    "DayOfYear_Cos",
    "Month_Sin",
    "Month_Cos",
    "Day_Sin",
    "Day_Cos",
    "Geodesic_Distance",
    "Region_Cluster",
    "Time_Delta_Lag1",
    "Region_Time",
    "Cumulative_Quakes",
];

const EXTENDED_COLUMNS: &[&str] = &[
    "Latitude",
    "Longitude",
    "Depth",
    "Time_Delta",
    "Year",
    "Month",
    "Day",
    "Weekday",
    "Hour",
    "Hour_Sin",
    "Hour_Cos",
    "DayOfYear",
    "DayOfYear_Sin",
    "DayOfYear_Cos",
    "Month_Sin",
    "Month_Cos",
    "Day_Sin",
    "Day_Cos",
    "Geodesic_Distance",
    "Region_Cluster",
    "Cumulative_Magnitude",
    "Avg_Magnitude",
    "Deviation_From_Avg",
    "Magnitude_Lag1",
    "Time_Delta_Lag1",
    "Magnitude_Depth",
    "Region_Time",
    "Rolling_Magnitude_Month",
    "Year_Count",
    "Yearly_Avg_Magnitude",
    "Cumulative_Quakes",
    "Magnitude_Year",
    "Depth_Month",
];

/// Which column list the feature pipeline produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSet {
    Basic,
    Extended,
}

impl FeatureSet {
    /// Column names in the exact order the model consumes them
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            FeatureSet::Basic    => BASIC_COLUMNS,
            FeatureSet::Extended => EXTENDED_COLUMNS,
        }
    }

    pub fn feature_count(self) -> usize {
        self.columns().len()
    }

    pub fn name(self) -> &'static str {
        match self {
            FeatureSet::Basic    => "basic",
            FeatureSet::Extended => "extended",
        }
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic"    => Ok(FeatureSet::Basic),
            "extended" => Ok(FeatureSet::Extended),
            other      => Err(format!("unknown feature set '{other}' (expected basic or extended)")),
        }
    }
}

/// Row-major numeric matrix with named columns.
///
/// Row `i` always describes the `i`-th event in time order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    values:  Vec<f64>,
}

impl FeatureMatrix {
    /// Build from row-major values.
    ///
    /// # Panics
    /// Panics if `values.len()` is not a multiple of the column count,
    /// since no valid matrix has that shape.
    pub fn new(columns: Vec<String>, values: Vec<f64>) -> Self {
        assert!(
            !columns.is_empty() && values.len() % columns.len() == 0,
            "{} values cannot fill rows of {} columns",
            values.len(),
            columns.len()
        );
        Self { columns, values }
    }

    /// Build from one series per column; every series must share a length.
    pub fn from_columns(columns: &[&str], series: &[Vec<f64>]) -> Self {
        assert_eq!(columns.len(), series.len(), "one series per column");
        let rows = series.first().map_or(0, Vec::len);
        assert!(series.iter().all(|s| s.len() == rows), "ragged feature series");

        let mut values = Vec::with_capacity(rows * columns.len());
        for r in 0..rows {
            values.extend(series.iter().map(|s| s[r]));
        }
        Self::new(columns.iter().map(|c| c.to_string()).collect(), values)
    }

    /// Number of rows (events)
    pub fn len(&self) -> usize {
        self.values.len() / self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of columns
    pub fn feature_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn row(&self, index: usize) -> &[f64] {
        let w = self.columns.len();
        &self.values[index * w..(index + 1) * w]
    }

    /// Index of a named column, if present
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Copy of one column as a series
    pub fn column(&self, index: usize) -> Vec<f64> {
        (0..self.len()).map(|r| self.row(r)[index]).collect()
    }

    /// Keep only the last `n` rows (all of them if `n >= len`)
    pub fn tail(&self, n: usize) -> FeatureMatrix {
        let skip = self.len().saturating_sub(n);
        let w    = self.columns.len();
        FeatureMatrix {
            columns: self.columns.clone(),
            values:  self.values[skip * w..].to_vec(),
        }
    }
}
