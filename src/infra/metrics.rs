// ============================================================
// Layer 6 — Metrics Records
// ============================================================
// Two kinds of structured output:
//
//   training_log.csv — one row per epoch, appended as training runs
//     epoch,loss,avg_prediction,avg_label,lr
//     1,3.412200,4.981000,5.870000,0.005000
//
//   *_metrics.json — one regression summary per evaluated subset
//     {"sample_count":21,"mean_absolute_error":0.41,...}
//
// A subset with no samples keeps its sample_count of 0 and writes
// every metric as null rather than a misleading 0 or NaN.
//
// Reference: csv crate documentation (serde writer)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

pub const TRAINING_LOG_FILE: &str = "training_log.csv";

/// One row of the per-epoch training log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,

    /// Mean batch loss over the epoch
    pub loss: f64,

    /// Mean prediction over every training sample seen this epoch
    pub avg_prediction: f64,

    /// Mean true magnitude over the same samples
    pub avg_label: f64,

    /// Learning rate the epoch ran with
    pub lr: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, loss: f64, avg_prediction: f64, avg_label: f64, lr: f64) -> Self {
        Self { epoch, loss, avg_prediction, avg_label, lr }
    }
}

/// Appends EpochMetrics rows to `<dir>/training_log.csv`
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Start a fresh log, replacing any log a previous run left behind.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create results directory '{}'", dir.display()))?;

        let csv_path = dir.join(TRAINING_LOG_FILE);
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "epoch,loss,avg_prediction,avg_label,lr")?;
        tracing::debug!("Created training log: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        let mut w = csv::WriterBuilder::new().has_headers(false).from_writer(f);
        w.write_record([
            m.epoch.to_string(),
            format!("{:.6}", m.loss),
            format!("{:.6}", m.avg_prediction),
            format!("{:.6}", m.avg_label),
            format!("{:.6}", m.lr),
        ])?;
        w.flush()?;

        tracing::debug!("Logged epoch {} loss={:.4}", m.epoch, m.loss);
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

/// Regression quality over one evaluated subset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub sample_count:            usize,
    pub mean_absolute_error:     Option<f64>,
    pub mean_squared_error:      Option<f64>,
    pub root_mean_squared_error: Option<f64>,
    pub magnitude_aware_loss:    Option<f64>,
}

impl RegressionMetrics {
    pub fn empty() -> Self {
        Self {
            sample_count:            0,
            mean_absolute_error:     None,
            mean_squared_error:      None,
            root_mean_squared_error: None,
            magnitude_aware_loss:    None,
        }
    }
}

/// Write one metrics record as pretty JSON, creating parent directories
pub fn write_metrics_json(path: impl AsRef<Path>, metrics: &RegressionMetrics) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create '{}'", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(metrics)?;
    fs::write(path, json).with_context(|| format!("Cannot write metrics to '{}'", path.display()))?;
    tracing::info!("Wrote metrics to '{}'", path.display());
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_log_rows() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::create(dir.path().join("run")).unwrap();
        logger.log(&EpochMetrics::new(1, 3.5, 4.9, 5.8, 0.005)).unwrap();
        logger.log(&EpochMetrics::new(2, 2.25, 5.2, 5.8, 0.0005)).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "epoch,loss,avg_prediction,avg_label,lr");
        assert_eq!(lines[2], "2,2.250000,5.200000,5.800000,0.000500");
    }

    #[test]
    fn test_create_truncates_previous_log() {
        let dir = tempfile::tempdir().unwrap();
        let first = MetricsLogger::create(dir.path()).unwrap();
        first.log(&EpochMetrics::new(1, 1.0, 1.0, 1.0, 0.1)).unwrap();
        let second = MetricsLogger::create(dir.path()).unwrap();
        assert_eq!(fs::read_to_string(second.csv_path()).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_empty_metrics_serialize_as_null() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("high_mag_model_metrics.json");
        write_metrics_json(&path, &RegressionMetrics::empty()).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["sample_count"], 0);
        assert!(value["mean_absolute_error"].is_null());
        assert!(value["magnitude_aware_loss"].is_null());
    }
}
