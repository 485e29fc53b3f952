// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Loads the checkpoint matching the configuration, predicts the
// temporal holdout in order and writes two metric records:
//
//   <results_dir>/<stem>/model_metrics.json
//   <results_dir>/<stem>/high_mag_model_metrics.json

use anyhow::Result;
use burn::prelude::Backend;

use crate::application::{config::PipelineConfig, prepare::prepare_sequences};
use crate::data::dataset::SequenceDataset;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{write_metrics_json, RegressionMetrics},
};
use crate::ml::evaluator::{high_magnitude_metrics, regression_metrics, run_evaluation};
use crate::ml::inferencer::InferBackend;
use crate::ml::model::MagnitudeModel;

pub const OVERALL_METRICS_FILE: &str = "model_metrics.json";
pub const HIGH_MAG_METRICS_FILE: &str = "high_mag_model_metrics.json";

#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub overall:        RegressionMetrics,
    pub high_magnitude: RegressionMetrics,
}

pub struct EvaluateUseCase {
    config: PipelineConfig,
}

impl EvaluateUseCase {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<EvaluationReport> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        self.execute_on::<InferBackend>(device)
    }

    pub fn execute_on<B: Backend>(&self, device: B::Device) -> Result<EvaluationReport> {
        let cfg = &self.config;
        cfg.validate()?;
        let stem = cfg.checkpoint_stem();

        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        let (model, _meta): (MagnitudeModel<B>, _) =
            ckpt_manager.load_model(&stem, &cfg.model_config(), cfg.window_size, &device)?;

        let prepared = prepare_sequences(cfg)?;
        if prepared.holdout.is_empty() {
            tracing::warn!("Holdout is empty (holdout_ratio = {}), metrics will be null", cfg.holdout_ratio);
        }

        let output  = run_evaluation(&model, SequenceDataset::new(prepared.holdout), cfg.batch_size, device)?;
        let loss_fn = cfg.loss_fn();

        let report = EvaluationReport {
            overall: regression_metrics(&output.predictions, &output.labels, &loss_fn),
            high_magnitude: high_magnitude_metrics(
                &output.predictions,
                &output.labels,
                cfg.high_magnitude_threshold,
                &loss_fn,
            ),
        };

        let dir = cfg.run_results_dir();
        write_metrics_json(dir.join(OVERALL_METRICS_FILE), &report.overall)?;
        write_metrics_json(dir.join(HIGH_MAG_METRICS_FILE), &report.high_magnitude)?;

        tracing::info!(
            "Holdout: {} windows, MAE={:?}, RMSE={:?}; above {}: {} windows",
            report.overall.sample_count,
            report.overall.mean_absolute_error,
            report.overall.root_mean_squared_error,
            cfg.high_magnitude_threshold,
            report.high_magnitude.sample_count,
        );
        Ok(report)
    }
}
