// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// The serving path: a recent-events CSV in, one magnitude out.
//
//   Step 1: Load the fitted feature state      (Layer 6 - infra)
//   Step 2: Load the matching checkpoint       (Layer 5 - ml)
//   Step 3: Read the recent events             (Layer 4 - data)
//   Step 4: Engineer + scale with the fitted
//           state, keep the last window        (Layer 4 - data)
//   Step 5: Predict through MagnitudePredictor (Layer 3 trait)
//
// Nothing is re-fitted here: regions and scaler come from training.

use anyhow::Result;
use burn::prelude::Backend;
use std::path::PathBuf;

use crate::application::config::PipelineConfig;
use crate::data::loader::CsvEventLoader;
use crate::domain::{
    error::PipelineError,
    traits::{EventSource, MagnitudePredictor},
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::inferencer::{InferBackend, Inferencer};

pub struct PredictUseCase {
    config:      PipelineConfig,
    events_path: PathBuf,
}

impl PredictUseCase {
    pub fn new(config: PipelineConfig, events_path: impl Into<PathBuf>) -> Self {
        Self { config, events_path: events_path.into() }
    }

    pub fn execute(&self) -> Result<f32> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        self.execute_on::<InferBackend>(device)
    }

    pub fn execute_on<B: Backend>(&self, device: B::Device) -> Result<f32> {
        let cfg = &self.config;
        cfg.validate()?;
        let stem = cfg.checkpoint_stem();

        // ── Steps 1–2 ─────────────────────────────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        let state = ckpt_manager.load_feature_state(&stem)?;
        if state.feature_set != cfg.feature_set {
            return Err(PipelineError::ArchitectureMismatch {
                path:     ckpt_manager.feature_state_path(&stem).display().to_string(),
                expected: format!("feature_set={}", cfg.feature_set),
                found:    format!("feature_set={}", state.feature_set),
            }
            .into());
        }
        let predictor = Inferencer::<B>::from_checkpoint(
            &ckpt_manager,
            &stem,
            &cfg.model_config(),
            cfg.window_size,
            device,
        )?;

        // ── Step 3 ────────────────────────────────────────────────────────────
        let events = CsvEventLoader::new(&self.events_path).load_all()?;
        if events.len() < predictor.window_size() {
            return Err(PipelineError::InsufficientData {
                rows:        events.len(),
                window_size: predictor.window_size(),
            }
            .into());
        }

        // ── Step 4 ────────────────────────────────────────────────────────────
        let features = state.prepare(&events)?.tail(predictor.window_size());
        if features.feature_count() != predictor.feature_count() {
            return Err(PipelineError::ShapeMismatch(format!(
                "feature state produces {} columns, model expects {}",
                features.feature_count(),
                predictor.feature_count()
            ))
            .into());
        }
        let window: Vec<f32> = features.values().iter().map(|v| *v as f32).collect();

        // ── Step 5 ────────────────────────────────────────────────────────────
        let magnitude = predictor.predict(&window)?;
        tracing::info!("Predicted magnitude {:.3} from {} recent events", magnitude, events.len());
        Ok(magnitude)
    }
}
