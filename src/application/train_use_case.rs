// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate configuration
//   Step 2: Prepare sequences + split        (Layer 4 / 6)
//   Step 3: Persist fitted feature state     (Layer 6 - infra)
//   Step 4: Open the per-epoch log           (Layer 6 - infra)
//   Step 5: Run the training loop            (Layer 5 - ml)
//
// Only the chronological head is trained on, so the holdout tail
// evaluated afterwards is data the model never saw.

use anyhow::Result;
use burn::tensor::backend::AutodiffBackend;

use crate::application::{config::PipelineConfig, prepare::prepare_sequences};
use crate::data::dataset::SequenceDataset;
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::trainer::{run_training, TrainBackend, TrainingSummary};

pub struct TrainUseCase {
    config: PipelineConfig,
}

impl TrainUseCase {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Train on the default GPU backend
    pub fn execute(&self) -> Result<TrainingSummary> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);
        self.execute_on::<TrainBackend>(device)
    }

    pub fn execute_on<B: AutodiffBackend>(&self, device: B::Device) -> Result<TrainingSummary> {
        let cfg = &self.config;

        // ── Step 1 ────────────────────────────────────────────────────────────
        cfg.validate()?;
        let stem = cfg.checkpoint_stem();
        tracing::info!("Training run '{}'", stem);

        // ── Step 2 ────────────────────────────────────────────────────────────
        let prepared = prepare_sequences(cfg)?;

        // ── Step 3 ────────────────────────────────────────────────────────────
        // Saved first so a checkpoint is never published without it
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt_manager.save_feature_state(&stem, &prepared.state)?;

        // ── Step 4 ────────────────────────────────────────────────────────────
        let metrics = MetricsLogger::create(cfg.run_results_dir())?;

        // ── Step 5 ────────────────────────────────────────────────────────────
        let train_dataset = SequenceDataset::new(prepared.train);
        run_training::<B>(cfg, train_dataset, &ckpt_manager, &metrics, device)
    }
}
