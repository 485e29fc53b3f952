// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Mini-batch training with Adam, gradient-norm clipping and a
// plateau scheduler. Generic over the autodiff backend so tests can
// train on NdArray while the CLI trains on Wgpu.
//
// Phases of one run:
//   Initialized → EpochRunning(1..=epochs) → Checkpointed → Done
//
// Any batch error aborts the run. A non-finite batch loss is a
// NonFiniteLoss error raised before the optimiser can apply it, so
// parameters never absorb NaN.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    grad_clipping::GradientClippingConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::fmt;
use std::path::PathBuf;

use crate::application::config::PipelineConfig;
use crate::data::{batcher::SequenceBatcher, dataset::SequenceDataset};
use crate::domain::error::PipelineError;
use crate::infra::checkpoint::{CheckpointManager, CheckpointMeta};
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::model::MagnitudeModel;
use crate::ml::scheduler::PlateauScheduler;

pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingPhase {
    Initialized,
    EpochRunning(usize),
    Checkpointed,
    Done,
}

impl fmt::Display for TrainingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingPhase::Initialized     => f.write_str("initialized"),
            TrainingPhase::EpochRunning(e) => write!(f, "epoch {e} running"),
            TrainingPhase::Checkpointed    => f.write_str("checkpointed"),
            TrainingPhase::Done            => f.write_str("done"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub epochs_completed: usize,
    pub final_loss:       f64,
    pub final_lr:         f64,
    pub checkpoint:       PathBuf,
}

fn enter(phase: &mut TrainingPhase, next: TrainingPhase) {
    tracing::info!("Training phase: {} → {}", phase, next);
    *phase = next;
}

pub fn run_training<B: AutodiffBackend>(
    cfg:           &PipelineConfig,
    train_dataset: SequenceDataset,
    ckpt_manager:  &CheckpointManager,
    metrics:       &MetricsLogger,
    device:        B::Device,
) -> Result<TrainingSummary> {
    let stem      = cfg.checkpoint_stem();
    let loss_fn   = cfg.loss_fn();
    let model_cfg = cfg.model_config();
    let train_len = train_dataset.sequence_count();

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: MagnitudeModel<B> = model_cfg.init(&device);
    tracing::info!(
        "Model ready: {} variant, hidden={}, {} features, {} training sequences",
        model_cfg.variant, model_cfg.hidden_size, model_cfg.input_size, train_len,
    );

    // ── Adam with gradient-norm clipping ──────────────────────────────────────
    let mut optim = AdamConfig::new()
        .with_epsilon(1e-8)
        .with_grad_clipping(Some(GradientClippingConfig::Norm(cfg.max_grad_norm as f32)))
        .init::<B, MagnitudeModel<B>>();
    let mut scheduler = PlateauScheduler::new(cfg.lr, cfg.patience);

    // ── Training data loader (reshuffled every epoch) ─────────────────────────
    let batcher = SequenceBatcher::<B>::new(device.clone());
    let loader  = DataLoaderBuilder::new(batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train_dataset);

    let mut phase = TrainingPhase::Initialized;
    tracing::info!("Training phase: {}", phase);

    let mut final_loss = f64::NAN;
    let mut checkpoint = ckpt_manager.weights_path::<B>(&stem);
    let mut saved_after_last_epoch = false;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {
        enter(&mut phase, TrainingPhase::EpochRunning(epoch));
        let lr = scheduler.lr();

        let mut loss_sum  = 0.0f64;
        let mut pred_sum  = 0.0f64;
        let mut label_sum = 0.0f64;
        let mut batches   = 0usize;
        let mut samples   = 0usize;

        for (index, batch) in loader.iter().enumerate() {
            let batch_size = batch.labels.dims()[0];
            let label_total: f64 = batch.labels.clone().sum().into_scalar().elem::<f64>();

            let (loss, predictions) = model.forward_loss(batch.sequences, batch.labels, &loss_fn);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            if !loss_val.is_finite() {
                return Err(PipelineError::NonFiniteLoss { epoch, batch: index + 1, value: loss_val }.into());
            }

            pred_sum  += predictions.detach().sum().into_scalar().elem::<f64>();
            label_sum += label_total;
            loss_sum  += loss_val;
            samples   += batch_size;
            batches   += 1;

            // Backward pass + clipped Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(lr, model, grads);
        }

        let avg_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
        let avg_pred = if samples > 0 { pred_sum / samples as f64 } else { f64::NAN };
        let avg_label = if samples > 0 { label_sum / samples as f64 } else { f64::NAN };

        println!(
            "Epoch {:>3}/{} | loss={:.4} | avg_pred={:.4} | avg_label={:.4} | lr={:.6}",
            epoch, cfg.epochs, avg_loss, avg_pred, avg_label, lr,
        );

        metrics.log(&EpochMetrics::new(epoch, avg_loss, avg_pred, avg_label, lr))?;
        final_loss = avg_loss;

        if let Some(new_lr) = scheduler.step(avg_loss) {
            tracing::info!("Loss plateaued, learning rate reduced to {:.6}", new_lr);
        }
        tracing::debug!("Best epoch loss so far {:.6}", scheduler.best());

        if cfg.checkpoint_every_epoch {
            let meta = checkpoint_meta(cfg, epoch, avg_loss, scheduler.lr());
            checkpoint = ckpt_manager.save_model(&stem, &model, &meta)?;
            saved_after_last_epoch = epoch == cfg.epochs;
            tracing::info!("Checkpoint saved for epoch {}", epoch);
        }
    }

    if !saved_after_last_epoch {
        let meta = checkpoint_meta(cfg, cfg.epochs, final_loss, scheduler.lr());
        checkpoint = ckpt_manager.save_model(&stem, &model, &meta)?;
    }
    enter(&mut phase, TrainingPhase::Checkpointed);
    tracing::info!("Checkpoint published at '{}'", checkpoint.display());

    enter(&mut phase, TrainingPhase::Done);
    tracing::info!("Training complete!");

    Ok(TrainingSummary {
        epochs_completed: cfg.epochs,
        final_loss,
        final_lr: scheduler.lr(),
        checkpoint,
    })
}

fn checkpoint_meta(cfg: &PipelineConfig, epoch: usize, loss: f64, lr: f64) -> CheckpointMeta {
    CheckpointMeta {
        model:            cfg.model_config(),
        feature_count:    cfg.feature_set.feature_count(),
        window_size:      cfg.window_size,
        epochs_completed: epoch,
        final_loss:       loss,
        final_lr:         lr,
    }
}
