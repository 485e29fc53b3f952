// ============================================================
// Layer 5 — Inferencer
// ============================================================
use anyhow::Result;
use burn::{prelude::*, tensor::TensorData};

use crate::domain::error::PipelineError;
use crate::domain::traits::MagnitudePredictor;
use crate::infra::checkpoint::{CheckpointManager, CheckpointMeta};
use crate::ml::model::{MagnitudeModel, MagnitudeModelConfig};

pub type InferBackend = burn::backend::Wgpu;

/// A loaded checkpoint ready to score windows of scaled features.
pub struct Inferencer<B: Backend> {
    model:         MagnitudeModel<B>,
    window_size:   usize,
    feature_count: usize,
    device:        B::Device,
}

impl<B: Backend> Inferencer<B> {
    /// Load `stem`, refusing any checkpoint whose architecture differs
    /// from `expected`.
    pub fn from_checkpoint(
        ckpt_manager: &CheckpointManager,
        stem:         &str,
        expected:     &MagnitudeModelConfig,
        window_size:  usize,
        device:       B::Device,
    ) -> Result<Self> {
        let (model, meta): (MagnitudeModel<B>, CheckpointMeta) =
            ckpt_manager.load_model(stem, expected, window_size, &device)?;
        Ok(Self::new(model, meta.window_size, meta.feature_count, device))
    }

    pub fn new(model: MagnitudeModel<B>, window_size: usize, feature_count: usize, device: B::Device) -> Self {
        Self { model, window_size, feature_count, device }
    }

    /// Score `count` windows laid out back to back, row-major.
    pub fn predict_batch(&self, windows: &[f32], count: usize) -> Result<Vec<f32>> {
        let per_window = self.window_size * self.feature_count;
        if count == 0 || windows.len() != count * per_window {
            return Err(PipelineError::ShapeMismatch(format!(
                "expected {count} windows of {} x {} values, got {} values",
                self.window_size,
                self.feature_count,
                windows.len()
            ))
            .into());
        }

        let input = Tensor::<B, 3>::from_data(
            TensorData::new(windows.to_vec(), [count, self.window_size, self.feature_count]),
            &self.device,
        );
        self.model
            .forward(input)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Cannot read predictions: {e:?}"))
    }
}

impl<B: Backend> MagnitudePredictor for Inferencer<B> {
    fn predict(&self, window: &[f32]) -> Result<f32> {
        let preds = self.predict_batch(window, 1)?;
        preds
            .first()
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Model returned no prediction"))
    }

    fn window_size(&self) -> usize {
        self.window_size
    }

    fn feature_count(&self) -> usize {
        self.feature_count
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::ModelVariant;
    use burn::backend::NdArray;

    fn inferencer() -> Inferencer<NdArray> {
        let device = Default::default();
        let model  = MagnitudeModelConfig::new(2, 4, ModelVariant::Shallow).init(&device);
        Inferencer::new(model, 3, 2, device)
    }

    #[test]
    fn test_predict_single_window() {
        let inf = inferencer();
        let p = inf.predict(&[0.1; 6]).unwrap();
        assert!(p.is_finite());
        assert_eq!(inf.window_size(), 3);
        assert_eq!(inf.feature_count(), 2);
    }

    #[test]
    fn test_batch_matches_single() {
        let inf = inferencer();
        let a: Vec<f32> = (0..6).map(|i| i as f32 * 0.1).collect();
        let b: Vec<f32> = (0..6).map(|i| 1.0 - i as f32 * 0.1).collect();
        let both: Vec<f32> = a.iter().chain(&b).copied().collect();

        let batch = inf.predict_batch(&both, 2).unwrap();
        assert!((batch[0] - inf.predict(&a).unwrap()).abs() < 1e-5);
        assert!((batch[1] - inf.predict(&b).unwrap()).abs() < 1e-5);
    }

    #[test]
    fn test_wrong_window_length_is_rejected() {
        let err = inferencer().predict(&[0.0; 5]).unwrap_err();
        assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::ShapeMismatch(_))));
    }
}
