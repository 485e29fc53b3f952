// ============================================================
// Layer 2 — Pipeline Configuration
// ============================================================
// Every tunable of a train / evaluate / predict run, injected into
// each use case instead of read from globals. Serialisable so a
// run's exact settings can be logged or saved.
//
// validate() runs before any file is touched; a bad value is an
// InvalidConfig naming the field.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::error::PipelineError;
use crate::domain::feature::FeatureSet;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::loss::{LossKind, MagnitudeLoss};
use crate::ml::model::{MagnitudeModelConfig, ModelVariant};

/// Attention heads in every encoder stage
pub const ATTENTION_HEADS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub data_path:      PathBuf,
    pub cache_dir:      PathBuf,
    pub checkpoint_dir: PathBuf,
    pub results_dir:    PathBuf,
    pub feature_set:    FeatureSet,
    pub window_size:    usize,
    pub hidden_size:    usize,
    pub variant:        ModelVariant,
    pub epochs:         usize,
    pub lr:             f64,
    pub batch_size:     usize,
    pub loss:           LossKind,
    pub beta:           f64,
    pub holdout_ratio:  f64,
    pub patience:       usize,
    pub max_grad_norm:  f64,
    pub checkpoint_every_epoch:   bool,
    pub high_magnitude_threshold: f64,
    pub seed:           u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path:      PathBuf::from("data/database.csv"),
            cache_dir:      PathBuf::from("data"),
            checkpoint_dir: PathBuf::from("model/modelfile"),
            results_dir:    PathBuf::from("results"),
            feature_set:    FeatureSet::Extended,
            window_size:    100,
            hidden_size:    128,
            variant:        ModelVariant::Deep,
            epochs:         50,
            lr:             0.005,
            batch_size:     32,
            loss:           LossKind::LinearWeighted,
            beta:           0.5,
            holdout_ratio:  0.3,
            patience:       5,
            max_grad_norm:  1.0,
            checkpoint_every_epoch:   false,
            high_magnitude_threshold: 6.5,
            seed:           42,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        let invalid = |msg: String| Err(PipelineError::InvalidConfig(msg));

        if self.window_size == 0 {
            return invalid("window_size must be at least 1".into());
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be at least 1".into());
        }
        if self.epochs == 0 {
            return invalid("epochs must be at least 1".into());
        }
        if self.hidden_size == 0 || (2 * self.hidden_size) % ATTENTION_HEADS != 0 {
            return invalid(format!(
                "hidden_size {} must be positive with 2*hidden_size divisible by {ATTENTION_HEADS}",
                self.hidden_size
            ));
        }
        if !self.lr.is_finite() || self.lr <= 0.0 {
            return invalid(format!("lr must be finite and > 0, got {}", self.lr));
        }
        if !self.beta.is_finite() || self.beta < 0.0 {
            return invalid(format!("beta must be finite and >= 0, got {}", self.beta));
        }
        if !(0.0..1.0).contains(&self.holdout_ratio) {
            return invalid(format!("holdout_ratio must be in [0, 1), got {}", self.holdout_ratio));
        }
        if !self.max_grad_norm.is_finite() || self.max_grad_norm <= 0.0 {
            return invalid(format!("max_grad_norm must be finite and > 0, got {}", self.max_grad_norm));
        }
        if !self.high_magnitude_threshold.is_finite() {
            return invalid("high_magnitude_threshold must be finite".into());
        }
        Ok(())
    }

    /// Checkpoint stem shared by every artefact of this run
    pub fn checkpoint_stem(&self) -> String {
        CheckpointManager::checkpoint_name(self.epochs, self.lr, self.batch_size, self.window_size)
    }

    /// `<results_dir>/<stem>`
    pub fn run_results_dir(&self) -> PathBuf {
        self.results_dir.join(self.checkpoint_stem())
    }

    pub fn loss_fn(&self) -> MagnitudeLoss {
        MagnitudeLoss::new(self.loss, self.beta as f32)
    }

    pub fn model_config(&self) -> MagnitudeModelConfig {
        MagnitudeModelConfig::new(self.feature_set.feature_count(), self.hidden_size, self.variant)
            .with_num_heads(ATTENTION_HEADS)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = PipelineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.checkpoint_stem(), "model_50_0P005_32_100");
        assert_eq!(cfg.model_config().input_size, 33);
    }

    #[test]
    fn test_rejects_out_of_domain_values() {
        let cases: Vec<Box<dyn Fn(&mut PipelineConfig)>> = vec![
            Box::new(|c| c.window_size = 0),
            Box::new(|c| c.batch_size = 0),
            Box::new(|c| c.epochs = 0),
            Box::new(|c| c.hidden_size = 3),
            Box::new(|c| c.lr = 0.0),
            Box::new(|c| c.lr = f64::NAN),
            Box::new(|c| c.beta = -0.1),
            Box::new(|c| c.holdout_ratio = 1.0),
            Box::new(|c| c.max_grad_norm = 0.0),
            Box::new(|c| c.high_magnitude_threshold = f64::INFINITY),
        ];
        for mutate in cases {
            let mut cfg = PipelineConfig::default();
            mutate(&mut cfg);
            assert!(matches!(cfg.validate(), Err(PipelineError::InvalidConfig(_))), "{cfg:?}");
        }
    }

    #[test]
    fn test_basic_feature_set_narrows_model_input() {
        let cfg = PipelineConfig { feature_set: FeatureSet::Basic, ..Default::default() };
        assert_eq!(cfg.model_config().input_size, 22);
    }
}
