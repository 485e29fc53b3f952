// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// Every checkpoint is named from the four hyperparameters that
// define a run, so differently configured runs never collide:
//
//   model_{epochs}_{lr}_{batch_size}_{window_size}
//   e.g. model_50_0P005_32_100     ('.' in the rate becomes 'P')
//
// Files per checkpoint, all in the checkpoint directory:
//   {stem}.<recorder ext>     — model weights
//   {stem}.json               — CheckpointMeta (architecture + run summary)
//   {stem}_features.json      — FittedFeatureState for inference
//
// Publishing is write-then-rename: weights are recorded under
// "{stem}_partial" and renamed over the final name once complete,
// JSON files go through a temp file persisted in the same directory.
// A reader therefore sees either the previous checkpoint or the new
// one, never a truncated file.
//
// Loading never falls back to a fresh model. A missing file is
// CheckpointMissing; metadata that disagrees with the requested
// architecture is ArchitectureMismatch.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, FileRecorder, Recorder},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use crate::data::features::FittedFeatureState;
use crate::domain::error::PipelineError;
use crate::ml::model::{MagnitudeModel, MagnitudeModelConfig};

/// Architecture and run summary stored next to the weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    pub model:            MagnitudeModelConfig,
    pub feature_count:    usize,
    pub window_size:      usize,
    pub epochs_completed: usize,
    pub final_loss:       f64,
    pub final_lr:         f64,
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create the manager, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Deterministic checkpoint stem for a run configuration
    pub fn checkpoint_name(epochs: usize, lr: f64, batch_size: usize, window_size: usize) -> String {
        let lr = format!("{lr}").replace('.', "P");
        format!("model_{epochs}_{lr}_{batch_size}_{window_size}")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Final path of the weights file for `stem`
    pub fn weights_path<B: Backend>(&self, stem: &str) -> PathBuf {
        let ext = <CompactRecorder as FileRecorder<B>>::file_extension();
        self.dir.join(format!("{stem}.{ext}"))
    }

    pub fn meta_path(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.json"))
    }

    pub fn feature_state_path(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}_features.json"))
    }

    /// Record weights and metadata, publishing each atomically.
    /// The metadata is staged before the weights are recorded and
    /// persisted straight after they are renamed into place, so the
    /// window with new weights beside old metadata is two renames wide.
    /// Returns the final weights path.
    pub fn save_model<B: Backend>(
        &self,
        stem:  &str,
        model: &MagnitudeModel<B>,
        meta:  &CheckpointMeta,
    ) -> Result<PathBuf> {
        let staged_meta = self.stage_json(meta)?;

        // The recorder appends its own extension to this path
        let partial = self.dir.join(format!("{stem}_partial"));
        CompactRecorder::new()
            .record(model.clone().into_record(), partial.clone())
            .with_context(|| format!("Failed to record checkpoint to '{}'", partial.display()))?;

        let ext = <CompactRecorder as FileRecorder<B>>::file_extension();
        let partial_file = self.dir.join(format!("{stem}_partial.{ext}"));
        let final_file   = self.weights_path::<B>(stem);
        fs::rename(&partial_file, &final_file).with_context(|| {
            format!("Cannot publish '{}' as '{}'", partial_file.display(), final_file.display())
        })?;

        let meta_path = self.meta_path(stem);
        staged_meta
            .persist(&meta_path)
            .with_context(|| format!("Cannot publish '{}'", meta_path.display()))?;
        tracing::debug!("Saved checkpoint '{}'", final_file.display());
        Ok(final_file)
    }

    /// Rebuild the model described by `expected` and load its weights.
    ///
    /// `window_size` must also match, since the feature state and
    /// cache were built for that window.
    pub fn load_model<B: Backend>(
        &self,
        stem:        &str,
        expected:    &MagnitudeModelConfig,
        window_size: usize,
        device:      &B::Device,
    ) -> Result<(MagnitudeModel<B>, CheckpointMeta)> {
        let weights = self.weights_path::<B>(stem);
        if !weights.exists() {
            return Err(PipelineError::CheckpointMissing { path: weights.display().to_string() }.into());
        }

        let meta = self.load_meta(stem)?;
        if meta.model != *expected || meta.window_size != window_size {
            return Err(PipelineError::ArchitectureMismatch {
                path:     weights.display().to_string(),
                expected: describe(expected, window_size),
                found:    describe(&meta.model, meta.window_size),
            }
            .into());
        }

        let model: MagnitudeModel<B> = meta.model.init(device);
        let record = CompactRecorder::new()
            .load(self.dir.join(stem), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", weights.display()))?;

        tracing::info!(
            "Loaded checkpoint '{}' ({} epochs, final loss {:.4})",
            weights.display(),
            meta.epochs_completed,
            meta.final_loss,
        );
        Ok((model.load_record(record), meta))
    }

    pub fn load_meta(&self, stem: &str) -> Result<CheckpointMeta> {
        self.read_json(&self.meta_path(stem))
    }

    pub fn save_feature_state(&self, stem: &str, state: &FittedFeatureState) -> Result<()> {
        self.write_json_atomic(&self.feature_state_path(stem), state)
    }

    pub fn load_feature_state(&self, stem: &str) -> Result<FittedFeatureState> {
        self.read_json(&self.feature_state_path(stem))
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        if !path.exists() {
            return Err(PipelineError::CheckpointMissing { path: path.display().to_string() }.into());
        }
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Cannot parse '{}'", path.display()))
    }

    /// Serialized `value` in a temp file beside its final destination
    fn stage_json<T: Serialize>(&self, value: &T) -> Result<tempfile::NamedTempFile> {
        let json = serde_json::to_string_pretty(value)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("Cannot create temp file in '{}'", self.dir.display()))?;
        tmp.write_all(json.as_bytes())?;
        Ok(tmp)
    }

    fn write_json_atomic<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        self.stage_json(value)?
            .persist(path)
            .with_context(|| format!("Cannot publish '{}'", path.display()))?;
        Ok(())
    }
}

fn describe(cfg: &MagnitudeModelConfig, window_size: usize) -> String {
    format!(
        "input_size={} hidden_size={} variant={} heads={} window_size={}",
        cfg.input_size, cfg.hidden_size, cfg.variant, cfg.num_heads, window_size,
    )
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::ModelVariant;
    use burn::backend::NdArray;

    type B = NdArray;

    fn meta(cfg: MagnitudeModelConfig, window_size: usize) -> CheckpointMeta {
        CheckpointMeta {
            feature_count: cfg.input_size,
            model: cfg,
            window_size,
            epochs_completed: 1,
            final_loss: 0.5,
            final_lr: 0.005,
        }
    }

    #[test]
    fn test_name_is_deterministic() {
        let a = CheckpointManager::checkpoint_name(50, 0.005, 32, 100);
        assert_eq!(a, "model_50_0P005_32_100");
        assert_eq!(a, CheckpointManager::checkpoint_name(50, 0.005, 32, 100));
    }

    #[test]
    fn test_name_changes_with_each_field() {
        let base = CheckpointManager::checkpoint_name(50, 0.005, 32, 100);
        assert_ne!(base, CheckpointManager::checkpoint_name(51, 0.005, 32, 100));
        assert_ne!(base, CheckpointManager::checkpoint_name(50, 0.001, 32, 100));
        assert_ne!(base, CheckpointManager::checkpoint_name(50, 0.005, 64, 100));
        assert_ne!(base, CheckpointManager::checkpoint_name(50, 0.005, 32, 50));
    }

    #[test]
    fn test_missing_checkpoint_is_explicit() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path()).unwrap();
        let cfg = MagnitudeModelConfig::new(3, 4, ModelVariant::Shallow);
        let err = mgr.load_model::<B>("model_1_0P1_2_3", &cfg, 3, &Default::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::CheckpointMissing { .. })
        ));
    }

    #[test]
    fn test_save_then_load_and_mismatch() {
        let dir    = tempfile::tempdir().unwrap();
        let mgr    = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();
        let cfg    = MagnitudeModelConfig::new(3, 4, ModelVariant::Shallow);
        let model: MagnitudeModel<B> = cfg.init(&device);

        let path = mgr.save_model("run", &model, &meta(cfg.clone(), 5)).unwrap();
        assert!(path.exists());
        assert!(!fs::read_dir(dir.path()).unwrap().any(|e| {
            e.unwrap().file_name().to_string_lossy().contains("_partial")
        }));

        let (_, loaded_meta) = mgr.load_model::<B>("run", &cfg, 5, &device).unwrap();
        assert_eq!(loaded_meta, meta(cfg.clone(), 5));

        let other = MagnitudeModelConfig::new(3, 8, ModelVariant::Shallow);
        let err = mgr.load_model::<B>("run", &other, 5, &device).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::ArchitectureMismatch { .. })
        ));

        let err = mgr.load_model::<B>("run", &cfg, 6, &device).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::ArchitectureMismatch { .. })
        ));
    }

    #[test]
    fn test_resave_publishes_matching_meta_and_no_leftovers() {
        let dir    = tempfile::tempdir().unwrap();
        let mgr    = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();
        let cfg    = MagnitudeModelConfig::new(3, 4, ModelVariant::Shallow);
        let model: MagnitudeModel<B> = cfg.init(&device);

        mgr.save_model("run", &model, &meta(cfg.clone(), 5)).unwrap();
        let second = CheckpointMeta { epochs_completed: 2, final_loss: 0.25, ..meta(cfg.clone(), 5) };
        mgr.save_model("run", &model, &second).unwrap();

        assert_eq!(mgr.load_meta("run").unwrap(), second);
        // Only the weights and their metadata remain
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }
}
