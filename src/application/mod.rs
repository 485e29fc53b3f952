// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers; holds no model math and does no
// printing of its own.
//
//   config.rs             — PipelineConfig, injected everywhere
//   prepare.rs            — catalogue → cached features → windows → split
//   train_use_case.rs     — train on the chronological head
//   evaluate_use_case.rs  — score the holdout tail, write metrics
//   predict_use_case.rs   — serve one prediction from recent events
//
// Reference: Clean Architecture pattern

/// Typed run configuration
pub mod config;

/// Sequence preparation shared by training and evaluation
pub mod prepare;

/// The training workflow
pub mod train_use_case;

/// The holdout evaluation workflow
pub mod evaluate_use_case;

/// The single-prediction serving workflow
pub mod predict_use_case;

// ─── End-to-End Tests ─────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use std::fmt::Write as _;
    use std::fs;
    use std::path::Path;

    use burn::backend::{Autodiff, NdArray};

    use super::config::PipelineConfig;
    use super::evaluate_use_case::{EvaluateUseCase, HIGH_MAG_METRICS_FILE, OVERALL_METRICS_FILE};
    use super::predict_use_case::PredictUseCase;
    use super::prepare::prepare_sequences;
    use super::train_use_case::TrainUseCase;
    use crate::domain::error::PipelineError;
    use crate::infra::metrics::TRAINING_LOG_FILE;
    use crate::infra::sequence_cache::CacheStatus;
    use crate::ml::loss::LossKind;
    use crate::ml::model::ModelVariant;

    /// `rows` events one hour apart starting 2000-01-01 00:00:00
    fn write_catalogue(path: &Path, rows: usize) {
        let mut csv = String::from("Date,Time,Latitude,Longitude,Type,Depth,Magnitude\n");
        for i in 0..rows {
            let day  = 1 + i / 24;
            let hour = i % 24;
            writeln!(
                csv,
                "01/{day:02}/2000,{hour:02}:00:00,{:.2},{:.2},Earthquake,{:.1},{:.1}",
                10.0 + (i % 10) as f64 * 0.5,
                20.0 + (i % 7) as f64 * 0.3,
                10.0 + (i % 5) as f64,
                5.0 + (i % 7) as f64 * 0.3,
            )
            .unwrap();
        }
        fs::write(path, csv).unwrap();
    }

    fn config(dir: &Path) -> PipelineConfig {
        PipelineConfig {
            data_path:      dir.join("catalogue.csv"),
            cache_dir:      dir.join("cache"),
            checkpoint_dir: dir.join("model"),
            results_dir:    dir.join("results"),
            window_size:    50,
            hidden_size:    4,
            variant:        ModelVariant::Shallow,
            epochs:         1,
            batch_size:     16,
            ..Default::default()
        }
    }

    #[test]
    fn test_prepare_windows_split_and_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        write_catalogue(&cfg.data_path, 120);

        let first = prepare_sequences(&cfg).unwrap();
        assert_eq!(first.sequences.len(), 71);
        assert_eq!(first.train.len(), 50);
        assert_eq!(first.holdout.len(), 21);
        assert_eq!(first.cache_status, CacheStatus::Miss);

        let second = prepare_sequences(&cfg).unwrap();
        assert_eq!(second.cache_status, CacheStatus::Hit);
        assert_eq!(second.state, first.state);

        // A different window must not reuse the cached build
        let narrow = PipelineConfig { window_size: 40, ..cfg };
        let third  = prepare_sequences(&narrow).unwrap();
        assert_eq!(third.cache_status, CacheStatus::Miss);
        assert_eq!(third.sequences.len(), 81);
    }

    #[test]
    fn test_train_evaluate_predict_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        write_catalogue(&cfg.data_path, 120);

        let summary = TrainUseCase::new(cfg.clone())
            .execute_on::<Autodiff<NdArray>>(Default::default())
            .unwrap();
        assert_eq!(summary.epochs_completed, 1);
        assert!(summary.final_loss.is_finite());
        assert!(summary.checkpoint.exists());

        let log = fs::read_to_string(cfg.run_results_dir().join(TRAINING_LOG_FILE)).unwrap();
        assert_eq!(log.lines().count(), 2);

        let report = EvaluateUseCase::new(cfg.clone())
            .execute_on::<NdArray>(Default::default())
            .unwrap();
        assert_eq!(report.overall.sample_count, 21);
        for metric in [
            report.overall.mean_absolute_error,
            report.overall.mean_squared_error,
            report.overall.root_mean_squared_error,
            report.overall.magnitude_aware_loss,
        ] {
            assert!(metric.unwrap().is_finite());
        }
        assert!(report.high_magnitude.sample_count > 0);
        assert!(cfg.run_results_dir().join(OVERALL_METRICS_FILE).exists());
        assert!(cfg.run_results_dir().join(HIGH_MAG_METRICS_FILE).exists());

        let magnitude = PredictUseCase::new(cfg.clone(), &cfg.data_path)
            .execute_on::<NdArray>(Default::default())
            .unwrap();
        assert!(magnitude.is_finite());
    }

    #[test]
    fn test_exponential_loss_end_to_end_stays_finite() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = PipelineConfig { loss: LossKind::Exponential, ..config(dir.path()) };
        write_catalogue(&cfg.data_path, 120);

        let summary = TrainUseCase::new(cfg.clone())
            .execute_on::<Autodiff<NdArray>>(Default::default())
            .unwrap();
        assert!(summary.final_loss.is_finite());

        let report = EvaluateUseCase::new(cfg)
            .execute_on::<NdArray>(Default::default())
            .unwrap();
        assert!(report.overall.magnitude_aware_loss.unwrap().is_finite());
    }

    #[test]
    fn test_evaluate_without_checkpoint_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        write_catalogue(&cfg.data_path, 120);

        let err = EvaluateUseCase::new(cfg)
            .execute_on::<NdArray>(Default::default())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::CheckpointMissing { .. })
        ));
    }

    #[test]
    fn test_too_few_rows_is_insufficient_data() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        write_catalogue(&cfg.data_path, 30);

        let err = prepare_sequences(&cfg).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::InsufficientData { rows: 30, window_size: 50 })
        ));
        assert!(!cfg.cache_dir.exists() || fs::read_dir(&cfg.cache_dir).unwrap().next().is_none());
    }

    #[test]
    fn test_invalid_config_rejected_before_any_work() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = PipelineConfig { lr: -1.0, ..config(dir.path()) };
        let err = TrainUseCase::new(cfg)
            .execute_on::<Autodiff<NdArray>>(Default::default())
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::InvalidConfig(_))));
    }
}
