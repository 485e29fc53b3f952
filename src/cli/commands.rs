// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Four subcommands share one set of pipeline flags:
//
//   train     — fit on the chronological head, publish a checkpoint
//   evaluate  — score the holdout tail with that checkpoint
//   run       — train then evaluate
//   predict   — one magnitude from a CSV of recent events
//
// The checkpoint is found by name from --epochs, --lr, --batch-size
// and --window-size, so evaluate and predict must be given the same
// values train was.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::config::PipelineConfig;
use crate::domain::feature::FeatureSet;
use crate::ml::loss::LossKind;
use crate::ml::model::ModelVariant;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the magnitude model on the catalogue
    Train(PipelineArgs),

    /// Evaluate a trained checkpoint on the holdout tail
    Evaluate(PipelineArgs),

    /// Train, then evaluate the resulting checkpoint
    Run(PipelineArgs),

    /// Predict the next magnitude from recent events
    Predict(PredictArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    /// Earthquake catalogue CSV (Date, Time, Latitude, Longitude, [Depth,] Magnitude)
    #[arg(long, default_value = "data/database.csv")]
    pub data_path: PathBuf,

    /// Directory for cached feature matrices
    #[arg(long, default_value = "data")]
    pub cache_dir: PathBuf,

    /// Directory for model checkpoints
    #[arg(long, default_value = "model/modelfile")]
    pub checkpoint_dir: PathBuf,

    /// Directory for training logs and metric records
    #[arg(long, default_value = "results")]
    pub results_dir: PathBuf,

    /// Feature columns: basic or extended
    #[arg(long, default_value = "extended")]
    pub feature_set: FeatureSet,

    /// Consecutive events per input sequence
    #[arg(long, default_value_t = 100)]
    pub window_size: usize,

    /// BiLSTM hidden size per direction; 2 * hidden must be divisible by 4
    #[arg(long, default_value_t = 128)]
    pub hidden_size: usize,

    /// Architecture: shallow or deep
    #[arg(long, default_value = "deep")]
    pub variant: ModelVariant,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 50)]
    pub epochs: usize,

    /// Initial learning rate
    #[arg(long, default_value_t = 0.005)]
    pub lr: f64,

    /// Sequences per mini-batch
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Loss: linear-weighted or exponential
    #[arg(long, default_value = "linear-weighted")]
    pub loss: LossKind,

    /// Weight slope of the linear-weighted loss
    #[arg(long, default_value_t = 0.5)]
    pub beta: f64,

    /// Fraction of the most recent sequences held out for evaluation
    #[arg(long, default_value_t = 0.3)]
    pub holdout_ratio: f64,

    /// Flat epochs tolerated before the learning rate is cut
    #[arg(long, default_value_t = 5)]
    pub patience: usize,

    /// Gradient L2-norm ceiling
    #[arg(long, default_value_t = 1.0)]
    pub max_grad_norm: f64,

    /// Publish the checkpoint after every epoch, not only at the end
    #[arg(long)]
    pub checkpoint_every_epoch: bool,

    /// Magnitude above which an event counts as high-magnitude
    #[arg(long, default_value_t = 6.5)]
    pub high_magnitude_threshold: f64,

    /// Seed for region clustering and batch shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Boundary between Layer 1 and Layer 2: the application layer never
/// sees clap types.
impl From<PipelineArgs> for PipelineConfig {
    fn from(a: PipelineArgs) -> Self {
        PipelineConfig {
            data_path:      a.data_path,
            cache_dir:      a.cache_dir,
            checkpoint_dir: a.checkpoint_dir,
            results_dir:    a.results_dir,
            feature_set:    a.feature_set,
            window_size:    a.window_size,
            hidden_size:    a.hidden_size,
            variant:        a.variant,
            epochs:         a.epochs,
            lr:             a.lr,
            batch_size:     a.batch_size,
            loss:           a.loss,
            beta:           a.beta,
            holdout_ratio:  a.holdout_ratio,
            patience:       a.patience,
            max_grad_norm:  a.max_grad_norm,
            checkpoint_every_epoch:   a.checkpoint_every_epoch,
            high_magnitude_threshold: a.high_magnitude_threshold,
            seed:           a.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// CSV of recent events, at least window-size rows after filtering
    #[arg(long)]
    pub events: PathBuf,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}
