// ============================================================
// Layer 3 — Pipeline Errors
// ============================================================
// Conditions a caller must be able to tell apart. Everything else
// travels as anyhow context; these are downcastable.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A configuration value is outside its valid domain
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Fewer usable rows than one window needs
    #[error("insufficient data: {rows} usable rows but window_size is {window_size}")]
    InsufficientData { rows: usize, window_size: usize },

    /// Two inputs that must agree in length or width do not
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// No checkpoint exists where the configuration says it should
    #[error("checkpoint not found at '{path}'. Train with the same epochs/lr/batch_size/window_size first")]
    CheckpointMissing { path: String },

    /// A checkpoint exists but was trained with a different architecture
    #[error("checkpoint '{path}' does not match the current configuration: expected {expected}, found {found}")]
    ArchitectureMismatch { path: String, expected: String, found: String },

    /// The loss diverged; training never continues past this
    #[error("non-finite loss {value} at epoch {epoch}, batch {batch}")]
    NonFiniteLoss { epoch: usize, batch: usize, value: f64 },
}
