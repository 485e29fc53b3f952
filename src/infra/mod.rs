// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Filesystem artefacts shared by training, evaluation and
// prediction:
//
//   checkpoint.rs      — model weights + architecture metadata +
//                        fitted feature state, published atomically
//
//   sequence_cache.rs  — content-keyed cache of the scaled feature
//                        matrix so repeated runs skip re-derivation
//
//   metrics.rs         — per-epoch training CSV and the JSON
//                        regression summaries written by evaluation
//
// Reference: Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Content-addressed sequence cache
pub mod sequence_cache;

/// Training log and evaluation metric records
pub mod metrics;
