// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the raw catalogue to tensor batches.
//
//   CSV catalogue
//       │
//       ▼
//   CsvEventLoader     → parses, filters, sorts RawEvents
//       │
//       ▼
//   FeatureEngineer    → calendar, spatial, lag and rolling columns
//       │               (geo + clustering feed this step)
//       ▼
//   StandardScaler     → zero mean, unit variance per column
//       │
//       ▼
//   SequenceBuilder    → stride-1 windows with last-row labels
//       │
//       ▼
//   split_holdout      → training prefix / holdout suffix
//       │
//       ▼
//   SequenceDataset    → implements Burn's Dataset trait
//       │
//       ▼
//   SequenceBatcher    → stacks windows into [B, W, F] tensors
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads the CSV catalogue into RawEvents
pub mod loader;

/// Great-circle distance between consecutive events
pub mod geo;

/// K-means region ids over (latitude, longitude)
pub mod clustering;

/// Builds the Basic and Extended feature columns
pub mod features;

/// Per-column standardisation
pub mod scaler;

/// Sliding windows over the scaled matrix
pub mod sequence;

/// Temporal train/holdout split
pub mod splitter;

/// Implements Burn's Dataset trait for sequences
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
