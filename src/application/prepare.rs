// ============================================================
// Layer 2 — Sequence Preparation
// ============================================================
// Shared first half of training and evaluation:
//
//   Step 1: Read the catalogue bytes         (Layer 4 - data)
//   Step 2: Look up the sequence cache       (Layer 6 - infra)
//   Step 3: On a miss, parse + engineer +
//           scale features and cache them    (Layer 4 - data)
//   Step 4: Slide windows over the matrix    (Layer 4 - data)
//   Step 5: Split off the temporal holdout   (Layer 4 - data)
//
// Training and evaluation both call this with the same config and
// therefore see the same split.

use anyhow::{Context, Result};

use crate::application::config::PipelineConfig;
use crate::data::{
    features::{FeatureEngineer, FittedFeatureState},
    loader::{log_drops, parse_events, CsvEventLoader},
    sequence::{SequenceBuilder, SequenceSet},
    splitter::split_holdout,
};
use crate::domain::error::PipelineError;
use crate::infra::sequence_cache::{cache_key, CacheStatus, CachedSequences, SequenceCache};

pub struct PreparedData {
    pub sequences:    SequenceSet,
    pub train:        SequenceSet,
    pub holdout:      SequenceSet,
    pub state:        FittedFeatureState,
    pub cache_status: CacheStatus,
}

pub fn prepare_sequences(cfg: &PipelineConfig) -> Result<PreparedData> {
    // ── Step 1: Dataset identity ──────────────────────────────────────────────
    let loader = CsvEventLoader::new(&cfg.data_path);
    let bytes  = loader.read_bytes()?;
    let key    = cache_key(&bytes, cfg.window_size, cfg.feature_set, cfg.seed);

    // ── Steps 2–3: Cached or freshly engineered features ──────────────────────
    let cache = SequenceCache::new(&cfg.cache_dir);
    let (cached, cache_status) = cache.load_or_build(&key, || {
        tracing::info!("Engineering '{}' features from '{}'", cfg.feature_set, cfg.data_path.display());
        let (events, dropped) = parse_events(bytes.as_slice())
            .with_context(|| format!("Cannot parse dataset '{}'", cfg.data_path.display()))?;
        log_drops(&dropped, events.len());

        // Checked before caching so an unusable artefact is never stored
        if events.len() < cfg.window_size {
            return Err(PipelineError::InsufficientData {
                rows:        events.len(),
                window_size: cfg.window_size,
            }
            .into());
        }

        let engineered = FeatureEngineer::new(cfg.feature_set, cfg.seed).fit(&events)?;
        Ok(CachedSequences {
            key:         key.clone(),
            window_size: cfg.window_size,
            feature_set: cfg.feature_set,
            features:    engineered.features,
            labels:      engineered.labels,
            state:       engineered.state,
        })
    })?;

    // ── Step 4: Windows ───────────────────────────────────────────────────────
    let sequences = SequenceBuilder::new(cfg.window_size).build(&cached.features, &cached.labels)?;

    // ── Step 5: Temporal holdout ──────────────────────────────────────────────
    let (train, holdout) = split_holdout(&sequences, cfg.holdout_ratio);
    tracing::info!(
        "{} sequences: {} training, {} holdout",
        sequences.len(),
        train.len(),
        holdout.len(),
    );

    Ok(PreparedData { sequences, train, holdout, state: cached.state, cache_status })
}
