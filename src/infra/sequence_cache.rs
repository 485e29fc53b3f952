// ============================================================
// Layer 6 — Sequence Cache
// ============================================================
// Persists the scaled feature matrix, labels and fitted feature
// state so repeated runs skip feature engineering. Windows are not
// stored: they are cheap views over the matrix.
//
// Cache identity:
//   key  = sha256(SCHEMA_VERSION, window_size, feature_set, seed, dataset bytes)
//   file = <cache_dir>/sequences_<first 16 hex chars of key>.bin
//
// The full key is stored inside the artefact and compared on load,
// so a prefix collision, a changed dataset or a different window
// can never serve stale sequences. A corrupt or mismatched file is
// treated as a miss and rebuilt.
//
// Writes go through a temp file in the cache directory and are
// persisted (renamed) only once fully written.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::data::features::FittedFeatureState;
use crate::domain::feature::{FeatureMatrix, FeatureSet};

/// Bump when the cached layout or any feature definition changes
pub const SCHEMA_VERSION: u32 = 1;

/// Hex SHA-256 identifying one (dataset, window, feature set, seed) build.
/// The seed matters because it fixes the region clustering.
pub fn cache_key(dataset: &[u8], window_size: usize, feature_set: FeatureSet, seed: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(SCHEMA_VERSION.to_le_bytes());
    hasher.update((window_size as u64).to_le_bytes());
    hasher.update(feature_set.name().as_bytes());
    hasher.update([0u8]);
    hasher.update(seed.to_le_bytes());
    hasher.update(dataset);
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSequences {
    pub key:         String,
    pub window_size: usize,
    pub feature_set: FeatureSet,
    /// Scaled features, one row per event
    pub features:    FeatureMatrix,
    pub labels:      Vec<f32>,
    pub state:       FittedFeatureState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

pub struct SequenceCache {
    dir: PathBuf,
}

impl SequenceCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let short = &key[..key.len().min(16)];
        self.dir.join(format!("sequences_{short}.bin"))
    }

    /// Return the cached artefact for `key`, or run `build`, store its
    /// result and return that.
    pub fn load_or_build<F>(&self, key: &str, build: F) -> Result<(CachedSequences, CacheStatus)>
    where
        F: FnOnce() -> Result<CachedSequences>,
    {
        let path = self.path_for(key);
        if path.exists() {
            match read_artifact(&path) {
                Ok(cached) if cached.key == key => {
                    tracing::info!("Loaded cached sequences from '{}'", path.display());
                    return Ok((cached, CacheStatus::Hit));
                }
                Ok(_) => tracing::warn!("Cache '{}' belongs to another build, rebuilding", path.display()),
                Err(e) => tracing::warn!("Cache '{}' is unreadable ({e:#}), rebuilding", path.display()),
            }
        }

        let built = build()?;
        self.store(&path, &built)?;
        Ok((built, CacheStatus::Miss))
    }

    fn store(&self, path: &Path, artifact: &CachedSequences) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create cache directory '{}'", self.dir.display()))?;

        let tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("Cannot create temp file in '{}'", self.dir.display()))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            bincode::serialize_into(&mut writer, artifact).context("Cannot serialise sequences")?;
            writer.flush()?;
        }
        tmp.persist(path)
            .with_context(|| format!("Cannot publish cache '{}'", path.display()))?;

        tracing::debug!("Cached sequences to '{}'", path.display());
        Ok(())
    }
}

fn read_artifact(path: &Path) -> Result<CachedSequences> {
    let file = File::open(path)?;
    Ok(bincode::deserialize_from(BufReader::new(file))?)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::clustering::RegionClusters;
    use crate::data::scaler::StandardScaler;
    use std::cell::Cell;

    fn artifact(key: &str, window_size: usize) -> CachedSequences {
        let features = FeatureMatrix::from_columns(&["a", "b"], &[vec![1.0, 2.0, 3.0], vec![0.5, 0.5, 0.5]]);
        CachedSequences {
            key: key.to_string(),
            window_size,
            feature_set: FeatureSet::Basic,
            state: FittedFeatureState {
                feature_set:    FeatureSet::Basic,
                regions:        RegionClusters::fit(&[[1.0, 2.0], [3.0, 4.0]], 2, 42),
                mean_magnitude: 5.5,
                scaler:         StandardScaler::fit(&features),
            },
            features,
            labels: vec![5.0, 5.5, 6.0],
        }
    }

    #[test]
    fn test_second_call_is_a_hit() {
        let dir   = tempfile::tempdir().unwrap();
        let cache = SequenceCache::new(dir.path());
        let key   = cache_key(b"rows", 3, FeatureSet::Basic, 42);
        let builds = Cell::new(0);

        let (first, status) = cache
            .load_or_build(&key, || { builds.set(builds.get() + 1); Ok(artifact(&key, 3)) })
            .unwrap();
        assert_eq!(status, CacheStatus::Miss);

        let (second, status) = cache
            .load_or_build(&key, || { builds.set(builds.get() + 1); Ok(artifact(&key, 3)) })
            .unwrap();
        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(builds.get(), 1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_key_depends_on_every_input() {
        let base = cache_key(b"rows", 50, FeatureSet::Extended, 42);
        assert_eq!(base, cache_key(b"rows", 50, FeatureSet::Extended, 42));
        assert_ne!(base, cache_key(b"rows", 100, FeatureSet::Extended, 42));
        assert_ne!(base, cache_key(b"rows", 50, FeatureSet::Basic, 42));
        assert_ne!(base, cache_key(b"rows2", 50, FeatureSet::Extended, 42));
        assert_ne!(base, cache_key(b"rows", 50, FeatureSet::Extended, 7));
        assert_eq!(base.len(), 64);
    }

    #[test]
    fn test_mismatched_key_rebuilds() {
        let dir   = tempfile::tempdir().unwrap();
        let cache = SequenceCache::new(dir.path());
        let key   = cache_key(b"rows", 3, FeatureSet::Basic, 42);

        // Same filename as `key`, different stored key
        let path = cache.path_for(&key);
        cache.store(&path, &artifact("stale", 3)).unwrap();

        let (got, status) = cache.load_or_build(&key, || Ok(artifact(&key, 3))).unwrap();
        assert_eq!(status, CacheStatus::Miss);
        assert_eq!(got.key, key);
    }

    #[test]
    fn test_corrupt_file_rebuilds() {
        let dir   = tempfile::tempdir().unwrap();
        let cache = SequenceCache::new(dir.path());
        let key   = cache_key(b"rows", 3, FeatureSet::Basic, 42);
        fs::write(cache.path_for(&key), b"not bincode").unwrap();

        let (_, status) = cache.load_or_build(&key, || Ok(artifact(&key, 3))).unwrap();
        assert_eq!(status, CacheStatus::Miss);
    }
}
