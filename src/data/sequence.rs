// ============================================================
// Layer 4 — Sequence Builder
// ============================================================
// Slides a window of `window_size` rows over the scaled feature
// matrix with stride 1. Window i covers rows [i, i + W) and its
// label is the magnitude at row i + W - 1.
//
// Example with N = 5 rows, W = 3:
//   Window 0: rows 0 1 2  → label[2]
//   Window 1: rows 1 2 3  → label[3]
//   Window 2: rows 2 3 4  → label[4]
//   N - W + 1 = 3 windows
//
// Windows are views: the matrix is stored once and each window is
// copied out only when the DataLoader asks for it. A SequenceSet
// can be narrowed to a contiguous range of windows without copying,
// which is how the temporal holdout split works.

use std::ops::Range;
use std::sync::Arc;

use crate::domain::error::PipelineError;
use crate::domain::feature::FeatureMatrix;

/// One supervised example: `window_size` feature rows and a label
#[derive(Debug, Clone)]
pub struct Sequence {
    /// Row-major, `window_size * feature_count` values
    pub features:      Vec<f32>,
    pub window_size:   usize,
    pub feature_count: usize,
    pub label:         f32,
}

pub struct SequenceBuilder {
    window_size: usize,
}

impl SequenceBuilder {
    pub fn new(window_size: usize) -> Self {
        Self { window_size }
    }

    /// Build every stride-1 window over `matrix`.
    ///
    /// Fails with InsufficientData when the matrix has fewer rows than
    /// one window. Never returns an empty set.
    pub fn build(&self, matrix: &FeatureMatrix, labels: &[f32]) -> Result<SequenceSet, PipelineError> {
        if self.window_size == 0 {
            return Err(PipelineError::InvalidConfig("window_size must be at least 1".into()));
        }
        if labels.len() != matrix.len() {
            return Err(PipelineError::ShapeMismatch(format!(
                "{} feature rows but {} labels",
                matrix.len(),
                labels.len()
            )));
        }

        let rows = matrix.len();
        if rows < self.window_size {
            return Err(PipelineError::InsufficientData { rows, window_size: self.window_size });
        }

        let features: Vec<f32> = matrix.values().iter().map(|v| *v as f32).collect();
        let count = rows - self.window_size + 1;
        tracing::info!("Built {} sequences of window {}", count, self.window_size);

        Ok(SequenceSet {
            features:      Arc::new(features),
            labels:        Arc::new(labels.to_vec()),
            feature_count: matrix.feature_count(),
            window_size:   self.window_size,
            offset:        0,
            len:           count,
        })
    }
}

/// A contiguous run of windows over a shared feature buffer
#[derive(Debug, Clone)]
pub struct SequenceSet {
    features:      Arc<Vec<f32>>,
    labels:        Arc<Vec<f32>>,
    feature_count: usize,
    window_size:   usize,
    /// Index of this view's first window in the full set
    offset:        usize,
    len:           usize,
}

impl SequenceSet {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    /// Label of window `index`: the magnitude at the window's last row
    pub fn label(&self, index: usize) -> Option<f32> {
        if index >= self.len {
            return None;
        }
        let last_row = self.offset + index + self.window_size - 1;
        self.labels.get(last_row).copied()
    }

    pub fn labels(&self) -> Vec<f32> {
        (0..self.len).filter_map(|i| self.label(i)).collect()
    }

    pub fn get(&self, index: usize) -> Option<Sequence> {
        let label = self.label(index)?;
        let start = (self.offset + index) * self.feature_count;
        let end   = start + self.window_size * self.feature_count;
        Some(Sequence {
            features:      self.features[start..end].to_vec(),
            window_size:   self.window_size,
            feature_count: self.feature_count,
            label,
        })
    }

    /// Narrow to windows `range` of this view, clamped to its length
    pub fn slice(&self, range: Range<usize>) -> SequenceSet {
        let start = range.start.min(self.len);
        let end   = range.end.clamp(start, self.len);
        SequenceSet {
            features:      Arc::clone(&self.features),
            labels:        Arc::clone(&self.labels),
            feature_count: self.feature_count,
            window_size:   self.window_size,
            offset:        self.offset + start,
            len:           end - start,
        }
    }
}
