// ============================================================
// Layer 4 — Standard Scaler
// ============================================================
// Per-column standardisation: (x - mean) / scale, where scale is
// the population standard deviation. A constant column gets
// scale 1 so it maps to all zeros rather than NaN.
//
// The fitted parameters are part of the trained artefact: they are
// cached with the sequences and saved next to the checkpoint, so
// inference never re-fits on different data.

use serde::{Deserialize, Serialize};

use crate::domain::error::PipelineError;
use crate::domain::feature::FeatureMatrix;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means:  Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Fit column means and scales on every row of `matrix`
    pub fn fit(matrix: &FeatureMatrix) -> Self {
        let w = matrix.feature_count();
        let n = matrix.len();
        let mut means  = vec![0.0; w];
        let mut scales = vec![1.0; w];

        if n == 0 {
            return Self { means, scales };
        }

        for r in 0..n {
            for (m, v) in means.iter_mut().zip(matrix.row(r)) {
                *m += v;
            }
        }
        means.iter_mut().for_each(|m| *m /= n as f64);

        let mut var = vec![0.0; w];
        for r in 0..n {
            for ((acc, v), m) in var.iter_mut().zip(matrix.row(r)).zip(&means) {
                *acc += (v - m) * (v - m);
            }
        }
        for (s, v) in scales.iter_mut().zip(var) {
            let std = (v / n as f64).sqrt();
            *s = if std > f64::EPSILON { std } else { 1.0 };
        }

        Self { means, scales }
    }

    /// Apply the fitted transform. The matrix must have the fitted width.
    pub fn transform(&self, matrix: &FeatureMatrix) -> Result<FeatureMatrix, PipelineError> {
        let w = matrix.feature_count();
        if w != self.means.len() {
            return Err(PipelineError::ShapeMismatch(format!(
                "scaler was fitted on {} columns, got {}",
                self.means.len(),
                w
            )));
        }

        let values = matrix
            .values()
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let j = i % w;
                (v - self.means[j]) / self.scales[j]
            })
            .collect();
        Ok(FeatureMatrix::new(matrix.columns().to_vec(), values))
    }

    pub fn feature_count(&self) -> usize {
        self.means.len()
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FeatureMatrix {
        FeatureMatrix::from_columns(
            &["a", "b", "c"],
            &[vec![1.0, 2.0, 3.0, 4.0], vec![10.0, 10.0, 10.0, 10.0], vec![-5.0, 5.0, -5.0, 5.0]],
        )
    }

    #[test]
    fn test_zero_mean_unit_variance() {
        let m = sample();
        let scaled = StandardScaler::fit(&m).transform(&m).unwrap();
        for j in [0, 2] {
            let col = scaled.column(j);
            let mean: f64 = col.iter().sum::<f64>() / col.len() as f64;
            let var: f64 = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / col.len() as f64;
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let m = sample();
        let scaler = StandardScaler::fit(&m);
        assert_eq!(scaler.scales()[1], 1.0);
        let scaled = scaler.transform(&m).unwrap();
        assert!(scaled.column(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let scaler = StandardScaler::fit(&sample());
        let narrow = FeatureMatrix::from_columns(&["a"], &[vec![1.0]]);
        assert!(matches!(scaler.transform(&narrow), Err(PipelineError::ShapeMismatch(_))));
    }
}
