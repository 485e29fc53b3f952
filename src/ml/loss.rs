// ============================================================
// Layer 5 — Magnitude-Aware Losses
// ============================================================
// Two regression losses that weigh errors on large events more
// heavily than plain MSE. Both reduce to a batch mean.
//
//   LinearWeighted (default):
//     w    = max(0, 1 + β · target)
//     loss = mean(w · (pred − target)²)
//
//   Exponential:
//     d    = min(|pred − target|, MAX_PENALTY_DIFF)
//     loss = mean(d · (e^d − 1) · ln(|target| + 1))
//
// Guards:
//   - the linear weight is clamped at 0, so β · target < −1 can
//     never turn the loss negative
//   - the exponential term caps d before exp(), so one wild
//     prediction cannot overflow f32 and poison the batch mean
//   - ln is taken of |target| + 1 ≥ 1, never of a non-positive value
//
// Both are 0 whenever pred == target.
//
// Reference: Burn Book §3 (Tensor operations)

use std::fmt;
use std::str::FromStr;

use burn::prelude::*;
use serde::{Deserialize, Serialize};

/// Error beyond which the exponential penalty stops growing.
/// At d = 10 the per-sample term is already ~2.2e5 · ln(|t| + 1).
pub const MAX_PENALTY_DIFF: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LossKind {
    LinearWeighted,
    Exponential,
}

impl fmt::Display for LossKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LossKind::LinearWeighted => f.write_str("linear-weighted"),
            LossKind::Exponential    => f.write_str("exponential"),
        }
    }
}

impl FromStr for LossKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linear-weighted" | "linear" => Ok(LossKind::LinearWeighted),
            "exponential" | "exp"        => Ok(LossKind::Exponential),
            other => Err(format!(
                "unknown loss '{other}' (expected linear-weighted or exponential)"
            )),
        }
    }
}

/// A configured loss. `beta` only affects LinearWeighted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnitudeLoss {
    pub kind: LossKind,
    pub beta: f32,
}

impl MagnitudeLoss {
    pub fn new(kind: LossKind, beta: f32) -> Self {
        Self { kind, beta }
    }

    /// Batch loss on tensors. `predictions` and `targets` are both [batch].
    pub fn forward<B: Backend>(&self, predictions: Tensor<B, 1>, targets: Tensor<B, 1>) -> Tensor<B, 1> {
        let diff = predictions - targets.clone();
        match self.kind {
            LossKind::LinearWeighted => {
                let weight = targets.mul_scalar(self.beta).add_scalar(1.0).clamp_min(0.0);
                (weight * diff.powf_scalar(2.0)).mean()
            }
            LossKind::Exponential => {
                let d     = diff.abs().clamp_max(MAX_PENALTY_DIFF);
                let scale = targets.abs().add_scalar(1.0).log();
                (d.clone() * d.exp().sub_scalar(1.0) * scale).mean()
            }
        }
    }

    /// The same loss over host-side slices, used for evaluation metrics.
    /// Returns None for empty input.
    pub fn evaluate(&self, predictions: &[f32], targets: &[f32]) -> Option<f64> {
        if predictions.is_empty() || predictions.len() != targets.len() {
            return None;
        }
        let total: f64 = predictions
            .iter()
            .zip(targets)
            .map(|(&p, &t)| self.sample(p as f64, t as f64))
            .sum();
        Some(total / predictions.len() as f64)
    }

    fn sample(&self, pred: f64, target: f64) -> f64 {
        let diff = pred - target;
        match self.kind {
            LossKind::LinearWeighted => {
                let weight = (1.0 + self.beta as f64 * target).max(0.0);
                weight * diff * diff
            }
            LossKind::Exponential => {
                let d = diff.abs().min(MAX_PENALTY_DIFF as f64);
                d * (d.exp() - 1.0) * (target.abs() + 1.0).ln()
            }
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    type B = NdArray;

    fn tensor(values: &[f32]) -> Tensor<B, 1> {
        Tensor::from_data(TensorData::new(values.to_vec(), [values.len()]), &Default::default())
    }

    fn scalar(t: Tensor<B, 1>) -> f32 {
        t.into_data().convert::<f32>().to_vec::<f32>().unwrap()[0]
    }

    #[test]
    fn test_zero_when_prediction_equals_target() {
        let values = [4.5, 5.0, 6.8, 7.2];
        for beta in [0.0, 0.5, 3.0] {
            let lin = MagnitudeLoss::new(LossKind::LinearWeighted, beta);
            assert_eq!(scalar(lin.forward(tensor(&values), tensor(&values))), 0.0);
            assert_eq!(lin.evaluate(&values, &values), Some(0.0));
        }
        let exp = MagnitudeLoss::new(LossKind::Exponential, 0.0);
        assert_eq!(scalar(exp.forward(tensor(&values), tensor(&values))), 0.0);
        assert_eq!(exp.evaluate(&values, &values), Some(0.0));
    }

    #[test]
    fn test_linear_weighted_value() {
        // w = 1 + 0.5 * 6 = 4, err² = 1 → 4; w = 1 + 0.5 * 2 = 2, err² = 4 → 8
        let loss = MagnitudeLoss::new(LossKind::LinearWeighted, 0.5);
        let out  = scalar(loss.forward(tensor(&[7.0, 0.0]), tensor(&[6.0, 2.0])));
        assert!((out - 6.0).abs() < 1e-5);
        let host = loss.evaluate(&[7.0, 0.0], &[6.0, 2.0]).unwrap();
        assert!((host - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_weight_never_negative() {
        let loss = MagnitudeLoss::new(LossKind::LinearWeighted, 1.0);
        let out  = scalar(loss.forward(tensor(&[0.0]), tensor(&[-3.0])));
        assert_eq!(out, 0.0);
    }

    #[test]
    fn test_exponential_stays_finite_for_huge_errors() {
        let loss = MagnitudeLoss::new(LossKind::Exponential, 0.0);
        let out  = scalar(loss.forward(tensor(&[1.0e6, -1.0e6]), tensor(&[5.0, 0.0])));
        assert!(out.is_finite());
        assert!(out > 0.0);
    }

    #[test]
    fn test_exponential_matches_host() {
        let loss = MagnitudeLoss::new(LossKind::Exponential, 0.0);
        let (p, t) = ([5.5f32, 6.0, 3.0], [5.0f32, 7.0, 3.2]);
        let dev  = scalar(loss.forward(tensor(&p), tensor(&t))) as f64;
        let host = loss.evaluate(&p, &t).unwrap();
        assert!((dev - host).abs() < 1e-4);
    }

    #[test]
    fn test_parse() {
        assert_eq!("exponential".parse::<LossKind>(), Ok(LossKind::Exponential));
        assert_eq!("Linear-Weighted".parse::<LossKind>(), Ok(LossKind::LinearWeighted));
        assert!("mse".parse::<LossKind>().is_err());
        assert_eq!(LossKind::LinearWeighted.to_string(), "linear-weighted");
    }

    #[test]
    fn test_empty_evaluate_is_none() {
        let loss = MagnitudeLoss::new(LossKind::LinearWeighted, 0.5);
        assert_eq!(loss.evaluate(&[], &[]), None);
    }
}
