// ============================================================
// Layer 5 — Plateau Learning-Rate Scheduler
// ============================================================
// Cuts the learning rate when the epoch loss stops improving.
//
//   improved  ⇔ loss < best · (1 − threshold)
//   otherwise bad_epochs += 1
//   bad_epochs > patience → lr = max(lr · factor, min_lr), bad_epochs = 0
//
// With patience 5 the first cut happens on the 6th consecutive
// epoch without improvement. State lives only for one training run.

use serde::{Deserialize, Serialize};

pub const DEFAULT_FACTOR:    f64 = 0.1;
pub const DEFAULT_THRESHOLD: f64 = 1e-4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlateauScheduler {
    lr:         f64,
    factor:     f64,
    patience:   usize,
    threshold:  f64,
    min_lr:     f64,
    best:       f64,
    bad_epochs: usize,
}

impl PlateauScheduler {
    pub fn new(initial_lr: f64, patience: usize) -> Self {
        Self {
            lr:         initial_lr,
            factor:     DEFAULT_FACTOR,
            patience,
            threshold:  DEFAULT_THRESHOLD,
            min_lr:     0.0,
            best:       f64::INFINITY,
            bad_epochs: 0,
        }
    }

    pub fn lr(&self) -> f64 {
        self.lr
    }

    pub fn best(&self) -> f64 {
        self.best
    }

    /// Record one epoch's loss. Returns the new rate when it was cut.
    /// A non-finite loss is ignored.
    pub fn step(&mut self, loss: f64) -> Option<f64> {
        if !loss.is_finite() {
            return None;
        }

        if loss < self.best * (1.0 - self.threshold) {
            self.best       = loss;
            self.bad_epochs = 0;
            return None;
        }

        self.bad_epochs += 1;
        if self.bad_epochs <= self.patience {
            return None;
        }

        self.bad_epochs = 0;
        let reduced = (self.lr * self.factor).max(self.min_lr);
        if reduced < self.lr {
            self.lr = reduced;
            Some(reduced)
        } else {
            None
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_improving_loss_keeps_rate() {
        let mut s = PlateauScheduler::new(0.01, 2);
        for loss in [5.0, 4.0, 3.0, 2.0, 1.0] {
            assert_eq!(s.step(loss), None);
        }
        assert_eq!(s.lr(), 0.01);
        assert_eq!(s.best(), 1.0);
    }

    #[test]
    fn test_cut_after_patience_plus_one_flat_epochs() {
        let mut s = PlateauScheduler::new(0.01, 2);
        assert_eq!(s.step(1.0), None);
        assert_eq!(s.step(1.0), None);
        assert_eq!(s.step(1.0), None);
        let cut = s.step(1.0).unwrap();
        assert!((cut - 0.001).abs() < 1e-12);
        assert!((s.lr() - 0.001).abs() < 1e-12);
    }

    #[test]
    fn test_tiny_improvement_counts_as_plateau() {
        let mut s = PlateauScheduler::new(1.0, 0);
        s.step(1.0);
        // 1e-6 relative improvement is below the 1e-4 threshold
        assert!(s.step(1.0 - 1e-6).is_some());
    }

    #[test]
    fn test_min_lr_floor() {
        let mut s = PlateauScheduler { min_lr: 0.5, ..PlateauScheduler::new(1.0, 0) };
        s.step(1.0);
        assert_eq!(s.step(2.0), Some(0.5));
        assert_eq!(s.step(2.0), None);
        assert_eq!(s.lr(), 0.5);
    }

    #[test]
    fn test_non_finite_loss_ignored() {
        let mut s = PlateauScheduler::new(1.0, 0);
        s.step(1.0);
        assert_eq!(s.step(f64::NAN), None);
        assert_eq!(s.lr(), 1.0);
    }
}
