// ============================================================
// Layer 4 — Temporal Holdout Splitter
// ============================================================
// Splits sequences into a training prefix and a holdout suffix.
//
// The catalogue is a time series and consecutive windows overlap
// in all but one row, so a shuffled split would leak nearly every
// holdout window into training. The holdout is therefore always
// the most recent `ratio` of windows.
//
//   71 windows, ratio 0.3 → holdout = floor(71 * 0.3) = 21
//                           train   = 50 (windows 0..50)
//
// Shuffling happens later, inside the training DataLoader, and
// only reorders the training prefix.

use crate::data::sequence::SequenceSet;

/// Split into (train, holdout) with the holdout at the end in time.
///
/// A ratio of 0 leaves the holdout empty. The training side always
/// keeps at least one window when the input is non-empty.
pub fn split_holdout(sequences: &SequenceSet, ratio: f64) -> (SequenceSet, SequenceSet) {
    let total   = sequences.len();
    let holdout = ((total as f64) * ratio.clamp(0.0, 1.0)).floor() as usize;
    let holdout = holdout.min(total.saturating_sub(1));
    let split_at = total - holdout;

    tracing::debug!(
        "Temporal split: {} training, {} holdout",
        split_at,
        holdout,
    );

    (sequences.slice(0..split_at), sequences.slice(split_at..total))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sequence::SequenceBuilder;
    use crate::domain::feature::FeatureMatrix;

    fn sequences(rows: usize, window: usize) -> SequenceSet {
        let series: Vec<f64> = (0..rows).map(|r| r as f64).collect();
        let labels: Vec<f32> = (0..rows).map(|r| r as f32).collect();
        let m = FeatureMatrix::from_columns(&["x"], &[series]);
        SequenceBuilder::new(window).build(&m, &labels).unwrap()
    }

    #[test]
    fn test_split_sizes() {
        let set = sequences(120, 50);
        let (train, holdout) = split_holdout(&set, 0.3);
        assert_eq!(train.len(), 50);
        assert_eq!(holdout.len(), 21);
    }

    #[test]
    fn test_holdout_is_most_recent() {
        let set = sequences(20, 5);
        let (train, holdout) = split_holdout(&set, 0.25);
        let last_train  = train.label(train.len() - 1).unwrap();
        let first_hold  = holdout.label(0).unwrap();
        assert!(last_train < first_hold);
        assert_eq!(holdout.label(holdout.len() - 1), set.label(set.len() - 1));
    }

    #[test]
    fn test_zero_ratio_keeps_everything() {
        let set = sequences(10, 3);
        let (train, holdout) = split_holdout(&set, 0.0);
        assert_eq!(train.len(), set.len());
        assert!(holdout.is_empty());
    }

    #[test]
    fn test_single_window_stays_in_training() {
        let set = sequences(5, 5);
        let (train, holdout) = split_holdout(&set, 0.9);
        assert_eq!(train.len(), 1);
        assert!(holdout.is_empty());
    }
}
