use burn::data::dataset::Dataset;

use crate::data::sequence::{Sequence, SequenceSet};

/// Burn Dataset over a SequenceSet; `get` copies one window out.
pub struct SequenceDataset {
    sequences: SequenceSet,
}

impl SequenceDataset {
    pub fn new(sequences: SequenceSet) -> Self { Self { sequences } }

    pub fn sequence_count(&self) -> usize { self.sequences.len() }
}

impl Dataset<Sequence> for SequenceDataset {
    fn get(&self, index: usize) -> Option<Sequence> {
        self.sequences.get(index)
    }

    fn len(&self) -> usize {
        self.sequences.len()
    }
}
