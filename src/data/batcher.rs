// ============================================================
// Layer 4 — Sequence Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<Sequence> into
// one input tensor and one label tensor.
//
//   Input:  N Sequences, each W rows of F features
//   Output: SequenceBatch with sequences [N, W, F], labels [N]
//
// Every window carries the same W and F, so flattening then
// reshaping is enough; no padding is involved.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::sequence::Sequence;

// ─── SequenceBatch ────────────────────────────────────────────────────────────
/// A batch of windows ready for the model forward pass
#[derive(Debug, Clone)]
pub struct SequenceBatch<B: Backend> {
    /// Scaled features — shape: [batch_size, window_size, feature_count]
    pub sequences: Tensor<B, 3>,

    /// Magnitude of each window's last event — shape: [batch_size]
    pub labels: Tensor<B, 1>,
}

// ─── SequenceBatcher ──────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct SequenceBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SequenceBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<Sequence, SequenceBatch<B>> for SequenceBatcher<B> {
    fn batch(&self, items: Vec<Sequence>) -> SequenceBatch<B> {
        let batch_size    = items.len();
        let window_size   = items.first().map_or(0, |s| s.window_size);
        let feature_count = items.first().map_or(0, |s| s.feature_count);

        let flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.features.iter().copied())
            .collect();
        let labels: Vec<f32> = items.iter().map(|s| s.label).collect();

        let sequences = Tensor::<B, 3>::from_data(
            TensorData::new(flat, [batch_size, window_size, feature_count]),
            &self.device,
        );
        let labels = Tensor::<B, 1>::from_data(
            TensorData::new(labels, [batch_size]),
            &self.device,
        );

        SequenceBatch { sequences, labels }
    }
}
