// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Runs a trained model over the temporal holdout in order (no
// shuffle) and summarises the predictions twice: over every
// holdout window and over the windows whose true magnitude exceeds
// the high-magnitude threshold.
//
//   MAE  = mean |p − t|
//   MSE  = mean (p − t)²
//   RMSE = √MSE
//   magnitude_aware_loss = the configured training loss
//
// Reference: Burn Book §5 (Inference on the inner backend)

use anyhow::Result;
use burn::{data::dataloader::DataLoaderBuilder, prelude::*};

use crate::data::{batcher::SequenceBatcher, dataset::SequenceDataset};
use crate::infra::metrics::RegressionMetrics;
use crate::ml::loss::MagnitudeLoss;
use crate::ml::model::MagnitudeModel;

/// Predictions and true labels, index-aligned, in holdout order
#[derive(Debug, Clone, Default)]
pub struct EvaluationOutput {
    pub predictions: Vec<f32>,
    pub labels:      Vec<f32>,
}

pub fn run_evaluation<B: Backend>(
    model:      &MagnitudeModel<B>,
    dataset:    SequenceDataset,
    batch_size: usize,
    device:     B::Device,
) -> Result<EvaluationOutput> {
    let loader = DataLoaderBuilder::new(SequenceBatcher::<B>::new(device))
        .batch_size(batch_size)
        .build(dataset);

    let mut out = EvaluationOutput::default();
    for batch in loader.iter() {
        let preds = model.forward(batch.sequences);
        out.predictions.extend(tensor_to_vec(preds)?);
        out.labels.extend(tensor_to_vec(batch.labels)?);
    }

    tracing::debug!("Evaluated {} holdout windows", out.predictions.len());
    Ok(out)
}

fn tensor_to_vec<B: Backend>(t: Tensor<B, 1>) -> Result<Vec<f32>> {
    t.into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("Cannot read tensor data: {e:?}"))
}

/// Metrics over every (prediction, label) pair
pub fn regression_metrics(predictions: &[f32], labels: &[f32], loss_fn: &MagnitudeLoss) -> RegressionMetrics {
    let n = predictions.len().min(labels.len());
    if n == 0 {
        return RegressionMetrics::empty();
    }

    let (mut abs_sum, mut sq_sum) = (0.0f64, 0.0f64);
    for (&p, &t) in predictions.iter().zip(labels) {
        let err = p as f64 - t as f64;
        abs_sum += err.abs();
        sq_sum  += err * err;
    }
    let mse = sq_sum / n as f64;

    RegressionMetrics {
        sample_count:            n,
        mean_absolute_error:     Some(abs_sum / n as f64),
        mean_squared_error:      Some(mse),
        root_mean_squared_error: Some(mse.sqrt()),
        magnitude_aware_loss:    loss_fn.evaluate(&predictions[..n], &labels[..n]),
    }
}

/// Metrics restricted to windows with true magnitude strictly above `threshold`
pub fn high_magnitude_metrics(
    predictions: &[f32],
    labels:      &[f32],
    threshold:   f64,
    loss_fn:     &MagnitudeLoss,
) -> RegressionMetrics {
    let (preds, truth): (Vec<f32>, Vec<f32>) = predictions
        .iter()
        .zip(labels)
        .filter(|(_, &t)| t as f64 > threshold)
        .map(|(&p, &t)| (p, t))
        .unzip();

    if preds.is_empty() {
        tracing::warn!("No holdout window has magnitude above {}, high-magnitude metrics are empty", threshold);
    }
    regression_metrics(&preds, &truth, loss_fn)
}
