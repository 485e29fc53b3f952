// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All model math lives here:
//
//   model.rs      — stacked BiLSTM + self-attention encoder with a
//                   mean-pooled regression head, in a shallow and a
//                   deep variant
//
//   loss.rs       — linear-weighted and exponential magnitude losses
//
//   scheduler.rs  — reduce-on-plateau learning rate
//
//   trainer.rs    — epoch loop: forward, loss, backward, clipped
//                   Adam step, scheduler, checkpoint
//
//   evaluator.rs  — ordered holdout inference and regression metrics
//
//   inferencer.rs — loaded checkpoint behind the MagnitudePredictor trait
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Hochreiter & Schmidhuber (1997) LSTM
//            Vaswani et al. (2017) Attention Is All You Need

/// BiLSTM + attention magnitude regressor
pub mod model;

/// Magnitude-aware regression losses
pub mod loss;

/// Plateau learning-rate scheduler
pub mod scheduler;

/// Training loop with clipping and checkpointing
pub mod trainer;

/// Holdout evaluation and metrics
pub mod evaluator;

/// Inference engine behind the serving trait
pub mod inferencer;
