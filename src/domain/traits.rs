// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these, never against the
// concrete CSV loader or the Burn-backed inferencer.

use anyhow::Result;
use crate::domain::event::RawEvent;

// ─── EventSource ──────────────────────────────────────────────────────────────
/// Any component that can produce a chronologically ordered list of
/// seismic events.
///
/// Implementations:
///   - CsvEventLoader → reads a catalogue file
pub trait EventSource {
    /// Load every usable event. Malformed rows are dropped, not fatal.
    fn load_all(&self) -> Result<Vec<RawEvent>>;
}

// ─── MagnitudePredictor ───────────────────────────────────────────────────────
/// The serving boundary: everything a web layer needs from the core.
///
/// `window` is one scaled sequence flattened row-major,
/// `window_size * feature_count` values long.
pub trait MagnitudePredictor {
    /// Predicted magnitude, unclamped
    fn predict(&self, window: &[f32]) -> Result<f32>;

    /// Number of consecutive feature rows one prediction consumes
    fn window_size(&self) -> usize;

    /// Width of one feature row
    fn feature_count(&self) -> usize;
}
