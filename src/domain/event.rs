// ============================================================
// Layer 3 — RawEvent Domain Type
// ============================================================
// One seismic record from the catalogue. Immutable once ingested:
// every derived quantity lives in a FeatureMatrix instead.

use chrono::NaiveDateTime;

/// A single earthquake as read from the input catalogue.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    /// Date and time of the event (catalogue times are UTC, no zone attached)
    pub timestamp: NaiveDateTime,

    /// Degrees north, in [-90, 90]
    pub latitude: f64,

    /// Degrees east, in [-180, 180]
    pub longitude: f64,

    /// Hypocentre depth in kilometres. Some catalogue variants omit it.
    pub depth: Option<f64>,

    /// The regression target
    pub magnitude: f64,
}

impl RawEvent {
    pub fn new(
        timestamp: NaiveDateTime,
        latitude:  f64,
        longitude: f64,
        depth:     Option<f64>,
        magnitude: f64,
    ) -> Self {
        Self { timestamp, latitude, longitude, depth, magnitude }
    }

    /// Depth with missing values treated as zero, the same fill the
    /// feature pipeline applies to every other missing value.
    pub fn depth_or_zero(&self) -> f64 {
        self.depth.unwrap_or(0.0)
    }
}
