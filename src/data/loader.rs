// ============================================================
// Layer 4 — Catalogue Loader
// ============================================================
// Loads seismic events from a CSV catalogue using the csv crate.
//
// Expected header (extra columns are ignored):
//   Date,Time,Latitude,Longitude,Depth,Magnitude
//   01/02/1965,13:44:18,19.246,145.616,131.6,6.0
//
// Depth may be absent entirely. Rows are fail-soft:
//   - a row that does not deserialize is dropped
//   - a row whose Date + Time does not parse as
//     "%m/%d/%Y %H:%M:%S" is dropped
//   - a row before 1970-01-01 00:00:00 is dropped
// The survivors are stably sorted by timestamp, since every
// lag and rolling feature downstream assumes time order.
//
// Reference: csv crate documentation (serde support)
//            chrono crate documentation (NaiveDateTime parsing)

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::{fs, io::Read, path::PathBuf};

use crate::domain::event::RawEvent;
use crate::domain::traits::EventSource;

pub const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// One CSV row before validation
#[derive(Debug, Deserialize)]
struct CatalogueRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Time")]
    time: String,
    #[serde(rename = "Latitude")]
    latitude: f64,
    #[serde(rename = "Longitude")]
    longitude: f64,
    #[serde(rename = "Depth", default)]
    depth: Option<f64>,
    #[serde(rename = "Magnitude")]
    magnitude: f64,
}

impl CatalogueRow {
    /// `f64` parsing accepts NaN and inf; such rows count as malformed
    fn is_finite(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.magnitude.is_finite()
            && self.depth.map_or(true, f64::is_finite)
    }
}

/// Counts of rows rejected while parsing, for logging
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DropCounts {
    pub malformed: usize,
    pub bad_timestamp: usize,
    pub before_epoch: usize,
}

impl DropCounts {
    pub fn total(&self) -> usize {
        self.malformed + self.bad_timestamp + self.before_epoch
    }
}

/// Loads a catalogue file. Implements the EventSource trait from Layer 3.
pub struct CsvEventLoader {
    path: PathBuf,
}

impl CsvEventLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Raw file bytes. The cache key is computed from these so a
    /// changed file never reuses stale sequences.
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        fs::read(&self.path)
            .with_context(|| format!("Cannot read dataset '{}'", self.path.display()))
    }
}

impl EventSource for CsvEventLoader {
    fn load_all(&self) -> Result<Vec<RawEvent>> {
        let bytes = self.read_bytes()?;
        let (events, dropped) = parse_events(bytes.as_slice())
            .with_context(|| format!("Cannot parse dataset '{}'", self.path.display()))?;
        log_drops(&dropped, events.len());
        Ok(events)
    }
}

/// Log how many rows were kept and why the rest were dropped
pub fn log_drops(dropped: &DropCounts, kept: usize) {
    if dropped.total() > 0 {
        tracing::warn!(
            "Dropped {} rows ({} malformed, {} unparseable timestamps, {} before 1970)",
            dropped.total(),
            dropped.malformed,
            dropped.bad_timestamp,
            dropped.before_epoch,
        );
    }
    tracing::info!("Loaded {} events", kept);
}

/// Parse a catalogue from any reader.
///
/// Only a missing or unreadable header is an error; individual bad
/// rows are counted in the returned DropCounts.
pub fn parse_events<R: Read>(reader: R) -> Result<(Vec<RawEvent>, DropCounts)> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    // Fail fast on a header that cannot possibly deserialize
    let headers = rdr.headers().context("Cannot read CSV header")?.clone();
    for required in ["Date", "Time", "Latitude", "Longitude", "Magnitude"] {
        if !headers.iter().any(|h| h == required) {
            anyhow::bail!("CSV header is missing required column '{required}'");
        }
    }

    let epoch = epoch_origin();
    let mut dropped = DropCounts::default();
    let mut events  = Vec::new();

    for row in rdr.deserialize::<CatalogueRow>() {
        let row = match row {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("Skipping malformed row: {e}");
                dropped.malformed += 1;
                continue;
            }
        };

        if !row.is_finite() {
            tracing::debug!("Skipping row with non-finite values on {} {}", row.date, row.time);
            dropped.malformed += 1;
            continue;
        }

        let stamp = format!("{} {}", row.date, row.time);
        let timestamp = match NaiveDateTime::parse_from_str(&stamp, TIMESTAMP_FORMAT) {
            Ok(t) => t,
            Err(_) => {
                dropped.bad_timestamp += 1;
                continue;
            }
        };

        if timestamp < epoch {
            dropped.before_epoch += 1;
            continue;
        }

        events.push(RawEvent::new(
            timestamp,
            row.latitude,
            row.longitude,
            row.depth,
            row.magnitude,
        ));
    }

    // sort_by_key is stable, so simultaneous events keep file order
    events.sort_by_key(|e| e.timestamp);
    Ok((events, dropped))
}

/// 1970-01-01 00:00:00, the earliest timestamp retained
pub fn epoch_origin() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Date,Time,Latitude,Longitude,Type,Depth,Magnitude
01/02/1965,13:44:18,19.246,145.616,Earthquake,131.6,6.0
01/03/1971,01:00:00,10.0,20.0,Earthquake,10.0,5.5
1975-02-23T02:58:41.000Z,1975-02-23T02:58:41.000Z,1.0,2.0,Earthquake,5.0,5.8
01/02/1971,23:59:59,11.0,21.0,Earthquake,15.0,6.1
01/04/1971,02:00:00,not-a-number,21.0,Earthquake,15.0,6.1
";

    #[test]
    fn test_drops_bad_rows_and_pre_epoch() {
        let (events, dropped) = parse_events(SAMPLE.as_bytes()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(dropped.before_epoch, 1);
        assert_eq!(dropped.bad_timestamp, 1);
        assert_eq!(dropped.malformed, 1);
    }

    #[test]
    fn test_non_finite_values_are_malformed() {
        let csv = "\
Date,Time,Latitude,Longitude,Depth,Magnitude
01/02/1980,10:00:00,1.0,2.0,10.0,NaN
01/03/1980,10:00:00,inf,2.0,10.0,5.0
01/04/1980,10:00:00,1.0,2.0,-inf,5.0
01/05/1980,10:00:00,1.0,2.0,10.0,5.5
";
        let (events, dropped) = parse_events(csv.as_bytes()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].magnitude, 5.5);
        assert_eq!(dropped.malformed, 3);
    }

    #[test]
    fn test_sorted_by_time() {
        let (events, _) = parse_events(SAMPLE.as_bytes()).unwrap();
        assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        // 01/02/1971 sorts before 01/03/1971 despite file order
        assert_eq!(events[0].magnitude, 6.1);
    }

    #[test]
    fn test_depth_optional() {
        let csv = "Date,Time,Latitude,Longitude,Magnitude\n01/02/1980,10:00:00,1.0,2.0,5.6\n";
        let (events, _) = parse_events(csv.as_bytes()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].depth, None);
        assert_eq!(events[0].depth_or_zero(), 0.0);
    }

    #[test]
    fn test_missing_required_column_is_error() {
        let csv = "Date,Time,Latitude,Magnitude\n01/02/1980,10:00:00,1.0,5.6\n";
        assert!(parse_events(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_epoch_boundary_is_inclusive() {
        let csv = "Date,Time,Latitude,Longitude,Magnitude\n01/01/1970,00:00:00,1.0,2.0,5.6\n";
        let (events, _) = parse_events(csv.as_bytes()).unwrap();
        assert_eq!(events.len(), 1);
    }
}
