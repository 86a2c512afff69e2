// src/domain/reading.rs

//! The stored form of a single sensor observation.

use serde::{Deserialize, Serialize};

/// A single sensor observation.
///
/// Invariants:
/// - `timestamp` is epoch seconds assigned at ingestion time, not supplied
///   by the sensor.
/// - Once written to a channel log a reading is immutable; ordering is
///   recovered at query time by sorting on `timestamp`.
/// - `value` is `0.0` when the sensor reported the `nan` sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Observed value in the channel's native units.
    pub value: f64,

    /// Epoch seconds at ingestion.
    pub timestamp: f64,
}

impl Reading {
    pub fn new(value: f64, timestamp: f64) -> Self {
        Self { value, timestamp }
    }

    /// Coerce a stored JSON record back into a reading.
    ///
    /// Returns `None` when either field is missing or non-numeric; a
    /// corrupted log entry is discarded, never fatal to a query.
    pub fn from_stored(record: &serde_json::Value) -> Option<Self> {
        // ---
        let value = record.get("value")?.as_f64()?;
        let timestamp = record.get("timestamp")?.as_f64()?;
        Some(Self { value, timestamp })
    }
}
