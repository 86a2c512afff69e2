// src/history.rs

//! The query path: day-window resolution, log retrieval, and fixed-width
//! bucket averaging.
//!
//! A history query reconstructs one calendar day of readings for a channel:
//! every surviving record rendered newest-first, plus the arithmetic mean of
//! each non-empty time bucket across the day. Day boundaries and bucket
//! labels use local wall-clock time, matching what the dashboard displays.
//!
//! The reader tolerates partial log corruption: records whose `value` or
//! `timestamp` does not coerce to a float are discarded, never fatal.

use chrono::{Local, NaiveDate, TimeZone};
use serde::Serialize;

use crate::{Channel, Error, Reading, Result, StorePtr};

/// One raw log line in a history response.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct LogEntry {
    /// Local wall-clock time, `YYYY-MM-DD HH:MM:SS`.
    pub datetime: String,
    pub value: f64,
}

/// One aggregated bucket in a history response.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct BucketPoint {
    /// Local wall-clock time of the bucket start, `HH:MM`.
    pub datetime: String,
    pub average_value: f64,
}

/// The local-midnight-anchored 24-hour span a query is scoped to.
#[derive(Clone, Copy, Debug)]
pub struct DayWindow {
    /// Epoch seconds of local midnight.
    pub start: f64,
    /// Epoch seconds of the following local midnight (exclusive).
    pub end: f64,
}

impl DayWindow {
    /// Resolve the window for an explicit `YYYY-MM-DD` date, or for today
    /// when none is given.
    ///
    /// Invalid date strings (bad format or impossible calendar dates such
    /// as `2024-02-30`) fail with [`Error::InvalidDate`].
    pub fn resolve(date: Option<&str>) -> Result<Self> {
        // ---
        let day = match date {
            Some(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map_err(|_| Error::InvalidDate(text.to_string()))?,
            None => Local::now().date_naive(),
        };

        Self::for_date(day)
    }

    /// Window for a specific calendar date.
    pub fn for_date(day: NaiveDate) -> Result<Self> {
        // ---
        let midnight = day.and_hms_opt(0, 0, 0).expect("midnight is always valid");

        // On DST transition days local midnight can be ambiguous or
        // nonexistent; take the earliest mapping.
        let start = Local
            .from_local_datetime(&midnight)
            .earliest()
            .ok_or_else(|| Error::InvalidDate(day.to_string()))?
            .timestamp() as f64;

        Ok(Self {
            start,
            end: start + 86_400.0,
        })
    }

    fn contains(&self, timestamp: f64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }
}

/// History reader and bucket aggregator over a shared store handle.
#[derive(Clone)]
pub struct HistoryReader {
    store: StorePtr,
    bucket_width_secs: i64,
}

impl HistoryReader {
    pub fn new(store: StorePtr, bucket_width: std::time::Duration) -> Self {
        Self {
            store,
            bucket_width_secs: bucket_width.as_secs() as i64,
        }
    }

    /// Fetch a channel's readings for one day, newest first.
    ///
    /// Fails with [`Error::NotFound`] when the channel has no log at all;
    /// a day with no matching readings inside an existing log yields an
    /// empty vector.
    pub async fn day_readings(&self, channel: Channel, window: DayWindow) -> Result<Vec<Reading>> {
        // ---
        let records = self.store.children(&channel.log_path()).await?;
        if records.is_empty() {
            return Err(Error::NotFound);
        }

        // Corrupt records are discarded, not fatal.
        let mut readings: Vec<Reading> = records
            .iter()
            .filter_map(|(_, value)| Reading::from_stored(value))
            .filter(|r| window.contains(r.timestamp))
            .collect();

        // Newest first; sort_by is stable, so same-timestamp records keep
        // their retrieval (append) order.
        readings.sort_by(|a, b| {
            b.timestamp
                .partial_cmp(&a.timestamp)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(readings)
    }

    /// Full history query: raw log lines plus bucket averages for one day.
    pub async fn query(
        &self,
        channel: Channel,
        date: Option<&str>,
    ) -> Result<(Vec<BucketPoint>, Vec<LogEntry>)> {
        // ---
        let window = DayWindow::resolve(date)?;
        let readings = self.day_readings(channel, window).await?;

        let logs = readings.iter().map(format_log_entry).collect();
        let data = aggregate(&readings, window, self.bucket_width_secs);

        Ok((data, logs))
    }
}

/// Partition the day window into fixed-width buckets and average each one.
///
/// Buckets walk `[window.start, window.end)` in `width_secs` steps; each
/// bucket is the half-open interval `[start, start+width)`. Empty buckets
/// are skipped, never emitted as zero. An empty record set yields an empty
/// result (no division by zero). Output is ascending by bucket start.
pub fn aggregate(readings: &[Reading], window: DayWindow, width_secs: i64) -> Vec<BucketPoint> {
    // ---
    if readings.is_empty() || width_secs <= 0 {
        return Vec::new();
    }

    let mut points = Vec::new();
    let mut bucket_start = window.start as i64;
    let day_end = window.end as i64;

    while bucket_start < day_end {
        let bucket_end = bucket_start + width_secs;

        let mut sum = 0.0;
        let mut count = 0usize;
        for r in readings {
            if r.timestamp >= bucket_start as f64 && r.timestamp < bucket_end as f64 {
                sum += r.value;
                count += 1;
            }
        }

        if count > 0 {
            points.push(BucketPoint {
                datetime: format_bucket_label(bucket_start),
                average_value: sum / count as f64,
            });
        }

        bucket_start = bucket_end;
    }

    points
}

fn format_log_entry(reading: &Reading) -> LogEntry {
    // ---
    let datetime = match Local.timestamp_opt(reading.timestamp as i64, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => String::new(),
    };

    LogEntry {
        datetime,
        value: reading.value,
    }
}

fn format_bucket_label(bucket_start: i64) -> String {
    // ---
    match Local.timestamp_opt(bucket_start, 0).single() {
        Some(dt) => dt.format("%H:%M").to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::store::create_memory_store;
    use serde_json::json;

    /// Window for 2024-01-01 in whatever timezone the test host runs in.
    fn test_window() -> DayWindow {
        DayWindow::for_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).unwrap()
    }

    fn reading_at(window: DayWindow, offset_secs: f64, value: f64) -> Reading {
        Reading::new(value, window.start + offset_secs)
    }

    #[test]
    fn invalid_date_string_rejected() {
        // ---
        assert!(matches!(
            DayWindow::resolve(Some("01-2024-01")),
            Err(Error::InvalidDate(_))
        ));
    }

    #[test]
    fn impossible_calendar_date_rejected() {
        // ---
        assert!(matches!(
            DayWindow::resolve(Some("2024-02-30")),
            Err(Error::InvalidDate(_))
        ));
    }

    #[test]
    fn omitted_date_defaults_to_today() {
        // ---
        let window = DayWindow::resolve(None).unwrap();
        let now = Local::now().timestamp() as f64;

        assert!(window.contains(now));
        assert_eq!(window.end - window.start, 86_400.0);
    }

    #[test]
    fn two_hour_bucket_scenario() {
        // ---
        // Readings at 10:00 (20.0), 10:05 (22.0), 14:00 (25.0); 2h buckets
        // must yield 10:00 -> 21.0 and 14:00 -> 25.0, nothing else.
        let window = test_window();
        let readings = vec![
            reading_at(window, 10.0 * 3600.0, 20.0),
            reading_at(window, 10.0 * 3600.0 + 300.0, 22.0),
            reading_at(window, 14.0 * 3600.0, 25.0),
        ];

        let points = aggregate(&readings, window, 7200);

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].datetime, "10:00");
        assert_eq!(points[0].average_value, 21.0);
        assert_eq!(points[1].datetime, "14:00");
        assert_eq!(points[1].average_value, 25.0);
    }

    #[test]
    fn empty_buckets_are_omitted() {
        // ---
        let window = test_window();
        let readings = vec![reading_at(window, 0.0, 5.0)];

        let points = aggregate(&readings, window, 7200);

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].datetime, "00:00");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        // ---
        let points = aggregate(&[], test_window(), 7200);
        assert!(points.is_empty());
    }

    #[test]
    fn bucket_mean_is_exact_for_exact_inputs() {
        // ---
        let window = test_window();
        let readings = vec![
            reading_at(window, 100.0, 1.0),
            reading_at(window, 200.0, 2.0),
            reading_at(window, 300.0, 6.0),
        ];

        let points = aggregate(&readings, window, 7200);
        assert_eq!(points[0].average_value, 3.0);
    }

    #[test]
    fn bucket_boundaries_are_half_open() {
        // ---
        // A reading exactly on a bucket boundary belongs to the later bucket.
        let window = test_window();
        let readings = vec![reading_at(window, 7200.0, 9.0)];

        let points = aggregate(&readings, window, 7200);

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].datetime, "02:00");
    }

    #[tokio::test]
    async fn day_readings_filters_and_sorts_newest_first() {
        // ---
        let store = create_memory_store().await.unwrap();
        let window = test_window();

        // In the window, appended out of time order.
        for (offset, value) in [(3600.0, 1.0), (7200.0, 2.0), (1800.0, 3.0)] {
            store
                .push(
                    "temp",
                    json!({"value": value, "timestamp": window.start + offset}),
                )
                .await
                .unwrap();
        }
        // Outside the window on both sides.
        store
            .push("temp", json!({"value": 99.0, "timestamp": window.start - 1.0}))
            .await
            .unwrap();
        store
            .push("temp", json!({"value": 99.0, "timestamp": window.end}))
            .await
            .unwrap();

        let reader = HistoryReader::new(store, std::time::Duration::from_secs(7200));
        let readings = reader.day_readings(Channel::Temp, window).await.unwrap();

        let values: Vec<f64> = readings.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![2.0, 1.0, 3.0]);
    }

    #[tokio::test]
    async fn equal_timestamps_keep_append_order() {
        // ---
        let store = create_memory_store().await.unwrap();
        let window = test_window();
        let ts = window.start + 60.0;

        for value in [1.0, 2.0, 3.0] {
            store
                .push("temp", json!({"value": value, "timestamp": ts}))
                .await
                .unwrap();
        }

        let reader = HistoryReader::new(store, std::time::Duration::from_secs(7200));
        let readings = reader.day_readings(Channel::Temp, window).await.unwrap();

        let values: Vec<f64> = readings.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[tokio::test]
    async fn corrupt_records_are_discarded_not_fatal() {
        // ---
        let store = create_memory_store().await.unwrap();
        let window = test_window();

        store
            .push("temp", json!({"value": "garbage", "timestamp": window.start}))
            .await
            .unwrap();
        store
            .push("temp", json!({"value": 4.0, "timestamp": window.start + 10.0}))
            .await
            .unwrap();

        let reader = HistoryReader::new(store, std::time::Duration::from_secs(7200));
        let readings = reader.day_readings(Channel::Temp, window).await.unwrap();

        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].value, 4.0);
    }

    #[tokio::test]
    async fn missing_log_is_not_found() {
        // ---
        let store = create_memory_store().await.unwrap();
        let reader = HistoryReader::new(store, std::time::Duration::from_secs(7200));

        let result = reader.day_readings(Channel::Humidity, test_window()).await;
        assert!(matches!(result, Err(Error::NotFound)));
    }

    #[tokio::test]
    async fn query_is_idempotent() {
        // ---
        let store = create_memory_store().await.unwrap();
        let window = test_window();

        store
            .push("temp", json!({"value": 7.0, "timestamp": window.start + 5.0}))
            .await
            .unwrap();

        let reader = HistoryReader::new(store, std::time::Duration::from_secs(7200));
        let date = Local
            .timestamp_opt(window.start as i64, 0)
            .single()
            .unwrap()
            .format("%Y-%m-%d")
            .to_string();

        let first = reader.query(Channel::Temp, Some(&date)).await.unwrap();
        let second = reader.query(Channel::Temp, Some(&date)).await.unwrap();

        assert_eq!(first, second);
    }
}
