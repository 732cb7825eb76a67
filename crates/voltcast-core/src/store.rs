//! Reading storage
//!
//! [`SampleStore`] is the read interface the analysis layer consumes. The
//! [`InMemoryStore`] implementation doubles as the ingestion boundary
//! (validating `append`) and loads reading files in CSV form.
//!
//! CSV format:
//!
//! ```text
//! timestamp,energy_produced,energy_consumed,efficiency,current_load,facility_id
//! 2026-03-02T00:00:00Z,12.5,30.1,0.82,41.0,1
//! ```
//!
//! `efficiency` and `facility_id` columns are optional. Rows that fail to
//! parse or validate are skipped with a warning.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{NewReading, Reading};

/// Facility assigned to CSV rows without a facility_id column
pub const DEFAULT_FACILITY_ID: i64 = 1;

const REQUIRED_COLUMNS: [&str; 4] = [
    "timestamp",
    "energy_produced",
    "energy_consumed",
    "current_load",
];

/// Source of historical readings
pub trait SampleStore: Send + Sync {
    /// Readings for a facility at or after `since`, oldest first
    fn fetch_readings(&self, facility_id: i64, since: DateTime<Utc>) -> Result<Vec<Reading>>;

    /// Most recent reading for a facility
    fn latest_reading(&self, facility_id: i64) -> Result<Reading> {
        self.fetch_readings(facility_id, DateTime::<Utc>::MIN_UTC)?
            .pop()
            .ok_or_else(|| Error::NotFound(format!("no readings for facility {}", facility_id)))
    }
}

/// Readings held in memory, kept sorted by timestamp
#[derive(Debug, Default)]
pub struct InMemoryStore {
    readings: RwLock<Vec<Reading>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_readings(mut readings: Vec<Reading>) -> Self {
        readings.sort_by_key(|r| r.timestamp);
        Self {
            readings: RwLock::new(readings),
        }
    }

    /// Load a CSV reading file
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        let store = Self::from_reader(file)?;
        debug!(path = %path.display(), readings = store.len(), "Loaded reading file");
        Ok(store)
    }

    /// Load CSV data from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(Self::from_readings(parse_csv(reader)?))
    }

    /// Validate and store a new reading
    pub fn append(
        &self,
        facility_id: i64,
        reading: NewReading,
        received_at: DateTime<Utc>,
    ) -> Result<Reading> {
        let reading = reading.into_reading(facility_id, received_at)?;

        let mut readings = self.readings.write().unwrap_or_else(PoisonError::into_inner);
        let position = readings.partition_point(|r| r.timestamp <= reading.timestamp);
        readings.insert(position, reading.clone());

        Ok(reading)
    }

    pub fn len(&self) -> usize {
        self.readings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distinct facility ids, ascending
    pub fn facilities(&self) -> Vec<i64> {
        let readings = self.readings.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<i64> = readings.iter().map(|r| r.facility_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

impl SampleStore for InMemoryStore {
    fn fetch_readings(&self, facility_id: i64, since: DateTime<Utc>) -> Result<Vec<Reading>> {
        let readings = self.readings.read().unwrap_or_else(PoisonError::into_inner);
        Ok(readings
            .iter()
            .filter(|r| r.facility_id == facility_id && r.timestamp >= since)
            .cloned()
            .collect())
    }
}

/// Parse a reading CSV. Header names are matched case-insensitively in any
/// column order.
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<Reading>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let columns: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name.to_ascii_lowercase(), i))
        .collect();

    for required in REQUIRED_COLUMNS {
        if !columns.contains_key(required) {
            return Err(Error::InvalidData(format!(
                "missing required column '{}'",
                required
            )));
        }
    }

    let mut readings = Vec::new();
    let mut skipped = 0usize;

    for (index, result) in rdr.records().enumerate() {
        // Header is line 1
        let line = index + 2;
        let record = result?;

        match parse_row(&record, &columns) {
            Ok(reading) => readings.push(reading),
            Err(e) => {
                skipped += 1;
                warn!(line, error = %e, "Skipping invalid reading row");
            }
        }
    }

    if skipped > 0 {
        debug!(parsed = readings.len(), skipped, "Parsed reading CSV");
    }

    Ok(readings)
}

fn parse_row(record: &StringRecord, columns: &HashMap<String, usize>) -> Result<Reading> {
    let field = |name: &str| -> Option<&str> {
        columns
            .get(name)
            .and_then(|&i| record.get(i))
            .filter(|s| !s.is_empty())
    };
    let required = |name: &str| -> Result<&str> {
        field(name).ok_or_else(|| Error::InvalidData(format!("missing {}", name)))
    };

    let timestamp = parse_timestamp(required("timestamp")?)?;
    let facility_id = match field("facility_id") {
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| Error::InvalidData(format!("invalid facility_id '{}'", raw)))?,
        None => DEFAULT_FACILITY_ID,
    };

    let new_reading = NewReading {
        energy_produced: parse_number("energy_produced", required("energy_produced")?)?,
        energy_consumed: parse_number("energy_consumed", required("energy_consumed")?)?,
        current_load: parse_number("current_load", required("current_load")?)?,
        efficiency: field("efficiency")
            .map(|raw| parse_number("efficiency", raw))
            .transpose()?,
        timestamp: Some(timestamp),
    };

    new_reading.into_reading(facility_id, timestamp)
}

fn parse_number(name: &str, raw: &str) -> Result<f64> {
    raw.parse::<f64>()
        .map_err(|_| Error::InvalidData(format!("invalid {} '{}'", name, raw)))
}

/// RFC 3339, or a naive `YYYY-MM-DD HH:MM[:SS]` taken as UTC
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(Error::InvalidData(format!("invalid timestamp '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const SAMPLE: &str = "\
timestamp,energy_produced,energy_consumed,efficiency,current_load,facility_id
2026-03-02T01:00:00Z,10.0,20.0,0.8,40.0,1
2026-03-02T00:00:00Z,12.0,18.0,,35.0,1
2026-03-02 02:00:00,11.0,21.0,0.75,42.0,2
not-a-time,1,1,0.5,1,1
2026-03-02T03:00:00Z,-4,21.0,0.75,42.0,1
2026-03-02T04:00:00Z,9.0,22.0,1.5,44.0,1
";

    fn ts(hour: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap() + Duration::hours(hour)
    }

    fn new_reading(consumed: f64) -> NewReading {
        NewReading {
            energy_produced: 10.0,
            energy_consumed: consumed,
            current_load: 30.0,
            efficiency: None,
            timestamp: None,
        }
    }

    #[test]
    fn test_parse_csv_skips_invalid_rows() {
        let readings = parse_csv(SAMPLE.as_bytes()).unwrap();
        // bad timestamp, negative production and efficiency > 1 are skipped
        assert_eq!(readings.len(), 3);
        assert_eq!(readings[0].timestamp, ts(1));
        assert_eq!(readings[2].facility_id, 2);
        assert_eq!(readings[2].timestamp, ts(2));
    }

    #[test]
    fn test_missing_efficiency_is_derived() {
        let readings = parse_csv(SAMPLE.as_bytes()).unwrap();
        let derived = &readings[1];
        assert!((derived.efficiency - 12.0 / 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_required_column() {
        let csv = "timestamp,energy_produced,energy_consumed\n2026-03-02T00:00:00Z,1,2\n";
        let err = parse_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
        assert!(err.to_string().contains("current_load"));
    }

    #[test]
    fn test_optional_columns_absent() {
        let csv = "Timestamp,Energy_Produced,Energy_Consumed,Current_Load\n\
                   2026-03-02T00:00:00Z,5,10,20\n";
        let readings = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].facility_id, DEFAULT_FACILITY_ID);
        assert!((readings[0].efficiency - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_store_fetch_sorted_and_filtered() {
        let store = InMemoryStore::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(store.facilities(), vec![1, 2]);

        let all = store.fetch_readings(1, DateTime::<Utc>::MIN_UTC).unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].timestamp < all[1].timestamp);

        let recent = store.fetch_readings(1, ts(1)).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(store.latest_reading(2).unwrap().timestamp, ts(2));
    }

    #[test]
    fn test_append_validates() {
        let store = InMemoryStore::new();
        let err = store.append(1, new_reading(-1.0), ts(0)).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
        assert!(store.is_empty());

        let stored = store.append(1, new_reading(20.0), ts(0)).unwrap();
        assert_eq!(stored.timestamp, ts(0));
        assert!((stored.efficiency - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_append_keeps_order() {
        let store = InMemoryStore::new();
        for hour in [3, 1, 2] {
            store.append(7, new_reading(10.0 + hour as f64), ts(hour)).unwrap();
        }
        let readings = store.fetch_readings(7, ts(0)).unwrap();
        let hours: Vec<DateTime<Utc>> = readings.iter().map(|r| r.timestamp).collect();
        assert_eq!(hours, vec![ts(1), ts(2), ts(3)]);
    }

    #[test]
    fn test_latest_reading_not_found() {
        let store = InMemoryStore::new();
        assert!(matches!(store.latest_reading(9), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_from_csv_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readings.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        let store = InMemoryStore::from_csv_path(&path).unwrap();
        assert_eq!(store.len(), 3);

        let missing = InMemoryStore::from_csv_path(&dir.path().join("nope.csv"));
        assert!(matches!(missing, Err(Error::Io(_))));
    }
}
