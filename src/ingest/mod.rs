//! AIS record ingest: CSV reading, cleaning, and grouping into per-vessel
//! trajectories.

pub mod clean;

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::model::{InvalidInputError, PositionRecord, Trajectory};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("record for vessel {identifier} is missing required field `{field}`")]
    MissingField {
        identifier: String,
        field: &'static str,
    },
    #[error("record for vessel {identifier} has unparseable timestamp {value:?}")]
    InvalidTimestamp { identifier: String, value: String },
    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),
}

/// One raw AIS row as it appears in the input file. Every measured field is
/// optional until cleaning has dropped incomplete rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AisRecord {
    #[serde(rename = "shipid", alias = "mmsi", alias = "MMSI", alias = "identifier")]
    pub identifier: String,
    #[serde(rename = "t", alias = "timestamp", alias = "# Timestamp", default)]
    pub timestamp: Option<String>,
    #[serde(alias = "longitude", alias = "x", default)]
    pub lon: Option<f64>,
    #[serde(alias = "latitude", alias = "y", default)]
    pub lat: Option<f64>,
    #[serde(alias = "sog", alias = "SOG", default)]
    pub speed: Option<f64>,
    #[serde(alias = "cog", alias = "COG", default)]
    pub course: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub status: Option<f64>,
    #[serde(default)]
    pub shiptype: Option<f64>,
    #[serde(default)]
    pub draught: Option<f64>,
    #[serde(default)]
    pub destination: Option<String>,
}

/// Parse the timestamp formats seen in AIS exports: RFC 3339,
/// `YYYY-MM-DD HH:MM:SS[.f]`, `DD/MM/YYYY HH:MM:SS`, or Unix seconds.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%d/%m/%Y %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}

/// Read AIS records from any CSV source with a header row.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<AisRecord>, IngestError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();
    for row in rdr.deserialize() {
        let record: AisRecord = row?;
        records.push(record);
    }
    Ok(records)
}

pub fn read_records_from_path(path: &Path) -> Result<Vec<AisRecord>, IngestError> {
    let file = std::fs::File::open(path).map_err(|source| IngestError::Open {
        path: path.display().to_string(),
        source,
    })?;
    let records = read_records(file)?;
    info!(path = %path.display(), records = records.len(), "read AIS records");
    Ok(records)
}

pub fn write_records<W: Write>(writer: W, records: &[AisRecord]) -> Result<(), IngestError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for r in records {
        wtr.serialize(r)?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

fn required(value: Option<f64>, identifier: &str, field: &'static str) -> Result<f64, IngestError> {
    value.ok_or_else(|| IngestError::MissingField {
        identifier: identifier.to_string(),
        field,
    })
}

/// Convert one cleaned record into a position fix.
pub fn to_position(record: &AisRecord) -> Result<PositionRecord, IngestError> {
    let id = record.identifier.as_str();
    let raw_ts = record
        .timestamp
        .as_deref()
        .ok_or_else(|| IngestError::MissingField {
            identifier: id.to_string(),
            field: "t",
        })?;
    let timestamp = parse_timestamp(raw_ts).ok_or_else(|| IngestError::InvalidTimestamp {
        identifier: id.to_string(),
        value: raw_ts.to_string(),
    })?;
    Ok(PositionRecord::new(
        timestamp,
        required(record.lon, id, "lon")?,
        required(record.lat, id, "lat")?,
        required(record.speed, id, "speed")?,
    ))
}

/// Group cleaned records by vessel into time-ordered trajectories.
pub fn group_trajectories(records: &[AisRecord]) -> Result<BTreeMap<String, Trajectory>, IngestError> {
    let mut grouped: BTreeMap<String, Vec<PositionRecord>> = BTreeMap::new();
    for r in records {
        grouped
            .entry(r.identifier.clone())
            .or_default()
            .push(to_position(r)?);
    }
    let mut trajectories = BTreeMap::new();
    for (id, positions) in grouped {
        let trajectory = Trajectory::new(id.clone(), positions)?;
        trajectories.insert(id, trajectory);
    }
    Ok(trajectories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    const SAMPLE: &str = "\
t,shipid,lon,lat,heading,course,speed,status,shiptype,draught,destination
2018-07-01 10:00:00,237000001,23.60,37.90,90,90.0,10.5,0,70,5.2,PIRAEUS
2018-07-01 09:59:00,237000001,23.59,37.90,90,90.0,10.4,0,70,5.2,PIRAEUS
2018-07-01 10:00:00,237000002,24.00,38.00,,180.0,0.0,1,30,,
";

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2018, 7, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2018-07-01 10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2018-07-01T10:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("01/07/2018 10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("1530439200"), Some(expected));
        assert_eq!(
            parse_timestamp("2018-07-01 10:00:00.250").map(|t| t.nanosecond()),
            Some(250_000_000)
        );
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_read_records_handles_empty_fields() {
        let records = read_records(SAMPLE.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].identifier, "237000001");
        assert_eq!(records[0].speed, Some(10.5));
        assert_eq!(records[2].heading, None);
        assert_eq!(records[2].destination, None);
    }

    #[test]
    fn test_alias_headers() {
        let csv = "mmsi,timestamp,longitude,latitude,sog\n1,2018-07-01 10:00:00,1.0,2.0,3.0\n";
        let records = read_records(csv.as_bytes()).unwrap();
        assert_eq!(records[0].identifier, "1");
        assert_eq!(records[0].lat, Some(2.0));
        assert_eq!(records[0].course, None);
    }

    #[test]
    fn test_group_trajectories_sorts_by_time() {
        let records = read_records(SAMPLE.as_bytes()).unwrap();
        let trajectories = group_trajectories(&records).unwrap();
        assert_eq!(trajectories.len(), 2);
        let t = &trajectories["237000001"];
        assert_eq!(t.len(), 2);
        assert_eq!(t.positions()[0].lon, 23.59);
    }

    #[test]
    fn test_missing_field_is_reported() {
        let csv = "shipid,t,lon,lat,speed\n1,2018-07-01 10:00:00,,2.0,3.0\n";
        let records = read_records(csv.as_bytes()).unwrap();
        let err = group_trajectories(&records).unwrap_err();
        assert!(matches!(err, IngestError::MissingField { field: "lon", .. }));
    }

    #[test]
    fn test_bad_timestamp_is_reported() {
        let csv = "shipid,t,lon,lat,speed\n1,not-a-time,1.0,2.0,3.0\n";
        let records = read_records(csv.as_bytes()).unwrap();
        let err = group_trajectories(&records).unwrap_err();
        assert!(matches!(err, IngestError::InvalidTimestamp { .. }));
    }

    #[test]
    fn test_write_then_read_preserves_columns() {
        let records = read_records(SAMPLE.as_bytes()).unwrap();
        let mut out = Vec::new();
        write_records(&mut out, &records).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("shipid,t,lon,lat,speed,course"));
        assert_eq!(read_records(text.as_bytes()).unwrap(), records);
    }
}
