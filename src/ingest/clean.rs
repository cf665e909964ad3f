//! Record cleaning ahead of analysis.

use super::{parse_timestamp, AisRecord};
use crate::config::IngestConfig;
use tracing::info;

/// Summary of what cleaning dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CleaningReport {
    pub input: usize,
    pub incomplete: usize,
    pub invalid_movement: usize,
    pub invalid_vessel_id: usize,
    pub kept: usize,
}

/// Rows missing lat, lon, t or speed. Course is only required when the
/// input carries a course column at all.
pub fn is_incomplete(r: &AisRecord, require_course: bool) -> bool {
    let ts_missing = r
        .timestamp
        .as_deref()
        .map_or(true, |t| parse_timestamp(t).is_none());
    r.lat.is_none()
        || r.lon.is_none()
        || r.speed.is_none()
        || ts_missing
        || (require_course && r.course.is_none())
}

/// SOG within the configured range, COG in [0, 360), and coordinates on
/// the globe.
pub fn has_valid_movement(r: &AisRecord, cfg: &IngestConfig) -> bool {
    let in_range = |v: Option<f64>, lo: f64, hi: f64| v.is_some_and(|v| v >= lo && v <= hi);
    let course_ok = r.course.map_or(true, |c| (0.0..360.0).contains(&c));
    in_range(r.speed, cfg.min_speed_knots, cfg.max_speed_knots)
        && course_ok
        && in_range(r.lat, -90.0, 90.0)
        && in_range(r.lon, -180.0, 180.0)
}

/// Nine characters, not a run of one repeated digit, not `123456789`.
pub fn is_valid_mmsi(id: &str) -> bool {
    if id.len() != 9 || id == "123456789" {
        return false;
    }
    let first = id.as_bytes()[0];
    !(first.is_ascii_digit() && id.bytes().all(|b| b == first))
}

/// Apply every cleaning rule, returning the kept records and a summary.
pub fn clean(records: Vec<AisRecord>, cfg: &IngestConfig) -> (Vec<AisRecord>, CleaningReport) {
    let mut report = CleaningReport {
        input: records.len(),
        ..Default::default()
    };
    let require_course = records.iter().any(|r| r.course.is_some());

    let kept: Vec<AisRecord> = records
        .into_iter()
        .filter(|r| {
            if is_incomplete(r, require_course) {
                report.incomplete += 1;
                false
            } else if !has_valid_movement(r, cfg) {
                report.invalid_movement += 1;
                false
            } else if cfg.require_valid_mmsi && !is_valid_mmsi(&r.identifier) {
                report.invalid_vessel_id += 1;
                false
            } else {
                true
            }
        })
        .collect();

    report.kept = kept.len();
    info!(
        input = report.input,
        kept = report.kept,
        incomplete = report.incomplete,
        invalid_movement = report.invalid_movement,
        invalid_vessel_id = report.invalid_vessel_id,
        "cleaned AIS records"
    );
    (kept, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, speed: Option<f64>, course: Option<f64>, lat: f64, lon: f64) -> AisRecord {
        AisRecord {
            identifier: id.to_string(),
            timestamp: Some("2018-07-01 10:00:00".to_string()),
            lon: Some(lon),
            lat: Some(lat),
            speed,
            course,
            heading: None,
            status: None,
            shiptype: None,
            draught: None,
            destination: None,
        }
    }

    #[test]
    fn test_mmsi_rules() {
        assert!(is_valid_mmsi("237000001"));
        assert!(!is_valid_mmsi("111111111"));
        assert!(!is_valid_mmsi("000000000"));
        assert!(!is_valid_mmsi("123456789"));
        assert!(!is_valid_mmsi("23700001"));
    }

    #[test]
    fn test_movement_bounds() {
        let cfg = IngestConfig::default();
        assert!(has_valid_movement(&record("237000001", Some(80.0), Some(0.0), 90.0, -180.0), &cfg));
        assert!(!has_valid_movement(&record("237000001", Some(80.1), Some(0.0), 0.0, 0.0), &cfg));
        assert!(!has_valid_movement(&record("237000001", Some(5.0), Some(360.0), 0.0, 0.0), &cfg));
        assert!(!has_valid_movement(&record("237000001", Some(5.0), Some(10.0), 91.0, 0.0), &cfg));
        assert!(!has_valid_movement(&record("237000001", Some(-1.0), None, 0.0, 0.0), &cfg));
    }

    #[test]
    fn test_clean_counts_each_drop_once() {
        let mut missing_ts = record("237000001", Some(5.0), Some(10.0), 37.0, 23.0);
        missing_ts.timestamp = None;
        let records = vec![
            record("237000001", Some(5.0), Some(10.0), 37.0, 23.0),
            record("237000001", None, Some(10.0), 37.0, 23.0),
            record("237000001", Some(5.0), None, 37.0, 23.0),
            record("237000001", Some(95.0), Some(10.0), 37.0, 23.0),
            record("111111111", Some(5.0), Some(10.0), 37.0, 23.0),
            missing_ts,
        ];

        let cfg = IngestConfig {
            require_valid_mmsi: true,
            ..Default::default()
        };
        let (kept, report) = clean(records, &cfg);
        assert_eq!(kept.len(), 1);
        assert_eq!(report.incomplete, 3);
        assert_eq!(report.invalid_movement, 1);
        assert_eq!(report.invalid_vessel_id, 1);
        assert_eq!(report.kept, 1);
        assert_eq!(report.input, 6);
    }

    #[test]
    fn test_course_optional_without_course_column() {
        let records = vec![record("237000001", Some(5.0), None, 37.0, 23.0)];
        let (kept, _) = clean(records, &IngestConfig::default());
        assert_eq!(kept.len(), 1);
    }
}
