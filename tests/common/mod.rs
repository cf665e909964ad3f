//! Synthetic trajectory builders shared by the integration tests.
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use spoofwatch::{PositionRecord, Trajectory};

pub const M_PER_DEG_LAT: f64 = 111_195.0;

pub const BASE_LON: f64 = 23.60;
pub const BASE_LAT: f64 = 37.90;

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_530_439_200 + secs, 0).unwrap()
}

/// Move `east_m` / `north_m` meters from a reference point.
pub fn offset(lon: f64, lat: f64, east_m: f64, north_m: f64) -> (f64, f64) {
    let d_lat = north_m / M_PER_DEG_LAT;
    let d_lon = east_m / (M_PER_DEG_LAT * lat.to_radians().cos());
    (lon + d_lon, lat + d_lat)
}

/// Ten fixes on a 5 x 2 grid with 10 m spacing, row-major.
pub fn grid_site(origin_east_m: f64) -> Vec<(f64, f64)> {
    (0..10)
        .map(|i| {
            offset(
                BASE_LON,
                BASE_LAT,
                origin_east_m + (i % 5) as f64 * 10.0,
                (i / 5) as f64 * 10.0,
            )
        })
        .collect()
}

/// Speeds alternating 4 and 6 knots: mean 5, std 1, threshold 9 knots.
pub fn sog(i: usize) -> f64 {
    if i % 2 == 0 {
        4.0
    } else {
        6.0
    }
}

/// Visit two grid sites 5 km apart following `pattern` (0 = west site,
/// 1 = east site), one fix every 60 s.
pub fn two_site_trajectory(id: &str, pattern: &[usize]) -> Trajectory {
    let sites = [grid_site(0.0), grid_site(5_000.0)];
    let mut next = [0usize, 0usize];
    let positions = pattern
        .iter()
        .enumerate()
        .map(|(i, &site)| {
            let (lon, lat) = sites[site][next[site] % 10];
            next[site] += 1;
            PositionRecord::new(at(i as i64 * 60), lon, lat, sog(i))
        })
        .collect();
    Trajectory::new(id, positions).unwrap()
}

/// Ten fixes at the west site, then ten at the east site.
pub fn single_jump_pattern() -> Vec<usize> {
    let mut p = vec![0; 10];
    p.extend(vec![1; 10]);
    p
}

/// Six site changes over twenty fixes, ten at each site: anomaly
/// density 0.3.
pub fn interleaved_pattern() -> Vec<usize> {
    vec![0, 0, 0, 1, 1, 1, 0, 0, 0, 1, 1, 1, 0, 0, 0, 1, 1, 1, 1, 0]
}

/// Twenty fixes within ~50 m of each other at a constant 3 knots.
pub fn tight_cluster(id: &str) -> Trajectory {
    let positions = (0..20)
        .map(|i| {
            let (lon, lat) = offset(BASE_LON, BASE_LAT, (i % 5) as f64 * 10.0, (i / 5) as f64 * 10.0);
            PositionRecord::new(at(i as i64 * 60), lon, lat, 3.0)
        })
        .collect();
    Trajectory::new(id, positions).unwrap()
}

pub fn anchored(id: &str) -> Trajectory {
    let positions = (0..30)
        .map(|i| {
            let (lon, lat) = offset(BASE_LON, BASE_LAT, (i % 3) as f64, 0.0);
            PositionRecord::new(at(i as i64 * 300), lon, lat, if i % 10 == 0 { 0.1 } else { 0.0 })
        })
        .collect();
    Trajectory::new(id, positions).unwrap()
}
