//! Great-circle distance and local planar projection.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

const STATUTE_MILES_PER_DEGREE: f64 = 60.0 * 1.1515;
const KM_PER_STATUTE_MILE: f64 = 1.609344;

/// A geographic point in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// Distance formula used for transition speeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Haversine on a sphere of radius [`EARTH_RADIUS_M`].
    #[default]
    Haversine,
    /// Spherical law of cosines in statute miles, converted to meters and
    /// rounded to the nearest 10 m.
    LawOfCosines,
}

impl DistanceMetric {
    /// Distance in meters.
    pub fn distance(&self, a: GeoPoint, b: GeoPoint) -> f64 {
        match self {
            DistanceMetric::Haversine => haversine(a, b),
            DistanceMetric::LawOfCosines => law_of_cosines(a, b),
        }
    }
}

/// Haversine great-circle distance in meters.
pub fn haversine(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = lat2 - lat1;
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // Round-off can push h a hair past 1 for antipodal points.
    let c = 2.0 * h.clamp(0.0, 1.0).sqrt().atan2((1.0 - h).clamp(0.0, 1.0).sqrt());
    EARTH_RADIUS_M * c
}

/// Spherical law of cosines distance in meters.
pub fn law_of_cosines(a: GeoPoint, b: GeoPoint) -> f64 {
    if a == b {
        return 0.0;
    }
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let theta = (a.lon - b.lon).to_radians();

    let cos_angle = lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * theta.cos();
    let degrees = cos_angle.clamp(-1.0, 1.0).acos().to_degrees();
    let km = degrees * STATUTE_MILES_PER_DEGREE * KM_PER_STATUTE_MILE;
    (km * 100.0).round() / 100.0 * 1000.0
}

/// Equirectangular projection around a reference point, in meters east and
/// north. Accurate over the extent of a single vessel's daily track.
#[derive(Debug, Clone, Copy)]
pub struct LocalProjection {
    origin: GeoPoint,
    cos_lat: f64,
}

impl LocalProjection {
    pub fn new(origin: GeoPoint) -> Self {
        Self {
            origin,
            cos_lat: origin.lat.to_radians().cos(),
        }
    }

    /// Projection centered on the mean position of `points`.
    pub fn centered_on(points: impl IntoIterator<Item = GeoPoint>) -> Self {
        let (mut lon, mut lat, mut n) = (0.0, 0.0, 0usize);
        for p in points {
            lon += p.lon;
            lat += p.lat;
            n += 1;
        }
        if n == 0 {
            return Self::new(GeoPoint::new(0.0, 0.0));
        }
        Self::new(GeoPoint::new(lon / n as f64, lat / n as f64))
    }

    pub fn project(&self, p: GeoPoint) -> [f64; 2] {
        let x = EARTH_RADIUS_M * (p.lon - self.origin.lon).to_radians() * self.cos_lat;
        let y = EARTH_RADIUS_M * (p.lat - self.origin.lat).to_radians();
        [x, y]
    }
}
