//! Core data model: position fixes, per-vessel trajectories, cluster labels
//! and the classification verdict.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Rejected trajectory input. Raised at construction so the analysis
/// pipeline itself never has to fail.
#[derive(Debug, Error, PartialEq)]
pub enum InvalidInputError {
    #[error("vessel {vessel_id}: non-finite coordinate at position {index} (lon={lon}, lat={lat})")]
    NonFiniteCoordinate {
        vessel_id: String,
        index: usize,
        lon: f64,
        lat: f64,
    },
    #[error("vessel {vessel_id}: non-finite speed over ground at position {index}")]
    NonFiniteSpeed { vessel_id: String, index: usize },
}

/// One reported fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub timestamp: DateTime<Utc>,
    pub lon: f64,
    pub lat: f64,
    /// Reported speed over ground, knots.
    pub sog: f64,
}

impl PositionRecord {
    pub fn new(timestamp: DateTime<Utc>, lon: f64, lat: f64, sog: f64) -> Self {
        Self {
            timestamp,
            lon,
            lat,
            sog,
        }
    }

    pub fn point(&self) -> crate::geo::GeoPoint {
        crate::geo::GeoPoint::new(self.lon, self.lat)
    }
}

/// All fixes of a single vessel, ascending by timestamp.
#[derive(Debug, Clone)]
pub struct Trajectory {
    vessel_id: String,
    positions: Vec<PositionRecord>,
}

impl Trajectory {
    /// Build a trajectory, stably sorting the fixes by timestamp.
    pub fn new(
        vessel_id: impl Into<String>,
        mut positions: Vec<PositionRecord>,
    ) -> Result<Self, InvalidInputError> {
        let vessel_id = vessel_id.into();
        for (index, p) in positions.iter().enumerate() {
            if !p.lon.is_finite() || !p.lat.is_finite() {
                return Err(InvalidInputError::NonFiniteCoordinate {
                    vessel_id,
                    index,
                    lon: p.lon,
                    lat: p.lat,
                });
            }
            if !p.sog.is_finite() {
                return Err(InvalidInputError::NonFiniteSpeed { vessel_id, index });
            }
        }
        positions.sort_by_key(|p| p.timestamp);
        Ok(Self {
            vessel_id,
            positions,
        })
    }

    pub fn vessel_id(&self) -> &str {
        &self.vessel_id
    }

    pub fn positions(&self) -> &[PositionRecord] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Cluster tag assigned to every fix by the density clusterer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterLabel(pub i32);

impl ClusterLabel {
    /// Points not dense enough to join any cluster.
    pub const NOISE: ClusterLabel = ClusterLabel(-1);

    pub fn is_noise(&self) -> bool {
        *self == Self::NOISE
    }
}

impl fmt::Display for ClusterLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Final verdict for one vessel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub has_problem: bool,
    pub has_location_spoofing: bool,
    pub has_identity_spoofing: bool,
    /// Distinct cluster labels (noise included), or -1 when not applicable.
    pub cluster_count: i32,
}

impl ClassificationResult {
    /// Classification does not apply to this trajectory.
    pub const NOT_APPLICABLE: ClassificationResult = ClassificationResult {
        has_problem: false,
        has_location_spoofing: false,
        has_identity_spoofing: false,
        cluster_count: -1,
    };

    /// No flags raised.
    pub fn clean(cluster_count: i32) -> Self {
        Self {
            cluster_count,
            ..Self::NOT_APPLICABLE
        }
    }

    pub fn is_applicable(&self) -> bool {
        self.cluster_count >= 0
    }
}

/// A boundary fix flagged during an anomalous transition, in the same shape
/// as the input record plus the cluster it was attributed to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierRecord {
    pub vessel_id: String,
    pub timestamp: DateTime<Utc>,
    pub lon: f64,
    pub lat: f64,
    pub sog: f64,
    pub cluster_label: ClusterLabel,
}

impl OutlierRecord {
    pub fn new(vessel_id: &str, record: &PositionRecord, cluster_label: ClusterLabel) -> Self {
        Self {
            vessel_id: vessel_id.to_string(),
            timestamp: record.timestamp,
            lon: record.lon,
            lat: record.lat,
            sog: record.sog,
            cluster_label,
        }
    }
}
