//! Cluster-boundary transitions along the time-ordered trajectory.

use super::cluster::ClusterStats;
use crate::geo::DistanceMetric;
use crate::model::{ClusterLabel, PositionRecord};
use std::collections::HashSet;

/// Speed between two fixes in meters/second. Zero elapsed time yields 0.
pub fn segment_speed(metric: DistanceMetric, a: &PositionRecord, b: &PositionRecord) -> f64 {
    let elapsed = (b.timestamp - a.timestamp).num_milliseconds().abs() as f64 / 1000.0;
    if elapsed == 0.0 {
        return 0.0;
    }
    metric.distance(a.point(), b.point()) / elapsed
}

/// An anomalous jump between two clusters.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionEvent {
    pub predecessor: PositionRecord,
    pub successor: PositionRecord,
    pub predecessor_label: ClusterLabel,
    pub successor_label: ClusterLabel,
    /// Meters per second.
    pub speed: f64,
    /// The smaller of the two straddling clusters.
    pub outlier_label: ClusterLabel,
}

impl TransitionEvent {
    /// The boundary fix on the outlier side of the jump.
    pub fn outlier_point(&self) -> &PositionRecord {
        if self.outlier_label == self.successor_label {
            &self.successor
        } else {
            &self.predecessor
        }
    }
}

/// A flagged boundary fix and the cluster it was attributed to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlaggedPoint {
    pub record: PositionRecord,
    pub label: ClusterLabel,
}

#[derive(Debug, Clone, Default)]
pub struct TransitionScan {
    pub events: Vec<TransitionEvent>,
    /// Outlier boundary fixes, deduplicated by (timestamp, lon, lat).
    pub outliers: Vec<FlaggedPoint>,
    /// Label changes seen, anomalous or not.
    pub transition_count: usize,
    pub anomalous_count: usize,
    pub total_points: usize,
}

impl TransitionScan {
    pub fn density(&self) -> f64 {
        if self.total_points == 0 {
            return 0.0;
        }
        self.anomalous_count as f64 / self.total_points as f64
    }
}

pub struct TransitionScanner {
    metric: DistanceMetric,
    /// Meters per second.
    threshold: f64,
}

impl TransitionScanner {
    pub fn new(metric: DistanceMetric, threshold: f64) -> Self {
        Self { metric, threshold }
    }

    pub fn scan(
        &self,
        positions: &[PositionRecord],
        labels: &[ClusterLabel],
        stats: &ClusterStats,
    ) -> TransitionScan {
        let mut scan = TransitionScan {
            total_points: positions.len(),
            ..Default::default()
        };
        let mut flagged = Vec::new();

        for i in 1..positions.len().min(labels.len()) {
            let (prev_label, cur_label) = (labels[i - 1], labels[i]);
            if prev_label == cur_label {
                continue;
            }
            scan.transition_count += 1;

            let (prev, cur) = (&positions[i - 1], &positions[i]);
            let speed = segment_speed(self.metric, prev, cur);
            if speed <= self.threshold {
                continue;
            }

            scan.anomalous_count += 1;
            // Ties go to the predecessor's cluster.
            let (outlier_label, outlier_point) =
                if stats.member_count(prev_label) > stats.member_count(cur_label) {
                    (cur_label, cur)
                } else {
                    (prev_label, prev)
                };
            flagged.push(FlaggedPoint {
                record: *outlier_point,
                label: outlier_label,
            });
            scan.events.push(TransitionEvent {
                predecessor: *prev,
                successor: *cur,
                predecessor_label: prev_label,
                successor_label: cur_label,
                speed,
                outlier_label,
            });
        }

        scan.outliers = dedup_keep_last(flagged);
        scan
    }
}

fn dedup_keep_last(points: Vec<FlaggedPoint>) -> Vec<FlaggedPoint> {
    let mut seen = HashSet::new();
    let mut kept: Vec<FlaggedPoint> = points
        .into_iter()
        .rev()
        .filter(|p| {
            seen.insert((
                p.record.timestamp,
                p.record.lon.to_bits(),
                p.record.lat.to_bits(),
            ))
        })
        .collect();
    kept.reverse();
    kept
}
