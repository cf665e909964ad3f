//! Final verdict from the anomalous-transition density.

use super::transitions::{segment_speed, TransitionScan};
use crate::geo::DistanceMetric;
use crate::model::{ClassificationResult, ClusterLabel, PositionRecord};
use std::collections::HashMap;

pub struct SpoofingClassifier {
    metric: DistanceMetric,
    /// Meters per second.
    threshold: f64,
    density_cutoff: f64,
}

impl SpoofingClassifier {
    pub fn new(metric: DistanceMetric, threshold: f64, density_cutoff: f64) -> Self {
        Self {
            metric,
            threshold,
            density_cutoff,
        }
    }

    /// Classify from the transition scan.
    ///
    /// A high anomaly density with a speed violation inside some cluster
    /// points at GPS jumps (location spoofing). A high density whose clusters
    /// are each internally consistent points at two craft sharing one
    /// identifier. A low nonzero density is treated as isolated GPS noise.
    pub fn classify(
        &self,
        scan: &TransitionScan,
        positions: &[PositionRecord],
        labels: &[ClusterLabel],
        cluster_count: i32,
    ) -> ClassificationResult {
        let density = scan.density();
        let mut result = ClassificationResult::clean(cluster_count);

        if density > self.density_cutoff {
            result.has_problem = true;
            if self.has_intra_cluster_violation(positions, labels) {
                result.has_location_spoofing = true;
            } else {
                result.has_identity_spoofing = true;
            }
        } else if density > 0.0 {
            result.has_problem = true;
            result.has_location_spoofing = true;
        }
        result
    }

    /// Whether any two chronologically consecutive members of the same
    /// cluster (noise included) are further apart than the threshold allows.
    pub fn has_intra_cluster_violation(&self, positions: &[PositionRecord], labels: &[ClusterLabel]) -> bool {
        let mut last_member: HashMap<ClusterLabel, &PositionRecord> = HashMap::new();
        for (p, label) in positions.iter().zip(labels) {
            if let Some(prev) = last_member.insert(*label, p) {
                if segment_speed(self.metric, prev, p) > self.threshold {
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn fix(secs: i64, lon: f64) -> PositionRecord {
        PositionRecord::new(Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(), lon, 0.0, 5.0)
    }

    fn scan(anomalous: usize, total: usize) -> TransitionScan {
        TransitionScan {
            anomalous_count: anomalous,
            total_points: total,
            transition_count: anomalous,
            ..Default::default()
        }
    }

    fn labels(raw: &[i32]) -> Vec<ClusterLabel> {
        raw.iter().copied().map(ClusterLabel).collect()
    }

    #[test]
    fn test_zero_density_is_clean() {
        let c = SpoofingClassifier::new(DistanceMetric::Haversine, 10.0, 0.1);
        let result = c.classify(&scan(0, 20), &[], &[], 2);
        assert_eq!(result, ClassificationResult::clean(2));
    }

    #[test]
    fn test_low_density_is_location_spoofing() {
        let c = SpoofingClassifier::new(DistanceMetric::Haversine, 10.0, 0.1);
        let result = c.classify(&scan(1, 20), &[], &[], 2);
        assert!(result.has_problem);
        assert!(result.has_location_spoofing);
        assert!(!result.has_identity_spoofing);
    }

    #[test]
    fn test_density_at_cutoff_is_location_spoofing() {
        let c = SpoofingClassifier::new(DistanceMetric::Haversine, 10.0, 0.1);
        let result = c.classify(&scan(2, 20), &[], &[], 2);
        assert!(result.has_location_spoofing);
        assert!(!result.has_identity_spoofing);
    }

    #[test]
    fn test_high_density_consistent_clusters_is_identity_spoofing() {
        // Two clusters interleaved in time, each internally slow.
        let positions = vec![fix(0, 0.0), fix(60, 1.0), fix(120, 0.0), fix(180, 1.0)];
        let c = SpoofingClassifier::new(DistanceMetric::Haversine, 10.0, 0.1);
        let result = c.classify(&scan(3, 4), &positions, &labels(&[0, 1, 0, 1]), 2);
        assert!(result.has_problem);
        assert!(!result.has_location_spoofing);
        assert!(result.has_identity_spoofing);
    }

    #[test]
    fn test_high_density_with_intra_cluster_jump_is_location_spoofing() {
        let positions = vec![fix(0, 0.0), fix(60, 1.0), fix(120, 0.5), fix(180, 1.0)];
        let c = SpoofingClassifier::new(DistanceMetric::Haversine, 10.0, 0.1);
        let result = c.classify(&scan(3, 4), &positions, &labels(&[0, 1, 0, 1]), 2);
        assert!(result.has_location_spoofing);
        assert!(!result.has_identity_spoofing);
    }
}
