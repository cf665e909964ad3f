//! Per-vessel trajectory analysis.
//!
//! Stages run strictly forward, each handing an immutable result to the
//! next: speed threshold, neighbor radius, density clustering, transition
//! scan, classification. Any stage may end the analysis early with a
//! well-formed verdict; nothing here returns an error.

pub mod classify;
pub mod cluster;
pub mod neighbors;
pub mod stats;
pub mod threshold;
pub mod transitions;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::DetectorConfig;
use crate::geo::LocalProjection;
use crate::model::{ClassificationResult, ClusterLabel, OutlierRecord, PositionRecord, Trajectory};
use crate::sink::OutlierSink;

use self::classify::SpoofingClassifier;
use self::cluster::DensityClusterer;
use self::neighbors::{NeighborhoodAnalyzer, SpatialIndex};
use self::threshold::SpeedThreshold;
use self::transitions::{TransitionEvent, TransitionScanner};

/// Why a trajectory was not fully analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Empty,
    Stationary,
    TooFewPoints,
    DegenerateRadius,
    SingleCluster,
}

/// Everything learned about one vessel.
#[derive(Debug, Clone)]
pub struct VesselReport {
    pub vessel_id: String,
    pub result: ClassificationResult,
    pub skipped: Option<SkipReason>,
    pub threshold: Option<SpeedThreshold>,
    /// Clustering radius in meters.
    pub eps: Option<f64>,
    /// One label per fix, in trajectory order. Empty when clustering never ran.
    pub labels: Vec<ClusterLabel>,
    /// Anomalous transitions per fix.
    pub density: Option<f64>,
    pub transitions: Vec<TransitionEvent>,
    pub outliers: Vec<OutlierRecord>,
}

impl VesselReport {
    fn skipped(trajectory: &Trajectory, reason: SkipReason, result: ClassificationResult) -> Self {
        Self {
            vessel_id: trajectory.vessel_id().to_string(),
            result,
            skipped: Some(reason),
            threshold: None,
            eps: None,
            labels: Vec::new(),
            density: None,
            transitions: Vec::new(),
            outliers: Vec::new(),
        }
    }

    /// Fixes of `trajectory` grouped by cluster label.
    pub fn members_by_label(&self, trajectory: &Trajectory) -> BTreeMap<ClusterLabel, Vec<PositionRecord>> {
        let mut grouped: BTreeMap<ClusterLabel, Vec<PositionRecord>> = BTreeMap::new();
        for (p, label) in trajectory.positions().iter().zip(&self.labels) {
            grouped.entry(*label).or_default().push(*p);
        }
        grouped
    }

    /// Outliers grouped by the cluster they were attributed to.
    pub fn outliers_by_label(&self) -> BTreeMap<ClusterLabel, Vec<OutlierRecord>> {
        let mut grouped: BTreeMap<ClusterLabel, Vec<OutlierRecord>> = BTreeMap::new();
        for o in &self.outliers {
            grouped.entry(o.cluster_label).or_default().push(o.clone());
        }
        grouped
    }
}

/// Classifies trajectories and forwards their outliers to an optional sink.
#[derive(Clone)]
pub struct Detector {
    config: DetectorConfig,
    sink: Option<Arc<dyn OutlierSink>>,
}

impl Detector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config, sink: None }
    }

    pub fn with_sink(mut self, sink: Arc<dyn OutlierSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Classify one trajectory, handing clusters and outliers to the sink.
    pub fn classify(&self, trajectory: &Trajectory) -> ClassificationResult {
        let report = self.analyze(trajectory);
        self.publish(trajectory, &report);
        report.result
    }

    /// Run the full analysis without side effects.
    pub fn analyze(&self, trajectory: &Trajectory) -> VesselReport {
        let cfg = &self.config;
        let vessel_id = trajectory.vessel_id();
        let positions = trajectory.positions();

        let threshold =
            SpeedThreshold::estimate(positions.iter().map(|p| p.sog), cfg.sigma_multiplier);
        if threshold.is_stationary(cfg.stationary_knots) {
            debug!(%vessel_id, threshold_knots = threshold.knots, "stationary vessel, skipping");
            return VesselReport::skipped(trajectory, SkipReason::Stationary, ClassificationResult::NOT_APPLICABLE);
        }
        if trajectory.is_empty() {
            return VesselReport::skipped(trajectory, SkipReason::Empty, ClassificationResult::NOT_APPLICABLE);
        }

        let projection = LocalProjection::centered_on(positions.iter().map(|p| p.point()));
        let points: Vec<[f64; 2]> = positions.iter().map(|p| projection.project(p.point())).collect();
        let index = SpatialIndex::build(&points);

        let Some(hood) = NeighborhoodAnalyzer::new(cfg.neighbor_count, cfg.eps_quantile).analyze(&index, &points) else {
            debug!(%vessel_id, points = points.len(), k = cfg.neighbor_count, "too few points for neighbor search");
            return VesselReport::skipped(trajectory, SkipReason::TooFewPoints, ClassificationResult::NOT_APPLICABLE);
        };
        if hood.is_degenerate() {
            debug!(%vessel_id, "all fixes coincide, zero clustering radius");
            return VesselReport::skipped(trajectory, SkipReason::DegenerateRadius, ClassificationResult::NOT_APPLICABLE);
        }

        let clustering = DensityClusterer::new(hood.eps, cfg.min_samples).fit_indexed(&index, &points);
        let cluster_count = clustering.label_count() as i32;
        debug!(%vessel_id, eps_m = hood.eps, cluster_count, "clustered trajectory");
        if clustering.label_count() <= 1 {
            let mut report =
                VesselReport::skipped(trajectory, SkipReason::SingleCluster, ClassificationResult::clean(cluster_count));
            report.threshold = Some(threshold);
            report.eps = Some(hood.eps);
            report.labels = clustering.labels;
            return report;
        }

        let threshold_mps = threshold.meters_per_second();
        let scan = TransitionScanner::new(cfg.distance_metric, threshold_mps).scan(
            positions,
            &clustering.labels,
            &clustering.stats,
        );
        let result = SpoofingClassifier::new(cfg.distance_metric, threshold_mps, cfg.density_cutoff).classify(
            &scan,
            positions,
            &clustering.labels,
            cluster_count,
        );
        debug!(
            %vessel_id,
            transitions = scan.transition_count,
            anomalous = scan.anomalous_count,
            density = scan.density(),
            ?result,
            "classified trajectory"
        );

        let outliers = scan
            .outliers
            .iter()
            .map(|f| OutlierRecord::new(vessel_id, &f.record, f.label))
            .collect();

        VesselReport {
            vessel_id: vessel_id.to_string(),
            result,
            skipped: None,
            threshold: Some(threshold),
            eps: Some(hood.eps),
            density: Some(scan.density()),
            labels: clustering.labels,
            transitions: scan.events,
            outliers,
        }
    }

    /// Forward a report's clusters and outliers to the sink. Sink failures
    /// are logged and never change the verdict.
    pub fn publish(&self, trajectory: &Trajectory, report: &VesselReport) {
        let Some(sink) = &self.sink else {
            return;
        };
        if let Err(e) = sink.begin(&report.vessel_id) {
            warn!(vessel_id = %report.vessel_id, error = %e, "failed to reset outlier sink");
            return;
        }
        for (label, members) in report.members_by_label(trajectory) {
            if let Err(e) = sink.record_cluster(&report.vessel_id, label, &members) {
                warn!(vessel_id = %report.vessel_id, %label, error = %e, "failed to record cluster members");
            }
        }
        for (label, points) in report.outliers_by_label() {
            if let Err(e) = sink.record(&report.vessel_id, label, &points) {
                warn!(vessel_id = %report.vessel_id, %label, error = %e, "failed to record outliers");
            }
        }
    }
}

impl Default for Detector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}
