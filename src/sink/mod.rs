//! Outlier sinks: where flagged boundary fixes and per-cluster members go
//! once a vessel is analyzed.

mod csv_dir;

pub use csv_dir::CsvDirOutlierSink;

use crate::model::{ClusterLabel, OutlierRecord, PositionRecord};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("outlier sink I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("outlier sink CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("outlier sink storage error: {0}")]
    Storage(String),
}

/// Receives the analysis output of one vessel.
///
/// For every classified vessel the detector calls [`begin`](Self::begin)
/// once, then [`record_cluster`](Self::record_cluster) once per cluster
/// label, then [`record`](Self::record) once per label that owns outliers.
/// Whatever a sink kept for the vessel from an earlier classification is
/// replaced, never extended.
pub trait OutlierSink: Send + Sync {
    fn begin(&self, _vessel_id: &str) -> Result<(), SinkError> {
        Ok(())
    }

    fn record(
        &self,
        vessel_id: &str,
        cluster_label: ClusterLabel,
        points: &[OutlierRecord],
    ) -> Result<(), SinkError>;

    /// Members of one cluster (noise included), ascending by timestamp.
    fn record_cluster(
        &self,
        _vessel_id: &str,
        _cluster_label: ClusterLabel,
        _members: &[PositionRecord],
    ) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Keeps outliers in memory, queryable by vessel identifier.
#[derive(Debug, Default)]
pub struct MemoryOutlierSink {
    inner: RwLock<BTreeMap<String, Vec<OutlierRecord>>>,
}

impl MemoryOutlierSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, vessel_id: &str) -> Option<Vec<OutlierRecord>> {
        self.inner.read().get(vessel_id).cloned()
    }

    pub fn vessel_ids(&self) -> Vec<String> {
        self.inner.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }
}

impl OutlierSink for MemoryOutlierSink {
    fn begin(&self, vessel_id: &str) -> Result<(), SinkError> {
        self.inner.write().remove(vessel_id);
        Ok(())
    }

    fn record(
        &self,
        vessel_id: &str,
        _cluster_label: ClusterLabel,
        points: &[OutlierRecord],
    ) -> Result<(), SinkError> {
        self.inner
            .write()
            .entry(vessel_id.to_string())
            .or_default()
            .extend_from_slice(points);
        Ok(())
    }
}

/// Forwards every call to each inner sink, stopping at the first failure.
#[derive(Default)]
pub struct FanOutSink {
    sinks: Vec<Arc<dyn OutlierSink>>,
}

impl FanOutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Arc<dyn OutlierSink>) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl OutlierSink for FanOutSink {
    fn begin(&self, vessel_id: &str) -> Result<(), SinkError> {
        for sink in &self.sinks {
            sink.begin(vessel_id)?;
        }
        Ok(())
    }

    fn record(
        &self,
        vessel_id: &str,
        cluster_label: ClusterLabel,
        points: &[OutlierRecord],
    ) -> Result<(), SinkError> {
        for sink in &self.sinks {
            sink.record(vessel_id, cluster_label, points)?;
        }
        Ok(())
    }

    fn record_cluster(
        &self,
        vessel_id: &str,
        cluster_label: ClusterLabel,
        members: &[PositionRecord],
    ) -> Result<(), SinkError> {
        for sink in &self.sinks {
            sink.record_cluster(vessel_id, cluster_label, members)?;
        }
        Ok(())
    }
}
