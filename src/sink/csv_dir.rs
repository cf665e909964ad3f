//! Per-vessel CSV files: `{dir}/{vessel}_outlier.csv` for outliers and
//! `{dir}/{vessel}_trajectoryID_{label}.csv` for each cluster's members.

use super::{OutlierSink, SinkError};
use crate::model::{ClusterLabel, OutlierRecord, PositionRecord};
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Writes each vessel's outliers and cluster members to its own files.
/// `begin` removes the vessel's previous outlier file; outlier calls then
/// append, writing the header only into an empty file. Cluster files are
/// rewritten whole.
pub struct CsvDirOutlierSink {
    dir: PathBuf,
}

impl CsvDirOutlierSink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, vessel_id: &str) -> PathBuf {
        self.dir.join(format!("{}_outlier.csv", sanitize(vessel_id)))
    }

    pub fn cluster_path_for(&self, vessel_id: &str, cluster_label: ClusterLabel) -> PathBuf {
        self.dir
            .join(format!("{}_trajectoryID_{}.csv", sanitize(vessel_id), cluster_label))
    }
}

/// Keep identifiers usable as file names.
fn sanitize(vessel_id: &str) -> String {
    vessel_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

impl OutlierSink for CsvDirOutlierSink {
    fn begin(&self, vessel_id: &str) -> Result<(), SinkError> {
        match std::fs::remove_file(self.path_for(vessel_id)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn record(
        &self,
        vessel_id: &str,
        _cluster_label: ClusterLabel,
        points: &[OutlierRecord],
    ) -> Result<(), SinkError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(vessel_id))?;
        let fresh = file.metadata()?.len() == 0;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(fresh)
            .from_writer(file);
        for p in points {
            writer.serialize(p)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn record_cluster(
        &self,
        vessel_id: &str,
        cluster_label: ClusterLabel,
        members: &[PositionRecord],
    ) -> Result<(), SinkError> {
        let file = File::create(self.cluster_path_for(vessel_id, cluster_label))?;
        let mut writer = csv::Writer::from_writer(file);
        for m in members {
            writer.serialize(OutlierRecord::new(vessel_id, m, cluster_label))?;
        }
        writer.flush()?;
        Ok(())
    }
}
