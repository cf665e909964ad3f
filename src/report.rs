//! Result table export (`spoof_status.csv`).

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::model::ClassificationResult;

/// One row of the status table, column names as downstream consumers
/// expect them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRow {
    #[serde(rename = "MMSI")]
    pub identifier: String,
    #[serde(rename = "hasProblem")]
    pub has_problem: bool,
    #[serde(rename = "hasLocationSpoofing")]
    pub has_location_spoofing: bool,
    #[serde(rename = "hasIdentitySpoofing")]
    pub has_identity_spoofing: bool,
    #[serde(rename = "CountOfClusters")]
    pub cluster_count: i32,
}

impl StatusRow {
    pub fn new(identifier: &str, r: &ClassificationResult) -> Self {
        Self {
            identifier: identifier.to_string(),
            has_problem: r.has_problem,
            has_location_spoofing: r.has_location_spoofing,
            has_identity_spoofing: r.has_identity_spoofing,
            cluster_count: r.cluster_count,
        }
    }
}

pub fn status_rows(results: &BTreeMap<String, ClassificationResult>) -> Vec<StatusRow> {
    results.iter().map(|(id, r)| StatusRow::new(id, r)).collect()
}

pub fn write_status_csv<W: Write>(writer: W, results: &BTreeMap<String, ClassificationResult>) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in status_rows(results) {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Plain-text table for terminal output.
pub fn render_table(results: &BTreeMap<String, ClassificationResult>) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<12} | {:<7} | {:<8} | {:<8} | Clusters\n",
        "MMSI", "Problem", "Location", "Identity"
    ));
    out.push_str(&format!("{:-<12}-|-{:-<7}-|-{:-<8}-|-{:-<8}-|-{:-<8}\n", "", "", "", "", ""));
    let yes_no = |b: bool| if b { "yes" } else { "no" };
    for (id, r) in results {
        let clusters = if r.is_applicable() {
            r.cluster_count.to_string()
        } else {
            "n/a".to_string()
        };
        out.push_str(&format!(
            "{:<12} | {:<7} | {:<8} | {:<8} | {}\n",
            id,
            yes_no(r.has_problem),
            yes_no(r.has_location_spoofing),
            yes_no(r.has_identity_spoofing),
            clusters
        ));
    }
    out
}
