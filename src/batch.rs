//! Fleet-wide classification: one independent task per vessel on a rayon
//! pool, cancellable between vessels.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::analysis::Detector;
use crate::model::{ClassificationResult, Trajectory};

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    pub results: BTreeMap<String, ClassificationResult>,
    /// Vessels with any flag raised.
    pub flagged: usize,
    /// Vessels where classification did not apply.
    pub skipped: usize,
    /// Vessels never started because the batch was cancelled.
    pub cancelled: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Classify every trajectory. `workers == 0` uses rayon's global pool.
pub fn classify_fleet(
    trajectories: &BTreeMap<String, Trajectory>,
    detector: &Detector,
    workers: usize,
    cancel: &AtomicBool,
) -> Result<BatchOutcome> {
    let started = Instant::now();

    let run = || -> Vec<(String, Option<ClassificationResult>)> {
        trajectories
            .par_iter()
            .map(|(id, trajectory)| {
                if cancel.load(Ordering::Relaxed) {
                    return (id.clone(), None);
                }
                (id.clone(), Some(detector.classify(trajectory)))
            })
            .collect()
    };

    let verdicts = if workers == 0 {
        run()
    } else {
        rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .context("failed to build worker pool")?
            .install(run)
    };

    let mut outcome = BatchOutcome::default();
    for (id, verdict) in verdicts {
        match verdict {
            Some(result) => {
                if result.has_problem {
                    outcome.flagged += 1;
                }
                if !result.is_applicable() {
                    outcome.skipped += 1;
                }
                outcome.results.insert(id, result);
            }
            None => outcome.cancelled += 1,
        }
    }
    outcome.elapsed = started.elapsed();

    info!(
        vessels = trajectories.len(),
        classified = outcome.results.len(),
        flagged = outcome.flagged,
        skipped = outcome.skipped,
        cancelled = outcome.cancelled,
        elapsed_ms = outcome.elapsed.as_millis() as u64,
        "fleet classification finished"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PositionRecord;
    use chrono::{TimeZone, Utc};

    fn anchored(id: &str) -> Trajectory {
        let positions = (0..10)
            .map(|i| PositionRecord::new(Utc.timestamp_opt(1_700_000_000 + i * 60, 0).unwrap(), 23.0, 37.0, 0.0))
            .collect();
        Trajectory::new(id, positions).unwrap()
    }

    fn fleet() -> BTreeMap<String, Trajectory> {
        ["237000001", "237000002", "237000003"]
            .into_iter()
            .map(|id| (id.to_string(), anchored(id)))
            .collect()
    }

    #[test]
    fn test_every_vessel_gets_a_result() {
        let outcome = classify_fleet(&fleet(), &Detector::default(), 2, &AtomicBool::new(false)).unwrap();
        assert_eq!(outcome.results.len(), 3);
        assert_eq!(outcome.skipped, 3);
        assert_eq!(outcome.flagged, 0);
        assert_eq!(outcome.cancelled, 0);
        assert!(outcome
            .results
            .values()
            .all(|r| *r == ClassificationResult::NOT_APPLICABLE));
    }

    #[test]
    fn test_cancelled_batch_produces_no_partial_verdicts() {
        let outcome = classify_fleet(&fleet(), &Detector::default(), 0, &AtomicBool::new(true)).unwrap();
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.cancelled, 3);
    }
}
