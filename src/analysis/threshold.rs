//! Per-vessel anomaly speed threshold from the reported speed-over-ground
//! distribution.

use super::stats::Sample;
use serde::Serialize;

/// Meters per second in one knot.
pub const KNOTS_TO_MPS: f64 = 1852.0 / 3600.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpeedThreshold {
    pub mean_knots: f64,
    pub std_dev_knots: f64,
    /// mean + multiplier * std_dev, knots.
    pub knots: f64,
}

impl SpeedThreshold {
    /// Derive the threshold as `mean + sigma_multiplier * std_dev`.
    pub fn estimate(speeds: impl IntoIterator<Item = f64>, sigma_multiplier: f64) -> Self {
        let sample = Sample::new(speeds.into_iter().collect());
        let mean_knots = sample.mean();
        let std_dev_knots = sample.std_dev();
        Self {
            mean_knots,
            std_dev_knots,
            knots: mean_knots + sigma_multiplier * std_dev_knots,
        }
    }

    /// The vessel barely moved over the whole period (moored or anchored).
    pub fn is_stationary(&self, stationary_knots: f64) -> bool {
        self.knots <= stationary_knots
    }

    pub fn meters_per_second(&self) -> f64 {
        self.knots * KNOTS_TO_MPS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_four_sigma() {
        let t = SpeedThreshold::estimate([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 4.0);
        assert_eq!(t.mean_knots, 5.0);
        assert_eq!(t.std_dev_knots, 2.0);
        assert_eq!(t.knots, 13.0);
        assert!(!t.is_stationary(1.0));
    }

    #[test]
    fn test_anchored_vessel_is_stationary() {
        let t = SpeedThreshold::estimate([0.0, 0.1, 0.0, 0.0, 0.1], 4.0);
        assert!(t.knots <= 1.0);
        assert!(t.is_stationary(1.0));
    }

    #[test]
    fn test_empty_speeds_are_stationary() {
        let t = SpeedThreshold::estimate(std::iter::empty(), 4.0);
        assert_eq!(t.knots, 0.0);
        assert!(t.is_stationary(1.0));
    }

    #[test]
    fn test_meters_per_second_conversion() {
        let t = SpeedThreshold::estimate([10.0; 4], 4.0);
        assert!((t.meters_per_second() - 5.1444).abs() < 1e-3);
    }
}
