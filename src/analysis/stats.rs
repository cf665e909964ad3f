//! Small descriptive statistics helpers shared by the analysis stages.

/// A sample of values for summary statistics.
pub struct Sample {
    values: Vec<f64>,
}

impl Sample {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Population variance (divides by n).
    pub fn variance(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let sum_sq_diff: f64 = self.values.iter().map(|&x| (x - mean).powi(2)).sum();
        sum_sq_diff / self.values.len() as f64
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Quantile `q` in [0, 1], linearly interpolated between the two
    /// nearest order statistics. Returns 0 for an empty sample.
    pub fn quantile(&self, q: f64) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mut sorted = self.values.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
        let lo = pos.floor() as usize;
        let hi = pos.ceil() as usize;
        let frac = pos - lo as f64;
        sorted[lo] + (sorted[hi] - sorted[lo]) * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_population_std() {
        let s = Sample::new(vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(s.mean(), 5.0);
        assert_eq!(s.std_dev(), 2.0);
    }

    #[test]
    fn test_quantile_interpolates() {
        let s = Sample::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
        // position 0.9 * 9 = 8.1 -> 9.0 + 0.1 * (10.0 - 9.0)
        assert!((s.quantile(0.9) - 9.1).abs() < 1e-12);
        assert_eq!(s.quantile(0.0), 1.0);
        assert_eq!(s.quantile(1.0), 10.0);
    }

    #[test]
    fn test_quantile_unsorted_input() {
        let s = Sample::new(vec![5.0, 1.0, 3.0]);
        assert_eq!(s.quantile(0.5), 3.0);
    }

    #[test]
    fn test_empty_sample() {
        let s = Sample::new(vec![]);
        assert!(s.is_empty());
        assert_eq!(s.mean(), 0.0);
        assert_eq!(s.std_dev(), 0.0);
        assert_eq!(s.quantile(0.9), 0.0);
    }
}
