use crate::detect::{DetectError, ExpectedRange};

/// Summary statistics of one metric over the baseline snapshots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    count: usize,
    mean: f64,
    /// Population standard deviation.
    std_dev: f64,
}

impl Baseline {
    /// Fewest values a z-score is computed from.
    pub const MIN_SAMPLES: usize = 2;

    /// Width of the expected range, in standard deviations.
    pub const RANGE_WIDTH: f64 = 2.0;

    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let values: Vec<f64> = values.into_iter().collect();
        let count = values.len();
        if count == 0 {
            return Self {
                count,
                mean: 0.0,
                std_dev: 0.0,
            };
        }
        let n = count as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Self {
            count,
            mean,
            std_dev: variance.sqrt(),
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }

    /// `mean +- 2 stddev`.
    pub fn expected_range(&self) -> ExpectedRange {
        ExpectedRange {
            lower: self.mean - Self::RANGE_WIDTH * self.std_dev,
            upper: self.mean + Self::RANGE_WIDTH * self.std_dev,
        }
    }

    /// |value - mean| / stddev
    pub fn z_score(&self, value: f64) -> Result<f64, DetectError> {
        if self.count < Self::MIN_SAMPLES {
            return Err(DetectError::InsufficientBaseline {
                needed: Self::MIN_SAMPLES,
                have: self.count,
            });
        }
        if self.std_dev == 0.0 {
            return Err(DetectError::ZeroVariance);
        }
        Ok((value - self.mean).abs() / self.std_dev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_population_stats() {
        let b = Baseline::from_values([1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(b.count(), 5);
        assert_eq!(b.mean(), 3.0);
        assert_eq!(b.std_dev(), 2.0_f64.sqrt());
        // 7 / sqrt(2) ~ 4.95
        let z = b.z_score(10.0).unwrap();
        assert!(z > 4.9 && z < 5.0);
    }

    #[test]
    fn test_z_score_is_absolute() {
        let b = Baseline::from_values([8.0, 12.0, 8.0, 12.0]);
        assert_eq!(b.z_score(4.0).unwrap(), 3.0);
        assert_eq!(b.z_score(16.0).unwrap(), 3.0);
        assert_eq!(b.expected_range(), ExpectedRange { lower: 6.0, upper: 14.0 });
    }

    #[test]
    fn test_constant_series_has_no_z_score() {
        let b = Baseline::from_values(vec![10.0; 30]);
        assert_eq!(b.z_score(50.0), Err(DetectError::ZeroVariance));
    }

    #[test]
    fn test_too_short() {
        let b = Baseline::from_values([1.0]);
        assert_eq!(
            b.z_score(1.0),
            Err(DetectError::InsufficientBaseline { needed: 2, have: 1 })
        );
        assert_eq!(Baseline::from_values([]).mean(), 0.0);
    }
}
