// src/core/clustering/params.rs

use super::estimate::DEFAULT_MAX_SAMPLES;
use crate::core::common::OxiclusterError;
use crate::core::types::Point;
use crate::core::vector::DistanceMetric;
use std::collections::HashSet;

/// Parameters shared by the density-based algorithms.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityParams {
    /// Neighbourhood radius; `0.0` estimates it from the data.
    pub epsilon: f32,
    /// Neighbourhood size (the point itself included) that makes a core point.
    pub min_points: usize,
    /// Seeds point shuffling, tree construction and epsilon estimation.
    pub seed: Option<u64>,
    pub metric: DistanceMetric,
    pub max_estimation_samples: usize,
}

impl DensityParams {
    pub fn new(epsilon: f32, min_points: usize) -> Self {
        Self {
            epsilon,
            min_points,
            seed: None,
            metric: DistanceMetric::L2,
            max_estimation_samples: DEFAULT_MAX_SAMPLES,
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    #[must_use]
    pub fn with_max_estimation_samples(mut self, samples: usize) -> Self {
        self.max_estimation_samples = samples;
        self
    }

    /// # Errors
    ///
    /// `InvalidArgument` for a negative or NaN epsilon, a zero `min_points` or
    /// a zero sample budget.
    pub fn validate(&self) -> Result<(), OxiclusterError> {
        if self.epsilon.is_nan() || self.epsilon < 0.0 {
            return Err(OxiclusterError::InvalidArgument(format!(
                "epsilon must be positive, or zero to estimate it; got {}",
                self.epsilon
            )));
        }
        if self.min_points == 0 {
            return Err(OxiclusterError::invalid_argument("min_points must be positive"));
        }
        if self.max_estimation_samples == 0 {
            return Err(OxiclusterError::invalid_argument("max_estimation_samples must be positive"));
        }
        Ok(())
    }
}

/// Results are keyed by point id, so ids must be unique.
pub(crate) fn check_unique_ids(points: &[Point]) -> Result<(), OxiclusterError> {
    let mut seen = HashSet::with_capacity(points.len());
    for point in points {
        if !seen.insert(point.id()) {
            return Err(OxiclusterError::InvalidArgument(format!("duplicate point id {}", point.id())));
        }
    }
    Ok(())
}

/// Number of processed points between two progress messages.
pub(crate) fn logging_interval(n: usize) -> usize {
    (n / 10).min(1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(DensityParams::new(0.0, 3).validate().is_ok());
        assert!(DensityParams::new(1.5, 1).validate().is_ok());
        assert!(DensityParams::new(-1.0, 3).validate().is_err());
        assert!(DensityParams::new(f32::NAN, 3).validate().is_err());
        assert!(DensityParams::new(1.0, 0).validate().is_err());
        assert!(DensityParams::new(1.0, 2).with_max_estimation_samples(0).validate().is_err());
    }

    #[test]
    fn test_builder_methods() {
        let params = DensityParams::new(2.0, 4).with_seed(Some(9)).with_metric(DistanceMetric::L1);
        assert_eq!(params.seed, Some(9));
        assert_eq!(params.metric, DistanceMetric::L1);
        assert_eq!(params.max_estimation_samples, DEFAULT_MAX_SAMPLES);
    }

    #[test]
    fn test_unique_ids() {
        let points = vec![Point::dense(1, vec![0.0]), Point::dense(2, vec![1.0])];
        assert!(check_unique_ids(&points).is_ok());
        let points = vec![Point::dense(1, vec![0.0]), Point::dense(1, vec![1.0])];
        assert!(matches!(check_unique_ids(&points), Err(OxiclusterError::InvalidArgument(_))));
    }

    #[test]
    fn test_logging_interval() {
        assert_eq!(logging_interval(5), 0);
        assert_eq!(logging_interval(500), 50);
        assert_eq!(logging_interval(1_000_000), 1000);
    }
}
