// src/core/config.rs

use crate::core::clustering::{DensityParams, DEFAULT_MAX_SAMPLES};
use crate::core::common::OxiclusterError;
use crate::core::vector::DistanceMetric;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Fewest estimation samples a configuration may ask for.
const MIN_ESTIMATION_SAMPLES: usize = 10;

/// Settings of a clustering run.
///
/// Fields missing from a TOML file take their default values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Neighbourhood radius; `0.0` estimates it from the data.
    pub epsilon: f32,
    /// Thresholds for OPTICS-derived clusterings. Empty means `[epsilon]`.
    pub epsilons: Vec<f32>,
    pub min_points: usize,
    pub seed: Option<u64>,
    pub metric: DistanceMetric,
    pub max_estimation_samples: usize,
}

/// Builder for [`ClusteringConfig`]; unset fields keep their defaults.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    epsilon: Option<f32>,
    epsilons: Option<Vec<f32>>,
    min_points: Option<usize>,
    seed: Option<Option<u64>>,
    metric: Option<DistanceMetric>,
    max_estimation_samples: Option<usize>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = Some(epsilon);
        self
    }

    pub fn epsilons(mut self, epsilons: Vec<f32>) -> Self {
        self.epsilons = Some(epsilons);
        self
    }

    pub fn min_points(mut self, min_points: usize) -> Self {
        self.min_points = Some(min_points);
        self
    }

    /// `None` seeds every run from entropy.
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = Some(metric);
        self
    }

    pub fn max_estimation_samples(mut self, samples: usize) -> Self {
        self.max_estimation_samples = Some(samples);
        self
    }

    /// Builds the configuration with validation
    pub fn build(self) -> Result<ClusteringConfig, OxiclusterError> {
        let defaults = ClusteringConfig::default();
        let config = ClusteringConfig {
            epsilon: self.epsilon.unwrap_or(defaults.epsilon),
            epsilons: self.epsilons.unwrap_or(defaults.epsilons),
            min_points: self.min_points.unwrap_or(defaults.min_points),
            seed: self.seed.unwrap_or(defaults.seed),
            metric: self.metric.unwrap_or(defaults.metric),
            max_estimation_samples: self.max_estimation_samples.unwrap_or(defaults.max_estimation_samples),
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.0,
            epsilons: Vec::new(),
            min_points: 5,
            seed: Some(42),
            metric: DistanceMetric::L2,
            max_estimation_samples: DEFAULT_MAX_SAMPLES,
        }
    }
}

impl ClusteringConfig {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<(), OxiclusterError> {
        if self.epsilon.is_nan() || self.epsilon < 0.0 {
            return Err(OxiclusterError::Configuration(format!(
                "epsilon must be positive, or 0 to estimate it; got {}",
                self.epsilon
            )));
        }

        if let Some(bad) = self.epsilons.iter().find(|e| e.is_nan() || **e <= 0.0) {
            return Err(OxiclusterError::Configuration(format!(
                "every clustering threshold must be positive; got {}",
                bad
            )));
        }

        if self.min_points == 0 {
            return Err(OxiclusterError::Configuration("min_points must be greater than 0".to_string()));
        }

        if self.max_estimation_samples < MIN_ESTIMATION_SAMPLES {
            return Err(OxiclusterError::Configuration(format!(
                "max_estimation_samples must be at least {}",
                MIN_ESTIMATION_SAMPLES
            )));
        }

        Ok(())
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `OxiclusterError::Configuration` if parsing or validation
    /// fails, `OxiclusterError::Io` if the file exists but cannot be read.
    pub fn load_from_file(path: &Path) -> Result<Self, OxiclusterError> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let config: Self = toml::from_str(&contents).map_err(|e| {
                    OxiclusterError::Configuration(format!(
                        "Failed to parse config file '{}': {}",
                        path.display(),
                        e
                    ))
                })?;
                config.validate()?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(OxiclusterError::Io(e)),
        }
    }

    pub fn load_or_default(optional_path: Option<&Path>) -> Result<Self, OxiclusterError> {
        match optional_path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Small fixed-radius configuration for tests.
    pub fn for_testing() -> Result<Self, OxiclusterError> {
        Self::builder()
            .epsilon(1.0)
            .min_points(2)
            .seed(Some(7))
            .max_estimation_samples(1000)
            .build()
    }

    /// Thresholds OPTICS clusterings are derived for.
    pub fn thresholds(&self) -> Vec<f32> {
        if self.epsilons.is_empty() {
            vec![self.epsilon]
        } else {
            self.epsilons.clone()
        }
    }

    /// Parameters for a DBSCAN run.
    pub fn density_params(&self) -> DensityParams {
        DensityParams::new(self.epsilon, self.min_points)
            .with_seed(self.seed)
            .with_metric(self.metric)
            .with_max_estimation_samples(self.max_estimation_samples)
    }

    /// Parameters for the OPTICS ordering: its radius must cover every
    /// threshold, so it is the largest of them.
    pub fn ordering_params(&self) -> DensityParams {
        let epsilon = self.thresholds().into_iter().fold(self.epsilon, f32::max);
        DensityParams { epsilon, ..self.density_params() }
    }
}
