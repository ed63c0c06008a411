// src/core/clustering/estimate.rs

//! Picks a neighbourhood radius from the distances between random pairs of
//! points.

use crate::core::common::OxiclusterError;
use crate::core::indexing::kdtree::KdTree;
use crate::core::types::Point;
use crate::core::vector::DistanceMetric;
use rand::Rng;
use serde::Serialize;
use tracing::info;

/// Upper bound on the number of sampled pairs.
pub const DEFAULT_MAX_SAMPLES: usize = 10_000;

/// Samples taken before the convergence test starts.
const MIN_SAMPLES: usize = 10;

/// Change in the running mean of squared distances below which sampling stops.
const CONVERGENCE_TOLERANCE: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpsilonEstimate {
    pub epsilon: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Number of sampled pairs.
    pub samples: usize,
}

/// Estimates epsilon as a low percentile of random pairwise distances.
///
/// Pairs of distinct points are drawn until the running mean of squared
/// distances moves by less than `1e-5` (checked once 10 pairs were drawn) or
/// `max_samples` pairs were drawn. The finite distances are sorted and the one
/// at index `max(len / 20, 2)`, clamped to the last, is returned.
///
/// # Errors
///
/// `EstimationFailed` with fewer than two points or when no sampled distance is
/// finite; `InvalidArgument` if `max_samples` is zero.
pub fn estimate_epsilon<R: Rng>(
    points: &[Point],
    metric: DistanceMetric,
    max_samples: usize,
    rng: &mut R,
) -> Result<EpsilonEstimate, OxiclusterError> {
    if max_samples == 0 {
        return Err(OxiclusterError::invalid_argument("max_samples must be positive"));
    }
    let n = points.len();
    if n < 2 {
        return Err(OxiclusterError::EstimationFailed(format!(
            "at least two points are needed, got {}",
            n
        )));
    }

    let mut distances = Vec::with_capacity(max_samples.min(1024));
    let (mut sum, mut sum_sq) = (0.0f32, 0.0f32);
    let mut last_mean_sq: Option<f32> = None;

    while distances.len() < max_samples {
        let i = rng.gen_range(0..n);
        let mut j = rng.gen_range(0..n - 1);
        if j >= i {
            j += 1;
        }

        let d = metric.distance(points[i].coordinates(), points[j].coordinates())?;
        distances.push(d);
        sum += d;
        sum_sq += d * d;

        if distances.len() >= MIN_SAMPLES {
            let mean_sq = sum_sq / distances.len() as f32;
            if last_mean_sq.is_some_and(|last| (mean_sq - last).abs() < CONVERGENCE_TOLERANCE) {
                break;
            }
            last_mean_sq = Some(mean_sq);
        }
    }

    let samples = distances.len();
    let mut finite: Vec<f32> = distances.into_iter().filter(|d| d.is_finite()).collect();
    if finite.is_empty() {
        return Err(OxiclusterError::EstimationFailed(format!(
            "none of the {} sampled distances is finite",
            samples
        )));
    }
    finite.sort_by(f32::total_cmp);

    let index = (finite.len() / 20).max(2).min(finite.len() - 1);
    let estimate = EpsilonEstimate {
        epsilon: finite[index],
        min_distance: finite[0],
        max_distance: finite[finite.len() - 1],
        samples,
    };
    info!(
        "epsilon estimated on {} random pairs: {} in [{}, {}] (mean {})",
        samples,
        estimate.epsilon,
        estimate.min_distance,
        estimate.max_distance,
        sum / samples as f32
    );
    Ok(estimate)
}

/// Resolves the radius an algorithm runs with: `epsilon` itself when positive,
/// an estimate from the tree's points when it is zero.
pub(crate) fn resolve_epsilon(
    tree: &KdTree,
    epsilon: f32,
    max_samples: usize,
) -> Result<(f32, Option<EpsilonEstimate>), OxiclusterError> {
    if epsilon > 0.0 {
        return Ok((epsilon, None));
    }
    let mut rng = crate::core::indexing::kdtree::make_rng(tree.seed());
    let estimate = estimate_epsilon(&tree.points, tree.metric(), max_samples, &mut rng)?;
    if estimate.epsilon <= 0.0 {
        return Err(OxiclusterError::EstimationFailed(format!(
            "estimated radius {} is not positive; the data has too many duplicate points",
            estimate.epsilon
        )));
    }
    Ok((estimate.epsilon, Some(estimate)))
}
