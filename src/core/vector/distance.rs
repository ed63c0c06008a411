// src/core/vector/distance.rs

use crate::core::common::OxiclusterError;
use crate::core::types::Coordinates;
use serde::{Deserialize, Serialize};

/// Distance metrics understood by the index and the clustering algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Euclidean distance
    #[default]
    L2,
    /// Sum of absolute differences
    L1,
    /// `1 - cos(angle)`
    Cosine,
}

impl DistanceMetric {
    /// Calculate the distance between two vectors using this metric
    pub fn distance(&self, a: &Coordinates, b: &Coordinates) -> Result<f32, OxiclusterError> {
        match self {
            Self::L2 => l2_distance(a, b),
            Self::L1 => l1_distance(a, b),
            Self::Cosine => cosine_distance(a, b),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::L2 => "l2",
            Self::L1 => "l1",
            Self::Cosine => "cosine",
        }
    }

    /// Identifier used in the persisted index header.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::L2 => 0,
            Self::L1 => 1,
            Self::Cosine => 2,
        }
    }

    /// Lower bound on the distance between two points whose coordinates at
    /// one axis differ by `gap`. Cosine distance ignores magnitude, so no
    /// single coordinate bounds it and the bound is zero.
    #[must_use]
    pub fn axis_gap_bound(&self, gap: f32) -> f32 {
        match self {
            Self::L2 | Self::L1 => gap.abs(),
            Self::Cosine => 0.0,
        }
    }

    pub fn from_code(code: i32) -> Result<Self, OxiclusterError> {
        match code {
            0 => Ok(Self::L2),
            1 => Ok(Self::L1),
            2 => Ok(Self::Cosine),
            other => Err(OxiclusterError::CorruptIndex(format!("unknown distance metric {}", other))),
        }
    }
}

/// Calls `f(a_i, b_i)` for every position where at least one vector may be
/// non-zero. Positions where both sparse vectors are empty are skipped.
fn for_each_pair<F>(a: &Coordinates, b: &Coordinates, mut f: F) -> Result<(), OxiclusterError>
where
    F: FnMut(f32, f32),
{
    if a.len() != b.len() {
        return Err(OxiclusterError::DimensionMismatch { dim1: a.len(), dim2: b.len() });
    }

    match (a, b) {
        (Coordinates::Dense(va), Coordinates::Dense(vb)) => {
            va.iter().zip(vb).for_each(|(x, y)| f(*x, *y));
        }
        (Coordinates::Dense(dense), sparse @ Coordinates::Sparse { .. }) => {
            walk_dense_sparse(dense, sparse, |d, s| f(d, s));
        }
        (sparse @ Coordinates::Sparse { .. }, Coordinates::Dense(dense)) => {
            walk_dense_sparse(dense, sparse, |d, s| f(s, d));
        }
        (
            Coordinates::Sparse { indices: ia, values: va, .. },
            Coordinates::Sparse { indices: ib, values: vb, .. },
        ) => {
            let (mut i, mut j) = (0, 0);
            while i < ia.len() && j < ib.len() {
                match ia[i].cmp(&ib[j]) {
                    std::cmp::Ordering::Equal => {
                        f(va[i], vb[j]);
                        i += 1;
                        j += 1;
                    }
                    std::cmp::Ordering::Less => {
                        f(va[i], 0.0);
                        i += 1;
                    }
                    std::cmp::Ordering::Greater => {
                        f(0.0, vb[j]);
                        j += 1;
                    }
                }
            }
            va[i..].iter().for_each(|x| f(*x, 0.0));
            vb[j..].iter().for_each(|y| f(0.0, *y));
        }
    }
    Ok(())
}

fn walk_dense_sparse<F>(dense: &[f32], sparse: &Coordinates, mut f: F)
where
    F: FnMut(f32, f32),
{
    let indices = sparse.indices().unwrap_or(&[]);
    let values = sparse.values();
    let mut k = 0;
    for (i, d) in dense.iter().enumerate() {
        if k < indices.len() && indices[k] == i {
            f(*d, values[k]);
            k += 1;
        } else {
            f(*d, 0.0);
        }
    }
}

/// Euclidean norm of the difference between two vectors.
///
/// # Errors
///
/// `DimensionMismatch` if the declared lengths differ.
pub fn l2_distance(a: &Coordinates, b: &Coordinates) -> Result<f32, OxiclusterError> {
    let mut sum = 0.0f32;
    for_each_pair(a, b, |x, y| {
        let d = x - y;
        sum += d * d;
    })?;
    Ok(sum.sqrt())
}

/// Sum of absolute differences between two vectors.
///
/// # Errors
///
/// `DimensionMismatch` if the declared lengths differ.
pub fn l1_distance(a: &Coordinates, b: &Coordinates) -> Result<f32, OxiclusterError> {
    let mut sum = 0.0f32;
    for_each_pair(a, b, |x, y| sum += (x - y).abs())?;
    Ok(sum)
}

/// `1 - cos(angle)` between two vectors.
///
/// Returns 0 when either vector has zero norm, and when rounding pushes the
/// cosine above 1.
///
/// # Errors
///
/// `DimensionMismatch` if the declared lengths differ.
pub fn cosine_distance(a: &Coordinates, b: &Coordinates) -> Result<f32, OxiclusterError> {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for_each_pair(a, b, |x, y| {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    })?;

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    let cos = dot / (norm_a.sqrt() * norm_b.sqrt());
    if cos > 1.0 {
        return Ok(0.0);
    }
    Ok(1.0 - cos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn dense(v: &[f32]) -> Coordinates {
        Coordinates::Dense(v.to_vec())
    }

    fn sparse(length: usize, indices: &[usize], values: &[f32]) -> Coordinates {
        Coordinates::sparse(length, indices.to_vec(), values.to_vec()).unwrap()
    }

    #[test]
    fn test_l2_dense() {
        let d = l2_distance(&dense(&[1.0, 2.0, 3.0]), &dense(&[4.0, 6.0, 3.0])).unwrap();
        assert_relative_eq!(d, 5.0, epsilon = 1e-6);
    }

    #[test]
    fn test_l1_dense() {
        let d = l1_distance(&dense(&[1.0, -2.0, 3.0]), &dense(&[4.0, 6.0, 3.0])).unwrap();
        assert_relative_eq!(d, 11.0, epsilon = 1e-6);
    }

    #[test]
    fn test_sparse_matches_dense() {
        let sa = sparse(6, &[0, 3, 5], &[1.0, -2.0, 4.0]);
        let sb = sparse(6, &[1, 3], &[3.0, 1.0]);
        let da = dense(&sa.to_dense());
        let db = dense(&sb.to_dense());

        for metric in [DistanceMetric::L2, DistanceMetric::L1, DistanceMetric::Cosine] {
            let expected = metric.distance(&da, &db).unwrap();
            assert_relative_eq!(metric.distance(&sa, &sb).unwrap(), expected, epsilon = 1e-6);
            assert_relative_eq!(metric.distance(&sa, &db).unwrap(), expected, epsilon = 1e-6);
            assert_relative_eq!(metric.distance(&da, &sb).unwrap(), expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = l2_distance(&dense(&[1.0, 2.0]), &dense(&[1.0, 2.0, 3.0])).unwrap_err();
        match err {
            OxiclusterError::DimensionMismatch { dim1, dim2 } => {
                assert_eq!(dim1, 2);
                assert_eq!(dim2, 3);
            }
            _ => panic!("Expected DimensionMismatch"),
        }
        assert!(cosine_distance(&sparse(4, &[], &[]), &dense(&[1.0])).is_err());
    }

    #[test]
    fn test_cosine_cases() {
        let orthogonal = cosine_distance(&dense(&[1.0, 0.0]), &dense(&[0.0, 1.0])).unwrap();
        assert_relative_eq!(orthogonal, 1.0, epsilon = 1e-6);

        let opposite = cosine_distance(&dense(&[1.0, 1.0]), &dense(&[-1.0, -1.0])).unwrap();
        assert_relative_eq!(opposite, 2.0, epsilon = 1e-6);

        let same = cosine_distance(&dense(&[3.0, 4.0]), &dense(&[6.0, 8.0])).unwrap();
        assert!(same >= 0.0);
        assert!(same < 1e-6);

        let zero = cosine_distance(&dense(&[0.0, 0.0]), &dense(&[1.0, 2.0])).unwrap();
        assert_eq!(zero, 0.0);
    }

    #[test]
    fn test_axis_gap_bound_never_exceeds_distance() {
        let (a, b) = (dense(&[1.0, 0.0]), dense(&[10.0, 0.1]));
        for metric in [DistanceMetric::L2, DistanceMetric::L1, DistanceMetric::Cosine] {
            assert!(metric.axis_gap_bound(-9.0) <= metric.distance(&a, &b).unwrap(), "{}", metric.name());
        }
        assert_eq!(DistanceMetric::L1.axis_gap_bound(-9.0), 9.0);
        assert_eq!(DistanceMetric::Cosine.axis_gap_bound(-9.0), 0.0);
    }

    #[test]
    fn test_metric_codes() {
        for metric in [DistanceMetric::L2, DistanceMetric::L1, DistanceMetric::Cosine] {
            assert_eq!(DistanceMetric::from_code(metric.code()).unwrap(), metric);
        }
        assert!(matches!(DistanceMetric::from_code(7), Err(OxiclusterError::CorruptIndex(_))));
        assert_eq!(DistanceMetric::default(), DistanceMetric::L2);
        assert_eq!(DistanceMetric::Cosine.name(), "cosine");
    }
}
