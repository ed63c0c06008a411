// src/core/types/mod.rs

use crate::core::common::OxiclusterError;
use crate::core::vector::distance::l2_distance;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Numeric payload of a point: either every coordinate, or only the non-zero
/// ones together with their (strictly increasing) positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Coordinates {
    Dense(Vec<f32>),
    Sparse { length: usize, indices: Vec<usize>, values: Vec<f32> },
}

impl Coordinates {
    /// Builds a sparse vector, checking that indices are sorted, unique and in range.
    pub fn sparse(
        length: usize,
        indices: Vec<usize>,
        values: Vec<f32>,
    ) -> Result<Self, OxiclusterError> {
        if indices.len() != values.len() {
            return Err(OxiclusterError::InvalidArgument(format!(
                "sparse vector has {} indices but {} values",
                indices.len(),
                values.len()
            )));
        }
        if indices.windows(2).any(|w| w[0] >= w[1]) {
            return Err(OxiclusterError::invalid_argument(
                "sparse indices must be strictly increasing",
            ));
        }
        if let Some(&last) = indices.last() {
            if last >= length {
                return Err(OxiclusterError::InvalidArgument(format!(
                    "sparse index {} out of range for length {}",
                    last, length
                )));
            }
        }
        Ok(Self::Sparse { length, indices, values })
    }

    /// Declared length of the vector.
    pub fn len(&self) -> usize {
        match self {
            Self::Dense(values) => values.len(),
            Self::Sparse { length, .. } => *length,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_dense(&self) -> bool {
        matches!(self, Self::Dense(_))
    }

    /// Stored values: all of them for dense vectors, the non-zero ones otherwise.
    pub fn values(&self) -> &[f32] {
        match self {
            Self::Dense(values) | Self::Sparse { values, .. } => values,
        }
    }

    /// Positions of the stored values, `None` for dense vectors.
    pub fn indices(&self) -> Option<&[usize]> {
        match self {
            Self::Dense(_) => None,
            Self::Sparse { indices, .. } => Some(indices),
        }
    }

    /// Coordinate `i`, zero for positions a sparse vector does not store.
    pub fn element_at(&self, i: usize) -> f32 {
        match self {
            Self::Dense(values) => values.get(i).copied().unwrap_or(0.0),
            Self::Sparse { indices, values, .. } => {
                indices.binary_search(&i).map(|pos| values[pos]).unwrap_or(0.0)
            }
        }
    }

    pub fn to_dense(&self) -> Vec<f32> {
        match self {
            Self::Dense(values) => values.clone(),
            Self::Sparse { length, indices, values } => {
                let mut dense = vec![0.0; *length];
                for (&i, &v) in indices.iter().zip(values) {
                    dense[i] = v;
                }
                dense
            }
        }
    }
}

/// An identified vector. Equality compares coordinates, never ids.
#[derive(Debug, Clone)]
pub struct Point {
    id: i64,
    coordinates: Coordinates,
    id_changed: bool,
}

impl Point {
    pub fn new(id: i64, coordinates: Coordinates) -> Self {
        Self { id, coordinates, id_changed: false }
    }

    pub fn dense(id: i64, values: Vec<f32>) -> Self {
        Self::new(id, Coordinates::Dense(values))
    }

    /// # Errors
    ///
    /// Returns `InvalidArgument` if the indices are unsorted, duplicated, out of
    /// range, or do not match the number of values.
    pub fn sparse(
        id: i64,
        length: usize,
        indices: Vec<usize>,
        values: Vec<f32>,
    ) -> Result<Self, OxiclusterError> {
        Ok(Self::new(id, Coordinates::sparse(length, indices, values)?))
    }

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub const fn coordinates(&self) -> &Coordinates {
        &self.coordinates
    }

    pub fn dimension(&self) -> usize {
        self.coordinates.len()
    }

    pub fn element_at(&self, i: usize) -> f32 {
        self.coordinates.element_at(i)
    }

    /// True once [`Point::change_id`] has succeeded.
    pub const fn id_changed(&self) -> bool {
        self.id_changed
    }

    /// Reassigns the id. Allowed once per point.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` on a second reassignment.
    pub fn change_id(&mut self, id: i64) -> Result<(), OxiclusterError> {
        if self.id_changed {
            return Err(OxiclusterError::InvalidArgument(format!(
                "id of point {} was already changed once",
                self.id
            )));
        }
        self.id = id;
        self.id_changed = true;
        Ok(())
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: &Self) -> Result<f32, OxiclusterError> {
        l2_distance(&self.coordinates, &other.coordinates)
    }

    /// Total order over coordinates: shorter vectors first, then coordinate by
    /// coordinate.
    pub fn compare(&self, other: &Self) -> Ordering {
        let dim = self.dimension();
        dim.cmp(&other.dimension()).then_with(|| {
            (0..dim)
                .map(|i| self.element_at(i).total_cmp(&other.element_at(i)))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        })
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for Point {}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sparse_element_at() {
        let p = Point::sparse(1, 6, vec![1, 4], vec![2.0, -3.0]).unwrap();
        assert_eq!(p.dimension(), 6);
        assert_eq!(p.element_at(0), 0.0);
        assert_eq!(p.element_at(1), 2.0);
        assert_eq!(p.element_at(4), -3.0);
        assert_eq!(p.element_at(5), 0.0);
        assert_eq!(p.coordinates().to_dense(), vec![0.0, 2.0, 0.0, 0.0, -3.0, 0.0]);
    }

    #[test]
    fn test_sparse_validation() {
        assert!(Point::sparse(0, 4, vec![2, 1], vec![1.0, 1.0]).is_err());
        assert!(Point::sparse(0, 4, vec![1, 1], vec![1.0, 1.0]).is_err());
        assert!(Point::sparse(0, 4, vec![4], vec![1.0]).is_err());
        assert!(Point::sparse(0, 4, vec![1], vec![1.0, 2.0]).is_err());
        assert!(Point::sparse(0, 4, vec![], vec![]).is_ok());
    }

    #[test]
    fn test_equality_ignores_id() {
        let a = Point::dense(1, vec![1.0, 0.0, 2.0]);
        let b = Point::dense(2, vec![1.0, 0.0, 2.0]);
        let c = Point::sparse(3, 3, vec![0, 2], vec![1.0, 2.0]).unwrap();
        let d = Point::dense(4, vec![1.0, 0.5, 2.0]);
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_ne!(a, d);
        assert_eq!(a.compare(&d), Ordering::Less);
    }

    #[test]
    fn test_change_id_once() {
        let mut p = Point::dense(5, vec![0.0]);
        p.change_id(10).unwrap();
        assert_eq!(p.id(), 10);
        assert!(matches!(p.change_id(11), Err(OxiclusterError::InvalidArgument(_))));
        assert_eq!(p.id(), 10);
    }

    #[test]
    fn test_distance_to() {
        let a = Point::dense(0, vec![0.0, 0.0]);
        let b = Point::dense(1, vec![3.0, 4.0]);
        assert_relative_eq!(a.distance_to(&b).unwrap(), 5.0, epsilon = 1e-6);
    }
}
