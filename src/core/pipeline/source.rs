// src/core/pipeline/source.rs

use crate::core::common::OxiclusterError;
use crate::core::types::{Coordinates, Point};
use serde::{Deserialize, Serialize};
use tracing::info;

/// One input row: a 128-bit row identifier and its feature vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRow {
    pub row_id: u128,
    pub features: Coordinates,
}

impl SourceRow {
    pub fn new(row_id: u128, features: Coordinates) -> Self {
        Self { row_id, features }
    }

    pub fn dense(row_id: u128, values: Vec<f32>) -> Self {
        Self::new(row_id, Coordinates::Dense(values))
    }
}

/// Point id of a row identifier.
///
/// # Errors
///
/// `IdOutOfRange` when the identifier does not fit an `i64`.
pub fn point_id(row_id: u128) -> Result<i64, OxiclusterError> {
    i64::try_from(row_id).map_err(|_| OxiclusterError::IdOutOfRange(row_id))
}

/// Copies rows into points, keeping the row identifier as the point id.
pub fn collect_points(rows: &[SourceRow]) -> Result<Vec<Point>, OxiclusterError> {
    info!("Caching {} rows.", rows.len());
    rows.iter()
        .map(|row| Ok(Point::new(point_id(row.row_id)?, row.features.clone())))
        .collect()
}
