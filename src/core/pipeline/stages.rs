// src/core/pipeline/stages.rs

//! Stages that fit a clustering model on a set of rows and answer per-row
//! lookups. Each stage fits on its first lookup and reuses the model after.

use super::source::{collect_points, point_id, SourceRow};
use crate::core::clustering::{ClusterAssignments, ClusteringResult, Dbscan, Optics};
use crate::core::common::{ComputeOnce, OxiclusterError};
use crate::core::config::ClusteringConfig;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Position and distances of a row in the OPTICS ordering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrderingResult {
    pub rank: i64,
    pub reachability: f32,
    pub core: f32,
}

/// Labels every row with its DBSCAN cluster.
#[derive(Debug)]
pub struct DbscanStage {
    config: ClusteringConfig,
    rows: Vec<SourceRow>,
    model: ComputeOnce<Dbscan>,
}

impl DbscanStage {
    pub fn new(config: ClusteringConfig, rows: Vec<SourceRow>) -> Result<Self, OxiclusterError> {
        config.validate()?;
        Ok(Self { config, rows, model: ComputeOnce::new() })
    }

    pub const fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    fn model(&self) -> Result<Arc<Dbscan>, OxiclusterError> {
        self.model.get_or_try_init(|| {
            info!("Fitting DBSCAN on {} rows.", self.rows.len());
            Dbscan::new(collect_points(&self.rows)?, self.config.density_params())
        })
    }

    pub fn assignments(&self) -> Result<Arc<ClusterAssignments>, OxiclusterError> {
        self.model()?.assignments()
    }

    /// Cluster of a row, `None` if the row was not part of the input.
    pub fn lookup(&self, row_id: u128) -> Result<Option<ClusteringResult>, OxiclusterError> {
        let id = point_id(row_id)?;
        Ok(self.assignments()?.get(id).copied())
    }
}

/// Labels every row once per configured threshold, from a single OPTICS
/// ordering.
#[derive(Debug)]
pub struct OpticsStage {
    config: ClusteringConfig,
    rows: Vec<SourceRow>,
    model: ComputeOnce<Optics>,
    clusterings: ComputeOnce<Vec<ClusterAssignments>>,
}

impl OpticsStage {
    pub fn new(config: ClusteringConfig, rows: Vec<SourceRow>) -> Result<Self, OxiclusterError> {
        config.validate()?;
        Ok(Self { config, rows, model: ComputeOnce::new(), clusterings: ComputeOnce::new() })
    }

    fn model(&self) -> Result<Arc<Optics>, OxiclusterError> {
        self.model.get_or_try_init(|| {
            info!("Fitting OPTICS on {} rows.", self.rows.len());
            Optics::new(collect_points(&self.rows)?, self.config.ordering_params())
        })
    }

    /// Thresholds the clusterings were derived for. An unset radius resolves to
    /// the one estimated for the ordering.
    pub fn thresholds(&self) -> Result<Vec<f32>, OxiclusterError> {
        let ordering = self.model()?.ordering()?;
        Ok(self
            .config
            .thresholds()
            .into_iter()
            .map(|t| if t > 0.0 { t } else { ordering.epsilon() })
            .collect())
    }

    /// One clustering per threshold, in configuration order.
    pub fn clusterings(&self) -> Result<Arc<Vec<ClusterAssignments>>, OxiclusterError> {
        self.clusterings.get_or_try_init(|| {
            let thresholds = self.thresholds()?;
            self.model()?.cluster_many(&thresholds)
        })
    }

    /// Cluster of a row at every threshold, `None` if the row was not part of
    /// the input.
    pub fn lookup(&self, row_id: u128) -> Result<Option<Vec<ClusteringResult>>, OxiclusterError> {
        let id = point_id(row_id)?;
        let clusterings = self.clusterings()?;
        Ok(clusterings.iter().map(|c| c.get(id).copied()).collect())
    }
}

/// Reports the OPTICS rank and distances of every row.
#[derive(Debug)]
pub struct OpticsOrderingStage {
    config: ClusteringConfig,
    rows: Vec<SourceRow>,
    model: ComputeOnce<Optics>,
}

impl OpticsOrderingStage {
    pub fn new(config: ClusteringConfig, rows: Vec<SourceRow>) -> Result<Self, OxiclusterError> {
        config.validate()?;
        Ok(Self { config, rows, model: ComputeOnce::new() })
    }

    fn model(&self) -> Result<Arc<Optics>, OxiclusterError> {
        self.model.get_or_try_init(|| {
            info!("Computing the OPTICS ordering of {} rows.", self.rows.len());
            Optics::new(collect_points(&self.rows)?, self.config.ordering_params())
        })
    }

    pub fn lookup(&self, row_id: u128) -> Result<Option<OrderingResult>, OxiclusterError> {
        let id = point_id(row_id)?;
        let ordering = self.model()?.ordering()?;
        let Some(rank) = ordering.rank(id) else {
            return Ok(None);
        };
        let entry = &ordering.entries()[rank];
        Ok(Some(OrderingResult {
            rank: i64::try_from(rank).map_err(|_| OxiclusterError::IdOutOfRange(rank as u128))?,
            reachability: entry.reachability,
            core: entry.core,
        }))
    }
}
