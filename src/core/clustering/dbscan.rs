// src/core/clustering/dbscan.rs

//! DBSCAN over the k-d tree's range queries.

use super::estimate::resolve_epsilon;
use super::params::{check_unique_ids, logging_interval, DensityParams};
use super::result::{finalize_labels, ClusterAssignments, ClusteringResult, NOISE};
use crate::core::common::{ComputeOnce, OxiclusterError};
use crate::core::indexing::kdtree::{make_rng, KdTree};
use crate::core::types::Point;
use rand::seq::SliceRandom;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Unvisited,
    Noise,
    Cluster(usize),
}

/// A DBSCAN run over a fixed point set.
///
/// The clustering is computed on the first call to [`Dbscan::assignments`]
/// and cached; concurrent callers wait for that first computation.
#[derive(Debug)]
pub struct Dbscan {
    tree: KdTree,
    params: DensityParams,
    result: ComputeOnce<ClusterAssignments>,
}

impl Dbscan {
    /// Indexes `points`. Nothing is clustered yet.
    ///
    /// # Errors
    ///
    /// Invalid parameters, duplicate ids, or any failure building the tree.
    pub fn new(points: Vec<Point>, params: DensityParams) -> Result<Self, OxiclusterError> {
        params.validate()?;
        check_unique_ids(&points)?;
        let tree = KdTree::build(points, params.metric, params.seed)?;
        Ok(Self { tree, params, result: ComputeOnce::new() })
    }

    pub const fn params(&self) -> &DensityParams {
        &self.params
    }

    pub const fn tree(&self) -> &KdTree {
        &self.tree
    }

    /// Cluster label and score of every point.
    pub fn assignments(&self) -> Result<Arc<ClusterAssignments>, OxiclusterError> {
        self.result.get_or_try_init(|| self.run())
    }

    /// True once the clustering has been computed.
    pub fn is_fitted(&self) -> bool {
        self.result.get().is_some()
    }

    fn run(&self) -> Result<ClusterAssignments, OxiclusterError> {
        let started = Instant::now();
        let n = self.tree.len();
        let min_points = self.params.min_points;
        if n == 0 {
            return Ok(ClusterAssignments::new(self.params.epsilon, min_points, None, BTreeMap::new()));
        }

        let (epsilon, estimate) = resolve_epsilon(&self.tree, self.params.epsilon, self.params.max_estimation_samples)?;
        info!("Clustering {} points with epsilon={} and min_points={}.", n, epsilon, min_points);

        let mut labels = vec![Label::Unvisited; n];
        let mut visited = vec![false; n];
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut make_rng(self.params.seed));

        let interval = logging_interval(n);
        let mut n_clusters = 0;
        for (iteration, &slot) in order.iter().enumerate() {
            if interval > 0 && (iteration + 1) % interval == 0 {
                debug!("Processing {}/{} - clusters={}", iteration + 1, n, n_clusters);
            }
            if visited[slot] {
                continue;
            }
            visited[slot] = true;

            let neighbours = self.tree.within_distance(&self.tree.points[slot], epsilon)?;
            if neighbours.len() < min_points {
                labels[slot] = Label::Noise;
                continue;
            }

            let cluster = n_clusters;
            n_clusters += 1;
            labels[slot] = Label::Cluster(cluster);

            let mut queue: VecDeque<usize> = neighbours.iter().map(|nb| nb.slot).collect();
            while let Some(q) = queue.pop_front() {
                if !matches!(labels[q], Label::Cluster(_)) {
                    labels[q] = Label::Cluster(cluster);
                }
                if visited[q] {
                    continue;
                }
                visited[q] = true;

                let expansion = self.tree.within_distance(&self.tree.points[q], epsilon)?;
                if expansion.len() >= min_points {
                    queue.extend(
                        expansion
                            .iter()
                            .map(|nb| nb.slot)
                            .filter(|s| !visited[*s] || !matches!(labels[*s], Label::Cluster(_))),
                    );
                }
            }
        }

        let mut flat = labels
            .iter()
            .map(|label| match label {
                Label::Cluster(c) => i32::try_from(*c)
                    .map_err(|_| OxiclusterError::invalid_argument("too many clusters for an i32 label")),
                Label::Noise | Label::Unvisited => Ok(NOISE),
            })
            .collect::<Result<Vec<i32>, _>>()?;

        info!("Removing clusters with less than {} points.", min_points);
        let (removed, kept) = finalize_labels(&mut flat, min_points);
        debug!("{} clusters removed", removed);

        let mut results = BTreeMap::new();
        for (slot, &cluster) in flat.iter().enumerate() {
            let point = &self.tree.points[slot];
            let result = if cluster == NOISE {
                ClusteringResult::noise()
            } else {
                ClusteringResult { cluster, score: self.score(slot, epsilon, &flat)? }
            };
            results.insert(point.id(), result);
        }

        info!("Found {} clusters.", kept);
        info!("'DBScan' finished in {:?}.", started.elapsed());
        Ok(ClusterAssignments::new(epsilon, min_points, estimate, results))
    }

    /// Mean distance from a point to the other members of its cluster inside
    /// its epsilon-neighbourhood; zero when there are none.
    fn score(&self, slot: usize, epsilon: f32, labels: &[i32]) -> Result<f32, OxiclusterError> {
        let neighbours = self.tree.within_distance(&self.tree.points[slot], epsilon)?;
        let (count, total) = neighbours
            .iter()
            .filter(|nb| nb.slot != slot && labels[nb.slot] == labels[slot])
            .fold((0usize, 0.0f32), |(count, total), nb| (count + 1, total + nb.distance));
        Ok(if count == 0 { 0.0 } else { total / count as f32 })
    }
}
