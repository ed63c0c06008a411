// src/core/clustering/ordering.rs

//! The reachability ordering produced by OPTICS and the clusterings derived
//! from it.

use super::estimate::EpsilonEstimate;
use super::result::{finalize_labels, ClusterAssignments, ClusteringResult, NOISE};
use crate::core::common::OxiclusterError;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Closest core point that reached an entry only after the entry was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BorderLink {
    /// `max(core(p), distance(p, q))` for the linking core point `p`.
    pub reachability: f32,
    pub predecessor: i64,
}

/// One position of the ordering.
///
/// `reachability` is infinite for the first point of every ordering segment;
/// `core` is infinite for points with fewer than `min_points` neighbours
/// within epsilon. `border` is set when a core point processed later had this
/// point in its neighbourhood.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrderingEntry {
    pub id: i64,
    pub reachability: f32,
    pub core: f32,
    pub border: Option<BorderLink>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpticsOrdering {
    entries: Vec<OrderingEntry>,
    #[serde(skip)]
    ranks: HashMap<i64, usize>,
    epsilon: f32,
    min_points: usize,
    estimate: Option<EpsilonEstimate>,
}

impl OpticsOrdering {
    pub(crate) fn new(
        entries: Vec<OrderingEntry>,
        epsilon: f32,
        min_points: usize,
        estimate: Option<EpsilonEstimate>,
    ) -> Self {
        let ranks = entries.iter().enumerate().map(|(rank, entry)| (entry.id, rank)).collect();
        Self { entries, ranks, epsilon, min_points, estimate }
    }

    /// Entries in processing order.
    pub fn entries(&self) -> &[OrderingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of `id` in the ordering.
    pub fn rank(&self, id: i64) -> Option<usize> {
        self.ranks.get(&id).copied()
    }

    pub fn entry(&self, id: i64) -> Option<&OrderingEntry> {
        self.rank(id).map(|rank| &self.entries[rank])
    }

    /// Upper bound on every threshold a clustering can be derived for.
    /// Infinite for an empty ordering whose radius was to be estimated.
    pub const fn epsilon(&self) -> f32 {
        self.epsilon
    }

    pub const fn min_points(&self) -> usize {
        self.min_points
    }

    pub const fn estimate(&self) -> Option<&EpsilonEstimate> {
        self.estimate.as_ref()
    }

    /// Derives the density clustering at `threshold` in one pass.
    ///
    /// A point joins the current cluster when its reachability is within the
    /// threshold; otherwise it starts a new cluster when its core distance is,
    /// and is noise when neither is. A noise point whose border link is within
    /// the threshold then joins the cluster of its linking core point. Joined
    /// points are scored with their reachability (or border link), cluster
    /// starts with their core distance. Clusters smaller than `min_points` are
    /// then demoted to noise.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` unless `0 < threshold <= epsilon`.
    pub fn cluster(&self, threshold: f32) -> Result<ClusterAssignments, OxiclusterError> {
        if threshold.is_nan() || threshold <= 0.0 || threshold > self.epsilon {
            return Err(OxiclusterError::InvalidArgument(format!(
                "threshold must be in (0, {}], got {}",
                self.epsilon, threshold
            )));
        }

        let mut labels = Vec::with_capacity(self.entries.len());
        let mut scores = Vec::with_capacity(self.entries.len());
        let mut current: Option<i32> = None;
        let mut next: i32 = 0;
        for entry in &self.entries {
            match current {
                Some(cluster) if entry.reachability <= threshold => {
                    labels.push(cluster);
                    scores.push(entry.reachability);
                }
                _ if entry.core <= threshold => {
                    current = Some(next);
                    labels.push(next);
                    scores.push(entry.core);
                    next += 1;
                }
                _ => {
                    labels.push(NOISE);
                    scores.push(f32::INFINITY);
                }
            }
        }

        for (position, entry) in self.entries.iter().enumerate() {
            let Some(link) = entry.border else { continue };
            if labels[position] != NOISE || link.reachability > threshold {
                continue;
            }
            if let Some(&cluster) = self.rank(link.predecessor).and_then(|rank| labels.get(rank)) {
                if cluster != NOISE {
                    labels[position] = cluster;
                    scores[position] = link.reachability;
                }
            }
        }

        let (removed, kept) = finalize_labels(&mut labels, self.min_points);
        debug!("{} clusters below {} points removed", removed, self.min_points);
        info!("Found {} clusters at threshold {}.", kept, threshold);

        let results = self
            .entries
            .iter()
            .zip(labels.iter().zip(scores))
            .map(|(entry, (&cluster, score))| {
                let result = if cluster == NOISE { ClusteringResult::noise() } else { ClusteringResult { cluster, score } };
                (entry.id, result)
            })
            .collect::<BTreeMap<_, _>>();
        Ok(ClusterAssignments::new(threshold, self.min_points, self.estimate, results))
    }

    /// [`OpticsOrdering::cluster`] for each threshold, in order.
    pub fn cluster_many(&self, thresholds: &[f32]) -> Result<Vec<ClusterAssignments>, OxiclusterError> {
        thresholds.iter().map(|&threshold| self.cluster(threshold)).collect()
    }

    pub fn to_json(&self) -> Result<String, OxiclusterError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
