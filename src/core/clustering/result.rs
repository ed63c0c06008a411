// src/core/clustering/result.rs

use super::estimate::EpsilonEstimate;
use crate::core::common::OxiclusterError;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Cluster label of points that belong to no cluster.
pub const NOISE: i32 = -1;

/// Cluster label and score of a single point.
///
/// Noise points carry an infinite score. JSON has no infinity, so such scores
/// are exported as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClusteringResult {
    pub cluster: i32,
    pub score: f32,
}

impl ClusteringResult {
    pub const fn noise() -> Self {
        Self { cluster: NOISE, score: f32::INFINITY }
    }

    pub const fn is_noise(&self) -> bool {
        self.cluster == NOISE
    }
}

/// Result of one clustering run: a label for every point id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterAssignments {
    /// Neighbourhood radius the labels were computed with.
    pub epsilon: f32,
    pub min_points: usize,
    /// Present when `epsilon` was estimated from the data.
    pub estimate: Option<EpsilonEstimate>,
    results: BTreeMap<i64, ClusteringResult>,
}

impl ClusterAssignments {
    pub(crate) fn new(
        epsilon: f32,
        min_points: usize,
        estimate: Option<EpsilonEstimate>,
        results: BTreeMap<i64, ClusteringResult>,
    ) -> Self {
        Self { epsilon, min_points, estimate, results }
    }

    pub fn get(&self, id: i64) -> Option<&ClusteringResult> {
        self.results.get(&id)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Iterates `(id, result)` by ascending id.
    pub fn iter(&self) -> impl Iterator<Item = (&i64, &ClusteringResult)> {
        self.results.iter()
    }

    /// Number of distinct non-noise clusters.
    pub fn cluster_count(&self) -> usize {
        self.cluster_sizes().len()
    }

    pub fn noise_count(&self) -> usize {
        self.results.values().filter(|r| r.is_noise()).count()
    }

    /// Size of every non-noise cluster.
    pub fn cluster_sizes(&self) -> BTreeMap<i32, usize> {
        let mut sizes = BTreeMap::new();
        for result in self.results.values().filter(|r| !r.is_noise()) {
            *sizes.entry(result.cluster).or_insert(0) += 1;
        }
        sizes
    }

    /// Member ids of every non-noise cluster, each list sorted.
    pub fn clusters(&self) -> BTreeMap<i32, Vec<i64>> {
        let mut members: BTreeMap<i32, Vec<i64>> = BTreeMap::new();
        for (id, result) in &self.results {
            if !result.is_noise() {
                members.entry(result.cluster).or_default().push(*id);
            }
        }
        members
    }

    /// Pretty-printed JSON export.
    pub fn to_json(&self) -> Result<String, OxiclusterError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Demotes clusters with fewer than `min_points` members to noise, then
/// renumbers the survivors `0..k` keeping their relative order.
///
/// Returns `(removed clusters, surviving clusters)`.
pub(crate) fn finalize_labels(labels: &mut [i32], min_points: usize) -> (usize, usize) {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for &label in labels.iter().filter(|l| **l != NOISE) {
        *counts.entry(label).or_insert(0) += 1;
    }

    let mut renumbered: HashMap<i32, i32> = HashMap::new();
    let mut removed = 0;
    let mut next = 0;
    for (&label, &count) in &counts {
        if count < min_points {
            removed += 1;
        } else {
            renumbered.insert(label, next);
            next += 1;
        }
    }

    for label in labels.iter_mut() {
        *label = renumbered.get(label).copied().unwrap_or(NOISE);
    }
    (removed, renumbered.len())
}
