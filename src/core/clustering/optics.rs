// src/core/clustering/optics.rs

use super::estimate::resolve_epsilon;
use super::ordering::{BorderLink, OpticsOrdering, OrderingEntry};
use super::params::{check_unique_ids, logging_interval, DensityParams};
use super::result::ClusterAssignments;
use crate::core::common::{ComputeOnce, OxiclusterError};
use crate::core::indexing::kdtree::{make_rng, KdTree};
use crate::core::types::Point;
use rand::seq::SliceRandom;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Pending point in the seed heap, ordered by reachability then slot.
#[derive(Debug, Clone, Copy)]
struct Seed {
    reachability: f32,
    slot: usize,
}

impl PartialEq for Seed {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Seed {}

impl PartialOrd for Seed {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Seed {
    fn cmp(&self, other: &Self) -> Ordering {
        self.reachability
            .total_cmp(&other.reachability)
            .then_with(|| self.slot.cmp(&other.slot))
    }
}

/// Working state of one ordering run.
struct Walk {
    processed: Vec<bool>,
    /// Entry index of every processed slot.
    position: Vec<usize>,
    reachability: Vec<f32>,
    seeds: BinaryHeap<Reverse<Seed>>,
    entries: Vec<OrderingEntry>,
}

/// OPTICS over a fixed point set.
///
/// The ordering is computed once, on first request, with `params.epsilon` as
/// the largest radius ever considered. Clusterings for any threshold up to
/// that radius are derived from it without touching the index again.
#[derive(Debug)]
pub struct Optics {
    tree: KdTree,
    params: DensityParams,
    ordering: ComputeOnce<OpticsOrdering>,
}

impl Optics {
    /// # Errors
    ///
    /// Invalid parameters, duplicate ids, or any failure building the tree.
    pub fn new(points: Vec<Point>, params: DensityParams) -> Result<Self, OxiclusterError> {
        params.validate()?;
        check_unique_ids(&points)?;
        let tree = KdTree::build(points, params.metric, params.seed)?;
        Ok(Self { tree, params, ordering: ComputeOnce::new() })
    }

    pub const fn params(&self) -> &DensityParams {
        &self.params
    }

    pub const fn tree(&self) -> &KdTree {
        &self.tree
    }

    pub fn ordering(&self) -> Result<Arc<OpticsOrdering>, OxiclusterError> {
        self.ordering.get_or_try_init(|| self.run())
    }

    pub fn is_fitted(&self) -> bool {
        self.ordering.get().is_some()
    }

    /// Clustering at `threshold`, which must not exceed the ordering's epsilon.
    pub fn cluster(&self, threshold: f32) -> Result<ClusterAssignments, OxiclusterError> {
        self.ordering()?.cluster(threshold)
    }

    pub fn cluster_many(&self, thresholds: &[f32]) -> Result<Vec<ClusterAssignments>, OxiclusterError> {
        self.ordering()?.cluster_many(thresholds)
    }

    fn run(&self) -> Result<OpticsOrdering, OxiclusterError> {
        let started = Instant::now();
        let n = self.tree.len();
        let min_points = self.params.min_points;
        if n == 0 {
            // nothing to estimate from; leave every positive threshold usable
            let epsilon = if self.params.epsilon > 0.0 { self.params.epsilon } else { f32::INFINITY };
            return Ok(OpticsOrdering::new(Vec::new(), epsilon, min_points, None));
        }

        let (epsilon, estimate) = resolve_epsilon(&self.tree, self.params.epsilon, self.params.max_estimation_samples)?;
        info!("Ordering {} points with epsilon={} and min_points={}.", n, epsilon, min_points);

        let mut walk = Walk {
            processed: vec![false; n],
            position: vec![0; n],
            reachability: vec![f32::INFINITY; n],
            seeds: BinaryHeap::new(),
            entries: Vec::with_capacity(n),
        };
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut make_rng(self.params.seed));

        let interval = logging_interval(n);
        let mut segments = 0;
        for &start in &order {
            if walk.processed[start] {
                continue;
            }
            segments += 1;
            self.expand(start, epsilon, &mut walk)?;
            while let Some(Reverse(seed)) = walk.seeds.pop() {
                if walk.processed[seed.slot] || seed.reachability != walk.reachability[seed.slot] {
                    continue;
                }
                self.expand(seed.slot, epsilon, &mut walk)?;
                if interval > 0 && walk.entries.len() % interval == 0 {
                    debug!("Processing {}/{} - segments={}", walk.entries.len(), n, segments);
                }
            }
        }

        info!("Ordering has {} segments.", segments);
        info!("'OPTICS' finished in {:?}.", started.elapsed());
        Ok(OpticsOrdering::new(walk.entries, epsilon, min_points, estimate))
    }

    /// Emits `slot` and, if it is a core point, lowers the reachability of its
    /// unprocessed neighbours. Neighbours emitted earlier keep the best link
    /// back to a core point processed after them, so they can still be
    /// attached to its cluster as border points.
    fn expand(&self, slot: usize, epsilon: f32, walk: &mut Walk) -> Result<(), OxiclusterError> {
        let point = &self.tree.points[slot];
        walk.processed[slot] = true;
        walk.position[slot] = walk.entries.len();
        let core = self.core_distance(point, epsilon)?;
        walk.entries.push(OrderingEntry {
            id: point.id(),
            reachability: walk.reachability[slot],
            core,
            border: None,
        });
        if core.is_infinite() {
            return Ok(());
        }

        for neighbour in self.tree.within_distance(point, epsilon)? {
            let candidate = core.max(neighbour.distance);
            if walk.processed[neighbour.slot] {
                if neighbour.slot != slot {
                    let entry = &mut walk.entries[walk.position[neighbour.slot]];
                    if entry.border.map_or(true, |link| candidate < link.reachability) {
                        entry.border = Some(BorderLink { reachability: candidate, predecessor: point.id() });
                    }
                }
                continue;
            }
            if candidate < walk.reachability[neighbour.slot] {
                walk.reachability[neighbour.slot] = candidate;
                walk.seeds.push(Reverse(Seed { reachability: candidate, slot: neighbour.slot }));
            }
        }
        Ok(())
    }

    /// Distance to the `min_points`-th nearest point, the point itself
    /// included; infinite when that neighbour is missing or beyond `epsilon`.
    fn core_distance(&self, point: &Point, epsilon: f32) -> Result<f32, OxiclusterError> {
        let neighbours = self.tree.nearest_neighbours(point, self.params.min_points)?;
        Ok(match neighbours.last() {
            Some(last) if neighbours.len() >= self.params.min_points && last.distance <= epsilon => last.distance,
            _ => f32::INFINITY,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clustering::Dbscan;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;
    use std::thread;

    fn six_points() -> Vec<Point> {
        vec![
            Point::dense(0, vec![0.0, 0.0]),
            Point::dense(1, vec![0.0, 1.0]),
            Point::dense(2, vec![1.0, 0.0]),
            Point::dense(3, vec![1.0, 1.0]),
            Point::dense(4, vec![10.0, 10.0]),
            Point::dense(5, vec![10.0, 11.0]),
        ]
    }

    fn blobs(centres: &[(f32, f32)], per_blob: usize, seed: u64) -> Vec<Point> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut points = Vec::new();
        for (c, (x, y)) in centres.iter().enumerate() {
            for i in 0..per_blob {
                let id = (c * per_blob + i) as i64;
                points.push(Point::dense(id, vec![x + rng.gen_range(-0.5..0.5), y + rng.gen_range(-0.5..0.5)]));
            }
        }
        points
    }

    /// Clusters as sorted member lists, independent of label numbering.
    fn partition(assignments: &ClusterAssignments) -> Vec<Vec<i64>> {
        let mut clusters: Vec<Vec<i64>> = assignments.clusters().into_values().collect();
        clusters.sort();
        clusters
    }

    #[test]
    fn test_ordering_covers_every_point_once() {
        let points = blobs(&[(0.0, 0.0), (5.0, 5.0)], 25, 8);
        let optics = Optics::new(points, DensityParams::new(1.0, 4).with_seed(Some(8))).unwrap();
        let ordering = optics.ordering().unwrap();

        assert_eq!(ordering.len(), 50);
        let ids: HashSet<i64> = ordering.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids.len(), 50);
        for (rank, entry) in ordering.entries().iter().enumerate() {
            assert_eq!(ordering.rank(entry.id), Some(rank));
        }
        assert!(ordering.entries()[0].reachability.is_infinite());
    }

    #[test]
    fn test_distances_bounded_by_epsilon() {
        let points = blobs(&[(0.0, 0.0), (3.0, 0.0)], 30, 5);
        let optics = Optics::new(points, DensityParams::new(0.7, 5).with_seed(Some(2))).unwrap();
        for entry in optics.ordering().unwrap().entries() {
            assert!(entry.core.is_infinite() || entry.core <= 0.7);
            assert!(entry.reachability.is_infinite() || entry.reachability <= 0.7);
        }
    }

    #[test]
    fn test_six_points() {
        let optics = Optics::new(six_points(), DensityParams::new(2.0, 2).with_seed(Some(1))).unwrap();
        let ordering = optics.ordering().unwrap();

        // the nearest other point of every point is exactly 1 away
        assert!(ordering.entries().iter().all(|e| e.core == 1.0));
        let segment_starts = ordering.entries().iter().filter(|e| e.reachability.is_infinite()).count();
        assert_eq!(segment_starts, 2);

        let clustered = optics.cluster(2.0).unwrap();
        assert_eq!(partition(&clustered), vec![vec![0, 1, 2, 3], vec![4, 5]]);
        let tight = optics.cluster(0.5).unwrap();
        assert_eq!(tight.noise_count(), 6);
    }

    #[test]
    fn test_matches_dbscan() {
        let six = six_points();
        let optics = Optics::new(six.clone(), DensityParams::new(2.0, 2).with_seed(Some(3))).unwrap();
        for threshold in [2.0, 1.0, 0.5] {
            let dbscan = Dbscan::new(six.clone(), DensityParams::new(threshold, 2).with_seed(Some(3))).unwrap();
            let expected = dbscan.assignments().unwrap();
            let derived = optics.cluster(threshold).unwrap();
            assert_eq!(partition(&derived), partition(&expected), "threshold {threshold}");
            assert_eq!(derived.noise_count(), expected.noise_count(), "threshold {threshold}");
        }

        let mut points = blobs(&[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)], 40, 21);
        points.push(Point::dense(900, vec![5.0, 5.0]));
        let params = DensityParams::new(0.8, 4).with_seed(Some(21));
        let dbscan = Dbscan::new(points.clone(), params.clone()).unwrap();
        let optics = Optics::new(points, params).unwrap();
        let expected = dbscan.assignments().unwrap();
        let derived = optics.cluster(0.8).unwrap();
        assert_eq!(partition(&derived), partition(&expected));
        assert!(derived.get(900).unwrap().is_noise());
    }

    #[test]
    fn test_border_point_emitted_before_its_core_point() {
        let line: Vec<Point> = (0..3).map(|i| Point::dense(i, vec![i as f32])).collect();
        for seed in 0..20 {
            let params = DensityParams::new(1.0, 3).with_seed(Some(seed));
            let dbscan = Dbscan::new(line.clone(), params.clone()).unwrap();
            let optics = Optics::new(line.clone(), params).unwrap();
            let expected = dbscan.assignments().unwrap();
            let derived = optics.cluster(1.0).unwrap();
            assert_eq!(partition(&expected), vec![vec![0, 1, 2]], "seed {seed}");
            assert_eq!(partition(&derived), partition(&expected), "seed {seed}");
            assert_eq!(derived.get(0).unwrap().score, 1.0, "seed {seed}");
        }
    }

    #[test]
    fn test_isolated_point_starts_its_own_segment() {
        let mut points = six_points();
        points.push(Point::dense(6, vec![-50.0, 40.0]));
        let optics = Optics::new(points, DensityParams::new(2.0, 2)).unwrap();
        let ordering = optics.ordering().unwrap();
        let entry = ordering.entry(6).unwrap();
        assert!(entry.reachability.is_infinite());
        assert!(entry.core.is_infinite());
        assert!(optics.cluster(2.0).unwrap().get(6).unwrap().is_noise());
    }

    #[test]
    fn test_threshold_above_epsilon() {
        let optics = Optics::new(six_points(), DensityParams::new(2.0, 2)).unwrap();
        assert!(matches!(optics.cluster(2.5), Err(OxiclusterError::InvalidArgument(_))));
        assert!(matches!(optics.cluster(0.0), Err(OxiclusterError::InvalidArgument(_))));
        assert_eq!(optics.cluster_many(&[0.5, 1.0, 2.0]).unwrap().len(), 3);
    }

    #[test]
    fn test_estimated_epsilon() {
        let points = blobs(&[(0.0, 0.0), (8.0, 8.0)], 30, 6);
        let optics = Optics::new(points, DensityParams::new(0.0, 3).with_seed(Some(6))).unwrap();
        let ordering = optics.ordering().unwrap();
        let estimate = ordering.estimate().unwrap();
        assert_eq!(ordering.epsilon(), estimate.epsilon);
        assert!(optics.cluster(ordering.epsilon()).is_ok());
    }

    #[test]
    fn test_empty_input() {
        let optics = Optics::new(Vec::new(), DensityParams::new(1.0, 3)).unwrap();
        assert!(optics.ordering().unwrap().is_empty());
        assert!(optics.cluster(1.0).unwrap().is_empty());

        let optics = Optics::new(Vec::new(), DensityParams::new(0.0, 3)).unwrap();
        let ordering = optics.ordering().unwrap();
        assert!(ordering.epsilon().is_infinite());
        assert!(ordering.estimate().is_none());
        assert!(optics.cluster(1.0).unwrap().is_empty());
    }

    #[test]
    fn test_computed_once_across_threads() {
        let optics = Arc::new(Optics::new(six_points(), DensityParams::new(2.0, 2).with_seed(Some(1))).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let optics = Arc::clone(&optics);
                thread::spawn(move || optics.cluster([0.5, 1.0, 1.5, 2.0][i]).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(optics.ordering.computations(), 1);
        assert!(optics.is_fitted());
    }
}
