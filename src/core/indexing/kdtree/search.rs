// src/core/indexing/kdtree/search.rs

//! Branch-and-bound queries over the node arena.

use super::key_at;
use super::queue::BoundedPriorityQueue;
use super::tree::{KdNode, KdTree, NodeId};
use crate::core::common::OxiclusterError;
use crate::core::types::Point;
use serde::Serialize;

/// A stored point found by a query, with its distance to the query point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbour {
    /// Slot of the point in the tree (see [`KdTree::point`]).
    pub slot: usize,
    pub id: i64,
    pub distance: f32,
}

/// Receives every distance the traversal computes and decides how far the
/// traversal may prune.
trait Collector {
    fn offer(&mut self, slot: usize, id: i64, distance: f32);

    /// A farther branch is explored only if the query's distance to the
    /// splitting plane is `<=` this bound.
    fn bound(&self) -> f32;
}

/// Pending traversal work. `Far` is pushed before the near child's `Visit`, so
/// the bound is checked only once the near subtree is fully explored.
enum Task {
    Visit(NodeId),
    Far { node: NodeId, gap: f32 },
}

struct NearestCollector {
    best: Option<Neighbour>,
}

impl Collector for NearestCollector {
    fn offer(&mut self, slot: usize, id: i64, distance: f32) {
        let closer = |best: Neighbour| distance.total_cmp(&best.distance).then(slot.cmp(&best.slot)).is_lt();
        if self.best.map_or(true, closer) {
            self.best = Some(Neighbour { slot, id, distance });
        }
    }

    fn bound(&self) -> f32 {
        self.best.map_or(f32::INFINITY, |best| best.distance)
    }
}

struct KnnCollector {
    queue: BoundedPriorityQueue<(usize, i64)>,
}

impl Collector for KnnCollector {
    fn offer(&mut self, slot: usize, id: i64, distance: f32) {
        self.queue.push((slot, id), distance);
    }

    fn bound(&self) -> f32 {
        if self.queue.is_full() {
            self.queue.worst().unwrap_or(f32::INFINITY)
        } else {
            f32::INFINITY
        }
    }
}

struct RangeCollector {
    radius: f32,
    found: Vec<Neighbour>,
}

impl Collector for RangeCollector {
    fn offer(&mut self, slot: usize, id: i64, distance: f32) {
        if distance <= self.radius {
            self.found.push(Neighbour { slot, id, distance });
        }
    }

    fn bound(&self) -> f32 {
        self.radius
    }
}

impl KdTree {
    fn traverse<C: Collector>(&self, target: &Point, collector: &mut C) -> Result<(), OxiclusterError> {
        let mut stack: Vec<Task> = self.root.into_iter().map(Task::Visit).collect();

        while let Some(task) = stack.pop() {
            let id = match task {
                Task::Visit(id) => id,
                Task::Far { node, gap } => {
                    if gap <= collector.bound() {
                        stack.push(Task::Visit(node));
                    }
                    continue;
                }
            };

            let KdNode::Internal { point: slot, left, right, depth, .. } = self.nodes[id] else {
                continue;
            };
            let point = &self.points[slot];
            let distance = self.metric.distance(point.coordinates(), target.coordinates())?;
            collector.offer(slot, point.id(), distance);

            let key = key_at(point, depth, self.dimension);
            let target_key = key_at(target, depth, self.dimension);
            let (near, far) = if target_key.total_cmp(&key).is_le() { (left, right) } else { (right, left) };

            stack.push(Task::Far { node: far, gap: self.metric.axis_gap_bound(target_key - key) });
            stack.push(Task::Visit(near));
        }
        Ok(())
    }

    /// Closest stored point to `target`; ties go to the lower slot.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` on an empty tree, `InvalidDimension` for a query of
    /// the wrong dimension.
    pub fn nearest_neighbour(&self, target: &Point) -> Result<Neighbour, OxiclusterError> {
        self.check_query(target)?;
        let mut collector = NearestCollector { best: None };
        self.traverse(target, &mut collector)?;
        collector
            .best
            .ok_or_else(|| OxiclusterError::invalid_argument("no finite distance to any stored point"))
    }

    /// The `k` stored points closest to `target`, by ascending distance.
    ///
    /// Ties on distance are ordered by slot. Fewer than `k` neighbours are
    /// returned when the tree holds fewer points.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for `k == 0` or an empty tree, `InvalidDimension` for
    /// a query of the wrong dimension.
    pub fn nearest_neighbours(&self, target: &Point, k: usize) -> Result<Vec<Neighbour>, OxiclusterError> {
        self.check_query(target)?;
        let mut collector = KnnCollector { queue: BoundedPriorityQueue::new(k)? };
        self.traverse(target, &mut collector)?;

        let mut neighbours: Vec<Neighbour> = collector
            .queue
            .into_sorted_vec()
            .into_iter()
            .map(|((slot, id), distance)| Neighbour { slot, id, distance })
            .collect();
        neighbours.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.slot.cmp(&b.slot)));
        Ok(neighbours)
    }

    /// Every stored point whose distance to `center` is `<= radius`, in
    /// traversal order.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a negative or NaN radius or an empty tree,
    /// `InvalidDimension` for a query of the wrong dimension.
    pub fn within_distance(&self, center: &Point, radius: f32) -> Result<Vec<Neighbour>, OxiclusterError> {
        if radius.is_nan() || radius < 0.0 {
            return Err(OxiclusterError::InvalidArgument(format!(
                "radius must be a non-negative number, got {}",
                radius
            )));
        }
        self.check_query(center)?;
        let mut collector = RangeCollector { radius, found: Vec::new() };
        self.traverse(center, &mut collector)?;
        Ok(collector.found)
    }
}
