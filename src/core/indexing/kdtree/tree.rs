// src/core/indexing/kdtree/tree.rs

//! Defines the arena node type and the `KdTree` handle.

use super::{builder, key_at, MAX_DEPTH};
use crate::core::common::OxiclusterError;
use crate::core::types::Point;
use crate::core::vector::DistanceMetric;
use tracing::debug;

pub(crate) type NodeId = usize;

/// A node of the arena.
///
/// `point` is a slot in `KdTree::points`; `size` counts the points stored in
/// the subtree rooted here (leaves hold none).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum KdNode {
    Internal { point: usize, left: NodeId, right: NodeId, size: usize, depth: usize },
    Leaf { depth: usize },
}

impl KdNode {
    pub(crate) const fn depth(&self) -> usize {
        match self {
            Self::Internal { depth, .. } | Self::Leaf { depth } => *depth,
        }
    }

    pub(crate) const fn size(&self) -> usize {
        match self {
            Self::Internal { size, .. } => *size,
            Self::Leaf { .. } => 0,
        }
    }
}

/// k-d tree over `Point`s sharing one dimension.
///
/// The tree is not internally synchronized: concurrent read-only queries are
/// fine, insertion needs exclusive access.
#[derive(Debug, Clone)]
pub struct KdTree {
    pub(crate) nodes: Vec<KdNode>,
    pub(crate) root: Option<NodeId>,
    pub(crate) points: Vec<Point>,
    pub(crate) dimension: usize,
    pub(crate) metric: DistanceMetric,
    pub(crate) seed: Option<u64>,
}

impl KdTree {
    /// Creates an empty tree. Its dimension is fixed by the first insertion.
    pub fn new(metric: DistanceMetric, seed: Option<u64>) -> Self {
        Self { nodes: Vec::new(), root: None, points: Vec::new(), dimension: 0, metric, seed }
    }

    /// Builds a tree from `points` by randomized median selection.
    ///
    /// The slot of every point (see [`KdTree::point`]) is its position in
    /// `points`.
    ///
    /// # Errors
    ///
    /// * `InvalidArgument` if the points have dimension zero.
    /// * `InvalidDimension` if the points do not all share one dimension.
    /// * `DepthExceeded` if the data is degenerate enough to push a node past
    ///   [`MAX_DEPTH`].
    pub fn build(
        points: Vec<Point>,
        metric: DistanceMetric,
        seed: Option<u64>,
    ) -> Result<Self, OxiclusterError> {
        let mut tree = Self::new(metric, seed);
        let Some(first) = points.first() else {
            return Ok(tree);
        };

        let dimension = first.dimension();
        if dimension == 0 {
            return Err(OxiclusterError::invalid_argument("points must have a positive dimension"));
        }
        if let Some(bad) = points.iter().find(|p| p.dimension() != dimension) {
            return Err(OxiclusterError::InvalidDimension {
                expected: dimension,
                found: bad.dimension(),
            });
        }

        let (nodes, root) = builder::build_nodes(&points, dimension, seed)?;
        debug!(points = points.len(), nodes = nodes.len(), dimension, "built k-d tree");
        tree.nodes = nodes;
        tree.root = Some(root);
        tree.points = points;
        tree.dimension = dimension;
        Ok(tree)
    }

    /// True when the tree holds at least one point.
    pub const fn any(&self) -> bool {
        self.root.is_some()
    }

    /// Number of points, read from the root's cached size.
    pub fn len(&self) -> usize {
        self.root.map_or(0, |root| self.nodes[root].size())
    }

    pub fn is_empty(&self) -> bool {
        !self.any()
    }

    /// Declared dimension, zero while the tree has never held a point.
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    pub const fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub const fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Point stored in `slot`.
    pub fn point(&self, slot: usize) -> Option<&Point> {
        self.points.get(slot)
    }

    /// Iterates the stored points in pre-order (node, left subtree, right subtree).
    pub fn points(&self) -> Points<'_> {
        Points { tree: self, stack: self.root.into_iter().collect() }
    }

    /// Rejects points whose dimension differs from the tree's.
    pub(crate) fn check_dimension(&self, point: &Point) -> Result<(), OxiclusterError> {
        if point.dimension() != self.dimension {
            return Err(OxiclusterError::InvalidDimension {
                expected: self.dimension,
                found: point.dimension(),
            });
        }
        Ok(())
    }

    /// Validation shared by every query: the tree must hold points and the
    /// query must have the tree's dimension.
    pub(crate) fn check_query(&self, point: &Point) -> Result<(), OxiclusterError> {
        if !self.any() {
            return Err(OxiclusterError::invalid_argument("the k-d tree is empty"));
        }
        self.check_dimension(point)
    }

    /// Inserts a point without rebalancing.
    ///
    /// # Errors
    ///
    /// `InvalidDimension` for a point of the wrong dimension, `DepthExceeded`
    /// when the new node would sit below [`MAX_DEPTH`]. The tree is left
    /// unchanged on error.
    pub fn insert(&mut self, point: Point) -> Result<(), OxiclusterError> {
        if self.dimension == 0 {
            if point.dimension() == 0 {
                return Err(OxiclusterError::invalid_argument("points must have a positive dimension"));
            }
            self.dimension = point.dimension();
        } else {
            self.check_dimension(&point)?;
        }

        let slot = self.points.len();
        let Some(root) = self.root else {
            let root = self.push_internal(slot, 0);
            self.root = Some(root);
            self.points.push(point);
            return Ok(());
        };

        let mut path = Vec::new();
        let mut current = root;
        let depth = loop {
            match self.nodes[current] {
                KdNode::Leaf { depth } => break depth,
                KdNode::Internal { point: node_slot, left, right, depth, .. } => {
                    path.push(current);
                    let key = key_at(&point, depth, self.dimension);
                    let node_key = key_at(&self.points[node_slot], depth, self.dimension);
                    current = if key.total_cmp(&node_key).is_le() { left } else { right };
                }
            }
        };
        if depth + 1 > MAX_DEPTH {
            return Err(OxiclusterError::DepthExceeded { depth: depth + 1, max_depth: MAX_DEPTH });
        }

        let left = self.push_leaf(depth + 1);
        let right = self.push_leaf(depth + 1);
        self.nodes[current] = KdNode::Internal { point: slot, left, right, size: 1, depth };
        for id in path {
            if let KdNode::Internal { size, .. } = &mut self.nodes[id] {
                *size += 1;
            }
        }
        self.points.push(point);
        Ok(())
    }

    /// Deletion is not supported; rebuild the tree instead.
    ///
    /// # Errors
    ///
    /// Always `NotImplemented`.
    pub fn delete(&mut self, _point: &Point) -> Result<bool, OxiclusterError> {
        Err(OxiclusterError::NotImplemented { feature: "k-d tree deletion".to_string() })
    }

    /// True if a point with equal coordinates is stored in the tree.
    pub fn contains(&self, point: &Point) -> Result<bool, OxiclusterError> {
        let Some(mut current) = self.root else {
            return Ok(false);
        };
        self.check_dimension(point)?;

        while let KdNode::Internal { point: slot, left, right, depth, .. } = self.nodes[current] {
            let stored = &self.points[slot];
            if stored == point {
                return Ok(true);
            }
            let key = key_at(point, depth, self.dimension);
            let node_key = key_at(stored, depth, self.dimension);
            current = if key.total_cmp(&node_key).is_le() { left } else { right };
        }
        Ok(false)
    }

    /// Adds `offset` to every point id, e.g. before merging trees whose ids
    /// were numbered independently.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if an id would overflow or a point's id was already
    /// reassigned. No id is changed in that case.
    pub fn move_ids(&mut self, offset: i64) -> Result<(), OxiclusterError> {
        let mut new_ids = Vec::with_capacity(self.points.len());
        for point in &self.points {
            if point.id_changed() {
                return Err(OxiclusterError::InvalidArgument(format!(
                    "id of point {} was already changed once",
                    point.id()
                )));
            }
            let id = point.id().checked_add(offset).ok_or_else(|| {
                OxiclusterError::InvalidArgument(format!(
                    "moving id {} by {} overflows",
                    point.id(),
                    offset
                ))
            })?;
            new_ids.push(id);
        }
        for (point, id) in self.points.iter_mut().zip(new_ids) {
            point.change_id(id)?;
        }
        Ok(())
    }

    fn push_leaf(&mut self, depth: usize) -> NodeId {
        self.nodes.push(KdNode::Leaf { depth });
        self.nodes.len() - 1
    }

    fn push_internal(&mut self, slot: usize, depth: usize) -> NodeId {
        let left = self.push_leaf(depth + 1);
        let right = self.push_leaf(depth + 1);
        self.nodes.push(KdNode::Internal { point: slot, left, right, size: 1, depth });
        self.nodes.len() - 1
    }
}

/// Pre-order iterator over the points of a [`KdTree`].
#[derive(Debug)]
pub struct Points<'a> {
    tree: &'a KdTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Points<'a> {
    type Item = &'a Point;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            if let KdNode::Internal { point, left, right, .. } = self.tree.nodes[id] {
                self.stack.push(right);
                self.stack.push(left);
                return Some(&self.tree.points[point]);
            }
        }
        None
    }
}
