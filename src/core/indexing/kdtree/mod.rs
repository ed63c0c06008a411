// src/core/indexing/kdtree/mod.rs

//! Randomized k-d tree over sparse or dense points.
//!
//! Nodes live in an arena and refer to their children by index; every query
//! walks the arena with an explicit work stack, so traversal depth is bounded
//! by memory rather than by the call stack.

mod builder;
mod persistence;
pub mod queue;
mod search;
mod tree;

pub(crate) use self::builder::make_rng;
pub use self::persistence::PointCodec;
pub use self::queue::BoundedPriorityQueue;
pub use self::search::Neighbour;
pub use self::tree::{KdTree, Points};

/// Deepest node (internal or leaf) a tree may contain.
pub const MAX_DEPTH: usize = 1500;

/// Splitting key of a point at a given node depth.
#[inline]
pub(crate) fn key_at(point: &crate::core::types::Point, depth: usize, dimension: usize) -> f32 {
    point.element_at(depth % dimension)
}
