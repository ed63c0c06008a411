// src/core/indexing/kdtree/builder.rs

//! Construction of the node arena by randomized median selection.

use super::tree::{KdNode, NodeId};
use super::{key_at, MAX_DEPTH};
use crate::core::common::OxiclusterError;
use crate::core::types::Point;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;

/// Result of selecting the median-ranked point among candidate slots.
#[derive(Debug, Default)]
pub(crate) struct Split {
    pub pivot: usize,
    pub left: Vec<usize>,
    pub right: Vec<usize>,
}

/// Seeded generator when a seed is given, entropy-seeded otherwise.
pub(crate) fn make_rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}

/// Builds the arena for `points` and returns it with the root id.
///
/// Work items are processed from an explicit stack; each one fills a node
/// slot that was reserved by its parent.
pub(crate) fn build_nodes(
    points: &[Point],
    dimension: usize,
    seed: Option<u64>,
) -> Result<(Vec<KdNode>, NodeId), OxiclusterError> {
    let mut rng = make_rng(seed);
    let mut nodes = vec![KdNode::Leaf { depth: 0 }];
    let mut stack: Vec<(NodeId, Vec<usize>, usize)> = vec![(0, (0..points.len()).collect(), 0)];

    while let Some((id, candidates, depth)) = stack.pop() {
        if depth > MAX_DEPTH {
            return Err(OxiclusterError::DepthExceeded { depth, max_depth: MAX_DEPTH });
        }
        if candidates.is_empty() {
            nodes[id] = KdNode::Leaf { depth };
            continue;
        }

        let size = candidates.len();
        let split = random_select(points, candidates, depth, dimension, &mut rng);

        nodes.push(KdNode::Leaf { depth: depth + 1 });
        let left = nodes.len() - 1;
        nodes.push(KdNode::Leaf { depth: depth + 1 });
        let right = nodes.len() - 1;
        nodes[id] = KdNode::Internal { point: split.pivot, left, right, size, depth };

        stack.push((right, split.right, depth + 1));
        stack.push((left, split.left, depth + 1));
    }

    Ok((nodes, 0))
}

/// Finds the median-ranked candidate by key at `depth` in expected linear time.
///
/// Points whose key equals the pivot's go left, so every left key is `<=` the
/// pivot key and every right key is `>` it.
pub(crate) fn random_select<R: Rng>(
    points: &[Point],
    mut candidates: Vec<usize>,
    depth: usize,
    dimension: usize,
    rng: &mut R,
) -> Split {
    let mut split = Split::default();
    let mut which = (candidates.len() - 1) / 2;

    loop {
        if candidates.len() == 1 {
            split.pivot = candidates[0];
            return split;
        }

        let pivot_key = key_at(&points[candidates[rng.gen_range(0..candidates.len())]], depth, dimension);
        let (mut lo, mut mid, mut hi) = (Vec::new(), Vec::new(), Vec::new());
        for slot in candidates {
            match key_at(&points[slot], depth, dimension).total_cmp(&pivot_key) {
                Ordering::Less => lo.push(slot),
                Ordering::Equal => mid.push(slot),
                Ordering::Greater => hi.push(slot),
            }
        }

        if which < lo.len() {
            split.right.extend(mid);
            split.right.extend(hi);
            candidates = lo;
        } else if which < lo.len() + mid.len() {
            split.pivot = mid[0];
            split.left.extend(lo);
            split.left.extend_from_slice(&mid[1..]);
            split.right.extend(hi);
            return split;
        } else {
            which -= lo.len() + mid.len();
            split.left.extend(lo);
            split.left.extend(mid);
            candidates = hi;
        }
    }
}
