#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]
#![warn(clippy::cast_possible_truncation)]
#![warn(clippy::cast_possible_wrap)]
#![warn(clippy::cast_precision_loss)]
#![warn(clippy::cast_sign_loss)]
#![forbid(unsafe_code)]
#![deny(deprecated, clippy::todo, clippy::module_inception, clippy::correctness, clippy::perf)]
#![warn(clippy::style, clippy::complexity, clippy::all)]

//! # Oxicluster: density-based clustering over a randomized k-d tree
//!
//! `oxicluster` indexes `(id, vector)` pairs and groups them by local density
//! without asking for the number of clusters up front. It features:
//! - Sparse-aware L1, L2 and cosine distances
//! - A k-d tree built by randomized median selection, with nearest-neighbour,
//!   k-nearest-neighbour and range queries
//! - DBSCAN-style clustering with automatic epsilon estimation
//! - OPTICS-style ordering from which clusterings at any smaller radius can be
//!   extracted in a single linear pass
//! - A compact binary layout for persisting the index
//!
//! Results are computed lazily, at most once per algorithm instance, and can be
//! shared freely between threads once computed.

pub mod core;

// Re-export key types for easier use by library consumers
pub use crate::core::clustering::{
    estimate_epsilon, BorderLink, ClusterAssignments, ClusteringResult, Dbscan, DensityParams,
    EpsilonEstimate, Optics, OpticsOrdering, OrderingEntry, NOISE,
};
pub use crate::core::common::OxiclusterError;
pub use crate::core::config::{ClusteringConfig, ConfigBuilder};
pub use crate::core::indexing::kdtree::{BoundedPriorityQueue, KdTree, Neighbour, MAX_DEPTH};
pub use crate::core::pipeline::{
    collect_points, DbscanStage, OpticsOrderingStage, OpticsStage, OrderingResult, SourceRow,
};
pub use crate::core::types::{Coordinates, Point};
pub use crate::core::vector::DistanceMetric;

/// Core result type for the library
pub type Result<T> = std::result::Result<T, OxiclusterError>;
