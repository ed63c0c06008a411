// src/core/clustering/mod.rs

//! Density-based clustering on top of the k-d tree.
//!
//! [`Dbscan`] labels points directly for one radius. [`Optics`] computes a
//! reachability ordering once, from which [`OpticsOrdering::cluster`] derives
//! the labels for any radius up to the one the ordering was built with.

mod dbscan;
pub mod estimate;
mod optics;
mod ordering;
mod params;
mod result;

pub use self::dbscan::Dbscan;
pub use self::estimate::{estimate_epsilon, EpsilonEstimate, DEFAULT_MAX_SAMPLES};
pub use self::optics::Optics;
pub use self::ordering::{BorderLink, OpticsOrdering, OrderingEntry};
pub use self::params::DensityParams;
pub use self::result::{ClusterAssignments, ClusteringResult, NOISE};
