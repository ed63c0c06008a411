// src/core/vector/mod.rs

pub mod distance;

pub use distance::{cosine_distance, l1_distance, l2_distance, DistanceMetric};
