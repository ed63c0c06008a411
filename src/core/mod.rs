pub mod clustering;
pub mod common;
pub mod config;
pub mod indexing;
pub mod pipeline;
pub mod types;
pub mod vector;

pub use self::config::ClusteringConfig;
