// src/core/indexing/mod.rs

pub mod kdtree;
