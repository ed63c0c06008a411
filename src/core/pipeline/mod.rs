// src/core/pipeline/mod.rs

//! Row-oriented entry points: rows keyed by 128-bit identifiers go in,
//! per-row cluster labels or ordering positions come out.

mod source;
mod stages;

pub use self::source::{collect_points, point_id, SourceRow};
pub use self::stages::{DbscanStage, OpticsOrderingStage, OpticsStage, OrderingResult};

#[cfg(test)]
mod tests {
    mod test_stages;
}
