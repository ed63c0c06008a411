// src/core/common/error.rs

use std::fmt;

#[derive(Debug)]
pub enum OxiclusterError {
    Io(std::io::Error),
    Json(serde_json::Error),
    InvalidArgument(String),
    InvalidDimension { expected: usize, found: usize },
    DimensionMismatch { dim1: usize, dim2: usize },
    IdOutOfRange(u128),
    EstimationFailed(String),
    DepthExceeded { depth: usize, max_depth: usize },
    CorruptIndex(String),
    NotImplemented { feature: String },
    Configuration(String),
    Lock(String),
}

impl fmt::Display for OxiclusterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO Error: {}", e),
            Self::Json(e) => write!(f, "JSON Serialization/Deserialization Error: {}", e),
            Self::InvalidArgument(s) => write!(f, "Invalid argument: {}", s),
            Self::InvalidDimension { expected, found } => write!(
                f,
                "Invalid dimension: expected {}, found {}",
                expected, found
            ),
            Self::DimensionMismatch { dim1, dim2 } => {
                write!(f, "Vector dimension mismatch: dim1 = {}, dim2 = {}", dim1, dim2)
            }
            Self::IdOutOfRange(id) => {
                write!(f, "Row id {} does not fit in a signed 64-bit point id", id)
            }
            Self::EstimationFailed(s) => write!(f, "Epsilon estimation failed: {}", s),
            Self::DepthExceeded { depth, max_depth } => write!(
                f,
                "Tree depth {} exceeds the maximum of {}; the data is probably too sparse, \
                 consider reducing its dimensionality (PCA) first",
                depth, max_depth
            ),
            Self::CorruptIndex(s) => write!(f, "Corrupt index: {}", s),
            Self::NotImplemented { feature } => write!(f, "Feature not implemented: {}", feature),
            Self::Configuration(s) => write!(f, "Configuration error: {}", s),
            Self::Lock(s) => write!(f, "Lock Error: {}", s),
        }
    }
}

impl std::error::Error for OxiclusterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

// Manual From implementations
impl From<std::io::Error> for OxiclusterError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for OxiclusterError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl OxiclusterError {
    /// Shorthand for an `InvalidArgument` error.
    #[must_use]
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Shorthand for a `CorruptIndex` error.
    #[must_use]
    pub fn corrupt<S: Into<String>>(message: S) -> Self {
        Self::CorruptIndex(message.into())
    }
}
