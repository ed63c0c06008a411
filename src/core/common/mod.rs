pub mod byteorder;
pub mod error;
pub mod lock_utils;
pub mod traits;

pub use error::OxiclusterError;
pub use lock_utils::ComputeOnce;

#[cfg(test)]
mod tests {
    mod error_tests;
}
