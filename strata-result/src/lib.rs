//! Shared error and result types for the Strata query core.

mod error;

pub use error::Error;

/// Result alias used across all Strata crates.
pub type Result<T> = std::result::Result<T, Error>;
