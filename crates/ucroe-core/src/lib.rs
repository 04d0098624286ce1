//! ucroe-core: Core traits and types for the ucroe library
//!
//! This crate provides the storage contract, serialization and metrics
//! seams shared by the guard and the storage backends.

mod error;
mod traits;

pub use error::{CacheError, Result};
pub use traits::*;
