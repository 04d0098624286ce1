//! In-memory cache backends

mod backend;

pub use backend::{LruBackend, LruConfig, TtlBackend, TtlConfig};
