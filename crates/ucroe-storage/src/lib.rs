//! ucroe-storage: Storage backends for ucroe

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "memory")]
pub mod named;

#[cfg(feature = "memory")]
pub use memory::{LruBackend, LruConfig, TtlBackend, TtlConfig};

#[cfg(feature = "memory")]
pub use named::{NamedCache, NamedCacheBackend, NamedCacheConfig, NamedCaches};
