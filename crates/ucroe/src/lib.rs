//! ucroe: use the cached result on exception
//!
//! Wrap a fallible function so that, when it fails, the last successful
//! result is returned instead of the error.
//!
//! # Features
//!
//! - **Attribute macro** usable bare or with options
//! - **Pluggable backends** (in-memory LRU, LRU + TTL, named caches, your own)
//! - **Layered configuration** (settings file, environment, defaults)
//! - **Pluggable serialization** (JSON, MessagePack, Bincode)
//! - **Metrics integration**
//!
//! # Quick Start
//!
//! ```rust
//! use ucroe::prelude::*;
//!
//! #[derive(Debug, thiserror::Error)]
//! enum FetchError {
//!     #[error("upstream unavailable")]
//!     Unavailable,
//!     #[error(transparent)]
//!     Cache(#[from] CacheError),
//! }
//!
//! #[cached_result_on_exception(log_exception = true)]
//! fn exchange_rate(fail: bool) -> Result<f64, FetchError> {
//!     if fail {
//!         return Err(FetchError::Unavailable);
//!     }
//!     Ok(1.08)
//! }
//!
//! assert_eq!(exchange_rate(false).unwrap(), 1.08);
//! // The upstream fails; the previous result is returned instead
//! assert_eq!(exchange_rate(true).unwrap(), 1.08);
//! ```

extern crate self as ucroe;

mod guard;
mod resolver;

// Re-export core
pub use ucroe_core::*;

// Re-export storage
#[cfg(feature = "memory")]
pub use ucroe_storage::{
    LruBackend, LruConfig, NamedCache, NamedCacheBackend, NamedCacheConfig, NamedCaches,
    TtlBackend, TtlConfig,
};

pub use guard::{
    CachedResultOnException, ExceptionCallback, FallbackEvent, GuardBuilder, GuardError,
    IntoExceptionCallback,
};
pub use resolver::{
    decode_backend_config, BackendConfig, BackendFactory, BackendRegistry, ConfigName,
    DeclarativeSettings, FileSettings, GlobalConfig, GlobalConfigBuilder, SettingsError,
    StaticSettings,
};

#[cfg(feature = "derive")]
pub use ucroe_derive::cached_result_on_exception;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        CacheBackend, CacheError, CachedResultOnException, FallbackEvent, GlobalConfig,
        GuardError, JsonSerializer, Serializer,
    };

    #[cfg(feature = "memory")]
    pub use crate::{LruBackend, TtlBackend};

    #[cfg(feature = "derive")]
    pub use crate::cached_result_on_exception;

    #[cfg(feature = "msgpack")]
    pub use crate::MsgPackSerializer;

    #[cfg(feature = "bincode")]
    pub use crate::BincodeSerializer;
}
