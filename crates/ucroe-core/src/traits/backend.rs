//! Cache backend trait

use std::sync::Arc;

use crate::CacheError;

/// Storage contract used by the fallback guard
///
/// Values are opaque serialized bytes keyed by the wrapped function's
/// qualified name. A stored value that encodes "nothing" (for example a
/// JSON `null`) is still an entry: `get` must return `Some` for it.
///
/// Errors raised by the underlying store are returned as-is; the guard
/// propagates them to its caller.
pub trait CacheBackend: Send + Sync + 'static {
    /// Get the value stored under `key`, or `None` when there is no entry
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store `value` under `key`, replacing any previous entry
    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError>;

    /// Check whether an entry exists for `key`
    fn has(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.get(key)?.is_some())
    }
}

impl<B: CacheBackend + ?Sized> CacheBackend for Arc<B> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        (**self).set(key, value)
    }

    fn has(&self, key: &str) -> Result<bool, CacheError> {
        (**self).has(key)
    }
}

impl<B: CacheBackend + ?Sized> CacheBackend for Box<B> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        (**self).set(key, value)
    }

    fn has(&self, key: &str) -> Result<bool, CacheError> {
        (**self).has(key)
    }
}
