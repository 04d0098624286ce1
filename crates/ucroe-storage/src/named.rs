//! Adapter over caches registered by name elsewhere in the process
//!
//! Applications that already own configured caches (with their own
//! capacity, prefixes or remote storage) register them in a [`NamedCaches`]
//! registry. [`NamedCacheBackend`] binds to one of them by name.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use serde::Deserialize;

use ucroe_core::{CacheBackend, CacheError, Result};

use crate::memory::LruBackend;

/// A cache registered under a name, with its own key prefix
pub struct NamedCache {
    store: Arc<dyn CacheBackend>,
    key_prefix: String,
}

impl NamedCache {
    /// Wrap a store with no key prefix
    pub fn new(store: impl CacheBackend) -> Self {
        Self {
            store: Arc::new(store),
            key_prefix: String::new(),
        }
    }

    /// Prefix every key written to or read from the store
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Prefix applied to keys
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

impl CacheBackend for NamedCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.store.get(&self.make_key(key))
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.store.set(&self.make_key(key), value)
    }

    fn has(&self, key: &str) -> Result<bool> {
        self.store.has(&self.make_key(key))
    }
}

/// Registry of named caches
///
/// A fresh registry always holds a [`NamedCaches::DEFAULT`] cache: an LRU
/// store of 100 entries without prefix.
pub struct NamedCaches {
    caches: RwLock<HashMap<String, Arc<NamedCache>>>,
}

impl NamedCaches {
    /// Name of the cache every registry starts with
    pub const DEFAULT: &'static str = "default";

    /// Create a registry holding only the default cache
    pub fn new() -> Self {
        let mut caches = HashMap::new();
        caches.insert(
            Self::DEFAULT.to_string(),
            Arc::new(NamedCache::new(LruBackend::default())),
        );

        Self {
            caches: RwLock::new(caches),
        }
    }

    /// Process-wide registry
    pub fn global() -> &'static NamedCaches {
        static GLOBAL: OnceLock<NamedCaches> = OnceLock::new();
        GLOBAL.get_or_init(NamedCaches::new)
    }

    /// Register `cache` under `name`, returning the cache it replaced
    pub fn insert(&self, name: impl Into<String>, cache: NamedCache) -> Option<Arc<NamedCache>> {
        self.caches.write().insert(name.into(), Arc::new(cache))
    }

    /// Look up a cache by name
    pub fn get(&self, name: &str) -> Option<Arc<NamedCache>> {
        self.caches.read().get(name).cloned()
    }

    /// Names of all registered caches, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for NamedCaches {
    fn default() -> Self {
        Self::new()
    }
}

fn default_cache_name() -> String {
    NamedCaches::DEFAULT.to_string()
}

/// Constructor configuration for [`NamedCacheBackend`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamedCacheConfig {
    /// Name of the registered cache to use
    #[serde(default = "default_cache_name")]
    pub cache_name: String,
}

impl Default for NamedCacheConfig {
    fn default() -> Self {
        Self {
            cache_name: default_cache_name(),
        }
    }
}

/// Backend bound to a named cache at construction time
///
/// `get`/`set`/`has` are forwarded unchanged; any key transformation is
/// the named cache's own.
#[derive(Clone)]
pub struct NamedCacheBackend {
    cache_name: String,
    cache: Arc<NamedCache>,
}

impl NamedCacheBackend {
    /// Bind to the cache named in `config`
    pub fn new(caches: &NamedCaches, config: NamedCacheConfig) -> Result<Self> {
        let cache = caches.get(&config.cache_name).ok_or_else(|| {
            CacheError::Config(format!("no cache named `{}`", config.cache_name))
        })?;

        tracing::debug!(
            target: "ucroe",
            cache_name = %config.cache_name,
            key_prefix = %cache.key_prefix(),
            "Bound named cache backend"
        );

        Ok(Self {
            cache_name: config.cache_name,
            cache,
        })
    }

    /// Name of the bound cache
    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    /// The bound cache
    pub fn cache(&self) -> &NamedCache {
        &self.cache
    }
}

impl CacheBackend for NamedCacheBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.cache.get(key)
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.cache.set(key, value)
    }

    fn has(&self, key: &str) -> Result<bool> {
        self.cache.has(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Store that records every key it is asked about
    #[derive(Default)]
    struct RecordingStore {
        calls: Mutex<Vec<(&'static str, String)>>,
    }

    impl CacheBackend for RecordingStore {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            self.calls.lock().push(("get", key.to_string()));
            Ok(None)
        }

        fn set(&self, key: &str, _value: Vec<u8>) -> Result<()> {
            self.calls.lock().push(("set", key.to_string()));
            Ok(())
        }
    }

    #[test]
    fn test_default_cache_is_registered() {
        let caches = NamedCaches::new();
        assert_eq!(caches.names(), vec!["default".to_string()]);

        let backend = NamedCacheBackend::new(&caches, NamedCacheConfig::default()).unwrap();
        assert_eq!(backend.cache_name(), "default");
        assert_eq!(backend.cache().key_prefix(), "");
    }

    #[test]
    fn test_unknown_cache_name() {
        let caches = NamedCaches::new();
        let config = NamedCacheConfig {
            cache_name: "missing".to_string(),
        };

        let err = NamedCacheBackend::new(&caches, config).err();
        assert!(matches!(err, Some(CacheError::Config(_))));
    }

    #[test]
    fn test_get_and_set_pass_through() {
        let store = Arc::new(RecordingStore::default());
        let caches = NamedCaches::new();
        caches.insert("dummy", NamedCache::new(store.clone()));

        let backend = NamedCacheBackend::new(
            &caches,
            NamedCacheConfig {
                cache_name: "dummy".to_string(),
            },
        )
        .unwrap();

        backend.get("abc").unwrap();
        backend.set("abc", b"123".to_vec()).unwrap();

        assert_eq!(
            *store.calls.lock(),
            vec![("get", "abc".to_string()), ("set", "abc".to_string())]
        );
    }

    #[test]
    fn test_prefix_is_applied_by_named_cache() {
        let store = Arc::new(LruBackend::default());
        let caches = NamedCaches::new();
        caches.insert("ucroe", NamedCache::new(store.clone()).with_prefix("ucroe_"));

        let backend = NamedCacheBackend::new(
            &caches,
            NamedCacheConfig {
                cache_name: "ucroe".to_string(),
            },
        )
        .unwrap();
        assert_eq!(backend.cache().key_prefix(), "ucroe_");

        backend.set("f", b"1".to_vec()).unwrap();
        assert!(store.has("ucroe_f").unwrap());
        assert!(backend.has("f").unwrap());
    }
}
