//! Backend registry: maps backend identifiers to constructors

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use ucroe_core::{CacheBackend, CacheError, Result};

#[cfg(feature = "memory")]
use ucroe_storage::{
    LruBackend, LruConfig, NamedCacheBackend, NamedCacheConfig, NamedCaches, TtlBackend,
    TtlConfig,
};

/// Constructor keyword arguments for a backend
pub type BackendConfig = serde_json::Map<String, Value>;

/// Constructs a backend from its configuration
pub type BackendFactory =
    Arc<dyn Fn(&BackendConfig) -> Result<Arc<dyn CacheBackend>> + Send + Sync>;

/// Decode a backend configuration into a typed constructor config
///
/// Missing, unknown or mistyped keys are reported as [`CacheError::Config`].
pub fn decode_backend_config<C: DeserializeOwned>(config: &BackendConfig) -> Result<C> {
    serde_json::from_value(Value::Object(config.clone()))
        .map_err(|e| CacheError::Config(e.to_string()))
}

/// Registry of backend constructors, looked up by identifier
#[derive(Clone, Default)]
pub struct BackendRegistry {
    factories: HashMap<String, BackendFactory>,
}

impl BackendRegistry {
    /// Identifier of the in-memory LRU backend (the default)
    pub const LRU: &'static str = "ucroe_storage::memory::LruBackend";
    /// Identifier of the in-memory LRU + TTL backend
    pub const TTL: &'static str = "ucroe_storage::memory::TtlBackend";
    /// Identifier of the named-cache adapter
    pub const NAMED: &'static str = "ucroe_storage::named::NamedCacheBackend";

    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in backends, binding named caches from
    /// [`NamedCaches::global`]
    #[cfg(feature = "memory")]
    pub fn with_defaults() -> Self {
        Self::with_named_caches(NamedCaches::global())
    }

    /// Registry with the built-in backends, binding named caches from `caches`
    #[cfg(feature = "memory")]
    pub fn with_named_caches<C>(caches: C) -> Self
    where
        C: Deref<Target = NamedCaches> + Send + Sync + 'static,
    {
        let mut registry = Self::new();
        registry
            .register(Self::LRU, |config| {
                Ok(LruBackend::new(decode_backend_config::<LruConfig>(config)?))
            })
            .register(Self::TTL, |config| {
                TtlBackend::new(decode_backend_config::<TtlConfig>(config)?)
            })
            .register(Self::NAMED, move |config| {
                NamedCacheBackend::new(&caches, decode_backend_config::<NamedCacheConfig>(config)?)
            });
        registry
    }

    /// Register a constructor under `name`, replacing any previous one
    pub fn register<B, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        B: CacheBackend,
        F: Fn(&BackendConfig) -> Result<B> + Send + Sync + 'static,
    {
        let factory: BackendFactory = Arc::new(move |config: &BackendConfig| {
            let backend: Arc<dyn CacheBackend> = Arc::new(factory(config)?);
            Ok(backend)
        });
        self.factories.insert(name.into(), factory);
        self
    }

    /// Whether a constructor is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered identifiers, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Construct the backend registered under `name`
    pub fn create(&self, name: &str, config: &BackendConfig) -> Result<Arc<dyn CacheBackend>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| CacheError::UnknownBackend(name.to_string()))?;
        factory(config)
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.names())
            .finish()
    }
}
