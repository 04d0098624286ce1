//! In-memory cache backends using moka

use std::time::Duration;

use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use serde::Deserialize;

use ucroe_core::{CacheBackend, CacheError, Result};

const DEFAULT_MAXSIZE: u64 = 100;

fn default_maxsize() -> u64 {
    DEFAULT_MAXSIZE
}

/// Constructor configuration for [`LruBackend`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LruConfig {
    /// Maximum number of entries
    #[serde(default = "default_maxsize")]
    pub maxsize: u64,
}

impl Default for LruConfig {
    fn default() -> Self {
        Self {
            maxsize: DEFAULT_MAXSIZE,
        }
    }
}

/// Constructor configuration for [`TtlBackend`]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TtlConfig {
    /// Maximum number of entries
    #[serde(default = "default_maxsize")]
    pub maxsize: u64,
    /// Time-to-live of each entry, in seconds
    pub ttl: f64,
}

impl TtlConfig {
    /// Create config with a TTL and the default capacity
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            maxsize: DEFAULT_MAXSIZE,
            ttl: ttl.as_secs_f64(),
        }
    }
}

/// Bounded in-memory cache with least-recently-used eviction
///
/// Eviction is performed by the underlying store. Cloning creates a new
/// handle to the SAME underlying store.
#[derive(Clone)]
pub struct LruBackend {
    cache: Cache<String, Vec<u8>>,
    maxsize: u64,
}

impl LruBackend {
    /// Create a new LRU backend
    pub fn new(config: LruConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.maxsize)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self {
            cache,
            maxsize: config.maxsize,
        }
    }

    /// Create a backend holding at most `maxsize` entries
    pub fn with_capacity(maxsize: u64) -> Self {
        Self::new(LruConfig { maxsize })
    }

    /// Number of entries currently stored
    pub fn current_size(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    /// Configured capacity
    pub fn max_size(&self) -> u64 {
        self.maxsize
    }
}

impl Default for LruBackend {
    fn default() -> Self {
        Self::new(LruConfig::default())
    }
}

impl CacheBackend for LruBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.cache.get(key))
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.cache.insert(key.to_string(), value);
        Ok(())
    }

    fn has(&self, key: &str) -> Result<bool> {
        Ok(self.cache.contains_key(key))
    }
}

/// Bounded in-memory cache whose entries also expire after a fixed TTL
#[derive(Clone)]
pub struct TtlBackend {
    cache: Cache<String, Vec<u8>>,
    maxsize: u64,
    ttl: Duration,
}

impl TtlBackend {
    /// Create a new TTL backend
    ///
    /// Fails when the TTL is negative, zero or not finite.
    pub fn new(config: TtlConfig) -> Result<Self> {
        let ttl = Duration::try_from_secs_f64(config.ttl)
            .ok()
            .filter(|ttl| !ttl.is_zero())
            .ok_or_else(|| CacheError::Config(format!("invalid ttl: {}", config.ttl)))?;

        let cache = Cache::builder()
            .max_capacity(config.maxsize)
            .eviction_policy(EvictionPolicy::lru())
            .time_to_live(ttl)
            .build();

        Ok(Self {
            cache,
            maxsize: config.maxsize,
            ttl,
        })
    }

    /// Number of live entries currently stored
    pub fn current_size(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    /// Configured capacity
    pub fn max_size(&self) -> u64 {
        self.maxsize
    }

    /// Configured time-to-live
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl CacheBackend for TtlBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.cache.get(key))
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.cache.insert(key.to_string(), value);
        Ok(())
    }

    fn has(&self, key: &str) -> Result<bool> {
        Ok(self.cache.contains_key(key))
    }
}
