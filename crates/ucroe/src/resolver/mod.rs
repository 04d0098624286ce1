//! Configuration resolution
//!
//! Each option is looked up, first hit wins, in:
//!
//! 1. the declarative settings source, when one is installed and configured
//! 2. the environment variable `UCROE_<NAME>`
//! 3. the built-in default
//!
//! A resolved value is memoized for the lifetime of the [`GlobalConfig`];
//! later changes to settings or environment are not observed.

mod registry;
mod settings;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::{json, Value};
use tracing::debug;

use ucroe_core::{CacheBackend, CacheError, Result};

pub use registry::{decode_backend_config, BackendConfig, BackendFactory, BackendRegistry};
pub use settings::{DeclarativeSettings, FileSettings, SettingsError, StaticSettings};

impl<S: DeclarativeSettings + ?Sized> DeclarativeSettings for Arc<S> {
    fn lookup(&self, name: &str) -> std::result::Result<Option<Value>, SettingsError> {
        (**self).lookup(name)
    }
}

/// Recognized configuration options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigName {
    /// Whether guards log fallbacks unless told otherwise
    LogExceptionByDefault,
    /// Identifier of the backend to construct
    Backend,
    /// Constructor arguments for the backend (object or JSON string)
    BackendConfig,
}

impl ConfigName {
    /// All recognized options
    pub const ALL: [ConfigName; 3] = [
        ConfigName::LogExceptionByDefault,
        ConfigName::Backend,
        ConfigName::BackendConfig,
    ];

    /// Option name as used in settings (unprefixed)
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigName::LogExceptionByDefault => "LOG_EXCEPTION_BY_DEFAULT",
            ConfigName::Backend => "BACKEND",
            ConfigName::BackendConfig => "BACKEND_CONFIG",
        }
    }

    /// Built-in default
    pub fn default_value(&self) -> Value {
        match self {
            ConfigName::LogExceptionByDefault => Value::Bool(false),
            ConfigName::Backend => Value::String(BackendRegistry::LRU.to_string()),
            ConfigName::BackendConfig => json!({ "maxsize": 100 }),
        }
    }
}

impl fmt::Display for ConfigName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
enum Environment {
    Process,
    Fixed(HashMap<String, String>),
}

impl Environment {
    fn var(&self, name: &str) -> Option<String> {
        let value = match self {
            Environment::Process => std::env::var(name).ok(),
            Environment::Fixed(vars) => vars.get(name).cloned(),
        };
        value.filter(|v| !v.is_empty())
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

static GLOBAL: OnceLock<Arc<GlobalConfig>> = OnceLock::new();

/// Resolver for guard configuration
///
/// Guards use the process-wide instance from [`GlobalConfig::global`]
/// unless given one explicitly.
pub struct GlobalConfig {
    settings: Option<Arc<dyn DeclarativeSettings>>,
    env: Environment,
    env_prefix: String,
    registry: RwLock<BackendRegistry>,
    resolved: DashMap<ConfigName, Value>,
}

impl GlobalConfig {
    /// Prefix of the environment variables consulted
    pub const ENV_PREFIX: &'static str = "UCROE_";

    /// Create a builder
    pub fn builder() -> GlobalConfigBuilder {
        GlobalConfigBuilder::default()
    }

    /// The process-wide instance
    ///
    /// Installs the default configuration (settings file from
    /// [`FileSettings::from_env`], process environment, built-in backends)
    /// when nothing was installed before.
    pub fn global() -> Arc<GlobalConfig> {
        GLOBAL
            .get_or_init(|| {
                Arc::new(
                    GlobalConfig::builder()
                        .settings(FileSettings::from_env())
                        .build(),
                )
            })
            .clone()
    }

    /// Install `config` as the process-wide instance
    ///
    /// The first installation wins: when an instance already exists it is
    /// returned and `config` is dropped.
    pub fn install(config: GlobalConfig) -> Arc<GlobalConfig> {
        GLOBAL.get_or_init(|| Arc::new(config)).clone()
    }

    /// Resolve an option, memoizing the first successful lookup
    pub fn get_config(&self, name: ConfigName) -> Result<Value> {
        if let Some(value) = self.resolved.get(&name) {
            return Ok(value.value().clone());
        }

        let value = self.lookup(name)?;
        Ok(self.resolved.entry(name).or_insert(value).value().clone())
    }

    fn lookup(&self, name: ConfigName) -> Result<Value> {
        if let Some(settings) = &self.settings {
            match settings.lookup(name.as_str()) {
                Ok(Some(value)) => {
                    debug!(target: "ucroe", option = %name, source = "settings", "Resolved option");
                    return Ok(value);
                }
                Ok(None) => {}
                Err(SettingsError::Unconfigured) => {
                    debug!(target: "ucroe", option = %name, "Settings not configured, skipping");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let env_name = format!("{}{}", self.env_prefix, name.as_str());
        if let Some(value) = self.env.var(&env_name) {
            debug!(target: "ucroe", option = %name, source = %env_name, "Resolved option");
            return Ok(Value::String(value));
        }

        debug!(target: "ucroe", option = %name, source = "default", "Resolved option");
        Ok(name.default_value())
    }

    /// Whether guards log fallbacks by default
    pub fn log_exception_by_default(&self) -> Result<bool> {
        Ok(is_truthy(&self.get_config(ConfigName::LogExceptionByDefault)?))
    }

    /// Identifier of the backend to construct
    pub fn backend(&self) -> Result<String> {
        match self.get_config(ConfigName::Backend)? {
            Value::String(name) => Ok(name),
            other => Err(CacheError::Config(format!(
                "{} must be a string, got {other}",
                ConfigName::Backend
            ))),
        }
    }

    /// Constructor arguments for the backend
    ///
    /// A string is parsed as JSON. Unparseable strings and anything that is
    /// not an object resolve to an empty map.
    pub fn backend_config(&self) -> Result<BackendConfig> {
        let value = match self.get_config(ConfigName::BackendConfig)? {
            Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(parsed) => parsed,
                Err(e) => {
                    debug!(target: "ucroe", error = %e, "Ignoring unparseable BACKEND_CONFIG");
                    Value::Null
                }
            },
            value => value,
        };

        match value {
            Value::Object(map) => Ok(map),
            _ => Ok(BackendConfig::new()),
        }
    }

    /// Construct the configured backend
    pub fn create_backend(&self) -> Result<Arc<dyn CacheBackend>> {
        let name = self.backend()?;
        let config = self.backend_config()?;

        debug!(target: "ucroe", backend = %name, config = ?config, "Creating cache backend");
        self.registry.read().create(&name, &config)
    }

    /// Register an additional backend constructor
    pub fn register_backend<B, F>(&self, name: impl Into<String>, factory: F)
    where
        B: CacheBackend,
        F: Fn(&BackendConfig) -> Result<B> + Send + Sync + 'static,
    {
        self.registry.write().register(name, factory);
    }
}

impl fmt::Debug for GlobalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalConfig")
            .field("has_settings", &self.settings.is_some())
            .field("env", &self.env)
            .field("env_prefix", &self.env_prefix)
            .field("registry", &*self.registry.read())
            .finish_non_exhaustive()
    }
}

/// Builder for [`GlobalConfig`]
pub struct GlobalConfigBuilder {
    settings: Option<Arc<dyn DeclarativeSettings>>,
    env: Environment,
    env_prefix: String,
    registry: Option<BackendRegistry>,
}

impl Default for GlobalConfigBuilder {
    fn default() -> Self {
        Self {
            settings: None,
            env: Environment::Process,
            env_prefix: GlobalConfig::ENV_PREFIX.to_string(),
            registry: None,
        }
    }
}

impl GlobalConfigBuilder {
    /// Consult `settings` before the environment
    pub fn settings(mut self, settings: impl DeclarativeSettings) -> Self {
        self.settings = Some(Arc::new(settings));
        self
    }

    /// Read environment variables from a fixed set instead of the process
    pub fn env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.env = Environment::Fixed(vars);
        self
    }

    /// Prefix of the environment variables consulted
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Backend constructors to choose from
    pub fn registry(mut self, registry: BackendRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the resolver
    pub fn build(self) -> GlobalConfig {
        GlobalConfig {
            settings: self.settings,
            env: self.env,
            env_prefix: self.env_prefix,
            registry: RwLock::new(self.registry.unwrap_or_else(default_registry)),
            resolved: DashMap::new(),
        }
    }
}

#[cfg(feature = "memory")]
fn default_registry() -> BackendRegistry {
    BackendRegistry::with_defaults()
}

#[cfg(not(feature = "memory"))]
fn default_registry() -> BackendRegistry {
    BackendRegistry::new()
}
