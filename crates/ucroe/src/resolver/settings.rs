//! Declarative settings sources
//!
//! A settings source is consulted before environment variables. Whether the
//! source is installed at all is decided by [`GlobalConfig`](super::GlobalConfig);
//! a source that is installed but not yet configured reports
//! [`SettingsError::Unconfigured`] and lookups fall through to the next source.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use config::{Config, ConfigError, File};
use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;

use ucroe_core::CacheError;

/// Failure to read a declarative setting
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// The settings subsystem itself has not been configured
    #[error("settings are not configured")]
    Unconfigured,

    /// The settings exist but could not be read
    #[error("invalid setting {name}: {reason}")]
    Invalid { name: String, reason: String },
}

impl From<SettingsError> for CacheError {
    fn from(err: SettingsError) -> Self {
        CacheError::Settings(err.to_string())
    }
}

/// A declarative settings source
pub trait DeclarativeSettings: Send + Sync + 'static {
    /// Look up `name`; `Ok(None)` when the setting is not defined
    fn lookup(&self, name: &str) -> Result<Option<Value>, SettingsError>;
}

/// In-process settings, set programmatically
///
/// ```
/// use ucroe::{DeclarativeSettings, StaticSettings};
///
/// let settings = StaticSettings::new();
/// settings.set("BACKEND", "ucroe_storage::memory::TtlBackend");
/// assert!(settings.lookup("BACKEND").unwrap().is_some());
/// ```
#[derive(Debug, Default)]
pub struct StaticSettings {
    values: RwLock<Option<HashMap<String, Value>>>,
}

impl StaticSettings {
    /// Create configured, empty settings
    pub fn new() -> Self {
        Self {
            values: RwLock::new(Some(HashMap::new())),
        }
    }

    /// Create settings that report [`SettingsError::Unconfigured`] until
    /// [`configure`](Self::configure) or [`set`](Self::set) is called
    pub fn unconfigured() -> Self {
        Self {
            values: RwLock::new(None),
        }
    }

    /// Mark the settings as configured
    pub fn configure(&self) {
        self.values.write().get_or_insert_with(HashMap::new);
    }

    /// Define a setting
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.values
            .write()
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
    }

    /// Remove a setting
    pub fn remove(&self, name: &str) -> Option<Value> {
        self.values.write().as_mut().and_then(|values| values.remove(name))
    }
}

impl DeclarativeSettings for StaticSettings {
    fn lookup(&self, name: &str) -> Result<Option<Value>, SettingsError> {
        match &*self.values.read() {
            Some(values) => Ok(values.get(name).cloned()),
            None => Err(SettingsError::Unconfigured),
        }
    }
}

/// Settings read from a TOML, YAML or JSON file
///
/// The file is loaded on first lookup. Keys are the unprefixed option
/// names:
///
/// ```toml
/// BACKEND = "ucroe_storage::memory::TtlBackend"
/// BACKEND_CONFIG = { ttl = 30, maxsize = 500 }
/// LOG_EXCEPTION_BY_DEFAULT = true
/// ```
pub struct FileSettings {
    path: Option<PathBuf>,
    loaded: OnceLock<Result<Config, SettingsError>>,
}

impl FileSettings {
    /// Environment variable holding the settings file path
    pub const PATH_VAR: &'static str = "UCROE_SETTINGS_FILE";

    /// Settings read from `path`
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            loaded: OnceLock::new(),
        }
    }

    /// Settings read from the file named by [`PATH_VAR`](Self::PATH_VAR)
    ///
    /// While the variable is unset or empty, lookups report
    /// [`SettingsError::Unconfigured`].
    pub fn from_env() -> Self {
        let path = std::env::var_os(Self::PATH_VAR)
            .filter(|value: &OsString| !value.is_empty())
            .map(PathBuf::from);

        Self {
            path,
            loaded: OnceLock::new(),
        }
    }

    /// Path of the settings file, if one is configured
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn config(&self) -> Result<&Config, SettingsError> {
        let path = self.path.as_ref().ok_or(SettingsError::Unconfigured)?;

        self.loaded
            .get_or_init(|| {
                Config::builder()
                    .add_source(File::from(path.as_path()))
                    .build()
                    .map_err(|e| SettingsError::Invalid {
                        name: path.display().to_string(),
                        reason: e.to_string(),
                    })
            })
            .as_ref()
            .map_err(Clone::clone)
    }
}

impl DeclarativeSettings for FileSettings {
    fn lookup(&self, name: &str) -> Result<Option<Value>, SettingsError> {
        let config = self.config()?;

        // Some formats fold keys to lowercase.
        for key in [name.to_string(), name.to_lowercase()] {
            match config.get::<Value>(&key) {
                Ok(value) => return Ok(Some(value)),
                Err(ConfigError::NotFound(_)) => continue,
                Err(e) => {
                    return Err(SettingsError::Invalid {
                        name: name.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn settings_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_static_settings_lookup() {
        let settings = StaticSettings::new();
        assert_eq!(settings.lookup("BACKEND").unwrap(), None);

        settings.set("BACKEND", "custom");
        assert_eq!(settings.lookup("BACKEND").unwrap(), Some(json!("custom")));

        assert_eq!(settings.remove("BACKEND"), Some(json!("custom")));
        assert_eq!(settings.lookup("BACKEND").unwrap(), None);
    }

    #[test]
    fn test_static_settings_unconfigured() {
        let settings = StaticSettings::unconfigured();
        assert_eq!(
            settings.lookup("BACKEND"),
            Err(SettingsError::Unconfigured)
        );

        settings.configure();
        assert_eq!(settings.lookup("BACKEND").unwrap(), None);
    }

    #[test]
    fn test_file_settings_lookup() {
        let file = settings_file(
            r#"
BACKEND = "ucroe_storage::memory::TtlBackend"
LOG_EXCEPTION_BY_DEFAULT = true
BACKEND_CONFIG = { ttl = 5, maxsize = 100 }
"#,
        );
        let settings = FileSettings::from_path(file.path());

        assert_eq!(
            settings.lookup("BACKEND").unwrap(),
            Some(json!("ucroe_storage::memory::TtlBackend"))
        );
        assert_eq!(
            settings.lookup("LOG_EXCEPTION_BY_DEFAULT").unwrap(),
            Some(json!(true))
        );

        let config = settings.lookup("BACKEND_CONFIG").unwrap().unwrap();
        assert_eq!(config["maxsize"], json!(100));
        assert_eq!(config["ttl"], json!(5));

        assert_eq!(settings.lookup("UNDEFINED").unwrap(), None);
    }

    #[test]
    fn test_file_settings_without_path_is_unconfigured() {
        let settings = FileSettings {
            path: None,
            loaded: OnceLock::new(),
        };
        assert_eq!(settings.lookup("BACKEND"), Err(SettingsError::Unconfigured));
    }

    #[test]
    fn test_missing_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let settings = FileSettings::from_path(dir.path().join("absent.toml"));

        let err = settings.lookup("BACKEND").unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { .. }));
    }

    #[test]
    fn test_invalid_converts_to_cache_error() {
        let err: CacheError = SettingsError::Invalid {
            name: "BACKEND".to_string(),
            reason: "bad".to_string(),
        }
        .into();
        assert_eq!(err, CacheError::Settings("invalid setting BACKEND: bad".to_string()));
    }
}
