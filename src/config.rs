//! Configuration file
//!
//! ```json
//! {
//!     "namespace": "demo",
//!     "schema": { "users": { "name": "string" } },
//!     "data_path": "store.json",
//!     "latency": { "mode": "range", "min_ms": 10, "max_ms": 200 },
//!     "log_level": "info",
//!     "seed": 42
//! }
//! ```
//!
//! `schema_path` may replace `schema`; exactly one of them is required.
//! Relative paths resolve against the directory of the config file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::ArgsError;
use crate::latency::Delay;
use crate::observability::{log_event_with_fields, Event, Severity};
use crate::randoms::Randoms;
use crate::schema::SchemaDecl;
use crate::storage::{has_wildcard, MemoryMedium, NamespacedStore, StorageResult};

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {reason}")]
    Read { path: String, reason: String },

    #[error("invalid config JSON: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Schema(#[from] ArgsError),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "CRUDDY_CONFIG_READ",
            ConfigError::Parse(_) => "CRUDDY_CONFIG_PARSE",
            ConfigError::Invalid(_) => "CRUDDY_CONFIG_INVALID",
            ConfigError::Schema(e) => e.code(),
        }
    }
}

/// Injected latency, applied to both legs of every call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum LatencyConfig {
    #[default]
    None,
    Fixed {
        ms: u64,
    },
    /// Uniform whole milliseconds, drawn afresh for every leg
    Range {
        min_ms: u64,
        max_ms: u64,
    },
}

impl LatencyConfig {
    pub fn delay(&self, randoms: &Randoms) -> Delay {
        match self {
            LatencyConfig::None => Delay::none(),
            LatencyConfig::Fixed { ms } => Delay::fixed_ms(*ms),
            LatencyConfig::Range { min_ms, max_ms } => Delay::between_ms(randoms.clone(), *min_ms, *max_ms),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CruddyConfig {
    /// Store namespace (required)
    pub namespace: String,

    /// Inline schema declaration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaDecl>,

    /// Schema declaration file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_path: Option<PathBuf>,

    /// Snapshot file the medium is loaded from and saved to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_path: Option<PathBuf>,

    #[serde(default)]
    pub latency: LatencyConfig,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seed for reproducible ids and delays
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl CruddyConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut config = Self::from_json_str(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);

        let location = path.display().to_string();
        log_event_with_fields(
            Event::ConfigLoaded,
            &[("namespace", config.namespace.as_str()), ("path", location.as_str())],
        );
        Ok(config)
    }

    /// Parses and validates configuration text
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: CruddyConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.namespace.is_empty() || has_wildcard(&self.namespace) || self.namespace.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "namespace '{}' must be non-empty and free of '*' and '/'",
                self.namespace
            )));
        }

        match (&self.schema, &self.schema_path) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Invalid(
                    "give either 'schema' or 'schema_path', not both".into(),
                ))
            }
            (None, None) => {
                return Err(ConfigError::Invalid(
                    "one of 'schema' or 'schema_path' is required".into(),
                ))
            }
            _ => {}
        }

        if let LatencyConfig::Range { min_ms, max_ms } = self.latency {
            if min_ms > max_ms {
                return Err(ConfigError::Invalid(format!(
                    "latency range min_ms ({}) exceeds max_ms ({})",
                    min_ms, max_ms
                )));
            }
        }

        self.severity()?;
        Ok(())
    }

    /// Resolves a configured path against the config file's directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// The schema declaration, read from `schema_path` if needed
    pub fn schema_decl(&self) -> ConfigResult<SchemaDecl> {
        match (&self.schema, &self.schema_path) {
            (Some(decl), _) => Ok(decl.clone()),
            (None, Some(path)) => Ok(SchemaDecl::load(&self.resolve(path))?),
            (None, None) => Err(ConfigError::Invalid(
                "one of 'schema' or 'schema_path' is required".into(),
            )),
        }
    }

    pub fn data_path(&self) -> Option<PathBuf> {
        self.data_path.as_deref().map(|p| self.resolve(p))
    }

    pub fn severity(&self) -> ConfigResult<Severity> {
        self.log_level.parse().map_err(ConfigError::Invalid)
    }

    /// Seeded generator if `seed` is set, thread-local otherwise
    pub fn randoms(&self) -> Randoms {
        match self.seed {
            Some(seed) => Randoms::seeded(seed),
            None => Randoms::thread(),
        }
    }

    /// Loads the medium from `data_path` (or starts empty) and opens the
    /// configured namespace on it
    pub fn open_store(&self) -> StorageResult<NamespacedStore> {
        let medium = match self.data_path() {
            Some(path) => MemoryMedium::load_from(&path)?,
            None => MemoryMedium::new(),
        };
        medium.namespace(&self.namespace)
    }
}
