//! Configuration management for hwgraph.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `hwgraph.toml` file
//! 3. User config `~/.config/hwgraph/config.toml`
//! 4. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Graph store configuration.
    pub store: StoreConfig,

    /// Inventory behavior.
    pub inventory: InventoryConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./hwgraph.toml` (project local)
    /// 2. `~/.config/hwgraph/config.toml` (user config)
    /// 3. Falls back to defaults
    ///
    /// Environment overrides apply in every case.
    pub fn load() -> Result<Self, ConfigError> {
        // Try project-local config first
        if Path::new(PROJECT_CONFIG_FILE).exists() {
            return Self::from_file(PROJECT_CONFIG_FILE);
        }

        // Try user config
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join(USER_CONFIG_DIR).join(USER_CONFIG_FILE);
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Self::default().resolve(env_var)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.resolve(env_var)
    }

    /// Apply overrides from `lookup`, then validate.
    fn resolve(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(backend) = lookup("HWGRAPH_STORE_BACKEND") {
            self.store.backend = backend.parse()?;
        }
        if let Some(path) = lookup("HWGRAPH_STORE_PATH") {
            self.store.path = path;
        }
        if let Some(id) = lookup("HWGRAPH_DEFAULT_GROUP_ID") {
            self.inventory.default_group_id = id;
        }
        if let Some(filter) = lookup("HWGRAPH_LOG") {
            self.logging.filter = filter;
        }

        self.validate()?;
        Ok(self)
    }

    /// Reject settings the inventory cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inventory.default_group_id.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "inventory.default_group_id must not be empty".to_string(),
            ));
        }
        if self.store.backend == Backend::Surreal && self.store.path.trim().is_empty() {
            return Err(ConfigError::Invalid("store.path must not be empty".to_string()));
        }
        Ok(())
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Which graph store to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// SurrealDB on RocksDB.
    Surreal,
    /// Process-local graph, lost on exit.
    Memory,
}

impl std::str::FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "surreal" | "surrealdb" => Ok(Self::Surreal),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(ConfigError::Invalid(format!("unknown store backend: {}", other))),
        }
    }
}

/// Graph store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: Backend,

    /// Database directory (SurrealDB backend only).
    pub path: String,

    pub namespace: String,

    pub database: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: DEFAULT_STORE_BACKEND.parse().unwrap_or(Backend::Surreal),
            path: DEFAULT_STORE_PATH.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            database: DEFAULT_DATABASE.to_string(),
        }
    }
}

impl StoreConfig {
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }
}

/// Inventory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    pub default_group_id: String,

    pub default_group_name: String,

    pub default_group_description: String,

    /// Device fields reported as `[]` when null or absent.
    pub list_properties: Vec<String>,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            default_group_id: DEFAULT_GROUP_ID.to_string(),
            default_group_name: DEFAULT_GROUP_NAME.to_string(),
            default_group_description: DEFAULT_GROUP_DESCRIPTION.to_string(),
            list_properties: DEFAULT_LIST_PROPERTIES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl InventoryConfig {
    /// The immutable settings handed to [`crate::Inventory::new`].
    pub fn settings(&self) -> InventorySettings {
        InventorySettings {
            default_group: DefaultGroup {
                id: self.default_group_id.clone(),
                name: self.default_group_name.clone(),
                description: self.default_group_description.clone(),
            },
            list_properties: self.list_properties.clone(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// The group newly discovered resources join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultGroup {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// Settings an [`crate::Inventory`] runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventorySettings {
    pub default_group: DefaultGroup,
    pub list_properties: Vec<String>,
}

impl Default for InventorySettings {
    fn default() -> Self {
        InventoryConfig::default().settings()
    }
}
