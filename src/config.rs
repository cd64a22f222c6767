//! Configuration management for the schema lifecycle core
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (schema-registry.toml)
//! - Environment variables (SCHEMA_REGISTRY__*)
//!
//! ## Example config file (schema-registry.toml):
//! ```toml
//! [registry]
//! upload_enabled = false
//! cache_enabled = true
//! dependency_mode = "sync"
//! node_id = 3
//!
//! [storage]
//! path = "./registry"
//!
//! [logging]
//! filter = "info"
//! ```
//!
//! Values are read once at startup; there is no reload.

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::dependency::DependencyMode;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SchemaConfig {
    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings threaded into the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Compile and attach dependency artifacts
    #[serde(default)]
    pub upload_enabled: bool,

    /// Passed through to storage reads
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    #[serde(default)]
    pub dependency_mode: DependencyMode,

    /// Snowflake node id, unique per running instance
    #[serde(default)]
    pub node_id: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for file storage
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when RUST_LOG is unset
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_true() -> bool {
    true
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./registry")
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            upload_enabled: false,
            cache_enabled: true,
            dependency_mode: DependencyMode::Sync,
            node_id: 0,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl SchemaConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering a specific file over the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "schema-registry.toml",
            ".schema-registry.toml",
            "config/schema-registry.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "schema-registry") {
            let xdg_config = config_dir.config_dir().join("schema-registry.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("SCHEMA_REGISTRY")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = SchemaConfig::default();
        assert!(!config.registry.upload_enabled);
        assert!(config.registry.cache_enabled);
        assert_eq!(config.registry.dependency_mode, DependencyMode::Sync);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_serialize_config() {
        let toml_str = toml::to_string_pretty(&SchemaConfig::default()).unwrap();
        assert!(toml_str.contains("[registry]"));
        assert!(toml_str.contains("[storage]"));
        assert!(toml_str.contains("dependency_mode = \"sync\""));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[registry]\nupload_enabled = true\ndependency_mode = \"deferred\"\nnode_id = 12\n",
        )
        .unwrap();

        let config = SchemaConfig::load_from(path.to_str()).unwrap();
        assert!(config.registry.upload_enabled);
        assert!(config.registry.cache_enabled);
        assert_eq!(config.registry.dependency_mode, DependencyMode::Deferred);
        assert_eq!(config.registry.node_id, 12);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = SchemaConfig::default();
        config.registry.node_id = 5;
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = SchemaConfig::load_from(path.to_str()).unwrap();
        assert_eq!(loaded.registry, config.registry);
    }
}
