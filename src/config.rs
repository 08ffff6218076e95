//! Configuration management for schema-gitops
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (schema-gitops.toml)
//! - Environment variables (SCHEMA_GITOPS__*)
//!
//! ## Example config file (schema-gitops.toml):
//! ```toml
//! [registry]
//! url = "http://localhost:8081"
//! timeout_secs = 30
//! username = "gitops"
//! password = "secret"
//!
//! [plan]
//! enable_deletes = false
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GitopsConfig {
    /// Registry connection settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Planning behaviour
    #[serde(default)]
    pub plan: PlanConfig,
}

/// Registry connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL of the schema registry
    #[serde(default = "default_registry_url")]
    pub url: String,

    /// Timeout for a whole request, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Basic auth user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Basic auth password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Plan configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlanConfig {
    /// Report registry subjects missing from the state as deletions
    #[serde(default)]
    pub enable_deletes: bool,
}

fn default_registry_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            timeout_secs: default_timeout_secs(),
            username: None,
            password: None,
        }
    }
}

impl GitopsConfig {
    /// Load configuration from default locations, adding a required file on
    /// top when `config_path` is given
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        for location in ["schema-gitops.toml", ".schema-gitops.toml"] {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(dirs) = directories::ProjectDirs::from("dev", "gitops", "schema-gitops") {
            let xdg_config = dirs.config_dir().join("schema-gitops.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // SCHEMA_GITOPS__REGISTRY__URL=...
        builder = builder.add_source(
            Environment::with_prefix("SCHEMA_GITOPS")
                .prefix_separator("__")
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
