//! Runtime configuration (factory.toml)
//!
//! ```toml
//! root_namespace = "System"
//! binding = "by-value"
//! register_classes = true
//! ```

use crate::binder::BindingMode;
use crate::namespace::split_path;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or write the configuration file
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// Validation error
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Runtime settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Namespace of root classes (default: "System")
    #[serde(default = "default_root_namespace")]
    pub root_namespace: String,

    /// Binding mode of the built-in `Observable` class
    #[serde(default)]
    pub binding: BindingMode,

    /// Attach declared classes to the namespace node of their qualified name
    #[serde(default = "default_register_classes")]
    pub register_classes: bool,
}

fn default_root_namespace() -> String {
    "System".to_string()
}

fn default_register_classes() -> bool {
    true
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            root_namespace: default_root_namespace(),
            binding: BindingMode::default(),
            register_classes: default_register_classes(),
        }
    }
}

impl RuntimeConfig {
    /// Load a configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML text
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write the configuration to a file
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root_namespace.is_empty() {
            return Err(ConfigError::ValidationError(
                "root_namespace cannot be empty".to_string(),
            ));
        }

        if split_path(&self.root_namespace).is_err() {
            return Err(ConfigError::ValidationError(format!(
                "Invalid root_namespace: {}. Segments must be non-empty",
                self.root_namespace
            )));
        }

        Ok(())
    }
}
