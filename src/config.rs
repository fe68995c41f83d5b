//! Configuration for document expansion
//!
//! An [`ExpandConfig`] carries the ambient environment handed to every
//! template plus the switches that shape one expansion. It can be built in
//! code or loaded from a TOML file:
//!
//! ```toml
//! validate_schema = true
//! max_depth = 32
//!
//! [env]
//! deployment = "staging"
//! project = "acme"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Environment values passed to templates, keyed by variable name
pub type Env = BTreeMap<String, String>;

/// Default limit on template nesting
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Errors that can occur when loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Options for one expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandConfig {
    /// Caller-supplied environment (deployment, project, ...)
    pub env: Env,
    /// Validate template properties against `<type>.schema` imports
    pub validate_schema: bool,
    /// Maximum template nesting depth
    pub max_depth: usize,
}

/// TOML structure for deserializing configs
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    #[serde(default)]
    env: Env,
    validate_schema: Option<bool>,
    max_depth: Option<usize>,
}

impl Default for ExpandConfig {
    fn default() -> Self {
        Self {
            env: Env::new(),
            validate_schema: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ExpandConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load a configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlConfig = toml::from_str(content)?;
        let defaults = Self::default();

        Ok(Self {
            env: parsed.env,
            validate_schema: parsed.validate_schema.unwrap_or(defaults.validate_schema),
            max_depth: parsed.max_depth.unwrap_or(defaults.max_depth),
        })
    }

    /// Replace the environment
    pub fn with_env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    /// Set a single environment value
    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Enable or disable schema validation
    pub fn with_schema_validation(mut self, enabled: bool) -> Self {
        self.validate_schema = enabled;
        self
    }

    /// Set the maximum template nesting depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}
