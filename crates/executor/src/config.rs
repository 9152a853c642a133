//! Configuration via `quarry.toml`
//!
//! Connections read their defaults (plan cache size, whether commands use
//! the plan cache, default command timeout) from a [`QuarryConfig`]. The
//! config is usually loaded from a TOML file; every key is optional.

use serde::{Deserialize, Serialize};
use std::path::Path;

use quarry_cache::DEFAULT_CAPACITY;
use quarry_core::{Error, Result};

/// Conventional config file name
pub const CONFIG_FILE_NAME: &str = "quarry.toml";

/// `[plan_cache]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanCacheConfig {
    /// Maximum number of cached definitions
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl Default for PlanCacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

/// `[command]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandConfig {
    /// Whether text commands use the plan cache unless told otherwise
    #[serde(default = "default_true")]
    pub enable_plan_caching: bool,
    /// Timeout applied to commands with no explicit timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_timeout_secs: Option<u32>,
}

fn default_true() -> bool {
    true
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            enable_plan_caching: true,
            default_timeout_secs: None,
        }
    }
}

/// Quarry configuration loaded from `quarry.toml`
///
/// # Example
///
/// ```toml
/// [plan_cache]
/// capacity = 1000
///
/// [command]
/// enable_plan_caching = true
/// # default_timeout_secs = 30
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuarryConfig {
    /// Plan cache settings
    #[serde(default)]
    pub plan_cache: PlanCacheConfig,
    /// Command defaults
    #[serde(default)]
    pub command: CommandConfig,
}

impl QuarryConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Quarry configuration

[plan_cache]
# Maximum number of compiled command definitions kept in the shared cache.
# Least recently used definitions are evicted beyond this size.
capacity = 1000

[command]
# Whether text commands look up and store definitions in the plan cache.
enable_plan_caching = true

# Timeout (seconds) for commands that do not set one.
# When unset, the provider's default applies.
# default_timeout_secs = 30
"#
    }

    /// Parse and validate TOML text.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the text cannot be parsed or fails validation.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: QuarryConfig = toml::from_str(content)
            .map_err(|e| Error::config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Config { reason } => {
                Error::config(format!("{} ({})", reason, path.display()))
            }
            other => other,
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::config(format!(
                    "failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::config(format!(
                "failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `Config` when `plan_cache.capacity` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.plan_cache.capacity == 0 {
            return Err(Error::config("plan_cache.capacity must be greater than 0"));
        }
        Ok(())
    }
}
