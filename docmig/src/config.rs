//! Project configuration stored in `.docmig/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{MigrationError, Result};
use crate::options::{Direction, DuplicateVersionPolicy};
use crate::store::DEFAULT_KEY_PREFIX;

/// Directory holding docmig's project files.
pub const CONFIG_DIR: &str = ".docmig";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocmigConfig {
    #[serde(default)]
    pub migrations: MigrationSettings,
    #[serde(default)]
    pub redis: RedisSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationSettings {
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub profiles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_version: Option<i64>,
    #[serde(default)]
    pub duplicate_versions: DuplicateVersionPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedisSettings {
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
        }
    }
}

fn default_redis_url() -> String {
    "${REDIS_URL}".to_string()
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

impl DocmigConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|err| MigrationError::config(format!("failed to parse config: {err}")))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|err| MigrationError::config(format!("failed to serialize config: {err}")))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|err| MigrationError::config(format!("failed to read {}: {err}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Load `.docmig/config.toml` from the nearest project root, or defaults when absent.
    pub fn discover_from(start: &Path) -> Result<Self> {
        match find_project_root(start) {
            Some(root) => {
                let path = config_path(&root);
                if path.exists() { Self::load(&path) } else { Ok(Self::default()) }
            }
            None => Ok(Self::default()),
        }
    }

    /// The Redis URL with `${VAR}` expanded from the environment.
    pub fn redis_url(&self) -> Result<String> {
        expand_env(&self.redis.url)
    }
}

pub fn config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_DIR).join(CONFIG_FILE)
}

/// Walk up from `start` to the first directory holding a `Cargo.toml`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join("Cargo.toml").exists() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Expand a whole-value `${VAR}` reference. Other values pass through unchanged.
pub fn expand_env(value: &str) -> Result<String> {
    if let Some(var_name) = value.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
        std::env::var(var_name).map_err(|_| MigrationError::config(format!("environment variable {var_name} not set")))
    } else {
        Ok(value.to_string())
    }
}
