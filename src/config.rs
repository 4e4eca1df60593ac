//! TOML configuration for dotsync.
//!
//! Kept deliberately small: the repository location and the identity used
//! when the git collaborator has to pin one. A missing file yields defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Core settings.
    #[serde(default)]
    pub core: CoreConfig,

    /// User identity, used for git commits when git has none configured.
    #[serde(default)]
    pub user: UserConfig,
}

/// Core settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Fixed repository location. When unset, the repository is resolved
    /// from the current directory.
    #[serde(default)]
    pub repo_path: Option<PathBuf>,

    /// Materialize home copies as real files instead of symlinks by default.
    #[serde(default)]
    pub hard: bool,
}

/// User identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    /// Commit author name.
    #[serde(default)]
    pub name: Option<String>,

    /// Commit author email.
    #[serde(default)]
    pub email: Option<String>,
}

impl Config {
    /// Loads the configuration from `path`, returning defaults when the file
    /// does not exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Saves the configuration to `path`, creating parent directories.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        crate::utils::atomic_write(path, content.as_bytes())
    }
}
