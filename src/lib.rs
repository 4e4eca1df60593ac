//! # Dotsync - Dotfiles Manager
//!
//! Dotsync mirrors a curated set of configuration files between the user's
//! home directory and a git-backed repository. Managed files are grouped
//! into categories and stored through one of two at-rest plugins:
//!
//! - **plain**: verbatim bytes, materialized in home as a symlink (or a byte
//!   copy in hard mode)
//! - **encrypt**: AES-256-GCM ciphertext under a repository passphrase,
//!   always materialized in home as a decrypted regular file
//!
//! ## Architecture
//!
//! - [`filelist`]: the manifest store, sole source of truth for what is managed
//! - [`resolver`]: master/secondary placement for multi-category entries
//! - [`plugins`]: the closed set of at-rest representation strategies
//! - [`sync`]: the reconciliation engine driving update/restore/clean/unmanage
//! - [`prompt`]: injected interactive decision strategy
//! - [`checks`]: pre-flight repository safety gate
//! - [`git`] / [`crypt`]: version-control and encryption collaborators
//! - [`commands`]: one module per CLI subcommand

/// Command-line interface definitions (argument parsing structures).
pub mod cli;

/// Pre-flight repository safety checks.
pub mod checks;

/// Commands module containing all CLI command implementations.
pub mod commands;

/// Configuration parsing and management.
pub mod config;

/// Encryption collaborator: passphrase-derived cipher and secret store.
pub mod crypt;

/// Manifest store mapping managed paths to categories and plugins.
pub mod filelist;

/// Version-control collaborator (shells out to git).
pub mod git;

/// At-rest representation plugins (plain, encrypt).
pub mod plugins;

/// Interactive prompting strategy.
pub mod prompt;

/// Category resolver: master and secondary repository placement.
pub mod resolver;

/// Home-side observation classifier.
pub mod state;

/// Reconciliation engine.
pub mod sync;

/// Utility functions: content hashing, atomic writes, path helpers.
pub mod utils;

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::crypt::SecretStore;
use crate::prompt::Prompt;

/// Current version of the dotsync binary.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Manifest file name at the repository root.
pub const FILELIST_FILE: &str = "filelist";

/// Directory holding at-rest content, one subdirectory per plugin.
pub const DOTFILES_DIR: &str = "dotfiles";

/// Directory holding private plugin state, excluded from version control.
pub const PLUGINS_DIR: &str = ".plugins";

/// Default repository directory name when running from the home directory.
pub const DEFAULT_REPO_DIR: &str = ".dotfiles";

/// Default configuration file path relative to home directory.
pub const DEFAULT_CONFIG_PATH: &str = ".config/dotsync/config.toml";

/// Central context for all dotsync operations.
///
/// Holds the resolved repository and home paths, the loaded configuration,
/// the injected prompting strategy and the per-invocation secret cache.
/// One context lives for the span of a single command invocation.
pub struct SyncContext {
    /// Path to the dotsync repository root.
    pub repo_path: PathBuf,

    /// Path to the user's home directory.
    pub home_path: PathBuf,

    /// Path to the configuration file.
    pub config_path: PathBuf,

    /// Loaded configuration settings.
    pub config: config::Config,

    /// Interactive prompting strategy.
    pub prompt: Box<dyn Prompt>,

    /// Memoized repository secret, valid for this invocation only.
    pub secrets: SecretStore,
}

impl SyncContext {
    /// Creates a context by resolving paths the way the CLI does.
    ///
    /// The repository path comes from `DOTSYNC_REPO_PATH` if set, then from
    /// the configuration, then from the current directory. When the current
    /// directory is the home directory itself, the conventional
    /// `~/.dotfiles` location is used instead.
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined or the
    /// configuration cannot be read.
    pub fn new(prompt: Box<dyn Prompt>) -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;

        let config_path = if let Ok(path) = std::env::var("DOTSYNC_CONFIG_PATH") {
            PathBuf::from(path)
        } else {
            home.join(DEFAULT_CONFIG_PATH)
        };
        let config = config::Config::load(&config_path)?;

        let repo_path = if let Ok(path) = std::env::var("DOTSYNC_REPO_PATH") {
            PathBuf::from(path)
        } else if let Some(path) = config.core.repo_path.clone() {
            path
        } else {
            let cwd = std::env::current_dir().context("Could not determine current directory")?;
            if cwd == home { home.join(DEFAULT_REPO_DIR) } else { cwd }
        };

        Ok(Self {
            repo_path,
            home_path: home,
            config_path,
            config,
            prompt,
            secrets: SecretStore::new(),
        })
    }

    /// Creates a context with explicit paths, avoiding environment lookups.
    /// Used by tests.
    #[must_use]
    pub fn new_explicit(repo_path: PathBuf, home_path: PathBuf, prompt: Box<dyn Prompt>) -> Self {
        let config_path = home_path.join(DEFAULT_CONFIG_PATH);
        Self {
            repo_path,
            home_path,
            config_path,
            config: config::Config::default(),
            prompt,
            secrets: SecretStore::new(),
        }
    }

    /// Absolute home-side path for a managed entry path.
    #[must_use]
    pub fn home_file(&self, entry_path: &str) -> PathBuf {
        self.home_path.join(entry_path)
    }

    /// Path to the manifest file.
    #[must_use]
    pub fn filelist_path(&self) -> PathBuf {
        self.repo_path.join(FILELIST_FILE)
    }

    /// Consults the safety gate before a command runs.
    ///
    /// # Errors
    /// Returns an `unsafe repository` error when [`checks::safety_checks`]
    /// rejects the repository/home combination.
    pub fn preflight(&self, init: bool) -> Result<()> {
        if !checks::safety_checks(&self.repo_path, &self.home_path, init) {
            anyhow::bail!(
                "unsafe repository: refusing to operate on {}",
                self.repo_path.display()
            );
        }
        Ok(())
    }
}
