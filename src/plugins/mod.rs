//! At-rest representation plugins.
//!
//! The plugin set is small and closed, so dispatch goes through a tagged
//! sum type rather than an open registry: [`PluginKind`] names the strategy
//! in the manifest, [`Plugin`] is the capability contract the engine drives.

use anyhow::Result;
use std::path::Path;

use crate::SyncContext;

mod encrypt;
mod plain;

pub use encrypt::EncryptPlugin;
pub use plain::PlainPlugin;

/// Capability contract shared by all at-rest strategies.
pub trait Plugin {
    /// Pushes home content into the repository at-rest form.
    ///
    /// # Errors
    /// Returns an error on I/O or encryption failure.
    fn sync_to_repo(&self, ctx: &SyncContext, home: &Path, repo: &Path) -> Result<()>;

    /// Materializes the repository copy at the home path. `hard` requests a
    /// byte copy instead of a symlink where the plugin distinguishes.
    ///
    /// # Errors
    /// Returns an error on I/O or decryption failure.
    fn sync_to_home(&self, ctx: &SyncContext, repo: &Path, home: &Path, hard: bool) -> Result<()>;

    /// Whether home content diverges from the repository copy. A home path
    /// that already links to the repository master never diverges.
    ///
    /// # Errors
    /// Returns an error on I/O or decryption failure.
    fn has_diverged(&self, ctx: &SyncContext, home: &Path, repo: &Path) -> Result<bool>;

    /// Whether the at-rest form is ciphertext.
    fn encrypted_at_rest(&self) -> bool;
}

/// The closed set of at-rest strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PluginKind {
    /// Verbatim bytes; home materialized as symlink (or copy in hard mode).
    #[default]
    Plain,
    /// Symmetric ciphertext; home always materialized as a decrypted file.
    Encrypt,
}

impl PluginKind {
    /// All plugins, in deterministic reporting order.
    pub const ALL: [Self; 2] = [Self::Plain, Self::Encrypt];

    /// The manifest tag and repository directory name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Encrypt => "encrypt",
        }
    }

    /// Parses a manifest plugin tag.
    ///
    /// # Errors
    /// Unknown tags are malformed manifest entries.
    pub fn parse(tag: &str) -> Result<Self> {
        match tag {
            "plain" => Ok(Self::Plain),
            "encrypt" => Ok(Self::Encrypt),
            other => anyhow::bail!("malformed filelist entry: unknown plugin {other:?}"),
        }
    }

    /// The strategy implementation for this tag.
    #[must_use]
    pub fn plugin(self) -> &'static dyn Plugin {
        match self {
            Self::Plain => &PlainPlugin,
            Self::Encrypt => &EncryptPlugin,
        }
    }
}

impl std::fmt::Display for PluginKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
