//! Verbatim at-rest plugin.

use anyhow::Result;
use std::path::Path;
use tracing::debug;

use super::Plugin;
use crate::SyncContext;
use crate::utils::{copy_file, hash_file, replace_with_symlink};

/// Stores bytes as-is; materializes home as a symlink to the repository
/// master, or as a byte copy in hard mode.
pub struct PlainPlugin;

impl Plugin for PlainPlugin {
    fn sync_to_repo(&self, _ctx: &SyncContext, home: &Path, repo: &Path) -> Result<()> {
        if repo.is_file() && hash_file(home)? == hash_file(repo)? {
            debug!("{} unchanged, skipping copy", repo.display());
            return Ok(());
        }
        copy_file(home, repo)
    }

    fn sync_to_home(&self, _ctx: &SyncContext, repo: &Path, home: &Path, hard: bool) -> Result<()> {
        if hard {
            // Reads through the symlink when home still links to the repo.
            copy_file(repo, home)
        } else {
            replace_with_symlink(repo, home)
        }
    }

    fn has_diverged(&self, _ctx: &SyncContext, home: &Path, repo: &Path) -> Result<bool> {
        let Ok(meta) = home.symlink_metadata() else {
            return Ok(false);
        };
        if meta.file_type().is_symlink() {
            if std::fs::read_link(home)? == repo {
                return Ok(false);
            }
            if !home.exists() {
                // Dangling link exposes no content to compare.
                return Ok(false);
            }
        }
        if !repo.is_file() {
            return Ok(true);
        }
        Ok(hash_file(home)? != hash_file(repo)?)
    }

    fn encrypted_at_rest(&self) -> bool {
        false
    }
}
