//! Encrypting at-rest plugin.
//!
//! The repository holds ciphertext; the home side always holds a decrypted
//! regular file. A symlink would expose only a path into the repository, not
//! decrypted content, so hard mode is irrelevant here.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

use super::Plugin;
use crate::SyncContext;
use crate::utils::{atomic_write, hash_bytes, hash_file};

/// Stores AES-256-GCM ciphertext under the repository passphrase.
pub struct EncryptPlugin;

impl EncryptPlugin {
    /// Decrypted content of the repository copy.
    fn plaintext(ctx: &SyncContext, repo: &Path) -> Result<Vec<u8>> {
        let cipher = ctx.secrets.cipher(&ctx.repo_path, ctx.prompt.as_ref())?;
        cipher
            .open(&std::fs::read(repo)?)
            .with_context(|| format!("Failed to decrypt {}", repo.display()))
    }
}

impl Plugin for EncryptPlugin {
    fn sync_to_repo(&self, ctx: &SyncContext, home: &Path, repo: &Path) -> Result<()> {
        let cipher = ctx.secrets.cipher(&ctx.repo_path, ctx.prompt.as_ref())?;
        let plaintext =
            std::fs::read(home).with_context(|| format!("Failed to read {}", home.display()))?;

        // Sealing uses a fresh nonce, so an unchanged plaintext must be
        // skipped to keep update idempotent at the byte level.
        if repo.is_file()
            && let Ok(existing) = Self::plaintext(ctx, repo)
            && hash_bytes(&existing) == hash_bytes(&plaintext)
        {
            debug!("{} unchanged, skipping re-encryption", repo.display());
            return Ok(());
        }

        atomic_write(repo, &cipher.seal(&plaintext)?)
    }

    fn sync_to_home(&self, ctx: &SyncContext, repo: &Path, home: &Path, _hard: bool) -> Result<()> {
        let plaintext = Self::plaintext(ctx, repo)?;
        atomic_write(home, &plaintext)
    }

    fn has_diverged(&self, ctx: &SyncContext, home: &Path, repo: &Path) -> Result<bool> {
        if home.symlink_metadata().is_err() {
            return Ok(false);
        }
        if !repo.is_file() {
            return Ok(true);
        }
        let plaintext = Self::plaintext(ctx, repo)?;
        Ok(hash_file(home)? != hash_bytes(&plaintext))
    }

    fn encrypted_at_rest(&self) -> bool {
        true
    }
}
