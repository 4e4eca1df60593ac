use anyhow::Result;

use crate::SyncContext;

/// Rotates the repository passphrase, re-encrypting every encrypted file
/// under the new secret.
///
/// Each file is rewritten atomically, but the rotation as a whole is not
/// transactional: an interruption leaves already-rotated files valid under
/// the new passphrase and the rest under the old one.
///
/// # Errors
/// Returns an error when verification of the old passphrase fails, the two
/// entries of the new passphrase do not match, or a rewrite fails.
pub fn execute(ctx: &SyncContext) -> Result<()> {
    let count = ctx.secrets.rotate(&ctx.repo_path, ctx.prompt.as_ref())?;
    super::print_success(&format!("Re-encrypted {count} file(s) under the new passphrase"));
    Ok(())
}
