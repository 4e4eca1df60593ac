use anyhow::{Context, Result};

use crate::SyncContext;
use crate::filelist::Filelist;
use crate::sync;

/// Removes an entry from management: home keeps a real copy of the current
/// repository content, the repository-side artifacts are deleted, and the
/// manifest entry is dropped.
///
/// A cancelled conflict aborts the whole command and leaves the entry
/// managed.
///
/// # Errors
/// Returns a `not managed` error for an unknown path, a `cancelled` error
/// on user cancellation, or a filesystem error.
pub fn execute(ctx: &SyncContext, path: &str, dry_run: bool) -> Result<()> {
    let mut filelist = Filelist::load(&ctx.repo_path)?;
    let entry = filelist
        .find(path)
        .with_context(|| format!("{path} is not managed"))?
        .clone();

    sync::unmanage_entry(ctx, &entry, dry_run)?;

    if dry_run {
        return Ok(());
    }
    filelist.remove(path)?;
    filelist.save(&ctx.repo_path)?;
    super::print_success(&format!("{path} is no longer managed"));
    Ok(())
}
