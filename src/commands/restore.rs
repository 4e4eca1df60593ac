use anyhow::Result;

use crate::SyncContext;
use crate::filelist::Filelist;
use crate::sync::{self, Options};

/// Materializes repository content into home for the selected categories.
///
/// # Errors
/// Returns an error when the manifest cannot be loaded; per-entry failures
/// are reported and skipped.
pub fn execute(ctx: &SyncContext, categories: Vec<String>, hard: bool, dry_run: bool) -> Result<()> {
    let filelist = Filelist::load(&ctx.repo_path)?;
    sync::restore(ctx, &filelist, &categories, Options::resolve(ctx, hard, dry_run))?;
    if !dry_run {
        super::print_success("Restored home from repository");
    }
    Ok(())
}
