use anyhow::Result;

use crate::SyncContext;
use crate::filelist::Filelist;
use crate::sync::{self, Options};

/// Pushes home content into the repository for the selected categories.
///
/// # Errors
/// Returns an error when the manifest cannot be loaded; per-entry failures
/// are reported and skipped.
pub fn execute(ctx: &SyncContext, categories: Vec<String>, hard: bool, dry_run: bool) -> Result<()> {
    let filelist = Filelist::load(&ctx.repo_path)?;
    sync::update(ctx, &filelist, &categories, Options::resolve(ctx, hard, dry_run))?;
    if !dry_run {
        super::print_success("Updated repository from home");
    }
    Ok(())
}
