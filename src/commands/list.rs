use anyhow::Result;
use colored::Colorize;

use crate::SyncContext;
use crate::filelist::Filelist;
use crate::resolver;
use crate::state::{HomeState, classify};

/// Lists managed entries, optionally filtered by category, with their
/// current home-side state.
///
/// # Errors
/// Returns an error when the manifest cannot be loaded.
pub fn execute(ctx: &SyncContext, category: Option<String>) -> Result<()> {
    let filelist = Filelist::load(&ctx.repo_path)?;
    let filter: Vec<String> = category.into_iter().collect();
    let selected = filelist.select(&filter);

    if selected.is_empty() {
        super::print_info("No managed configuration files found.");
        return Ok(());
    }

    for entry in selected {
        let master = resolver::master_path(&ctx.repo_path, entry);
        let home = ctx.home_file(&entry.path);
        let state = classify(ctx, &home, &master, entry.plugin.plugin())?;
        let marker = match state {
            HomeState::ManagedSymlink | HomeState::ManagedCopy => "synced".green(),
            HomeState::Absent | HomeState::DanglingSymlink => "absent".yellow(),
            HomeState::ForeignFile | HomeState::ForeignSymlink => "diverged".red(),
        };
        println!(
            "{:<10} {} [{}] ({})",
            marker,
            entry.path.bold(),
            entry.categories.join(","),
            entry.plugin
        );
    }
    Ok(())
}
