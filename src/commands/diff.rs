use anyhow::Result;

use crate::SyncContext;
use crate::filelist::Filelist;
use crate::git::GitRepo;
use crate::plugins::PluginKind;
use crate::resolver;
use crate::state::{HomeState, classify};

/// Prints pending repository changes followed by home-side edits not yet
/// pushed into the repository.
///
/// # Errors
/// Returns an error when the manifest cannot be loaded or git fails.
pub fn execute(ctx: &SyncContext, categories: Vec<String>) -> Result<()> {
    let filelist = Filelist::load(&ctx.repo_path)?;
    let lines = report(ctx, &filelist, &categories)?;
    if lines.is_empty() {
        super::print_info("No changes");
        return Ok(());
    }
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

/// Builds the diff report: uncommitted repository changes first, then one
/// group per plugin listing home files that diverge from their repository
/// copies, one `modified` or `deleted` line per entry. Group order follows
/// [`PluginKind::ALL`]; each group is preceded by a blank line and a header.
///
/// # Errors
/// Returns an error when git status or divergence detection fails.
pub fn report(ctx: &SyncContext, filelist: &Filelist, categories: &[String]) -> Result<Vec<String>> {
    let git = GitRepo::new(&ctx.repo_path);
    let mut lines: Vec<String> = git.status()?.iter().map(ToString::to_string).collect();

    for kind in PluginKind::ALL {
        let mut group = Vec::new();
        for entry in filelist.select(categories) {
            if entry.plugin != kind {
                continue;
            }
            let master = resolver::master_path(&ctx.repo_path, entry);
            if !master.is_file() {
                // Never pushed; nothing to compare against.
                continue;
            }
            let home = ctx.home_file(&entry.path);
            match classify(ctx, &home, &master, kind.plugin())? {
                HomeState::Absent | HomeState::DanglingSymlink => {
                    group.push(format!("deleted {}", home.display()));
                }
                HomeState::ForeignFile => {
                    group.push(format!("modified {}", home.display()));
                }
                // A link elsewhere only counts when its content differs.
                HomeState::ForeignSymlink => {
                    if kind.plugin().has_diverged(ctx, &home, &master)? {
                        group.push(format!("modified {}", home.display()));
                    }
                }
                HomeState::ManagedSymlink | HomeState::ManagedCopy => {}
            }
        }
        if !group.is_empty() {
            lines.push(String::new());
            lines.push(format!("{kind}-plugin updates not yet in repo:"));
            lines.append(&mut group);
        }
    }
    Ok(lines)
}
