//! Category resolver.
//!
//! A multi-category entry has exactly one physical copy in the repository:
//! the master, under the first-declared category. Every other category holds
//! a symlink to it.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::commands::print_info;
use crate::filelist::Entry;
use crate::utils::{hash_file, remove_and_prune, replace_with_symlink};
use crate::{DOTFILES_DIR, SyncContext, prompt};

/// Repository path for one category of an entry.
#[must_use]
pub fn category_path(repo: &Path, entry: &Entry, category: &str) -> PathBuf {
    repo.join(DOTFILES_DIR)
        .join(entry.plugin.name())
        .join(category)
        .join(&entry.path)
}

/// Repository master path (first-declared category).
#[must_use]
pub fn master_path(repo: &Path, entry: &Entry) -> PathBuf {
    category_path(repo, entry, entry.master_category())
}

/// Root of a plugin's at-rest tree.
#[must_use]
pub fn plugin_root(repo: &Path, plugin_name: &str) -> PathBuf {
    repo.join(DOTFILES_DIR).join(plugin_name)
}

/// Categories currently holding real (non-symlink) content for the entry,
/// as `(index, path)` pairs in declaration order.
#[must_use]
pub fn real_candidates(repo: &Path, entry: &Entry) -> Vec<(usize, PathBuf)> {
    entry
        .categories
        .iter()
        .enumerate()
        .filter_map(|(i, category)| {
            let path = category_path(repo, entry, category);
            match path.symlink_metadata() {
                Ok(meta) if meta.file_type().is_file() => Some((i, path)),
                _ => None,
            }
        })
        .collect()
}

/// Resolves the master path for an entry, consolidating stray real copies.
///
/// When more than one category holds divergent real content the conflict
/// resolver asks the user to pick the surviving copy by index; the chosen
/// content moves to the first-declared category's path and the rest is
/// discarded. Identical copies are consolidated silently. Dry-run mode asks
/// the same question but moves nothing.
///
/// # Errors
/// Returns an error on I/O failure or when prompting fails.
pub fn resolve_master(ctx: &SyncContext, entry: &Entry, dry_run: bool) -> Result<PathBuf> {
    let master = master_path(&ctx.repo_path, entry);
    let candidates = real_candidates(&ctx.repo_path, entry);

    if candidates.len() > 1 {
        let mut hashes = Vec::with_capacity(candidates.len());
        for (_, path) in &candidates {
            hashes.push(hash_file(path)?);
        }
        let divergent = hashes.iter().any(|h| h != &hashes[0]);

        let winner = if divergent {
            let options: Vec<String> = candidates
                .iter()
                .map(|(i, _)| entry.categories[*i].clone())
                .collect();
            let choice = prompt::choose(
                ctx.prompt.as_ref(),
                &format!(
                    "{} has divergent copies in multiple categories; pick the one to keep:",
                    entry.path
                ),
                &options,
            )?;
            candidates[choice].clone()
        } else {
            candidates[0].clone()
        };

        if dry_run {
            print_info(&format!(
                "would consolidate {} under {}",
                entry.path,
                master.display()
            ));
            return Ok(master);
        }

        if winner.1 != master {
            crate::utils::copy_file(&winner.1, &master)?;
        }
        for (_, path) in &candidates {
            if *path != master {
                remove_and_prune(path, &plugin_root(&ctx.repo_path, entry.plugin.name()))?;
            }
        }
    } else if let Some((index, path)) = candidates.first()
        && *index != 0
    {
        // A single real copy living under a secondary category migrates to
        // the master location.
        if dry_run {
            print_info(&format!(
                "would move {} to {}",
                path.display(),
                master.display()
            ));
            return Ok(master);
        }
        crate::utils::copy_file(path, &master)?;
        remove_and_prune(path, &plugin_root(&ctx.repo_path, entry.plugin.name()))?;
    }

    Ok(master)
}

/// Re-materializes every secondary category as a symlink to the master.
///
/// # Errors
/// Returns an error when a link cannot be created.
pub fn materialize_secondaries(
    ctx: &SyncContext,
    entry: &Entry,
    master: &Path,
    dry_run: bool,
) -> Result<()> {
    for category in entry.categories.iter().skip(1) {
        let link = category_path(&ctx.repo_path, entry, category);
        if link.symlink_metadata().is_ok()
            && link.is_symlink()
            && std::fs::read_link(&link)? == master
        {
            continue;
        }
        if dry_run {
            print_info(&format!("would link {} -> {}", link.display(), master.display()));
            continue;
        }
        replace_with_symlink(master, &link)?;
        debug!("linked {} -> {}", link.display(), master.display());
    }
    Ok(())
}

/// Removes the entry's repository content across all categories of its
/// plugin tree, pruning emptied category directories.
///
/// # Errors
/// Returns an error when a removal fails.
pub fn remove_all(ctx: &SyncContext, entry: &Entry) -> Result<()> {
    let root = plugin_root(&ctx.repo_path, entry.plugin.name());
    for category in &entry.categories {
        let path = category_path(&ctx.repo_path, entry, category);
        if path.symlink_metadata().is_ok() {
            remove_and_prune(&path, &root)?;
        }
    }
    Ok(())
}
