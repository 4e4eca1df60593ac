//! The reconciliation engine.
//!
//! Each operation makes one sequential pass over the selected entries. A
//! failure on one entry is logged and the batch continues; only `unmanage`
//! treats a cancelled conflict as fatal. Dry-run walks the same decisions
//! without mutating the filesystem.

use anyhow::{Context, Result, bail};
use tracing::{debug, warn};

use crate::commands::{print_error, print_info, print_warning};
use crate::filelist::{Entry, Filelist};
use crate::plugins::PluginKind;
use crate::prompt::Resolution;
use crate::state::{HomeState, classify};
use crate::utils::remove_and_prune;
use crate::{SyncContext, prompt, resolver};

/// Per-invocation engine options.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Materialize home as byte copies instead of symlinks.
    pub hard: bool,
    /// Report decisions without mutating anything.
    pub dry_run: bool,
}

impl Options {
    /// Folds the configured default hard mode into the CLI flags.
    #[must_use]
    pub fn resolve(ctx: &SyncContext, hard: bool, dry_run: bool) -> Self {
        Self {
            hard: hard || ctx.config.core.hard,
            dry_run,
        }
    }
}

/// Pushes home content into the repository for every selected entry, then
/// re-materializes home and secondary-category links.
///
/// # Errors
/// Per-entry failures are logged and skipped; only a manifest selection
/// problem is fatal.
pub fn update(ctx: &SyncContext, filelist: &Filelist, categories: &[String], opts: Options) -> Result<()> {
    for entry in filelist.select(categories) {
        if let Err(err) = update_entry(ctx, entry, opts) {
            print_error(&format!("{}: {err:#}", entry.path));
        }
    }
    Ok(())
}

/// Reconciles a single entry home-to-repo.
///
/// # Errors
/// Returns an error on filesystem or plugin failure.
pub fn update_entry(ctx: &SyncContext, entry: &Entry, opts: Options) -> Result<()> {
    let master = resolver::resolve_master(ctx, entry, opts.dry_run)?;
    let home = ctx.home_file(&entry.path);
    let plugin = entry.plugin.plugin();
    let state = classify(ctx, &home, &master, plugin)?;
    debug!("{}: {state:?}", entry.path);

    match state {
        HomeState::ForeignFile => {
            if opts.dry_run {
                print_info(&format!("would update {}", master.display()));
            } else {
                plugin.sync_to_repo(ctx, &home, &master)?;
            }
        }
        HomeState::ForeignSymlink => {
            print_warning(&format!(
                "{} is a symlink to somewhere else, skipping",
                home.display()
            ));
            return Ok(());
        }
        HomeState::Absent | HomeState::DanglingSymlink => {
            if !master.exists() {
                warn!("{} exists in neither home nor repository", entry.path);
                return Ok(());
            }
        }
        HomeState::ManagedSymlink | HomeState::ManagedCopy => {}
    }

    if opts.dry_run {
        return Ok(());
    }

    remove_stale_plugin_copies(ctx, entry)?;

    if master.exists() {
        plugin.sync_to_home(ctx, &master, &home, opts.hard)?;
        resolver::materialize_secondaries(ctx, entry, &master, opts.dry_run)?;
    }
    Ok(())
}

/// Drops leftover repository content under plugins the entry no longer uses.
/// Relabeling (plain to encrypt) leaves such copies behind until the next
/// update.
fn remove_stale_plugin_copies(ctx: &SyncContext, entry: &Entry) -> Result<()> {
    for kind in PluginKind::ALL {
        if kind == entry.plugin {
            continue;
        }
        let root = resolver::plugin_root(&ctx.repo_path, kind.name());
        for category in &entry.categories {
            let stale = root.join(category).join(&entry.path);
            if stale.symlink_metadata().is_ok() {
                debug!("removing stale {} copy {}", kind, stale.display());
                remove_and_prune(&stale, &root)?;
            }
        }
    }
    Ok(())
}

/// Materializes repository content into home for every selected entry.
///
/// # Errors
/// Per-entry failures are logged and skipped.
pub fn restore(ctx: &SyncContext, filelist: &Filelist, categories: &[String], opts: Options) -> Result<()> {
    for entry in filelist.select(categories) {
        if let Err(err) = restore_entry(ctx, entry, opts) {
            print_error(&format!("{}: {err:#}", entry.path));
        }
    }
    Ok(())
}

/// Reconciles a single entry repo-to-home. A foreign file or symlink at the
/// home path triggers an overwrite/keep/cancel prompt; cancel skips this
/// entry only.
///
/// # Errors
/// Returns an error on filesystem or plugin failure, or when the repository
/// holds no content for the entry.
pub fn restore_entry(ctx: &SyncContext, entry: &Entry, opts: Options) -> Result<()> {
    let master = resolver::master_path(&ctx.repo_path, entry);
    if !master.is_file() {
        bail!("no repository copy at {}", master.display());
    }
    let home = ctx.home_file(&entry.path);
    let plugin = entry.plugin.plugin();
    let state = classify(ctx, &home, &master, plugin)?;
    debug!("{}: {state:?}", entry.path);

    match state {
        // A dangling link is silently replaced.
        HomeState::Absent | HomeState::DanglingSymlink => {}
        HomeState::ManagedSymlink | HomeState::ManagedCopy => {}
        HomeState::ForeignFile | HomeState::ForeignSymlink => {
            let question = format!("{} differs from the repository copy.", home.display());
            match prompt::resolve(ctx.prompt.as_ref(), &question)? {
                Resolution::Overwrite => {}
                Resolution::Keep => {
                    debug!("keeping {}", home.display());
                    return Ok(());
                }
                Resolution::Cancel => {
                    print_info(&format!("skipped {}", entry.path));
                    return Ok(());
                }
            }
        }
    }

    if opts.dry_run {
        print_info(&format!("would restore {}", home.display()));
        return Ok(());
    }
    plugin.sync_to_home(ctx, &master, &home, opts.hard)
}

/// Removes home-side materializations for every selected entry.
///
/// # Errors
/// Per-entry failures are logged and skipped.
pub fn clean(ctx: &SyncContext, filelist: &Filelist, categories: &[String], opts: Options) -> Result<()> {
    for entry in filelist.select(categories) {
        if let Err(err) = clean_entry(ctx, entry, opts) {
            print_error(&format!("{}: {err:#}", entry.path));
        }
    }
    Ok(())
}

/// Removes the home-side artifact for one entry, but only when it is
/// recognizably the managed materialization. Foreign content stays.
///
/// # Errors
/// Returns an error on filesystem or plugin failure.
pub fn clean_entry(ctx: &SyncContext, entry: &Entry, opts: Options) -> Result<()> {
    let master = resolver::master_path(&ctx.repo_path, entry);
    let home = ctx.home_file(&entry.path);
    let plugin = entry.plugin.plugin();

    let removable = match classify(ctx, &home, &master, plugin)? {
        HomeState::Absent => return Ok(()),
        HomeState::ManagedSymlink | HomeState::ManagedCopy => true,
        // Only a link that pointed at our master is ours to remove.
        HomeState::DanglingSymlink => std::fs::read_link(&home)? == master,
        HomeState::ForeignFile | HomeState::ForeignSymlink => false,
    };

    if !removable {
        print_warning(&format!("{} is not managed content, leaving it", home.display()));
        return Ok(());
    }
    if opts.dry_run {
        print_info(&format!("would remove {}", home.display()));
        return Ok(());
    }
    std::fs::remove_file(&home).with_context(|| format!("Failed to remove {}", home.display()))?;
    debug!("removed {}", home.display());
    Ok(())
}

/// Detaches one entry: home keeps a real copy of the current repository
/// content, then the repository master and all secondary links are removed.
/// The manifest edit itself is the caller's job.
///
/// A differing real file at the home path prompts overwrite/keep/cancel; a
/// foreign symlink prompts for its removal before the repository copy is
/// materialized in its place. Cancelling either prompt aborts the whole
/// command.
///
/// # Errors
/// Returns a `cancelled` error on conflict cancellation, or a filesystem
/// error.
pub fn unmanage_entry(ctx: &SyncContext, entry: &Entry, dry_run: bool) -> Result<()> {
    let master = resolver::master_path(&ctx.repo_path, entry);
    let home = ctx.home_file(&entry.path);
    let plugin = entry.plugin.plugin();

    match classify(ctx, &home, &master, plugin)? {
        // The symlink would dangle once the master is gone, so it becomes a
        // real copy first.
        HomeState::ManagedSymlink => {
            if !dry_run {
                plugin.sync_to_home(ctx, &master, &home, true)?;
            }
        }
        HomeState::ForeignFile => {
            let question = format!("{} differs from the repository copy.", home.display());
            match prompt::resolve(ctx.prompt.as_ref(), &question)? {
                Resolution::Overwrite => {
                    if !dry_run {
                        plugin.sync_to_home(ctx, &master, &home, true)?;
                    }
                }
                Resolution::Keep => debug!("keeping {}", home.display()),
                Resolution::Cancel => bail!("cancelled"),
            }
        }
        // The repository copy is about to disappear, so leaving the link
        // would silently lose the managed content.
        HomeState::ForeignSymlink => {
            let question = format!(
                "{} is a symlink to somewhere else. Replace it with the repository copy?",
                home.display()
            );
            if !prompt::confirm(ctx.prompt.as_ref(), &question)? {
                bail!("cancelled");
            }
            if !dry_run {
                if master.is_file() {
                    plugin.sync_to_home(ctx, &master, &home, true)?;
                } else {
                    std::fs::remove_file(&home)
                        .with_context(|| format!("Failed to remove {}", home.display()))?;
                }
            }
        }
        HomeState::ManagedCopy | HomeState::Absent | HomeState::DanglingSymlink => {}
    }

    if dry_run {
        print_info(&format!("would unmanage {}", entry.path));
        return Ok(());
    }
    resolver::remove_all(ctx, entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedPrompt;
    use std::path::Path;
    use tempfile::tempdir;

    fn ctx_with(dir: &Path, answers: &[&str]) -> SyncContext {
        let answers: Vec<String> = answers.iter().map(|s| (*s).to_string()).collect();
        let ctx = SyncContext::new_explicit(
            dir.join("repo"),
            dir.join("home"),
            Box::new(ScriptedPrompt::new(answers)),
        );
        std::fs::create_dir_all(&ctx.home_path).unwrap();
        std::fs::create_dir_all(&ctx.repo_path).unwrap();
        ctx
    }

    fn list(content: &str) -> Filelist {
        Filelist::parse(content).unwrap()
    }

    const SOFT: Options = Options { hard: false, dry_run: false };
    const HARD: Options = Options { hard: true, dry_run: false };
    const DRY: Options = Options { hard: false, dry_run: true };

    #[test]
    fn test_update_pushes_and_links_home() -> Result<()> {
        let dir = tempdir()?;
        let ctx = ctx_with(dir.path(), &[]);
        let list = list(".zshrc:zsh\n");
        std::fs::write(ctx.home_file(".zshrc"), b"alias ll='ls -l'\n")?;

        update(&ctx, &list, &[], SOFT)?;
        let master = ctx.repo_path.join("dotfiles/plain/zsh/.zshrc");
        assert_eq!(std::fs::read(&master)?, b"alias ll='ls -l'\n");
        let home = ctx.home_file(".zshrc");
        assert!(home.is_symlink());
        assert_eq!(std::fs::read_link(&home)?, master);
        Ok(())
    }

    #[test]
    fn test_update_hard_keeps_real_copy() -> Result<()> {
        let dir = tempdir()?;
        let ctx = ctx_with(dir.path(), &[]);
        let list = list("file\n");
        std::fs::write(ctx.home_file("file"), b"data")?;

        update(&ctx, &list, &[], HARD)?;
        assert!(!ctx.home_file("file").is_symlink());
        assert_eq!(
            std::fs::read(ctx.repo_path.join("dotfiles/plain/common/file"))?,
            b"data"
        );
        Ok(())
    }

    #[test]
    fn test_update_is_idempotent() -> Result<()> {
        let dir = tempdir()?;
        let ctx = ctx_with(dir.path(), &[]);
        let list = list(".vimrc:vim\n");
        std::fs::write(ctx.home_file(".vimrc"), b"set nu\n")?;

        update(&ctx, &list, &[], SOFT)?;
        let master = ctx.repo_path.join("dotfiles/plain/vim/.vimrc");
        let first = std::fs::read(&master)?;
        update(&ctx, &list, &[], SOFT)?;
        assert_eq!(std::fs::read(&master)?, first);
        assert!(ctx.home_file(".vimrc").is_symlink());
        Ok(())
    }

    #[test]
    fn test_update_multi_category_links() -> Result<()> {
        let dir = tempdir()?;
        let ctx = ctx_with(dir.path(), &[]);
        let list = list(".gitconfig:work,laptop\n");
        std::fs::write(ctx.home_file(".gitconfig"), b"[user]\n")?;

        update(&ctx, &list, &[], SOFT)?;
        let master = ctx.repo_path.join("dotfiles/plain/work/.gitconfig");
        let secondary = ctx.repo_path.join("dotfiles/plain/laptop/.gitconfig");
        assert!(master.is_file() && !master.is_symlink());
        assert!(secondary.is_symlink());
        assert_eq!(std::fs::read_link(&secondary)?, master);
        assert_eq!(std::fs::read_link(ctx.home_file(".gitconfig"))?, master);
        Ok(())
    }

    #[test]
    fn test_update_dry_run_mutates_nothing() -> Result<()> {
        let dir = tempdir()?;
        let ctx = ctx_with(dir.path(), &[]);
        let list = list("file\n");
        std::fs::write(ctx.home_file("file"), b"data")?;

        update(&ctx, &list, &[], DRY)?;
        assert!(!ctx.repo_path.join("dotfiles").exists());
        assert!(!ctx.home_file("file").is_symlink());
        Ok(())
    }

    #[test]
    fn test_update_skips_foreign_symlink() -> Result<()> {
        let dir = tempdir()?;
        let ctx = ctx_with(dir.path(), &[]);
        let list = list("link\n");
        let elsewhere = dir.path().join("elsewhere");
        std::fs::write(&elsewhere, b"x")?;
        std::os::unix::fs::symlink(&elsewhere, ctx.home_file("link"))?;

        update(&ctx, &list, &[], SOFT)?;
        assert!(!ctx.repo_path.join("dotfiles/plain/common/link").exists());
        assert_eq!(std::fs::read_link(ctx.home_file("link"))?, elsewhere);
        Ok(())
    }

    #[test]
    fn test_update_removes_stale_plain_copy_after_relabel() -> Result<()> {
        let dir = tempdir()?;
        let ctx = ctx_with(dir.path(), &["secret123"]);
        std::fs::write(ctx.home_file(".token"), b"hunter2")?;

        update(&ctx, &list(".token:token\n"), &[], HARD)?;
        let plain = ctx.repo_path.join("dotfiles/plain/token/.token");
        assert!(plain.is_file());

        update(&ctx, &list(".token:token|encrypt\n"), &[], HARD)?;
        assert!(!plain.exists());
        let sealed = ctx.repo_path.join("dotfiles/encrypt/token/.token");
        assert!(sealed.is_file());
        assert_ne!(std::fs::read(&sealed)?, b"hunter2");
        Ok(())
    }

    #[test]
    fn test_restore_plain_roundtrip() -> Result<()> {
        let dir = tempdir()?;
        let ctx = ctx_with(dir.path(), &[]);
        let list = list(".zshrc:zsh\n");
        std::fs::write(ctx.home_file(".zshrc"), b"content")?;
        update(&ctx, &list, &[], SOFT)?;

        std::fs::remove_file(ctx.home_file(".zshrc"))?;
        restore(&ctx, &list, &[], SOFT)?;
        assert_eq!(std::fs::read(ctx.home_file(".zshrc"))?, b"content");
        Ok(())
    }

    #[test]
    fn test_restore_replaces_dangling_link_silently() -> Result<()> {
        let dir = tempdir()?;
        // No prompt answers queued: any prompt would fail the test.
        let ctx = ctx_with(dir.path(), &[]);
        let list = list("file\n");
        std::fs::write(ctx.home_file("file"), b"data")?;
        update(&ctx, &list, &[], HARD)?;

        std::fs::remove_file(ctx.home_file("file"))?;
        std::os::unix::fs::symlink(dir.path().join("gone"), ctx.home_file("file"))?;
        restore(&ctx, &list, &[], HARD)?;
        assert_eq!(std::fs::read(ctx.home_file("file"))?, b"data");
        Ok(())
    }

    #[test]
    fn test_restore_conflict_keep_and_overwrite() -> Result<()> {
        let dir = tempdir()?;
        let ctx = ctx_with(dir.path(), &["k", "o"]);
        let list = list("file\n");
        std::fs::write(ctx.home_file("file"), b"original")?;
        update(&ctx, &list, &[], HARD)?;

        std::fs::write(ctx.home_file("file"), b"local edit")?;
        restore(&ctx, &list, &[], HARD)?;
        assert_eq!(std::fs::read(ctx.home_file("file"))?, b"local edit");

        restore(&ctx, &list, &[], HARD)?;
        assert_eq!(std::fs::read(ctx.home_file("file"))?, b"original");
        Ok(())
    }

    #[test]
    fn test_restore_cancel_is_scoped_to_entry() -> Result<()> {
        let dir = tempdir()?;
        let ctx = ctx_with(dir.path(), &["c"]);
        let list = list("a\nb\n");
        std::fs::write(ctx.home_file("a"), b"a1")?;
        std::fs::write(ctx.home_file("b"), b"b1")?;
        update(&ctx, &list, &[], HARD)?;

        std::fs::write(ctx.home_file("a"), b"edited")?;
        std::fs::remove_file(ctx.home_file("b"))?;
        restore(&ctx, &list, &[], HARD)?;
        // Entry a cancelled and left alone; entry b still restored.
        assert_eq!(std::fs::read(ctx.home_file("a"))?, b"edited");
        assert_eq!(std::fs::read(ctx.home_file("b"))?, b"b1");
        Ok(())
    }

    #[test]
    fn test_clean_removes_only_managed_artifacts() -> Result<()> {
        let dir = tempdir()?;
        let ctx = ctx_with(dir.path(), &[]);
        let list = list("a\nb\n");
        std::fs::write(ctx.home_file("a"), b"a1")?;
        std::fs::write(ctx.home_file("b"), b"b1")?;
        update(&ctx, &list, &[], SOFT)?;

        // b grows a local edit: foreign, must stay.
        std::fs::remove_file(ctx.home_file("b"))?;
        std::fs::write(ctx.home_file("b"), b"edited")?;

        clean(&ctx, &list, &[], SOFT)?;
        assert!(!ctx.home_file("a").exists());
        assert_eq!(std::fs::read(ctx.home_file("b"))?, b"edited");
        // Repository untouched.
        assert!(ctx.repo_path.join("dotfiles/plain/common/a").is_file());
        Ok(())
    }

    #[test]
    fn test_clean_category_filter_scopes_removal() -> Result<()> {
        let dir = tempdir()?;
        let ctx = ctx_with(dir.path(), &[]);
        let list = list(".zshrc:zsh\n.vimrc:vim\n");
        std::fs::write(ctx.home_file(".zshrc"), b"z")?;
        std::fs::write(ctx.home_file(".vimrc"), b"v")?;
        update(&ctx, &list, &[], SOFT)?;

        clean(&ctx, &list, &["zsh".to_string()], SOFT)?;
        assert!(!ctx.home_file(".zshrc").exists());
        assert!(ctx.home_file(".vimrc").is_symlink());
        Ok(())
    }

    #[test]
    fn test_unmanage_converts_symlink_to_copy() -> Result<()> {
        let dir = tempdir()?;
        let ctx = ctx_with(dir.path(), &[]);
        let list = list("file\n");
        std::fs::write(ctx.home_file("file"), b"data")?;
        update(&ctx, &list, &[], SOFT)?;
        assert!(ctx.home_file("file").is_symlink());

        let entry = list.find("file").unwrap();
        unmanage_entry(&ctx, entry, false)?;
        assert!(!ctx.home_file("file").is_symlink());
        assert_eq!(std::fs::read(ctx.home_file("file"))?, b"data");
        assert!(!ctx.repo_path.join("dotfiles/plain/common/file").exists());
        Ok(())
    }

    #[test]
    fn test_unmanage_cancel_aborts() -> Result<()> {
        let dir = tempdir()?;
        let ctx = ctx_with(dir.path(), &["c"]);
        let list = list("file\n");
        std::fs::write(ctx.home_file("file"), b"data")?;
        update(&ctx, &list, &[], HARD)?;
        std::fs::write(ctx.home_file("file"), b"edited")?;

        let entry = list.find("file").unwrap();
        let err = unmanage_entry(&ctx, entry, false).unwrap_err();
        assert!(err.to_string().contains("cancelled"));
        // Repository content untouched on abort.
        assert!(ctx.repo_path.join("dotfiles/plain/common/file").is_file());
        Ok(())
    }

    #[test]
    fn test_unmanage_foreign_symlink_confirmed_restores_copy() -> Result<()> {
        let dir = tempdir()?;
        let ctx = ctx_with(dir.path(), &["y"]);
        let list = list(".testfile:test\n");
        std::fs::write(ctx.home_file(".testfile"), b"managed")?;
        update(&ctx, &list, &[], HARD)?;

        let elsewhere = dir.path().join("elsewhere");
        std::fs::write(&elsewhere, b"other")?;
        std::fs::remove_file(ctx.home_file(".testfile"))?;
        std::os::unix::fs::symlink(&elsewhere, ctx.home_file(".testfile"))?;

        unmanage_entry(&ctx, list.find(".testfile").unwrap(), false)?;
        // The link is gone and the managed content survives as a real copy.
        assert!(!ctx.home_file(".testfile").is_symlink());
        assert_eq!(std::fs::read(ctx.home_file(".testfile"))?, b"managed");
        assert!(!ctx.repo_path.join("dotfiles/plain/test/.testfile").exists());
        Ok(())
    }

    #[test]
    fn test_unmanage_foreign_symlink_declined_aborts() -> Result<()> {
        let dir = tempdir()?;
        let ctx = ctx_with(dir.path(), &["n"]);
        let list = list(".testfile:test\n");
        std::fs::write(ctx.home_file(".testfile"), b"managed")?;
        update(&ctx, &list, &[], HARD)?;

        let elsewhere = dir.path().join("elsewhere");
        std::fs::write(&elsewhere, b"other")?;
        std::fs::remove_file(ctx.home_file(".testfile"))?;
        std::os::unix::fs::symlink(&elsewhere, ctx.home_file(".testfile"))?;

        let err = unmanage_entry(&ctx, list.find(".testfile").unwrap(), false).unwrap_err();
        assert!(err.to_string().contains("cancelled"));
        assert_eq!(std::fs::read_link(ctx.home_file(".testfile"))?, elsewhere);
        assert!(ctx.repo_path.join("dotfiles/plain/test/.testfile").is_file());
        Ok(())
    }

    #[test]
    fn test_unmanage_removes_secondary_links() -> Result<()> {
        let dir = tempdir()?;
        let ctx = ctx_with(dir.path(), &[]);
        let list = list(".f:a,b\n");
        std::fs::write(ctx.home_file(".f"), b"x")?;
        update(&ctx, &list, &[], SOFT)?;

        unmanage_entry(&ctx, list.find(".f").unwrap(), false)?;
        assert!(!ctx.repo_path.join("dotfiles/plain/a").exists());
        assert!(!ctx.repo_path.join("dotfiles/plain/b").exists());
        Ok(())
    }

    #[test]
    fn test_encrypted_roundtrip_through_engine() -> Result<()> {
        let dir = tempdir()?;
        let ctx = ctx_with(dir.path(), &["secret123"]);
        let list = list(".netrc:netrc|encrypt\n");
        std::fs::write(ctx.home_file(".netrc"), b"machine x login y\n")?;

        update(&ctx, &list, &[], SOFT)?;
        let sealed = ctx.repo_path.join("dotfiles/encrypt/netrc/.netrc");
        assert!(sealed.is_file());
        assert_ne!(std::fs::read(&sealed)?, b"machine x login y\n");
        // Home stays a decrypted regular file, never a symlink.
        assert!(!ctx.home_file(".netrc").is_symlink());

        std::fs::remove_file(ctx.home_file(".netrc"))?;
        restore(&ctx, &list, &[], SOFT)?;
        assert_eq!(std::fs::read(ctx.home_file(".netrc"))?, b"machine x login y\n");
        Ok(())
    }
}
