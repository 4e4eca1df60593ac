use anyhow::{Result, bail};
use std::path::Path;

use crate::filelist::{Entry, Filelist};
use crate::plugins::PluginKind;
use crate::sync::{self, Options};
use crate::{SyncContext, prompt, utils};

/// Adds a path to the manifest and immediately pushes it into the
/// repository.
///
/// The path may be given home-relative, absolute under the home directory,
/// or with a leading tilde. When the file does not exist yet, the user is
/// asked to confirm before the entry is recorded.
///
/// # Errors
///
/// Returns an error if:
/// - The path lies outside the home directory
/// - The path is already managed
/// - The manifest cannot be loaded or saved
pub fn execute(
    ctx: &SyncContext,
    path: &str,
    category: Option<String>,
    encrypt: bool,
    dry_run: bool,
) -> Result<()> {
    let relative = home_relative(ctx, path)?;
    let mut filelist = Filelist::load(&ctx.repo_path)?;

    if !ctx.home_file(&relative).exists() {
        let question = format!("{relative} does not exist in home. Add it anyway?");
        if !prompt::confirm(ctx.prompt.as_ref(), &question)? {
            super::print_info("Not added");
            return Ok(());
        }
    }

    let plugin = if encrypt { PluginKind::Encrypt } else { PluginKind::Plain };
    let entry = Entry::new(relative.clone(), category, plugin);
    let line = entry.to_line();

    // Dry-run still surfaces duplicate entries; only the persistence and
    // the follow-up update are skipped.
    filelist.add(entry)?;
    if dry_run {
        super::print_info(&format!("would add {line}"));
        return Ok(());
    }
    filelist.save(&ctx.repo_path)?;

    if let Some(entry) = filelist.find(&relative) {
        sync::update_entry(ctx, entry, Options::resolve(ctx, false, false))?;
    }
    super::print_success(&format!("Added {line}"));
    Ok(())
}

/// Normalizes user input to the home-relative path stored in the manifest.
fn home_relative(ctx: &SyncContext, path: &str) -> Result<String> {
    let expanded = utils::expand_tilde(path);
    let relative = if expanded.is_absolute() {
        match expanded.strip_prefix(&ctx.home_path) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => bail!("{} is outside the home directory", expanded.display()),
        }
    } else {
        expanded
    };
    if relative.as_os_str().is_empty() || relative.starts_with(Path::new("..")) {
        bail!("{path} is not a valid home-relative path");
    }
    Ok(relative.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedPrompt;
    use tempfile::tempdir;

    fn ctx(dir: &Path, answers: &[&str]) -> SyncContext {
        let answers: Vec<String> = answers.iter().map(|s| (*s).to_string()).collect();
        let ctx = SyncContext::new_explicit(
            dir.join("repo"),
            dir.join("home"),
            Box::new(ScriptedPrompt::new(answers)),
        );
        std::fs::create_dir_all(&ctx.home_path).unwrap();
        std::fs::create_dir_all(&ctx.repo_path).unwrap();
        std::fs::write(ctx.filelist_path(), "").unwrap();
        ctx
    }

    #[test]
    fn test_add_infers_category_and_updates() -> Result<()> {
        let dir = tempdir()?;
        let ctx = ctx(dir.path(), &[]);
        std::fs::write(ctx.home_file(".zshrc"), b"x")?;

        execute(&ctx, ".zshrc", None, false, false)?;
        let filelist = Filelist::load(&ctx.repo_path)?;
        let entry = filelist.find(".zshrc").unwrap();
        assert_eq!(entry.categories, vec!["zsh"]);
        assert!(ctx.repo_path.join("dotfiles/plain/zsh/.zshrc").is_file());
        Ok(())
    }

    #[test]
    fn test_add_rejects_duplicate() -> Result<()> {
        let dir = tempdir()?;
        let ctx = ctx(dir.path(), &[]);
        std::fs::write(ctx.home_file(".vimrc"), b"x")?;

        execute(&ctx, ".vimrc", None, false, false)?;
        let err = execute(&ctx, ".vimrc", Some("other".into()), false, false).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        Ok(())
    }

    #[test]
    fn test_add_missing_file_declined() -> Result<()> {
        let dir = tempdir()?;
        let ctx = ctx(dir.path(), &["n"]);

        execute(&ctx, ".ghost", None, false, false)?;
        assert!(Filelist::load(&ctx.repo_path)?.find(".ghost").is_none());
        Ok(())
    }

    #[test]
    fn test_add_rejects_outside_home() {
        let dir = tempdir().unwrap();
        let ctx = ctx(dir.path(), &[]);
        assert!(execute(&ctx, "/etc/passwd", None, false, false).is_err());
    }

    #[test]
    fn test_add_dry_run_records_nothing() -> Result<()> {
        let dir = tempdir()?;
        let ctx = ctx(dir.path(), &[]);
        std::fs::write(ctx.home_file("file"), b"x")?;

        execute(&ctx, "file", None, false, true)?;
        assert!(Filelist::load(&ctx.repo_path)?.find("file").is_none());
        Ok(())
    }

    #[test]
    fn test_add_dry_run_still_rejects_duplicate() -> Result<()> {
        let dir = tempdir()?;
        let ctx = ctx(dir.path(), &[]);
        std::fs::write(ctx.home_file(".zshrc"), b"x")?;

        execute(&ctx, ".zshrc", None, false, false)?;
        let err = execute(&ctx, ".zshrc", None, false, true).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        Ok(())
    }
}
