use anyhow::{Context, Result, bail};

use crate::SyncContext;
use crate::filelist::Filelist;
use crate::plugins::PluginKind;

/// Relabels a managed entry as encrypted at rest. Only the manifest tag
/// changes here; the physical re-encryption happens on the next `update`.
///
/// # Errors
/// Returns a `not managed` error for an unknown path and an
/// `already encrypted` error for an encrypt-tagged entry.
pub fn execute(ctx: &SyncContext, path: &str, dry_run: bool) -> Result<()> {
    let mut filelist = Filelist::load(&ctx.repo_path)?;
    let entry = filelist
        .find_mut(path)
        .with_context(|| format!("{path} is not managed"))?;
    if entry.plugin == PluginKind::Encrypt {
        bail!("{path} is already encrypted");
    }

    if dry_run {
        super::print_info(&format!("would mark {path} as encrypted"));
        return Ok(());
    }

    entry.plugin = PluginKind::Encrypt;
    filelist.save(&ctx.repo_path)?;
    super::print_success(&format!(
        "{path} marked as encrypted; run `dotsync update` to re-encrypt it"
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedPrompt;
    use std::path::Path;
    use tempfile::tempdir;

    fn ctx(dir: &Path) -> SyncContext {
        let ctx = SyncContext::new_explicit(
            dir.join("repo"),
            dir.join("home"),
            Box::new(ScriptedPrompt::default()),
        );
        std::fs::create_dir_all(&ctx.repo_path).unwrap();
        ctx
    }

    #[test]
    fn test_encrypt_relabels_entry() -> Result<()> {
        let dir = tempdir()?;
        let ctx = ctx(dir.path());
        std::fs::write(ctx.filelist_path(), ".netrc:netrc\n")?;

        execute(&ctx, ".netrc", false)?;
        let filelist = Filelist::load(&ctx.repo_path)?;
        assert_eq!(filelist.find(".netrc").unwrap().plugin, PluginKind::Encrypt);
        assert_eq!(
            std::fs::read_to_string(ctx.filelist_path())?,
            ".netrc:netrc|encrypt\n"
        );
        Ok(())
    }

    #[test]
    fn test_encrypt_rejects_unmanaged_and_double() -> Result<()> {
        let dir = tempdir()?;
        let ctx = ctx(dir.path());
        std::fs::write(ctx.filelist_path(), ".netrc:netrc|encrypt\n")?;

        let err = execute(&ctx, ".ghost", false).unwrap_err();
        assert!(err.to_string().contains("not managed"));
        let err = execute(&ctx, ".netrc", false).unwrap_err();
        assert!(err.to_string().contains("already encrypted"));
        Ok(())
    }

    #[test]
    fn test_encrypt_dry_run_keeps_tag() -> Result<()> {
        let dir = tempdir()?;
        let ctx = ctx(dir.path());
        std::fs::write(ctx.filelist_path(), "file\n")?;

        execute(&ctx, "file", true)?;
        let filelist = Filelist::load(&ctx.repo_path)?;
        assert_eq!(filelist.find("file").unwrap().plugin, PluginKind::Plain);
        Ok(())
    }
}
