use anyhow::{Context, Result};
use colored::Colorize;

use crate::git::GitRepo;
use crate::{FILELIST_FILE, PLUGINS_DIR, SyncContext};

/// Initializes a dotsync repository at the context's repository path.
///
/// Creates the git repository with a pinned local identity, an empty
/// manifest and a `.gitignore` that keeps private plugin state out of
/// version control, then records the initial commit.
///
/// # Errors
///
/// Returns an error if:
/// - The `git` binary is not available
/// - The repository directory cannot be created
/// - Any of the seed files cannot be written or committed
pub fn execute(ctx: &SyncContext) -> Result<()> {
    GitRepo::ensure_available()?;

    std::fs::create_dir_all(&ctx.repo_path).with_context(|| {
        format!(
            "Failed to create repository directory: {}",
            ctx.repo_path.display()
        )
    })?;

    let git = GitRepo::new(&ctx.repo_path);
    git.init(&ctx.config)?;

    crate::utils::atomic_write(&ctx.repo_path.join(FILELIST_FILE), b"")?;
    // Plugin private state (e.g. the passphrase verifier) never enters
    // version control.
    crate::utils::atomic_write(
        &ctx.repo_path.join(".gitignore"),
        format!("{PLUGINS_DIR}/\n").as_bytes(),
    )?;
    git.commit("Initialize dotsync repository")?;

    if !ctx.config_path.exists() {
        ctx.config
            .save(&ctx.config_path)
            .context("Failed to save default configuration")?;
    }

    super::print_success(&format!(
        "Initialized dotsync repository at {}",
        ctx.repo_path.display()
    ));
    println!("\n{}", "Quick start:".bold());
    println!("  dotsync add ~/.zshrc          # Manage your zsh config");
    println!("  dotsync update                # Push changes into the repo");
    println!("  dotsync commit                # Record a snapshot");
    Ok(())
}
