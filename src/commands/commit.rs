use anyhow::Result;

use crate::SyncContext;
use crate::git::GitRepo;

/// Records pending repository changes in version control. The commit
/// message lists the changed paths.
///
/// # Errors
/// Returns an error when git fails.
pub fn execute(ctx: &SyncContext) -> Result<()> {
    let git = GitRepo::new(&ctx.repo_path);
    let changes = git.status()?;
    if changes.is_empty() {
        super::print_info("Nothing to commit");
        return Ok(());
    }

    let paths: Vec<&str> = changes.iter().map(|c| c.path.as_str()).collect();
    let message = format!("Update {}", paths.join(", "));
    git.commit(&message)?;
    super::print_success(&format!("Committed: {message}"));
    Ok(())
}
