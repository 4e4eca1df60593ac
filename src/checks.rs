//! Pre-flight repository safety checks.
//!
//! An advisory gate consulted at dispatch time, before the engine runs. It
//! guards against operating on the home directory itself, on an
//! uninitialized or foreign directory, or on a repository laid out by an
//! incompatible older version of the tool.

use std::path::Path;
use tracing::error;

use crate::FILELIST_FILE;

/// Marker file written by old dotsync versions with an incompatible layout.
pub const LEGACY_MARKER: &str = "cryptlist";

/// Returns whether it is safe to operate on `repo` with `home` as the home
/// directory. `init` selects init-mode rules (the repository is about to be
/// created) versus normal-mode rules (it must already exist). Failures are
/// logged with their reason.
#[must_use]
pub fn safety_checks(repo: &Path, home: &Path, init: bool) -> bool {
    if repo == home {
        error!(
            "repository path {} is the home directory itself",
            repo.display()
        );
        return false;
    }

    if repo.join(LEGACY_MARKER).exists() {
        error!(
            "{} looks like an old dotsync repo (found {LEGACY_MARKER}); migrate it first",
            repo.display()
        );
        return false;
    }

    let filelist = repo.join(FILELIST_FILE);
    if init {
        if filelist.exists() {
            error!(
                "{} already contains a filelist; refusing to re-init",
                repo.display()
            );
            return false;
        }
        return true;
    }

    if !repo.join(".git").is_dir() {
        error!(
            "{} is not a git repository; run `dotsync init` first",
            repo.display()
        );
        return false;
    }
    if !filelist.is_file() {
        error!("{} has no filelist; not a dotsync repository", repo.display());
        return false;
    }
    true
}
