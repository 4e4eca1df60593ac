//! Home-side observation classifier.
//!
//! All commands reason about the current home-side state of an entry through
//! one explicit classification instead of ad-hoc filesystem probing at every
//! call site.

use anyhow::Result;
use std::path::Path;

use crate::SyncContext;
use crate::plugins::Plugin;

/// Observed state of a managed path in the home directory, relative to the
/// repository master copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeState {
    /// Nothing exists at the home path.
    Absent,
    /// A symlink pointing at the repository master.
    ManagedSymlink,
    /// A regular file whose content matches the repository copy.
    ManagedCopy,
    /// A regular file whose content differs from the repository copy.
    ForeignFile,
    /// A symlink pointing somewhere other than the repository master.
    ForeignSymlink,
    /// A symlink whose target no longer exists. Treated like [`Absent`] for
    /// resolution purposes.
    ///
    /// [`Absent`]: HomeState::Absent
    DanglingSymlink,
}

/// Classifies the home path for an entry against its repository master.
///
/// Content equality for regular files is delegated to the entry's plugin so
/// that encrypted entries compare plaintext rather than ciphertext.
///
/// # Errors
/// Returns an error when the filesystem cannot be inspected or plugin
/// divergence detection fails.
pub fn classify(
    ctx: &SyncContext,
    home: &Path,
    master: &Path,
    plugin: &dyn Plugin,
) -> Result<HomeState> {
    let Ok(meta) = home.symlink_metadata() else {
        return Ok(HomeState::Absent);
    };

    if meta.file_type().is_symlink() {
        let target = std::fs::read_link(home)?;
        if target == master {
            return Ok(if master.exists() {
                HomeState::ManagedSymlink
            } else {
                HomeState::DanglingSymlink
            });
        }
        // Relative or indirect links still count as managed when they
        // resolve to the same file as the master.
        if let (Ok(resolved), Ok(master_resolved)) = (home.canonicalize(), master.canonicalize())
            && resolved == master_resolved
        {
            return Ok(HomeState::ManagedSymlink);
        }
        if !home.exists() {
            return Ok(HomeState::DanglingSymlink);
        }
        return Ok(HomeState::ForeignSymlink);
    }

    if !master.exists() {
        return Ok(HomeState::ForeignFile);
    }
    if plugin.has_diverged(ctx, home, master)? {
        Ok(HomeState::ForeignFile)
    } else {
        Ok(HomeState::ManagedCopy)
    }
}
