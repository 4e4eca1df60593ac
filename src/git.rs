//! Version-control collaborator.
//!
//! The repository is a plain git working tree; all operations shell out to
//! the `git` binary rather than linking a git library. Failures surface the
//! command's stderr. Identity is pinned repo-locally at init so commits work
//! without global git configuration.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

use crate::config::Config;

/// Kind of change reported by `git status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// New file, staged or untracked.
    Added,
    /// Tracked file with modified content.
    Modified,
    /// Tracked file removed from the working tree.
    Deleted,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
        })
    }
}

/// One pending change in the repository working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub kind: ChangeKind,
    /// Repository-relative path.
    pub path: String,
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.path)
    }
}

/// Handle to the git working tree at the repository root.
pub struct GitRepo {
    root: PathBuf,
}

impl GitRepo {
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Whether the root already holds a git repository.
    #[must_use]
    pub fn is_repo(&self) -> bool {
        self.root.join(".git").is_dir()
    }

    /// Checks that a `git` binary is reachable on `PATH`.
    ///
    /// # Errors
    /// Returns an error naming the missing binary.
    pub fn ensure_available() -> Result<()> {
        which::which("git").context("git binary not found on PATH")?;
        Ok(())
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to run git {}", args.join(" ")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("git {} failed: {}", args.join(" "), stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Initializes a repository at the root and pins a repo-local identity.
    ///
    /// The identity comes from the `[user]` configuration section, with
    /// neutral fallbacks so commits never fail on machines without a global
    /// git identity.
    ///
    /// # Errors
    /// Returns an error when `git init` or `git config` fails.
    pub fn init(&self, config: &Config) -> Result<()> {
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create {}", self.root.display()))?;
        self.run(&["init"])?;

        let name = config.user.name.as_deref().unwrap_or("dotsync");
        let email = config.user.email.as_deref().unwrap_or("dotsync@localhost");
        self.run(&["config", "user.name", name])?;
        self.run(&["config", "user.email", email])?;
        debug!("initialized git repository at {}", self.root.display());
        Ok(())
    }

    /// Stages every change in the working tree.
    ///
    /// # Errors
    /// Returns an error when `git add` fails.
    pub fn add_all(&self) -> Result<()> {
        self.run(&["add", "--all"]).map(drop)
    }

    /// Creates a commit with the given message. Returns `false` when there
    /// was nothing to commit.
    ///
    /// # Errors
    /// Returns an error when `git commit` fails for a reason other than an
    /// empty index.
    pub fn commit(&self, message: &str) -> Result<bool> {
        if self.status()?.is_empty() {
            return Ok(false);
        }
        self.add_all()?;
        self.run(&["commit", "-m", message])?;
        Ok(true)
    }

    /// Pending working-tree changes, untracked files included, in the order
    /// git reports them.
    ///
    /// # Errors
    /// Returns an error when `git status` fails or reports malformed lines.
    pub fn status(&self) -> Result<Vec<Change>> {
        let stdout = self.run(&["status", "--porcelain", "-uall"])?;
        let mut changes = Vec::new();
        for line in stdout.lines() {
            if line.len() < 4 {
                continue;
            }
            let (code, path) = line.split_at(3);
            // Rename lines carry "old -> new"; only the new path matters.
            let path = path
                .rsplit_once(" -> ")
                .map_or(path, |(_, new)| new)
                .trim_matches('"')
                .to_string();
            let kind = match code.trim() {
                "??" | "A" => ChangeKind::Added,
                "D" => ChangeKind::Deleted,
                _ => ChangeKind::Modified,
            };
            changes.push(Change { kind, path });
        }
        Ok(changes)
    }

    /// Subject line of the last commit, or `None` before the first commit.
    ///
    /// # Errors
    /// Returns an error when `git log` fails unexpectedly.
    pub fn last_commit(&self) -> Result<Option<String>> {
        let output = Command::new("git")
            .args(["log", "-1", "--format=%s"])
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .output()
            .context("Failed to run git log")?;
        if !output.status.success() {
            // An unborn branch has no log.
            return Ok(None);
        }
        let subject = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!subject.is_empty()).then_some(subject))
    }
}
