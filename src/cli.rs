//! Command-line interface definitions for dotsync.
//!
//! All CLI argument parsing structures use clap's derive macros. Help text
//! lives in clap attributes and doc comments here rather than in the command
//! modules.

#![allow(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Main CLI structure for dotsync.
#[derive(Parser)]
#[command(
    name = "dotsync",
    version = crate::VERSION,
    about = "Mirror your dotfiles into a git-backed repository",
    long_about = "Mirrors a curated set of configuration files between your home \
directory and a version-controlled repository, grouped into categories, stored \
verbatim or encrypted at rest"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a dotsync repository
    Init,

    /// Start managing a file
    Add {
        /// Path to manage (home-relative, absolute, or with ~)
        path: String,

        /// Category to file it under (inferred from the name if omitted)
        category: Option<String>,

        /// Store the file encrypted at rest
        #[arg(long)]
        encrypt: bool,

        /// Show what would happen without making changes
        #[arg(long)]
        dry_run: bool,
    },

    /// List managed files and their state
    List {
        /// Only list entries in this category
        category: Option<String>,
    },

    /// Push home content into the repository
    Update {
        /// Categories to update (all when omitted)
        categories: Vec<String>,

        /// Materialize home files as copies instead of symlinks
        #[arg(long)]
        hard: bool,

        /// Show what would happen without making changes
        #[arg(long)]
        dry_run: bool,
    },

    /// Materialize repository content into home
    Restore {
        /// Categories to restore (all when omitted)
        categories: Vec<String>,

        /// Materialize home files as copies instead of symlinks
        #[arg(long)]
        hard: bool,

        /// Show what would happen without making changes
        #[arg(long)]
        dry_run: bool,
    },

    /// Show uncommitted repository changes and unpushed home edits
    Diff {
        /// Categories to diff (all when omitted)
        categories: Vec<String>,

        /// Accepted for symmetry with update/restore; diff output is the
        /// same in both modes
        #[arg(long)]
        hard: bool,
    },

    /// Remove home-side symlinks/copies of managed files
    Clean {
        /// Categories to clean (all when omitted)
        categories: Vec<String>,

        /// Accepted for symmetry with update/restore
        #[arg(long)]
        hard: bool,

        /// Show what would happen without making changes
        #[arg(long)]
        dry_run: bool,
    },

    /// Record pending repository changes in version control
    Commit,

    /// Mark a managed file as encrypted at rest
    Encrypt {
        /// Managed path to relabel
        path: String,

        /// Show what would happen without making changes
        #[arg(long)]
        dry_run: bool,
    },

    /// Stop managing a file, leaving a real copy in home
    Unmanage {
        /// Managed path to release
        path: String,

        /// Show what would happen without making changes
        #[arg(long)]
        dry_run: bool,
    },

    /// Change the repository passphrase and re-encrypt all encrypted files
    Passwd,

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}
