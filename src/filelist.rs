//! The manifest store.
//!
//! The `filelist` file at the repository root is the sole source of truth
//! for what is managed. One entry per line:
//!
//! ```text
//! path[:cat1,cat2,...][|plugin]
//! ```
//!
//! The store is loaded at the start of a command, mutated in memory and
//! persisted once; no longer-lived state exists.

use anyhow::{Context, Result, bail};
use std::path::Path;

use crate::FILELIST_FILE;
use crate::plugins::PluginKind;

/// One managed path with its categories and plugin tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Home-relative path; unique across the manifest.
    pub path: String,

    /// Non-empty, ordered category set. The first category is the master.
    pub categories: Vec<String>,

    /// At-rest representation plugin.
    pub plugin: PluginKind,

    /// Whether the categories were written in the manifest line (as opposed
    /// to inferred from the file name). Preserved so serialization keeps the
    /// original line shape.
    pub explicit_categories: bool,
}

impl Entry {
    /// Creates an entry, inferring the category when none is given.
    #[must_use]
    pub fn new(path: String, category: Option<String>, plugin: PluginKind) -> Self {
        let explicit = category.is_some();
        let category = category.unwrap_or_else(|| infer_category(&path));
        Self {
            path,
            categories: vec![category],
            plugin,
            explicit_categories: explicit,
        }
    }

    /// The master category (first declared).
    #[must_use]
    pub fn master_category(&self) -> &str {
        &self.categories[0]
    }

    /// Whether the entry belongs to any of the filter categories. An empty
    /// filter matches everything.
    #[must_use]
    pub fn in_categories(&self, filter: &[String]) -> bool {
        filter.is_empty() || self.categories.iter().any(|c| filter.contains(c))
    }

    /// Serializes the entry back to its manifest line.
    #[must_use]
    pub fn to_line(&self) -> String {
        let mut line = self.path.clone();
        if self.explicit_categories {
            line.push(':');
            line.push_str(&self.categories.join(","));
        }
        if self.plugin != PluginKind::Plain {
            line.push('|');
            line.push_str(self.plugin.name());
        }
        line
    }

    fn parse(line: &str) -> Result<Self> {
        let (head, plugin) = match line.split_once('|') {
            Some((head, tag)) => (head, PluginKind::parse(tag.trim())?),
            None => (line, PluginKind::Plain),
        };

        let (path, categories) = match head.split_once(':') {
            Some((path, cats)) => {
                let categories: Vec<String> = cats
                    .split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(String::from)
                    .collect();
                if categories.is_empty() {
                    bail!("malformed filelist entry: empty category list in {line:?}");
                }
                (path.trim(), Some(categories))
            }
            None => (head.trim(), None),
        };

        if path.is_empty() {
            bail!("malformed filelist entry: empty path in {line:?}");
        }

        let explicit = categories.is_some();
        Ok(Self {
            path: path.to_string(),
            categories: categories.unwrap_or_else(|| vec![infer_category(path)]),
            plugin,
            explicit_categories: explicit,
        })
    }
}

/// Infers a category from a file name. Dotfile names drop the leading dots,
/// keep the segment before the first remaining dot and shed a trailing `rc`
/// (`.zshrc` -> `zsh`, `.config/nvim/init.vim` falls back through its file
/// name). Anything without a leading dot lands in `common`.
#[must_use]
pub fn infer_category(path: &str) -> String {
    let name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let Some(stripped) = name.strip_prefix('.') else {
        return "common".to_string();
    };
    let stem = stripped
        .trim_start_matches('.')
        .split('.')
        .next()
        .unwrap_or("");
    let stem = match stem.strip_suffix("rc") {
        Some(base) if !base.is_empty() => base,
        _ => stem,
    };
    if stem.is_empty() {
        "common".to_string()
    } else {
        stem.to_string()
    }
}

/// The loaded manifest: an ordered entry collection plus persistence.
#[derive(Debug, Default)]
pub struct Filelist {
    entries: Vec<Entry>,
}

impl Filelist {
    /// Loads the manifest from the repository root.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or a line is malformed.
    pub fn load(repo: &Path) -> Result<Self> {
        let path = repo.join(FILELIST_FILE);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read filelist at {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parses manifest content. Blank lines are skipped.
    ///
    /// # Errors
    /// Returns a `malformed filelist entry` error for an invalid line.
    pub fn parse(content: &str) -> Result<Self> {
        let mut entries = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            entries.push(Entry::parse(line)?);
        }
        Ok(Self { entries })
    }

    /// Persists the manifest, preserving declaration order.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub fn save(&self, repo: &Path) -> Result<()> {
        let mut content = self
            .entries
            .iter()
            .map(Entry::to_line)
            .collect::<Vec<_>>()
            .join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        crate::utils::atomic_write(&repo.join(FILELIST_FILE), content.as_bytes())
    }

    /// All entries, in declaration order.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Entries matching a category filter (empty filter = all).
    #[must_use]
    pub fn select(&self, filter: &[String]) -> Vec<&Entry> {
        self.entries
            .iter()
            .filter(|e| e.in_categories(filter))
            .collect()
    }

    /// Finds an entry by its path.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.path == path)
    }

    /// Mutable lookup by path.
    pub fn find_mut(&mut self, path: &str) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.path == path)
    }

    /// Appends an entry.
    ///
    /// # Errors
    /// Fails with a duplicate error when the path is already managed,
    /// regardless of category.
    pub fn add(&mut self, entry: Entry) -> Result<()> {
        if self.find(&entry.path).is_some() {
            bail!("{} already exists in filelist", entry.path);
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Removes and returns the entry for `path`.
    ///
    /// # Errors
    /// Fails with a `not managed` error when the path is absent.
    pub fn remove(&mut self, path: &str) -> Result<Entry> {
        let index = self
            .entries
            .iter()
            .position(|e| e.path == path)
            .with_context(|| format!("{path} is not managed"))?;
        Ok(self.entries.remove(index))
    }
}
