//! Content hashing and filesystem helpers shared across the engine.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use xxhash_rust::xxh3::xxh3_128;

/// Hashes a byte slice with xxHash3-128, formatted as 32 hex characters.
#[must_use]
pub fn hash_bytes(data: &[u8]) -> String {
    format!("{:032x}", xxh3_128(data))
}

/// Hashes the contents of a file.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn hash_file(path: &Path) -> Result<String> {
    let content = std::fs::read(path)
        .with_context(|| format!("Failed to read {} for hashing", path.display()))?;
    Ok(hash_bytes(&content))
}

/// Writes `data` to `path` atomically: the bytes land in a temporary file in
/// the same directory, which is then renamed over the destination. A crash
/// before the rename leaves the prior state intact.
///
/// # Errors
/// Returns an error if the parent directory cannot be created or the write
/// or rename fails.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("No parent directory for {}", path.display()))?;
    std::fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory {}", parent.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in {}", parent.display()))?;
    use std::io::Write;
    tmp.write_all(data)
        .with_context(|| format!("Failed to write temporary file for {}", path.display()))?;
    // rename() would fail replacing an existing symlink target on some
    // platforms; persist() overwrites the path itself, which is what we want.
    if path.is_symlink() {
        std::fs::remove_file(path)?;
    }
    tmp.persist(path)
        .with_context(|| format!("Failed to persist {}", path.display()))?;
    Ok(())
}

/// Copies file content atomically (read fully, then [`atomic_write`]).
/// Reads through symlinks on the source side.
///
/// # Errors
/// Returns an error if the source cannot be read or the destination write fails.
pub fn copy_file(src: &Path, dest: &Path) -> Result<()> {
    let data =
        std::fs::read(src).with_context(|| format!("Failed to read {}", src.display()))?;
    atomic_write(dest, &data)
}

/// Replaces whatever sits at `link` with a symlink pointing at `target`.
///
/// # Errors
/// Returns an error if removal of the existing path or symlink creation fails.
pub fn replace_with_symlink(target: &Path, link: &Path) -> Result<()> {
    if let Some(parent) = link.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if link.symlink_metadata().is_ok() {
        std::fs::remove_file(link)
            .with_context(|| format!("Failed to remove {}", link.display()))?;
    }
    #[cfg(unix)]
    std::os::unix::fs::symlink(target, link)
        .with_context(|| format!("Failed to link {} -> {}", link.display(), target.display()))?;
    #[cfg(not(unix))]
    anyhow::bail!("symlink materialization is only supported on unix");
    Ok(())
}

/// Removes `path` and then prunes any now-empty ancestor directories up to
/// (but excluding) `stop`.
///
/// # Errors
/// Returns an error if the file removal fails. Pruning errors are ignored;
/// a non-empty directory simply stops the walk.
pub fn remove_and_prune(path: &Path, stop: &Path) -> Result<()> {
    if path.symlink_metadata().is_ok() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    let mut dir = path.parent();
    while let Some(d) = dir {
        if d == stop || std::fs::remove_dir(d).is_err() {
            break;
        }
        dir = d.parent();
    }
    Ok(())
}

/// Expands a leading `~` or `~/` to the user's home directory.
#[must_use]
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_hash_bytes_stable() {
        let h1 = hash_bytes(b"hello world");
        let h2 = hash_bytes(b"hello world");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 32);
        assert_ne!(h1, hash_bytes(b"hello worlds"));
    }

    #[test]
    fn test_hash_file_matches_bytes() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("f");
        std::fs::write(&path, b"content")?;
        assert_eq!(hash_file(&path)?, hash_bytes(b"content"));
        Ok(())
    }

    #[test]
    fn test_atomic_write_creates_parents() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("a/b/c.txt");
        atomic_write(&path, b"data")?;
        assert_eq!(std::fs::read(&path)?, b"data");
        Ok(())
    }

    #[test]
    fn test_atomic_write_replaces_symlink() -> Result<()> {
        let dir = tempdir()?;
        let target = dir.path().join("target");
        let link = dir.path().join("link");
        std::fs::write(&target, b"old")?;
        std::os::unix::fs::symlink(&target, &link)?;

        atomic_write(&link, b"new")?;
        assert!(!link.is_symlink());
        assert_eq!(std::fs::read(&link)?, b"new");
        // Target untouched.
        assert_eq!(std::fs::read(&target)?, b"old");
        Ok(())
    }

    #[test]
    fn test_remove_and_prune() -> Result<()> {
        let dir = tempdir()?;
        let root = dir.path().join("root");
        let file = root.join("cat/sub/file");
        std::fs::create_dir_all(file.parent().unwrap())?;
        std::fs::write(&file, b"x")?;

        remove_and_prune(&file, &root)?;
        assert!(!file.exists());
        assert!(!root.join("cat").exists());
        assert!(root.exists());
        Ok(())
    }

    #[test]
    fn test_replace_with_symlink_over_file() -> Result<()> {
        let dir = tempdir()?;
        let target = dir.path().join("target");
        let link = dir.path().join("link");
        std::fs::write(&target, b"t")?;
        std::fs::write(&link, b"old")?;

        replace_with_symlink(&target, &link)?;
        assert!(link.is_symlink());
        assert_eq!(std::fs::read_link(&link)?, target);
        Ok(())
    }
}
