//! Directory traversal filtered by file extension.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A matching file discovered under a walk root.
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// Full path to the file
    pub path: PathBuf,

    /// Relative path from the root
    pub relative_path: PathBuf,
}

/// An entry that could not be read during the walk.
#[derive(Debug)]
pub struct WalkFailure {
    /// Relative path of the offending entry, when known
    pub relative_path: PathBuf,
    pub error: walkdir::Error,
}

/// Recursively collect regular files under `root` whose extension equals
/// `extension`. Unreadable entries are returned separately so one bad
/// subdirectory does not hide the rest of the tree.
pub fn walk_by_extension(root: &Path, extension: &str) -> (Vec<FileInfo>, Vec<WalkFailure>) {
    let mut files = Vec::new();
    let mut failures = Vec::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(error) => {
                let relative_path = error
                    .path()
                    .map(|p| p.strip_prefix(root).unwrap_or(p).to_path_buf())
                    .unwrap_or_default();
                failures.push(WalkFailure { relative_path, error });
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension() != Some(OsStr::new(extension)) {
            continue;
        }

        let path = entry.path().to_path_buf();
        let relative_path = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
        files.push(FileInfo { path, relative_path });
    }

    (files, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_walk_empty_directory() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let (files, failures) = walk_by_extension(temp_dir.path(), "md");
        assert!(files.is_empty());
        assert!(failures.is_empty());
        Ok(())
    }

    #[test]
    fn test_walk_filters_extension() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;

        fs::write(temp_dir.path().join("SOUL.md"), b"soul")?;
        fs::write(temp_dir.path().join("notes.txt"), b"skip")?;
        fs::write(temp_dir.path().join("README.MD"), b"case differs")?;

        let (files, _) = walk_by_extension(temp_dir.path(), "md");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative_path, PathBuf::from("SOUL.md"));

        Ok(())
    }

    #[test]
    fn test_walk_with_subdirectories() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;

        fs::create_dir_all(temp_dir.path().join("memory/2026"))?;
        fs::write(temp_dir.path().join("IDENTITY.md"), b"id")?;
        fs::write(temp_dir.path().join("memory/2026/oct.md"), b"log")?;
        fs::create_dir(temp_dir.path().join("dir.md"))?;

        let (files, _) = walk_by_extension(temp_dir.path(), "md");
        let rel: Vec<_> = files.iter().map(|f| f.relative_path.clone()).collect();
        assert_eq!(
            rel,
            vec![PathBuf::from("IDENTITY.md"), PathBuf::from("memory/2026/oct.md")]
        );

        Ok(())
    }

    #[test]
    fn test_missing_root_reports_failure() {
        let temp_dir = TempDir::new().unwrap();
        let (files, failures) = walk_by_extension(&temp_dir.path().join("gone"), "md");
        assert!(files.is_empty());
        assert_eq!(failures.len(), 1);
    }
}
