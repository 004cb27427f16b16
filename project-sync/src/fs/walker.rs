//! Local tree scanning.
//!
//! Produces the relative POSIX paths of every regular file under a root,
//! skipping reserved directories (VCS metadata, tool config, dependency and
//! build caches).

use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// Options for scanning a directory tree
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Directory names excluded at any depth, together with their subtree
    pub exclude_dirs: Vec<String>,

    /// File names skipped only at the scan root
    pub skip_root_files: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            exclude_dirs: default_exclude_dirs(),
            skip_root_files: Vec::new(),
        }
    }
}

impl ScanOptions {
    /// Options with no exclusions at all
    pub fn unfiltered() -> Self {
        Self {
            exclude_dirs: Vec::new(),
            skip_root_files: Vec::new(),
        }
    }

    pub fn skip_root_file(mut self, name: impl Into<String>) -> Self {
        self.skip_root_files.push(name.into());
        self
    }
}

/// Reserved directory names skipped by default
pub fn default_exclude_dirs() -> Vec<String> {
    [".git", ".opencode", "node_modules", ".next", "build"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Scan `root` and return the sorted relative POSIX paths of all files.
///
/// A missing root yields an empty list. Symlinks to files count as files;
/// broken symlinks, symlinks to directories and special files are skipped.
///
/// # Example
/// ```no_run
/// use project_sync::fs::walker::{scan, ScanOptions};
/// use std::path::Path;
///
/// let files = scan(Path::new("game/client"), &ScanOptions::default()).unwrap();
/// println!("Found {} files", files.len());
/// ```
pub fn scan(root: &Path, options: &ScanOptions) -> std::io::Result<Vec<String>> {
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_excluded_dir(entry, &options.exclude_dirs));

    for entry in walker {
        let entry = entry?;

        if entry.depth() == 0 || entry.file_type().is_dir() {
            continue;
        }

        if !is_regular_file(&entry) {
            continue;
        }

        let Some(rel) = relative_posix(entry.path(), root) else {
            continue;
        };

        if entry.depth() == 1 && options.skip_root_files.iter().any(|n| *n == rel) {
            continue;
        }

        files.push(rel);
    }

    files.sort();
    Ok(files)
}

/// Plain files, plus symlinks that resolve to a file
fn is_regular_file(entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    if file_type.is_file() {
        return true;
    }
    if file_type.is_symlink() {
        return std::fs::metadata(entry.path())
            .map(|m| m.is_file())
            .unwrap_or(false);
    }
    false
}

fn is_excluded_dir(entry: &DirEntry, exclude_dirs: &[String]) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    exclude_dirs.iter().any(|d| *d == name)
}

fn relative_posix(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}
