//! Path confinement for everything written under a project directory.
//!
//! Manifest entries and software names come from the remote side, so every
//! path derived from them goes through [`resolve_within_base`] before it
//! touches the disk.

use crate::utils::{Result, SyncError};
use std::path::{Component, Path, PathBuf};

/// Normalize a relative path to POSIX form: backslashes become forward
/// slashes and leading slashes are stripped.
pub fn normalize_rel_path(raw: &str) -> String {
    raw.replace('\\', "/").trim_start_matches('/').to_string()
}

/// Join `relative` onto `base` and fail unless the result stays inside `base`.
///
/// The check is lexical: `.` and `..` are folded without touching the
/// filesystem, and the result must equal the base or have it as a
/// component-wise prefix (so `/data/project-evil` is not inside `/data/project`).
pub fn resolve_within_base(base: &Path, relative: &str) -> Result<PathBuf> {
    let base = absolute_lexical(base)?;
    let rel = normalize_rel_path(relative);

    let mut resolved = base.clone();
    for component in Path::new(&rel).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() {
                    return Err(SyncError::PathEscape(relative.to_string()));
                }
            }
            // A drive prefix or root survived normalization (e.g. `C:/x`)
            Component::Prefix(_) | Component::RootDir => {
                return Err(SyncError::PathEscape(relative.to_string()));
            }
        }
    }

    if resolved != base && !resolved.starts_with(&base) {
        return Err(SyncError::PathEscape(relative.to_string()));
    }

    Ok(resolved)
}

/// Make `path` absolute against the current directory and fold `.`/`..`.
fn absolute_lexical(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}
