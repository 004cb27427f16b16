//! Project workspace layout.
//!
//! ```text
//! {project}/
//!   build/                 build output, build_version.json record
//!   game/{software}/       synced sources, manifest.json record
//!   logs/ artifacts/ docs/
//! ```

use std::path::Path;
use walkdir::WalkDir;

/// Top-level directories scaffolded in every project.
pub const WORKSPACE_DIRS: &[&str] = &["build", "game", "logs", "artifacts", "docs"];

/// Directory holding software sources.
pub const GAME_DIR: &str = "game";

/// Older layouts used this name instead of `game`.
pub const LEGACY_GAME_DIR: &str = "game_project";

/// Default build output directory.
pub const BUILD_DIR: &str = "build";

/// Create the standard top-level directories.
pub async fn ensure_workspace_layout(project_dir: &Path) -> std::io::Result<()> {
    for name in WORKSPACE_DIRS {
        tokio::fs::create_dir_all(project_dir.join(name)).await?;
    }
    Ok(())
}

/// `game` unless only the legacy `game_project` directory exists.
pub async fn pick_game_dir(project_dir: &Path) -> &'static str {
    if tokio::fs::try_exists(project_dir.join(GAME_DIR)).await.unwrap_or(false) {
        return GAME_DIR;
    }
    if tokio::fs::try_exists(project_dir.join(LEGACY_GAME_DIR)).await.unwrap_or(false) {
        return LEGACY_GAME_DIR;
    }
    GAME_DIR
}

/// True when `dir` is missing or has no entries.
pub async fn dir_is_empty(dir: &Path) -> bool {
    match tokio::fs::read_dir(dir).await {
        Ok(mut entries) => matches!(entries.next_entry().await, Ok(None)),
        Err(_) => true,
    }
}

/// Recursively copy regular files and directories from `src` into `dest`.
/// Returns the number of files copied.
pub async fn copy_dir(src: &Path, dest: &Path) -> std::io::Result<usize> {
    tokio::fs::create_dir_all(dest).await?;
    let mut copied = 0usize;

    for entry in WalkDir::new(src).min_depth(1).follow_links(false) {
        let entry = entry.map_err(std::io::Error::other)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(std::io::Error::other)?;
        let to = dest.join(rel);

        let file_type = entry.file_type();
        if file_type.is_dir() {
            tokio::fs::create_dir_all(&to).await?;
        } else if file_type.is_file() {
            tokio::fs::copy(entry.path(), &to).await?;
            copied += 1;
        }
    }

    Ok(copied)
}
