//! Pull planning: where every manifest entry lands on disk.
//!
//! Dry runs and live pulls share this plan, so a dry run reports exactly the
//! targets a live pull would write.

use crate::fs::sandbox::resolve_within_base;
use crate::sync::manifest::{Manifest, MANIFEST_FILE_NAME};
use crate::utils::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One file a pull fetches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedFile {
    pub path: String,
    pub file_id: u64,
    pub file_version_id: u64,
    pub target: PathBuf,
}

/// Resolved pull plan for one software component.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullPlan {
    /// `{game_dir}/{software}` relative to the project
    pub base_rel: String,

    /// Absolute software directory
    pub base_dir: PathBuf,

    /// Where the manifest record is written
    pub manifest_path: PathBuf,

    pub folders: Vec<PathBuf>,

    pub files: Vec<PlannedFile>,
}

impl PullPlan {
    pub fn total_files(&self) -> usize {
        self.files.len()
    }
}

/// Resolve every folder and file of `manifest` under
/// `{project_dir}/{game_dir}/{software_name}`.
///
/// Fails with `PathEscape` if the software name or any entry would land
/// outside the project directory.
pub fn plan_pull(project_dir: &Path, game_dir: &str, software_name: &str, manifest: &Manifest) -> Result<PullPlan> {
    let base_rel = format!("{}/{}", game_dir, software_name);
    let base_dir = resolve_within_base(project_dir, &base_rel)?;
    let manifest_path = resolve_within_base(project_dir, &format!("{}/{}", base_rel, MANIFEST_FILE_NAME))?;

    let folders = manifest
        .folders
        .iter()
        .filter(|f| !f.is_empty())
        .map(|f| resolve_within_base(project_dir, &format!("{}/{}", base_rel, f)))
        .collect::<Result<Vec<_>>>()?;

    let files = manifest
        .files
        .iter()
        .map(|f| {
            Ok(PlannedFile {
                path: f.path.clone(),
                file_id: f.file_id,
                file_version_id: f.file_version_id,
                target: resolve_within_base(project_dir, &format!("{}/{}", base_rel, f.path))?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(PullPlan {
        base_rel,
        base_dir,
        manifest_path,
        folders,
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::manifest::ManifestFileEntry;
    use crate::utils::SyncError;

    fn entry(path: &str, id: u64) -> ManifestFileEntry {
        ManifestFileEntry {
            path: path.to_string(),
            file_id: id,
            file_version_id: id + 1,
            hash: None,
            size_bytes: None,
            last_modified: None,
        }
    }

    #[test]
    fn test_plan_pull_targets() {
        let manifest = Manifest::from_entries(
            "client",
            vec![entry("src/main.ts", 1), entry("index.html", 3)],
            "2024-05-01T00:00:00.000Z",
        );
        let plan = plan_pull(Path::new("/work/42"), "game", "client", &manifest).unwrap();

        assert_eq!(plan.base_rel, "game/client");
        assert_eq!(plan.base_dir, PathBuf::from("/work/42/game/client"));
        assert_eq!(plan.manifest_path, PathBuf::from("/work/42/game/client/manifest.json"));
        assert_eq!(plan.folders, vec![PathBuf::from("/work/42/game/client/src")]);
        assert_eq!(plan.total_files(), 2);
        assert_eq!(plan.files[0].path, "index.html");
        assert_eq!(plan.files[1].target, PathBuf::from("/work/42/game/client/src/main.ts"));
        assert_eq!((plan.files[1].file_id, plan.files[1].file_version_id), (1, 2));
    }

    #[test]
    fn test_plan_pull_rejects_escaping_entry() {
        let manifest = Manifest::from_entries(
            "client",
            vec![entry("../../../etc/passwd", 1)],
            "2024-05-01T00:00:00.000Z",
        );
        let err = plan_pull(Path::new("/work/42"), "game", "client", &manifest).unwrap_err();
        assert!(matches!(err, SyncError::PathEscape(_)));
    }

    #[test]
    fn test_plan_pull_rejects_escaping_software_name() {
        let manifest = Manifest::from_entries("x", Vec::new(), "");
        let err = plan_pull(Path::new("/work/42"), "game", "../../..", &manifest).unwrap_err();
        assert!(matches!(err, SyncError::PathEscape(_)));
    }
}
