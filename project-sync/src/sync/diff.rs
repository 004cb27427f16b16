//! Manifest diff engine.
//!
//! Reconciles a local snapshot against the last published manifest and
//! decides, per path, whether the file is unchanged (carry the remote ids
//! forward), must be uploaded, or was deleted locally. The engine performs
//! no I/O: the push executor fetches the previous manifest, fingerprints
//! the tree, runs [`plan_push`], performs the uploads the plan asks for and
//! then calls [`PushPlan::next_manifest`] with the resulting receipts.

use crate::fs::metadata::LocalFileRecord;
use crate::sync::manifest::{Manifest, ManifestFileEntry};
use crate::utils::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Which local files a push uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum UploadMode {
    /// Upload only files whose hash or size differ from the previous manifest
    #[default]
    Changed,
    /// Upload every fingerprinted file
    All,
}

/// Local state for one push.
#[derive(Debug, Clone, Default)]
pub struct LocalSnapshot {
    /// Every path the scanner saw, fingerprinted or not
    pub present: BTreeSet<String>,

    /// Fingerprinted files (at most the per-run cap)
    pub records: Vec<LocalFileRecord>,
}

impl LocalSnapshot {
    /// Snapshot where every scanned path was fingerprinted.
    pub fn from_records(records: Vec<LocalFileRecord>) -> Self {
        Self {
            present: records.iter().map(|r| r.path.clone()).collect(),
            records,
        }
    }
}

/// A file the plan wants uploaded, with the fingerprint it will be recorded under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingUpload {
    pub path: String,
    pub hash: String,
    pub size_bytes: u64,
    pub last_modified: String,
}

/// Ids the platform allocated for an uploaded blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadReceipt {
    pub file_id: u64,
    pub file_version_id: u64,
}

/// Result of reconciling local state with the previous manifest.
#[derive(Debug, Clone, Default)]
pub struct PushPlan {
    /// Files identical to the previous version; remote ids carried forward
    pub unchanged: Vec<ManifestFileEntry>,

    /// Files to upload, sorted by path
    pub uploads: Vec<PendingUpload>,

    /// Previous paths no longer present locally, sorted
    pub deleted: Vec<String>,

    /// Previous entries still present locally but not fingerprinted this run
    pub carried: Vec<ManifestFileEntry>,

    /// Whether a previous manifest existed
    pub has_previous: bool,
}

impl PushPlan {
    /// A new version is published when something changed, when forced, or
    /// when nothing has been published yet.
    pub fn should_publish(&self, force: bool) -> bool {
        force || !self.has_previous || !self.uploads.is_empty() || !self.deleted.is_empty()
    }

    /// Build the next manifest once every pending upload has a receipt.
    pub fn next_manifest(
        &self,
        software_name: &str,
        receipts: &HashMap<String, UploadReceipt>,
        updated_at: &str,
    ) -> Result<Manifest> {
        let mut entries: Vec<ManifestFileEntry> =
            Vec::with_capacity(self.carried.len() + self.unchanged.len() + self.uploads.len());

        // Order matters: later entries win on duplicate paths, so local results go last.
        entries.extend(self.carried.iter().cloned());
        entries.extend(self.unchanged.iter().cloned());

        for upload in &self.uploads {
            let receipt = receipts.get(&upload.path).ok_or_else(|| {
                SyncError::RemoteProtocol(format!("no upload receipt for {}", upload.path))
            })?;
            entries.push(ManifestFileEntry {
                path: upload.path.clone(),
                file_id: receipt.file_id,
                file_version_id: receipt.file_version_id,
                hash: Some(upload.hash.clone()),
                size_bytes: Some(upload.size_bytes),
                last_modified: Some(upload.last_modified.clone()),
            });
        }

        Ok(Manifest::from_entries(software_name, entries, updated_at))
    }
}

/// Reconcile `local` against `previous`.
pub fn plan_push(previous: Option<&Manifest>, local: &LocalSnapshot, mode: UploadMode) -> PushPlan {
    let remote_by_path: BTreeMap<&str, &ManifestFileEntry> = previous
        .map(|m| m.files.iter().map(|f| (f.path.as_str(), f)).collect())
        .unwrap_or_default();

    let local_by_path: BTreeMap<&str, &LocalFileRecord> = local
        .records
        .iter()
        .map(|r| (r.path.as_str(), r))
        .collect();

    let mut plan = PushPlan {
        has_previous: previous.is_some(),
        ..PushPlan::default()
    };

    for (path, record) in &local_by_path {
        let remote = remote_by_path.get(path);
        let unchanged = mode == UploadMode::Changed
            && remote
                .and_then(|r| r.comparable())
                .is_some_and(|(hash, size)| hash == record.hash && size == record.size_bytes);

        match remote {
            Some(remote) if unchanged => plan.unchanged.push(ManifestFileEntry {
                path: record.path.clone(),
                file_id: remote.file_id,
                file_version_id: remote.file_version_id,
                hash: Some(record.hash.clone()),
                size_bytes: Some(record.size_bytes),
                last_modified: Some(record.last_modified.clone()),
            }),
            _ => plan.uploads.push(PendingUpload {
                path: record.path.clone(),
                hash: record.hash.clone(),
                size_bytes: record.size_bytes,
                last_modified: record.last_modified.clone(),
            }),
        }
    }

    for (path, remote) in &remote_by_path {
        if !local.present.contains(*path) {
            plan.deleted.push(path.to_string());
        } else if !local_by_path.contains_key(path) {
            plan.carried.push((*remote).clone());
        }
    }

    plan
}
