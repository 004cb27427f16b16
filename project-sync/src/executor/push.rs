//! Push: publish local changes of one software as a new manifest version.

use super::{join_rel, truncated, ToolContext, UploadedBlob};
use crate::api::types::CreateManifestRequest;
use crate::config::check_max_files;
use crate::fs::layout::pick_game_dir;
use crate::fs::metadata::{now_iso, LocalFileRecord};
use crate::fs::sandbox::resolve_within_base;
use crate::fs::walker::{scan, ScanOptions};
use crate::sync::diff::{plan_push, LocalSnapshot, UploadMode, UploadReceipt};
use crate::sync::manifest::{Manifest, MANIFEST_FILE_NAME};
use crate::utils::{Result, SyncError};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct PushOptions {
    pub software_name: String,
    pub mode: UploadMode,
    /// Files fingerprinted this run; the rest are carried forward untouched
    pub max_files: usize,
    /// Publish even when nothing changed
    pub force_version: bool,
    pub version_description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteVersion {
    pub manifest_id: Option<u64>,
    pub version_number: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub path: String,
    pub name: String,
    pub file_id: u64,
    pub version_id: u64,
    pub version_number: Option<u64>,
    pub hash: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedManifest {
    pub manifest_file: UploadedBlob,
    pub software_manifest: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushReport {
    pub project_id: u64,
    pub software_id: u64,
    pub software_name: String,
    pub base_dir: String,
    pub remote: RemoteVersion,
    pub published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<CreatedManifest>,
    pub scanned: usize,
    /// Present locally but beyond the per-run cap
    pub carried_count: usize,
    pub uploaded_count: usize,
    pub deleted_count: usize,
    pub skipped_count: usize,
    pub uploaded: Vec<UploadedFile>,
    pub skipped: Vec<SkippedFile>,
    pub deleted: Vec<String>,
}

/// Push `game/{software}` as the next manifest version.
pub async fn push(ctx: &ToolContext, options: &PushOptions) -> Result<PushReport> {
    let max_files = check_max_files(options.max_files)?;
    let software = ctx.require_software(&options.software_name).await?;

    let pointer = ctx.client.latest_manifest(ctx.project_id, software.id).await?;
    let previous = match &pointer {
        Some(p) => {
            let bytes = ctx
                .client
                .download_file(p.manifest_file_id, p.manifest_file_version_id)
                .await?;
            Some(Manifest::parse(&bytes)?)
        }
        None => None,
    };
    let remote = RemoteVersion {
        manifest_id: pointer.and_then(|p| p.manifest_id),
        version_number: pointer.and_then(|p| p.version_number),
    };

    let game_dir = pick_game_dir(&ctx.project_dir).await;
    let base_rel = format!("{}/{}", game_dir, options.software_name);
    let base_dir = resolve_within_base(&ctx.project_dir, &base_rel)?;

    let scan_options = ScanOptions {
        exclude_dirs: ctx.sync.exclude_dirs.clone(),
        skip_root_files: Vec::new(),
    }
    .skip_root_file(MANIFEST_FILE_NAME);
    let paths = scan(&base_dir, &scan_options)?;
    info!(
        "Scanned {} files under {} (fingerprinting up to {})",
        paths.len(),
        base_rel,
        max_files
    );

    let mut records = Vec::with_capacity(paths.len().min(max_files));
    for rel in paths.iter().take(max_files) {
        records.push(LocalFileRecord::load(&base_dir, rel).await?);
    }
    let snapshot = LocalSnapshot {
        present: paths.iter().cloned().collect(),
        records,
    };

    let plan = plan_push(previous.as_ref(), &snapshot, options.mode);
    let skipped: Vec<SkippedFile> = plan
        .unchanged
        .iter()
        .map(|e| SkippedFile {
            path: e.path.clone(),
            reason: "unchanged",
        })
        .collect();

    let mut report = PushReport {
        project_id: ctx.project_id,
        software_id: software.id,
        software_name: options.software_name.clone(),
        base_dir: base_rel.clone(),
        remote,
        published: false,
        created: None,
        scanned: paths.len(),
        carried_count: plan.carried.len(),
        uploaded_count: 0,
        deleted_count: 0,
        skipped_count: skipped.len(),
        uploaded: Vec::new(),
        skipped: truncated(&skipped),
        deleted: Vec::new(),
    };

    if !plan.should_publish(options.force_version) {
        info!(
            "No changes for {}; remote version {:?} stays current",
            options.software_name, report.remote.version_number
        );
        return Ok(report);
    }

    let by_path: HashMap<&str, &LocalFileRecord> =
        snapshot.records.iter().map(|r| (r.path.as_str(), r)).collect();
    let mut receipts = HashMap::with_capacity(plan.uploads.len());
    let mut uploaded = Vec::with_capacity(plan.uploads.len());

    for pending in &plan.uploads {
        let record = scanned_record(&by_path, &pending.path)?;
        let name = join_rel(&base_rel, &pending.path);
        let ticket = ctx
            .upload_named(&name, record.bytes.clone(), Some(&pending.hash))
            .await?;

        receipts.insert(
            pending.path.clone(),
            UploadReceipt {
                file_id: ticket.file_id,
                file_version_id: ticket.version_id,
            },
        );
        uploaded.push(UploadedFile {
            path: pending.path.clone(),
            name,
            file_id: ticket.file_id,
            version_id: ticket.version_id,
            version_number: ticket.version_number,
            hash: pending.hash.clone(),
            size_bytes: pending.size_bytes,
        });
    }

    let next = plan.next_manifest(&options.software_name, &receipts, &now_iso())?;
    let manifest_bytes = next.to_json_pretty()?;
    tokio::fs::create_dir_all(&base_dir).await?;
    tokio::fs::write(base_dir.join(MANIFEST_FILE_NAME), &manifest_bytes).await?;
    debug!("Wrote {} ({} files)", MANIFEST_FILE_NAME, next.total_files);

    let manifest_name = join_rel(&base_rel, MANIFEST_FILE_NAME);
    let manifest_ticket = ctx.upload_named(&manifest_name, manifest_bytes, None).await?;

    let software_manifest = ctx
        .client
        .create_software_manifest(&CreateManifestRequest {
            project_id: ctx.project_id,
            software_id: software.id,
            manifest_file_id: manifest_ticket.file_id,
            manifest_file_version_id: manifest_ticket.version_id,
            version_description: options.version_description.clone(),
        })
        .await?;

    info!(
        "Published {}: {} uploaded, {} unchanged, {} deleted",
        options.software_name,
        uploaded.len(),
        plan.unchanged.len(),
        plan.deleted.len()
    );

    report.published = true;
    report.created = Some(CreatedManifest {
        manifest_file: UploadedBlob::from_ticket(&manifest_name, &manifest_ticket),
        software_manifest,
    });
    report.uploaded_count = uploaded.len();
    report.deleted_count = plan.deleted.len();
    report.uploaded = truncated(&uploaded);
    report.deleted = truncated(&plan.deleted);
    Ok(report)
}

/// Scanned content for a planned upload.
fn scanned_record<'a>(
    by_path: &HashMap<&str, &'a LocalFileRecord>,
    path: &str,
) -> Result<&'a LocalFileRecord> {
    by_path
        .get(path)
        .copied()
        .ok_or_else(|| SyncError::NotFound(format!("no scanned content for planned upload {path}")))
}
