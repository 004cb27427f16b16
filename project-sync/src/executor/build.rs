//! Upload a build output directory and register it as a build version.

use super::{join_rel, ToolContext, UploadedBlob};
use crate::api::types::CreateBuildVersionRequest;
use crate::fs::layout::BUILD_DIR;
use crate::fs::metadata::{now_iso, LocalFileRecord};
use crate::fs::sandbox::{normalize_rel_path, resolve_within_base};
use crate::fs::walker::{scan, ScanOptions};
use crate::sync::manifest::derive_folders;
use crate::utils::{Result, SyncError};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

/// Build record written next to the build output.
pub const BUILD_RECORD_FILE_NAME: &str = "build_version.json";

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub software_name: String,
    /// Build output directory relative to the project (default `build`)
    pub target_dir: Option<String>,
    pub version_description: Option<String>,
    /// Entry file relative to the build output
    pub entry: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildFile {
    pub path: String,
    pub file_id: u64,
    pub version_id: u64,
    pub version_number: Option<u64>,
    pub hash: String,
    pub size: u64,
    pub last_modified: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub npm_return_code: i32,
    pub build_duration_ms: u64,
    pub uploaded: bool,
}

/// Contents of `build_version.json`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRecord {
    pub software_name: String,
    pub version: Option<String>,
    pub version_code: i64,
    pub version_description: String,
    pub build_command: String,
    pub build_time: String,
    pub entry: String,
    pub files: Vec<BuildFile>,
    pub folders: Vec<String>,
    pub total_files: usize,
    pub total_size: u64,
    pub build_info: BuildInfo,
}

impl BuildRecord {
    pub fn new(options: &BuildOptions, build_time: String, files: Vec<BuildFile>) -> Self {
        let folders = derive_folders(files.iter().map(|f| f.path.as_str()));
        Self {
            software_name: options.software_name.clone(),
            version: None,
            version_code: Utc::now().timestamp(),
            version_description: options.version_description.clone().unwrap_or_default(),
            build_command: String::new(),
            build_time,
            entry: options.entry.clone(),
            total_files: files.len(),
            total_size: files.iter().map(|f| f.size).sum(),
            files,
            folders,
            build_info: BuildInfo {
                npm_return_code: 0,
                build_duration_ms: 0,
                uploaded: true,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedBuildVersion {
    pub id: Option<u64>,
    pub version_number: Option<u64>,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub project_id: u64,
    pub software_id: u64,
    pub software_name: String,
    pub software_manifest_id: u64,
    pub target_dir: String,
    pub uploaded_files: usize,
    pub total_size: u64,
    pub build_version_json_file: UploadedBlob,
    pub build_version: CreatedBuildVersion,
}

/// Upload every file under the target directory, then register the build.
///
/// The software and its latest manifest are resolved first, so a missing
/// component fails before anything is uploaded.
pub async fn upload_build(ctx: &ToolContext, options: &BuildOptions) -> Result<BuildReport> {
    let target_rel = normalize_rel_path(options.target_dir.as_deref().unwrap_or(BUILD_DIR))
        .trim_end_matches('/')
        .to_string();
    let target_rel = if target_rel.is_empty() { BUILD_DIR.to_string() } else { target_rel };
    let target_dir = resolve_within_base(&ctx.project_dir, &target_rel)?;

    let software = ctx.require_software(&options.software_name).await?;
    let records = ctx.client.manifest_records(ctx.project_id, &[software.id]).await?;
    let software_manifest_id = records
        .iter()
        .filter(|r| r.software_id == software.id && r.has_record)
        .find_map(|r| r.manifest_id.filter(|id| *id > 0))
        .ok_or_else(|| {
            SyncError::NotFound(format!("software manifest not found for softwareId: {}", software.id))
        })?;

    if !tokio::fs::try_exists(&target_dir).await.unwrap_or(false) {
        return Err(SyncError::NotFound(format!("build directory not found: {target_rel}")));
    }

    let build_time = now_iso();
    let paths = scan(
        &target_dir,
        &ScanOptions::unfiltered().skip_root_file(BUILD_RECORD_FILE_NAME),
    )?;
    info!("Uploading {} build files from {}", paths.len(), target_rel);

    let mut files = Vec::with_capacity(paths.len());
    for rel in &paths {
        let record = LocalFileRecord::load(&target_dir, rel).await?;
        let name = join_rel(&target_rel, rel);
        let ticket = ctx.upload_named(&name, record.bytes, Some(&record.hash)).await?;
        files.push(BuildFile {
            path: record.path,
            file_id: ticket.file_id,
            version_id: ticket.version_id,
            version_number: ticket.version_number,
            hash: record.hash,
            size: record.size_bytes,
            last_modified: record.last_modified,
        });
    }

    let build_record = BuildRecord::new(options, build_time, files);
    let record_bytes = serde_json::to_vec_pretty(&build_record)?;
    tokio::fs::write(target_dir.join(BUILD_RECORD_FILE_NAME), &record_bytes).await?;

    let record_name = join_rel(&target_rel, BUILD_RECORD_FILE_NAME);
    let record_ticket = ctx.upload_named(&record_name, record_bytes, None).await?;

    let description = options.version_description.clone().unwrap_or_default();
    let created = ctx
        .client
        .create_build_version(&CreateBuildVersionRequest {
            project_id: ctx.project_id,
            software_manifest_id,
            description: description.clone(),
            build_version_file_id: record_ticket.file_id,
            build_version_file_version_id: record_ticket.version_id,
        })
        .await?;

    info!(
        "Registered build version {:?} for {} ({} files, {} bytes)",
        created.version_number, options.software_name, build_record.total_files, build_record.total_size
    );

    Ok(BuildReport {
        project_id: ctx.project_id,
        software_id: software.id,
        software_name: options.software_name.clone(),
        software_manifest_id,
        target_dir: target_rel,
        uploaded_files: build_record.total_files,
        total_size: build_record.total_size,
        build_version_json_file: UploadedBlob::from_ticket(&record_name, &record_ticket),
        build_version: CreatedBuildVersion {
            id: created.build_version_id,
            version_number: created.version_number,
            description,
        },
    })
}
