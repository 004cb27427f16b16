//! Bootstrap a software component from a named template archive.

use super::ToolContext;
use crate::api::types::CreateSoftwareRequest;
use crate::archive::{extract, pick_flatten_root, safe_file_stem, ArchiveKind};
use crate::fs::layout::{copy_dir, dir_is_empty, ensure_workspace_layout, GAME_DIR};
use crate::fs::sandbox::resolve_within_base;
use crate::utils::{Result, SyncError};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct TemplateOptions {
    pub template_name: String,
    pub software_name: String,
    pub description: Option<String>,
    pub technology_stack: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateReport {
    pub project_id: u64,
    /// Template record as returned by the platform
    pub template: serde_json::Value,
    pub template_archive_path: PathBuf,
    pub extracted_to: String,
    pub copied_files: usize,
    pub created: serde_json::Value,
    pub next_step: String,
}

/// Download the template archive, unpack it into `game/{software}` and
/// create the software component unless one with that name exists.
pub async fn create_from_template(ctx: &ToolContext, options: &TemplateOptions) -> Result<TemplateReport> {
    let template_name = options.template_name.trim();
    if template_name.is_empty() {
        return Err(SyncError::Config("templateName is required".to_string()));
    }

    ensure_workspace_layout(&ctx.project_dir).await?;

    let (template, template_raw) = ctx.client.template_by_name(template_name).await?;
    let ticket = ctx.client.template_download_ticket(template.archive_file_id).await?;

    let target_rel = format!("{}/{}", GAME_DIR, options.software_name);
    let target_dir = resolve_within_base(&ctx.project_dir, &target_rel)?;
    tokio::fs::create_dir_all(&target_dir).await?;
    if !dir_is_empty(&target_dir).await {
        return Err(SyncError::TargetNotEmpty(target_rel));
    }

    let templates_dir = ctx.project_dir.join("artifacts").join("templates");
    tokio::fs::create_dir_all(&templates_dir).await?;

    let archive_bytes = ctx.client.fetch_signed(&ticket.download_url).await?;
    let kind = ArchiveKind::detect(&archive_bytes);
    let archive_path = templates_dir.join(format!(
        "{}_{}.{}",
        safe_file_stem(template_name),
        template.archive_file_id,
        kind.extension()
    ));
    tokio::fs::write(&archive_path, &archive_bytes).await?;
    info!("Saved template archive to {}", archive_path.display());

    let tmp_root = ctx.project_dir.join("artifacts").join("tmp");
    tokio::fs::create_dir_all(&tmp_root).await?;
    // Removed on drop, whether extraction succeeds or not
    let scratch = tempfile::Builder::new()
        .prefix(&format!("template_extract_{}_", ctx.project_id))
        .tempdir_in(&tmp_root)?;

    let extract_dir = scratch.path().join("extracted");
    extract(&archive_path, kind, &extract_dir).await?;
    let flatten_root = pick_flatten_root(&extract_dir).await?;
    let copied_files = copy_dir(&flatten_root, &target_dir).await?;
    scratch.close()?;
    info!("Copied {} template files into {}", copied_files, target_rel);

    let existing = ctx
        .client
        .find_software(ctx.project_id, &options.software_name, ctx.sync.pull_page_size)
        .await?;
    let created = match existing {
        Some(existing) => {
            info!("Software {} already exists (id {})", options.software_name, existing.id);
            json!({ "skipped": true, "softwareId": existing.id })
        }
        None => {
            ctx.client
                .create_software(
                    ctx.project_id,
                    &CreateSoftwareRequest {
                        name: options.software_name.clone(),
                        description: options.description.clone(),
                        technology_stack: options.technology_stack.clone(),
                        template_id: template.id,
                    },
                )
                .await?
        }
    };

    Ok(TemplateReport {
        project_id: ctx.project_id,
        template: template_raw,
        template_archive_path: archive_path,
        extracted_to: target_rel,
        copied_files,
        created,
        next_step: format!(
            "run `project-sync push --project-id {} --software-name {}` to upload the files",
            ctx.project_id, options.software_name
        ),
    })
}
