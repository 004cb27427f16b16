//! Pull: materialize the latest manifest of every software on disk.

use super::ToolContext;
use crate::api::types::{ManifestPointer, Software};
use crate::config::check_page_size;
use crate::fs::layout::{ensure_workspace_layout, pick_game_dir};
use crate::sync::manifest::Manifest;
use crate::sync::pull_plan::{plan_pull, PlannedFile, PullPlan};
use crate::utils::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PullMode {
    /// Always write
    #[default]
    Overwrite,
    /// Write only files missing locally
    SkipExisting,
    /// Report the plan without touching disk
    DryRun,
}

#[derive(Debug, Clone)]
pub struct PullOptions {
    pub mode: PullMode,
    pub page_size: u64,
}

/// Per-software entry of a dry run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedSoftware {
    pub software_id: u64,
    pub software_name: String,
    pub manifest_id: Option<u64>,
    pub version_number: Option<u64>,
    pub base_dir: String,
    pub total_files: usize,
    pub files: Vec<PlannedFile>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunReport {
    pub project_id: u64,
    pub softwares: usize,
    pub manifests: usize,
    pub total_planned_files: usize,
    pub planned: Vec<PlannedSoftware>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullSummary {
    pub project_id: u64,
    pub softwares: usize,
    pub manifests: usize,
    pub total_planned_files: usize,
    pub written: usize,
    pub skipped: usize,
    pub bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PullReport {
    DryRun(DryRunReport),
    Applied(PullSummary),
}

struct Prepared {
    pointer: ManifestPointer,
    software_name: String,
    raw: Vec<u8>,
    plan: PullPlan,
}

/// Pull every software of the project.
///
/// All manifests are fetched and planned before any file is downloaded, so
/// a bad manifest or escaping path aborts the run without partial writes.
pub async fn pull(ctx: &ToolContext, options: &PullOptions) -> Result<PullReport> {
    let page_size = check_page_size(options.page_size)?;
    let dry_run = options.mode == PullMode::DryRun;

    // Pick before scaffolding, which would create `game/`
    let game_dir = pick_game_dir(&ctx.project_dir).await;
    if !dry_run {
        ensure_workspace_layout(&ctx.project_dir).await?;
    }

    let softwares = ctx.client.list_all_softwares(ctx.project_id, page_size).await?;
    if softwares.is_empty() {
        return Err(SyncError::NotFound(format!(
            "project {} has no softwares",
            ctx.project_id
        )));
    }

    let pointers = latest_pointers(ctx, &softwares).await?;
    if pointers.is_empty() {
        return Err(SyncError::NotFound(format!(
            "project {} has no usable software manifest",
            ctx.project_id
        )));
    }

    let names: HashMap<u64, &str> = softwares.iter().map(|s| (s.id, s.name.as_str())).collect();
    let mut prepared = Vec::with_capacity(pointers.len());
    for pointer in pointers {
        let software_name = names
            .get(&pointer.software_id)
            .map(|n| n.to_string())
            .unwrap_or_else(|| format!("software_{}", pointer.software_id));

        let raw = ctx
            .client
            .download_file(pointer.manifest_file_id, pointer.manifest_file_version_id)
            .await?
            .to_vec();
        let manifest = Manifest::parse(&raw)?;
        let plan = plan_pull(&ctx.project_dir, game_dir, &software_name, &manifest)?;
        debug!("Planned {} files for {}", plan.total_files(), software_name);

        prepared.push(Prepared {
            pointer,
            software_name,
            raw,
            plan,
        });
    }

    let total_planned_files = prepared.iter().map(|p| p.plan.total_files()).sum();

    if dry_run {
        let planned = prepared
            .into_iter()
            .map(|p| PlannedSoftware {
                software_id: p.pointer.software_id,
                software_name: p.software_name,
                manifest_id: p.pointer.manifest_id,
                version_number: p.pointer.version_number,
                base_dir: p.plan.base_rel,
                total_files: p.plan.files.len(),
                files: p.plan.files,
            })
            .collect::<Vec<_>>();
        return Ok(PullReport::DryRun(DryRunReport {
            project_id: ctx.project_id,
            softwares: softwares.len(),
            manifests: planned.len(),
            total_planned_files,
            planned,
        }));
    }

    for p in &prepared {
        tokio::fs::create_dir_all(&p.plan.base_dir).await?;
        for folder in &p.plan.folders {
            tokio::fs::create_dir_all(folder).await?;
        }
        let exists = tokio::fs::try_exists(&p.plan.manifest_path).await.unwrap_or(false);
        if options.mode != PullMode::SkipExisting || !exists {
            tokio::fs::write(&p.plan.manifest_path, &p.raw).await?;
        }
    }

    let mut written = 0usize;
    let mut skipped = 0usize;
    let mut bytes = 0u64;

    for p in &prepared {
        for file in &p.plan.files {
            if let Some(parent) = file.target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            if options.mode == PullMode::SkipExisting
                && tokio::fs::try_exists(&file.target).await.unwrap_or(false)
            {
                skipped += 1;
                continue;
            }

            let content = ctx.client.download_file(file.file_id, file.file_version_id).await?;
            tokio::fs::write(&file.target, &content).await?;
            written += 1;
            bytes += content.len() as u64;
        }
        info!("Pulled {} into {}", p.software_name, p.plan.base_rel);
    }

    info!(
        "Pull complete: {} written, {} skipped, {} bytes",
        written, skipped, bytes
    );

    Ok(PullReport::Applied(PullSummary {
        project_id: ctx.project_id,
        softwares: softwares.len(),
        manifests: prepared.len(),
        total_planned_files,
        written,
        skipped,
        bytes,
    }))
}

/// Latest manifest pointer per software, fetched in id chunks.
async fn latest_pointers(ctx: &ToolContext, softwares: &[Software]) -> Result<Vec<ManifestPointer>> {
    let ids: Vec<u64> = softwares.iter().map(|s| s.id).collect();
    let chunk_size = ctx.sync.manifest_chunk_size.max(1);

    let mut pointers = Vec::new();
    for chunk in ids.chunks(chunk_size) {
        let records = ctx.client.manifest_records(ctx.project_id, chunk).await?;
        pointers.extend(records.iter().filter_map(|r| r.pointer()));
    }
    Ok(pointers)
}
