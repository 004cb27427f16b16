//! List the software components of a project.

use super::ToolContext;
use crate::api::types::Software;
use crate::config::check_page_size;
use crate::utils::Result;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftwareSummary {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub template_id: u64,
    pub technology_stack: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Software> for SoftwareSummary {
    fn from(s: Software) -> Self {
        Self {
            id: s.id,
            name: s.name,
            description: s.description.unwrap_or_default(),
            template_id: s.template_id.unwrap_or_default(),
            technology_stack: s.technology_stack.unwrap_or_default(),
            status: s.status.unwrap_or_default(),
            created_at: s.created_at.unwrap_or_default(),
            updated_at: s.updated_at.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftwareListReport {
    pub project_id: u64,
    pub total: usize,
    pub softwares: Vec<SoftwareSummary>,
}

pub async fn list_softwares(ctx: &ToolContext, page_size: u64) -> Result<SoftwareListReport> {
    let page_size = check_page_size(page_size)?;
    let softwares: Vec<SoftwareSummary> = ctx
        .client
        .list_all_softwares(ctx.project_id, page_size)
        .await?
        .into_iter()
        .map(SoftwareSummary::from)
        .collect();

    Ok(SoftwareListReport {
        project_id: ctx.project_id,
        total: softwares.len(),
        softwares,
    })
}
