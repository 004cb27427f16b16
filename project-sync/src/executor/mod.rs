//! Sync orchestrators - one per command.
//!
//! Each executor drives the pure planning code in [`crate::sync`] against
//! the platform client and the local project directory, then returns a
//! serializable report that `main` prints as JSON.

pub mod build;
pub mod pull;
pub mod push;
pub mod softwares;
pub mod template;

use crate::api::types::{PreUploadRequest, PreUploadTicket, Software};
use crate::api::PlatformClient;
use crate::config::SyncConfig;
use crate::sync::file_kind::classify;
use crate::sync::fingerprint::fingerprint;
use crate::utils::{Result, SyncError};
use serde::Serialize;
use std::path::PathBuf;

/// Report lists are cut to this many entries; counts stay exact.
pub const REPORT_LIST_LIMIT: usize = 200;

/// Everything an executor needs for one invocation.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub client: PlatformClient,
    pub project_id: u64,
    pub project_dir: PathBuf,
    pub sync: SyncConfig,
}

impl ToolContext {
    /// Look up a software component by exact name.
    pub async fn require_software(&self, name: &str) -> Result<Software> {
        self.client
            .find_software(self.project_id, name, self.sync.pull_page_size)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("software not found: {name}")))
    }

    /// Preupload and PUT one blob stored under `name` in the project.
    pub async fn upload_named(&self, name: &str, content: Vec<u8>, hash: Option<&str>) -> Result<PreUploadTicket> {
        let (category, format) = classify(name);
        let hash = match hash {
            Some(h) => h.to_string(),
            None => fingerprint(&content),
        };
        let request = PreUploadRequest {
            project_id: self.project_id,
            name: name.to_string(),
            file_category: category.as_str().to_string(),
            file_format: format,
            size_bytes: content.len() as u64,
            hash,
        };
        self.client.upload_blob(&request, content).await
    }
}

/// Name/ids of a blob the executor uploaded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedBlob {
    pub name: String,
    pub file_id: u64,
    pub version_id: u64,
}

impl UploadedBlob {
    fn from_ticket(name: &str, ticket: &PreUploadTicket) -> Self {
        Self {
            name: name.to_string(),
            file_id: ticket.file_id,
            version_id: ticket.version_id,
        }
    }
}

/// First [`REPORT_LIST_LIMIT`] items.
fn truncated<T: Clone>(items: &[T]) -> Vec<T> {
    items.iter().take(REPORT_LIST_LIMIT).cloned().collect()
}

/// Join a project-relative directory and a path inside it.
fn join_rel(dir: &str, path: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        path.to_string()
    } else {
        format!("{dir}/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated() {
        let items: Vec<usize> = (0..450).collect();
        let cut = truncated(&items);
        assert_eq!(cut.len(), REPORT_LIST_LIMIT);
        assert_eq!(cut.last(), Some(&199));
        assert_eq!(truncated(&items[..3]), vec![0, 1, 2]);
    }

    #[test]
    fn test_join_rel() {
        assert_eq!(join_rel("game/client", "src/a.ts"), "game/client/src/a.ts");
        assert_eq!(join_rel("build/", "index.html"), "build/index.html");
        assert_eq!(join_rel("", "x"), "x");
    }
}
