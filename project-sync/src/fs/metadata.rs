//! Fingerprinted snapshots of local files.

use crate::sync::fingerprint::Fingerprint;
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::Path;

/// One local file read and fingerprinted for a single invocation.
#[derive(Debug, Clone)]
pub struct LocalFileRecord {
    /// Relative POSIX path under the scanned root
    pub path: String,

    pub bytes: Vec<u8>,

    pub hash: String,

    pub size_bytes: u64,

    /// Modification time, ISO-8601 UTC with milliseconds
    pub last_modified: String,
}

impl LocalFileRecord {
    /// Build a record from bytes already in memory.
    pub fn from_bytes(path: impl Into<String>, bytes: Vec<u8>, last_modified: impl Into<String>) -> Self {
        let fingerprint = Fingerprint::of(&bytes);
        Self {
            path: path.into(),
            bytes,
            hash: fingerprint.hash,
            size_bytes: fingerprint.size_bytes,
            last_modified: last_modified.into(),
        }
    }

    /// Read `root/rel` from disk and fingerprint it.
    pub async fn load(root: &Path, rel: &str) -> std::io::Result<Self> {
        let abs = root.join(rel);
        let metadata = tokio::fs::metadata(&abs).await?;
        let bytes = tokio::fs::read(&abs).await?;
        let last_modified = metadata
            .modified()
            .map(iso_timestamp)
            .unwrap_or_default();

        Ok(Self::from_bytes(rel, bytes, last_modified))
    }
}

/// Format a system time the way manifests record it.
pub fn iso_timestamp(time: std::time::SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time in manifest timestamp format.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
