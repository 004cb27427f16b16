//! Template archive extraction.
//!
//! Extraction is delegated to whichever external tool is installed. Each
//! archive kind has an ordered list of backends; the first one that exits
//! successfully wins.

use crate::utils::{Result, SyncError};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Longest error message kept from a failed backend.
const MAX_ERROR_LEN: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    Gzip,
    Unknown,
}

impl ArchiveKind {
    /// Detect the kind from magic bytes.
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.len() >= 4 && bytes[0] == 0x50 && bytes[1] == 0x4b {
            ArchiveKind::Zip
        } else if bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b {
            ArchiveKind::Gzip
        } else {
            ArchiveKind::Unknown
        }
    }

    /// File extension used when saving the archive.
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveKind::Zip => "zip",
            ArchiveKind::Gzip => "tgz",
            ArchiveKind::Unknown => "archive",
        }
    }
}

/// One external extraction command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extractor {
    pub program: String,
    pub args: Vec<String>,
}

impl Extractor {
    fn new(program: &str, args: &[&str], archive: &Path, dest: &Path) -> Self {
        let archive = archive.to_string_lossy().into_owned();
        let dest = dest.to_string_lossy().into_owned();
        let args = args
            .iter()
            .map(|a| match *a {
                "{archive}" => archive.clone(),
                "{dest}" => dest.clone(),
                other => other.to_string(),
            })
            .collect();
        Self {
            program: program.to_string(),
            args,
        }
    }

    async fn run(&self, cwd: &Path) -> std::result::Result<(), String> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .current_dir(cwd)
            .output()
            .await
            .map_err(|e| format!("{} failed to start: {}", self.program, e))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let detail = if stderr.trim().is_empty() { stdout } else { stderr };
        let code = output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        Err(format!("{} failed (code={}): {}", self.program, code, detail.trim()))
    }
}

/// Ordered backends for `kind`.
pub fn extractors_for(kind: ArchiveKind, archive: &Path, dest: &Path) -> Vec<Extractor> {
    let plan: &[(&str, &[&str])] = match kind {
        ArchiveKind::Zip => &[
            ("unzip", &["-q", "{archive}", "-d", "{dest}"]),
            ("bsdtar", &["-xf", "{archive}", "-C", "{dest}"]),
            ("tar", &["-xf", "{archive}", "-C", "{dest}"]),
        ],
        ArchiveKind::Gzip => &[
            ("tar", &["-xzf", "{archive}", "-C", "{dest}"]),
            ("bsdtar", &["-xzf", "{archive}", "-C", "{dest}"]),
        ],
        ArchiveKind::Unknown => &[
            ("tar", &["-xf", "{archive}", "-C", "{dest}"]),
            ("bsdtar", &["-xf", "{archive}", "-C", "{dest}"]),
            ("unzip", &["-q", "{archive}", "-d", "{dest}"]),
        ],
    };
    plan.iter()
        .map(|(program, args)| Extractor::new(program, args, archive, dest))
        .collect()
}

/// Try each extractor in order; the first success wins.
pub async fn run_extractors(extractors: &[Extractor], dest: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dest).await?;

    let mut last_error = String::new();
    for extractor in extractors {
        debug!("Extracting with {} {:?}", extractor.program, extractor.args);
        match extractor.run(dest).await {
            Ok(()) => {
                info!("Extracted archive with {}", extractor.program);
                return Ok(());
            }
            Err(e) => last_error = truncate(&e, MAX_ERROR_LEN),
        }
    }

    if last_error.is_empty() {
        last_error = "extract failed".to_string();
    }
    Err(SyncError::ArchiveExtraction(last_error))
}

/// Extract `archive` into `dest` using the backends for `kind`.
pub async fn extract(archive: &Path, kind: ArchiveKind, dest: &Path) -> Result<()> {
    run_extractors(&extractors_for(kind, archive, dest), dest).await
}

/// If the extracted tree is a single directory (ignoring `__MACOSX`), use
/// that directory as the content root.
pub async fn pick_flatten_root(extracted: &Path) -> std::io::Result<PathBuf> {
    let mut entries = tokio::fs::read_dir(extracted).await?;
    let mut meaningful = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_name() != "__MACOSX" {
            meaningful.push(entry);
        }
    }

    if meaningful.len() == 1 && meaningful[0].file_type().await?.is_dir() {
        return Ok(meaningful[0].path());
    }
    Ok(extracted.to_path_buf())
}

/// File-name-safe stem derived from a template name.
pub fn safe_file_stem(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_run = false;
    for c in input.trim().chars() {
        let keep = c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-';
        if keep {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    let trimmed = out.trim_matches('_');
    let stem = if trimmed.is_empty() { "template" } else { trimmed };
    stem.chars().take(80).collect()
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
