//! Configuration for the sync tools.
//!
//! Loads an optional TOML file; command-line flags override it and the
//! environment fills in what neither provides.

use crate::api::client::{normalize_base_url, TransportOptions};
use crate::fs::walker::default_exclude_dirs;
use crate::utils::{Result, SyncError};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variables consulted for the base URL, in order.
pub const BASE_URL_ENV: &[&str] = &["SPARKX_API_BASE_URL", "API_BASE_URL"];

/// Environment variable consulted for the bearer token.
pub const TOKEN_ENV: &str = "SPARKX_API_TOKEN";

/// Upper bound for `--max-files`.
pub const MAX_PUSH_FILES_LIMIT: usize = 2000;

/// Upper bound for `--page-size`.
pub const PAGE_SIZE_LIMIT: u64 = 500;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Platform API base URL
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// Bearer token
    #[serde(default)]
    pub token: Option<String>,

    /// Accept invalid TLS certificates (unset = decide from the URL)
    #[serde(default)]
    pub insecure_tls: Option<bool>,

    /// Request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Software name used when a command does not name one
    #[serde(default = "default_software_name")]
    pub software_name: String,

    /// Directory names never pushed
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,

    /// Files fingerprinted per push
    #[serde(default = "default_max_push_files")]
    pub max_push_files: usize,

    /// Page size when listing softwares
    #[serde(default = "default_pull_page_size")]
    pub pull_page_size: u64,

    /// Software ids per manifest-record request
    #[serde(default = "default_manifest_chunk_size")]
    pub manifest_chunk_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values
fn default_software_name() -> String {
    "game_client".to_string()
}

fn default_max_push_files() -> usize {
    500
}

fn default_pull_page_size() -> u64 {
    200
}

fn default_manifest_chunk_size() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            software_name: default_software_name(),
            exclude_dirs: default_exclude_dirs(),
            max_push_files: default_max_push_files(),
            pull_page_size: default_pull_page_size(),
            manifest_chunk_size: default_manifest_chunk_size(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Connection values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConnectionArgs {
    pub api_base_url: Option<String>,
    pub token: Option<String>,
    pub project_id: Option<u64>,
    pub insecure_tls: Option<bool>,
}

/// Fully resolved connection settings for one invocation.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub api_base_url: String,
    pub token: String,
    pub project_id: u64,
    pub transport: TransportOptions,
}

impl ConnectionSettings {
    /// Resolve flags > config file > environment. Fails before any I/O when
    /// the base URL, token or project id cannot be determined.
    pub fn resolve(args: &ConnectionArgs, config: &PlatformConfig, project_dir: &Path) -> Result<Self> {
        Self::resolve_with_env(args, config, project_dir, |key| std::env::var(key).ok())
    }

    pub fn resolve_with_env<F>(
        args: &ConnectionArgs,
        config: &PlatformConfig,
        project_dir: &Path,
        env: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = args
            .api_base_url
            .clone()
            .or_else(|| config.api_base_url.clone())
            .or_else(|| BASE_URL_ENV.iter().find_map(|key| env(*key)))
            .map(|raw| normalize_base_url(&raw))
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                SyncError::Config(
                    "apiBaseUrl is required (or set SPARKX_API_BASE_URL / API_BASE_URL)".to_string(),
                )
            })?;

        let token = args
            .token
            .clone()
            .or_else(|| config.token.clone())
            .or_else(|| env(TOKEN_ENV))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SyncError::Config(format!("token is required (or set {TOKEN_ENV})")))?;

        let project_id = args
            .project_id
            .filter(|id| *id > 0)
            .or_else(|| infer_project_id(project_dir))
            .ok_or_else(|| {
                SyncError::Config(
                    "projectId is required (or ensure directory ends with /{projectId})".to_string(),
                )
            })?;

        let insecure_tls = args
            .insecure_tls
            .or(config.insecure_tls)
            .unwrap_or_else(|| default_insecure_tls(&api_base_url));

        Ok(Self {
            api_base_url,
            token,
            project_id,
            transport: TransportOptions {
                insecure_tls,
                timeout: config.timeout_secs.map(Duration::from_secs),
            },
        })
    }
}

/// Project id from the last segment of the project directory, when numeric
/// and positive. The path needs at least two segments.
pub fn infer_project_id(directory: &Path) -> Option<u64> {
    let normalized = directory.to_string_lossy().replace('\\', "/");
    let parts: Vec<&str> = normalized.split('/').filter(|p| !p.is_empty()).collect();
    if parts.len() < 2 {
        return None;
    }
    parts
        .last()
        .and_then(|last| last.parse::<u64>().ok())
        .filter(|id| *id > 0)
}

/// Self-signed certificates are accepted by default only for HTTPS on
/// local development hosts.
pub fn default_insecure_tls(api_base_url: &str) -> bool {
    let Ok(url) = Url::parse(api_base_url) else {
        return false;
    };
    if url.scheme() != "https" {
        return false;
    }
    matches!(
        url.host_str(),
        Some("localhost") | Some("127.0.0.1") | Some("host.docker.internal")
    )
}

/// Validate a per-run file cap.
pub fn check_max_files(max_files: usize) -> Result<usize> {
    if max_files == 0 || max_files > MAX_PUSH_FILES_LIMIT {
        return Err(SyncError::Config(format!(
            "maxFiles must be between 1 and {MAX_PUSH_FILES_LIMIT}, got {max_files}"
        )));
    }
    Ok(max_files)
}

/// Validate a listing page size.
pub fn check_page_size(page_size: u64) -> Result<u64> {
    if page_size == 0 || page_size > PAGE_SIZE_LIMIT {
        return Err(SyncError::Config(format!(
            "pageSize must be between 1 and {PAGE_SIZE_LIMIT}, got {page_size}"
        )));
    }
    Ok(page_size)
}

/// Resolve the project directory: the flag, else the current directory.
pub fn project_dir_or_cwd(dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(dir) => Ok(dir),
        None => Ok(std::env::current_dir()?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_infer_project_id() {
        assert_eq!(infer_project_id(Path::new("/workspace/projects/42")), Some(42));
        assert_eq!(infer_project_id(Path::new("/workspace/projects/42/")), Some(42));
        assert_eq!(infer_project_id(Path::new("C:\\work\\7")), Some(7));
        assert_eq!(infer_project_id(Path::new("/42")), None);
        assert_eq!(infer_project_id(Path::new("/workspace/0")), None);
        assert_eq!(infer_project_id(Path::new("/workspace/game")), None);
    }

    #[test]
    fn test_default_insecure_tls() {
        assert!(default_insecure_tls("https://localhost:8890"));
        assert!(default_insecure_tls("https://127.0.0.1"));
        assert!(default_insecure_tls("https://host.docker.internal:8890"));
        assert!(!default_insecure_tls("http://localhost:6001"));
        assert!(!default_insecure_tls("https://api.example.com"));
        assert!(!default_insecure_tls("garbage"));
    }

    #[test]
    fn test_resolve_precedence() {
        let args = ConnectionArgs {
            api_base_url: Some("https://flag.example.com/".to_string()),
            token: None,
            project_id: None,
            insecure_tls: None,
        };
        let config = PlatformConfig {
            api_base_url: Some("https://file.example.com".to_string()),
            token: Some("file-token".to_string()),
            insecure_tls: Some(true),
            timeout_secs: Some(30),
        };
        let env = |key: &str| match key {
            "SPARKX_API_TOKEN" => Some("env-token".to_string()),
            _ => None,
        };

        let settings =
            ConnectionSettings::resolve_with_env(&args, &config, Path::new("/work/projects/9"), env).unwrap();

        assert_eq!(settings.api_base_url, "https://flag.example.com");
        assert_eq!(settings.token, "file-token");
        assert_eq!(settings.project_id, 9);
        assert!(settings.transport.insecure_tls);
        assert_eq!(settings.transport.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_resolve_from_env() {
        let env = |key: &str| match key {
            "API_BASE_URL" => Some("https://localhost:8890".to_string()),
            "SPARKX_API_TOKEN" => Some("env-token".to_string()),
            _ => None,
        };
        let args = ConnectionArgs {
            project_id: Some(3),
            ..ConnectionArgs::default()
        };

        let settings =
            ConnectionSettings::resolve_with_env(&args, &PlatformConfig::default(), Path::new("/x"), env).unwrap();

        assert_eq!(settings.api_base_url, "https://localhost:8890");
        assert_eq!(settings.token, "env-token");
        assert_eq!(settings.project_id, 3);
        assert!(settings.transport.insecure_tls);
    }

    #[test]
    fn test_resolve_failures_are_config_errors() {
        let dir = Path::new("/work/projects/9");
        let full = ConnectionArgs {
            api_base_url: Some("http://localhost:6001".to_string()),
            token: Some("t".to_string()),
            project_id: None,
            insecure_tls: None,
        };

        let no_url = ConnectionArgs { api_base_url: None, ..full.clone() };
        let no_token = ConnectionArgs { token: Some("  ".to_string()), ..full.clone() };
        let no_project = full.clone();

        for (args, project_dir) in [(no_url, dir), (no_token, dir), (no_project, Path::new("/work/game"))] {
            let err = ConnectionSettings::resolve_with_env(&args, &PlatformConfig::default(), project_dir, no_env)
                .unwrap_err();
            assert!(matches!(err, SyncError::Config(_)));
        }
    }

    #[test]
    fn test_limits() {
        assert!(check_max_files(500).is_ok());
        assert!(check_max_files(0).is_err());
        assert!(check_max_files(2001).is_err());
        assert!(check_page_size(200).is_ok());
        assert!(check_page_size(501).is_err());
    }

    #[test]
    fn test_config_from_toml() {
        let config: Config = toml::from_str(
            r#"
            [platform]
            api_base_url = "http://localhost:6001"

            [sync]
            software_name = "server"
            max_push_files = 50
            "#,
        )
        .unwrap();

        assert_eq!(config.platform.api_base_url.as_deref(), Some("http://localhost:6001"));
        assert_eq!(config.sync.software_name, "server");
        assert_eq!(config.sync.max_push_files, 50);
        assert_eq!(config.sync.pull_page_size, 200);
        assert_eq!(config.sync.exclude_dirs, default_exclude_dirs());
        assert_eq!(config.log.level, "info");
    }
}
