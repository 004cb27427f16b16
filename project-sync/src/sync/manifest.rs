//! Software manifest model.
//!
//! A manifest is the immutable file list of one software component at one
//! published version. It is stored on the platform as a JSON blob and
//! mirrored locally as `game/{software}/manifest.json`.
//!
//! Reading is tolerant of the legacy snake_case field names and of ids sent
//! as numeric strings; writing is always canonical camelCase.

use crate::fs::sandbox::normalize_rel_path;
use crate::utils::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// File name of the manifest record inside a software directory.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// One file of a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFileEntry {
    pub path: String,
    pub file_id: u64,
    pub file_version_id: u64,
    pub hash: Option<String>,
    pub size_bytes: Option<u64>,
    pub last_modified: Option<String>,
}

impl ManifestFileEntry {
    /// Hash and size, when both are known and the hash is non-empty.
    pub fn comparable(&self) -> Option<(&str, u64)> {
        match (self.hash.as_deref(), self.size_bytes) {
            (Some(hash), Some(size)) if !hash.is_empty() => Some((hash, size)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub software_name: String,
    pub files: Vec<ManifestFileEntry>,
    pub folders: Vec<String>,
    pub total_files: usize,
    pub updated_at: String,
}

impl Manifest {
    /// Build a manifest from entries: dedupe by path (later wins), sort by
    /// path, and derive the folder list.
    pub fn from_entries(
        software_name: impl Into<String>,
        entries: impl IntoIterator<Item = ManifestFileEntry>,
        updated_at: impl Into<String>,
    ) -> Self {
        let by_path: BTreeMap<String, ManifestFileEntry> = entries
            .into_iter()
            .map(|e| (e.path.clone(), e))
            .collect();
        let files: Vec<ManifestFileEntry> = by_path.into_values().collect();
        let folders = derive_folders(files.iter().map(|f| f.path.as_str()));

        Self {
            software_name: software_name.into(),
            total_files: files.len(),
            files,
            folders,
            updated_at: updated_at.into(),
        }
    }

    /// Parse a manifest blob.
    ///
    /// Fails when the bytes are not JSON or `files` is not an array. Entries
    /// with an empty path or without positive ids are skipped; a repeated
    /// path replaces the earlier entry.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let doc: RawManifest = serde_json::from_slice(bytes)
            .map_err(|e| SyncError::ManifestFormat(format!("not a manifest document: {e}")))?;

        let files = match doc.files {
            serde_json::Value::Array(items) => items,
            serde_json::Value::Null => {
                return Err(SyncError::ManifestFormat("missing `files` array".to_string()))
            }
            _ => return Err(SyncError::ManifestFormat("`files` is not an array".to_string())),
        };

        let mut by_path: BTreeMap<String, ManifestFileEntry> = BTreeMap::new();
        for (idx, item) in files.into_iter().enumerate() {
            match serde_json::from_value::<RawEntry>(item) {
                Ok(raw) => match raw.into_entry() {
                    Some(entry) => {
                        by_path.insert(entry.path.clone(), entry);
                    }
                    None => warn!("Skipping manifest entry {} without usable path/ids", idx),
                },
                Err(e) => warn!("Skipping malformed manifest entry {}: {}", idx, e),
            }
        }

        let files: Vec<ManifestFileEntry> = by_path.into_values().collect();
        let listed: Vec<String> = match &doc.folders {
            serde_json::Value::Array(items) => items
                .iter()
                .filter_map(|v| v.as_str())
                .map(normalize_rel_path)
                .filter(|p| !p.is_empty())
                .collect(),
            _ => Vec::new(),
        };
        let folders = if listed.is_empty() {
            derive_folders(files.iter().map(|f| f.path.as_str()))
        } else {
            listed
        };

        Ok(Self {
            software_name: doc.software_name.or(doc.software_name_snake).unwrap_or_default(),
            total_files: files.len(),
            files,
            folders,
            updated_at: doc.updated_at.or(doc.updated_at_snake).unwrap_or_default(),
        })
    }

    /// Canonical pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<Vec<u8>> {
        let doc = CanonicalManifest {
            software_name: &self.software_name,
            files: self
                .files
                .iter()
                .map(|f| CanonicalEntry {
                    path: &f.path,
                    file_id: f.file_id,
                    file_version_id: f.file_version_id,
                    hash: f.hash.as_deref().unwrap_or(""),
                    size_bytes: f.size_bytes.unwrap_or(0),
                    last_modified: f.last_modified.as_deref().unwrap_or(""),
                })
                .collect(),
            folders: &self.folders,
            total_files: self.total_files,
            updated_at: &self.updated_at,
        };
        Ok(serde_json::to_vec_pretty(&doc)?)
    }
}

/// Distinct parent directories of `paths`, root excluded, sorted.
pub fn derive_folders<'a>(paths: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    paths
        .into_iter()
        .filter_map(|p| p.rsplit_once('/').map(|(dir, _)| dir))
        .filter(|dir| !dir.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// Each spelling is its own field: serde aliases reject documents that carry
// both the camelCase and the legacy snake_case name.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawManifest {
    #[serde(default)]
    software_name: Option<String>,
    #[serde(default, rename = "software_name")]
    software_name_snake: Option<String>,
    #[serde(default)]
    files: serde_json::Value,
    #[serde(default)]
    folders: serde_json::Value,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default, rename = "updated_at")]
    updated_at_snake: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    #[serde(default)]
    path: Option<String>,
    #[serde(default, rename = "file_id", deserialize_with = "crate::api::types::de_opt_id")]
    file_id_snake: Option<u64>,
    #[serde(default, deserialize_with = "crate::api::types::de_opt_id")]
    file_id: Option<u64>,
    #[serde(
        default,
        rename = "file_version_id",
        deserialize_with = "crate::api::types::de_opt_id"
    )]
    file_version_id_snake: Option<u64>,
    #[serde(default, deserialize_with = "crate::api::types::de_opt_id")]
    file_version_id: Option<u64>,
    #[serde(default, deserialize_with = "crate::api::types::de_opt_id")]
    version_id: Option<u64>,
    #[serde(default)]
    hash: Option<String>,
    #[serde(default)]
    size_bytes: Option<u64>,
    #[serde(default, rename = "size_bytes")]
    size_bytes_snake: Option<u64>,
    #[serde(default)]
    last_modified: Option<String>,
    #[serde(default, rename = "last_modified")]
    last_modified_snake: Option<String>,
}

impl RawEntry {
    fn into_entry(self) -> Option<ManifestFileEntry> {
        let path = normalize_rel_path(&self.path?);
        if path.is_empty() {
            return None;
        }
        let file_id = self.file_id_snake.or(self.file_id).filter(|id| *id > 0)?;
        let file_version_id = self
            .file_version_id_snake
            .or(self.file_version_id)
            .or(self.version_id)
            .filter(|id| *id > 0)?;
        Some(ManifestFileEntry {
            path,
            file_id,
            file_version_id,
            hash: self.hash.filter(|h| !h.is_empty()),
            size_bytes: self.size_bytes.or(self.size_bytes_snake),
            last_modified: self
                .last_modified
                .or(self.last_modified_snake)
                .filter(|s| !s.is_empty()),
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalManifest<'a> {
    software_name: &'a str,
    files: Vec<CanonicalEntry<'a>>,
    folders: &'a [String],
    total_files: usize,
    updated_at: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalEntry<'a> {
    path: &'a str,
    file_id: u64,
    file_version_id: u64,
    hash: &'a str,
    size_bytes: u64,
    last_modified: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, id: u64, hash: &str, size: u64) -> ManifestFileEntry {
        ManifestFileEntry {
            path: path.to_string(),
            file_id: id,
            file_version_id: id * 10,
            hash: Some(hash.to_string()),
            size_bytes: Some(size),
            last_modified: Some("2024-01-01T00:00:00.000Z".to_string()),
        }
    }

    #[test]
    fn test_from_entries_sorts_dedupes_and_derives_folders() {
        let manifest = Manifest::from_entries(
            "game_client",
            vec![
                entry("src/scenes/boot.ts", 3, "h3", 3),
                entry("index.html", 1, "h1", 1),
                entry("src/main.ts", 2, "h2", 2),
                entry("index.html", 4, "h4", 4),
            ],
            "2024-01-02T00:00:00.000Z",
        );

        let paths: Vec<&str> = manifest.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["index.html", "src/main.ts", "src/scenes/boot.ts"]);
        assert_eq!(manifest.files[0].file_id, 4);
        assert_eq!(manifest.folders, vec!["src", "src/scenes"]);
        assert_eq!(manifest.total_files, 3);
    }

    #[test]
    fn test_derive_folders_excludes_root() {
        assert!(derive_folders(["a.txt", "b.txt"]).is_empty());
        assert_eq!(derive_folders(["x/y/z.txt", "x/w.txt"]), vec!["x", "x/y"]);
    }

    #[test]
    fn test_roundtrip_canonical() {
        let manifest = Manifest::from_entries(
            "game_client",
            vec![entry("a.txt", 1, "h1", 5), entry("dir/b.txt", 2, "h2", 6)],
            "2024-01-02T00:00:00.000Z",
        );
        let bytes = manifest.to_json_pretty().unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("\"fileVersionId\": 20"));
        assert!(text.contains("\"softwareName\": \"game_client\""));

        let parsed = Manifest::parse(&bytes).unwrap();
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn test_legacy_aliases_accepted() {
        let json = br#"{
            "softwareName": "client",
            "files": [
                {"path": "a.txt", "file_id": 1, "file_version_id": 11, "hash": "aa", "size_bytes": 3, "last_modified": "t1"},
                {"path": "\\win\\b.txt", "fileId": "2", "versionId": "22", "hash": "bb", "sizeBytes": 4},
                {"path": "/c.txt", "fileId": 3, "fileVersionId": 33}
            ]
        }"#;
        let manifest = Manifest::parse(json).unwrap();

        assert_eq!(manifest.files.len(), 3);
        let a = &manifest.files[0];
        assert_eq!((a.path.as_str(), a.file_id, a.file_version_id), ("a.txt", 1, 11));
        assert_eq!(a.size_bytes, Some(3));
        assert_eq!(a.last_modified.as_deref(), Some("t1"));

        let c = &manifest.files[1];
        assert_eq!(c.path, "c.txt");
        assert_eq!(c.comparable(), None);

        let b = &manifest.files[2];
        assert_eq!((b.path.as_str(), b.file_id, b.file_version_id), ("win/b.txt", 2, 22));
        assert_eq!(b.comparable(), Some(("bb", 4)));

        assert_eq!(manifest.folders, vec!["win"]);
    }

    #[test]
    fn test_both_spellings_in_one_entry() {
        let json = br#"{
            "softwareName": "client",
            "software_name": "client",
            "files": [
                {"path": "a.txt", "fileId": 1, "file_id": 1, "fileVersionId": 2, "hash": "aa", "sizeBytes": 3, "size_bytes": 3},
                {"path": "b.txt", "fileId": 5, "fileVersionId": 4, "versionId": 4, "lastModified": "t", "last_modified": "t"}
            ],
            "updatedAt": "u",
            "updated_at": "u"
        }"#;
        let manifest = Manifest::parse(json).unwrap();

        let paths: Vec<&str> = manifest.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a.txt", "b.txt"]);
        assert_eq!(manifest.files[0].comparable(), Some(("aa", 3)));
        assert_eq!((manifest.files[1].file_id, manifest.files[1].file_version_id), (5, 4));
        assert_eq!(manifest.files[1].last_modified.as_deref(), Some("t"));
        assert_eq!(manifest.software_name, "client");
        assert_eq!(manifest.updated_at, "u");
    }

    #[test]
    fn test_invalid_entries_skipped() {
        let json = br#"{"files": [
            {"path": "", "fileId": 1, "fileVersionId": 1},
            {"path": "no-ids.txt"},
            {"path": "zero.txt", "fileId": 0, "fileVersionId": 5},
            {"path": "bad-id.txt", "fileId": "abc", "fileVersionId": 5},
            "not an object",
            {"path": "ok.txt", "fileId": 7, "fileVersionId": 8}
        ]}"#;
        let manifest = Manifest::parse(json).unwrap();
        assert_eq!(manifest.files.len(), 1);
        assert_eq!(manifest.files[0].path, "ok.txt");
    }

    #[test]
    fn test_empty_hash_is_not_comparable() {
        let json = br#"{"files": [{"path": "a", "fileId": 1, "fileVersionId": 1, "hash": "", "sizeBytes": 0}]}"#;
        let manifest = Manifest::parse(json).unwrap();
        assert_eq!(manifest.files[0].hash, None);
        assert_eq!(manifest.files[0].comparable(), None);
    }

    #[test]
    fn test_malformed_documents_rejected() {
        let bad_docs: [&[u8]; 4] = [
            b"not json",
            br#"{"files": {"a": 1}}"#,
            br#"{"softwareName": "x"}"#,
            b"[]",
        ];
        for bad in bad_docs {
            let err = Manifest::parse(bad).unwrap_err();
            assert!(matches!(err, SyncError::ManifestFormat(_)));
        }
    }

    #[test]
    fn test_duplicate_paths_last_wins() {
        let json = br#"{"files": [
            {"path": "a.txt", "fileId": 1, "fileVersionId": 1},
            {"path": "a.txt", "fileId": 2, "fileVersionId": 2}
        ]}"#;
        let manifest = Manifest::parse(json).unwrap();
        assert_eq!(manifest.files.len(), 1);
        assert_eq!(manifest.files[0].file_id, 2);
    }
}
