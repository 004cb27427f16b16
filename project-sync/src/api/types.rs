//! Request and response shapes of the platform API.
//!
//! Responses are decoded strictly: a missing or ill-typed required field is a
//! protocol error at the transport boundary instead of a silent default.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Numeric ids may arrive as JSON numbers or numeric strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Num(u64),
    Text(String),
}

fn raw_to_id<E: de::Error>(raw: RawId) -> Result<u64, E> {
    match raw {
        RawId::Num(n) => Ok(n),
        RawId::Text(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| E::custom(format!("invalid numeric id: {s:?}"))),
    }
}

/// Required positive id.
pub fn de_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let id = raw_to_id(RawId::deserialize(deserializer)?)?;
    if id == 0 {
        return Err(de::Error::custom("id must be positive"));
    }
    Ok(id)
}

/// Optional id; `null` and absent both decode to `None`.
pub fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawId>::deserialize(deserializer)? {
        Some(raw) => raw_to_id(raw).map(Some),
        None => Ok(None),
    }
}

/// `GET /api/v1/software-templates/by-name/{name}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftwareTemplate {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(deserialize_with = "de_id")]
    pub archive_file_id: u64,
}

/// `{downloadUrl}` indirection returned by the download endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadTicket {
    pub download_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Software {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub template_id: Option<u64>,
    #[serde(default)]
    pub technology_stack: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub page_size: Option<u64>,
}

/// `GET /api/v1/projects/{projectId}/softwares`
#[derive(Debug, Clone, Deserialize)]
pub struct SoftwarePage {
    #[serde(default)]
    pub list: Vec<Software>,
    #[serde(default)]
    pub page: PageInfo,
}

/// `POST /api/v1/projects/{projectId}/softwares`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSoftwareRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technology_stack: Option<String>,
    pub template_id: u64,
}

/// One row of `GET /api/v1/projects/{projectId}/software_manifests`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestRecord {
    #[serde(deserialize_with = "de_id")]
    pub software_id: u64,
    #[serde(default)]
    pub has_record: bool,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub manifest_file_id: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub manifest_file_version_id: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub manifest_id: Option<u64>,
    #[serde(default)]
    pub version_number: Option<u64>,
}

/// Where the latest published manifest blob of a software lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestPointer {
    pub software_id: u64,
    pub manifest_id: Option<u64>,
    pub version_number: Option<u64>,
    pub manifest_file_id: u64,
    pub manifest_file_version_id: u64,
}

impl ManifestRecord {
    /// The manifest blob location, when the software has a usable record.
    pub fn pointer(&self) -> Option<ManifestPointer> {
        if !self.has_record {
            return None;
        }
        let file_id = self.manifest_file_id.filter(|id| *id > 0)?;
        let version_id = self.manifest_file_version_id.filter(|id| *id > 0)?;
        Some(ManifestPointer {
            software_id: self.software_id,
            manifest_id: self.manifest_id,
            version_number: self.version_number,
            manifest_file_id: file_id,
            manifest_file_version_id: version_id,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestRecordList {
    #[serde(default)]
    pub list: Vec<ManifestRecord>,
}

/// `POST /api/v1/files/preupload`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreUploadRequest {
    pub project_id: u64,
    pub name: String,
    pub file_category: String,
    pub file_format: String,
    pub size_bytes: u64,
    pub hash: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreUploadTicket {
    pub upload_url: String,
    pub content_type: String,
    #[serde(deserialize_with = "de_id")]
    pub file_id: u64,
    #[serde(deserialize_with = "de_id")]
    pub version_id: u64,
    #[serde(default)]
    pub version_number: Option<u64>,
}

/// `POST /api/v1/software-manifests`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateManifestRequest {
    pub project_id: u64,
    pub software_id: u64,
    pub manifest_file_id: u64,
    pub manifest_file_version_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_description: Option<String>,
}

/// `POST /api/v1/build-versions`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBuildVersionRequest {
    pub project_id: u64,
    pub software_manifest_id: u64,
    pub description: String,
    pub build_version_file_id: u64,
    pub build_version_file_version_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildVersionCreated {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub build_version_id: Option<u64>,
    #[serde(default)]
    pub version_number: Option<u64>,
}
