//! HTTP client for the platform REST API and its signed blob URLs.

use super::types::*;
use crate::utils::{Result, SyncError};
use bytes::Bytes;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

/// Transport settings for one client.
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    /// Accept self-signed / invalid certificates
    pub insecure_tls: bool,

    /// Per-request timeout
    pub timeout: Option<Duration>,
}

/// Authenticated platform client.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

/// Trim whitespace and trailing slashes from a base URL.
pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

impl PlatformClient {
    pub fn new(base_url: &str, token: &str, options: &TransportOptions) -> Result<Self> {
        let base_url = normalize_base_url(base_url);
        if base_url.is_empty() {
            return Err(SyncError::Config(
                "apiBaseUrl is required (or set SPARKX_API_BASE_URL / API_BASE_URL)".to_string(),
            ));
        }
        Url::parse(&base_url)
            .map_err(|e| SyncError::Config(format!("invalid api base url {base_url}: {e}")))?;

        if token.trim().is_empty() {
            return Err(SyncError::Config("token is required".to_string()));
        }

        let mut builder = reqwest::Client::builder().danger_accept_invalid_certs(options.insecure_tls);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url,
            token: token.trim().to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, pathname: &str) -> Result<Url> {
        let url = format!("{}/{}", self.base_url, pathname.trim_start_matches('/'));
        Url::parse(&url).map_err(|e| SyncError::Config(format!("invalid endpoint url {url}: {e}")))
    }

    async fn request<T, B>(
        &self,
        method: Method,
        url: Url,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        debug!("{} {}", method, url);
        let pathname = url.path().to_string();

        let mut req = self
            .http
            .request(method.clone(), url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json");
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(SyncError::RemoteProtocol(format!(
                "{method} {pathname} failed ({status}): {}",
                text.trim()
            )));
        }

        let body = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(body).map_err(|e| {
            SyncError::RemoteProtocol(format!("{method} {pathname}: unexpected response shape: {e}"))
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, pathname: &str, query: &[(&str, String)]) -> Result<T> {
        self.get_json_at(self.endpoint(pathname)?, query).await
    }

    async fn get_json_at<T: DeserializeOwned>(&self, url: Url, query: &[(&str, String)]) -> Result<T> {
        self.request::<T, ()>(Method::GET, url, query, None).await
    }

    async fn post_json<T, B>(&self, pathname: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, self.endpoint(pathname)?, &[], Some(body)).await
    }

    /// Download bytes from a signed URL (no auth header).
    pub async fn fetch_signed(&self, url: &str) -> Result<Bytes> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SyncError::RemoteProtocol(format!("download failed ({status})")));
        }
        Ok(resp.bytes().await?)
    }

    /// Write bytes to a signed URL with the content type the platform asked for.
    pub async fn put_signed(&self, url: &str, content_type: &str, content: Vec<u8>) -> Result<()> {
        let resp = self
            .http
            .put(url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(content)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(SyncError::RemoteProtocol(format!("upload failed ({status}): {}", text.trim())));
        }
        Ok(())
    }

    pub async fn template_by_name(&self, name: &str) -> Result<(SoftwareTemplate, serde_json::Value)> {
        let mut url = self.endpoint("/api/v1/software-templates/by-name")?;
        url.path_segments_mut()
            .map_err(|_| SyncError::Config(format!("api base url {} cannot carry a path", self.base_url)))?
            .push(name);
        let raw: serde_json::Value = self.get_json_at(url, &[]).await?;
        let template = serde_json::from_value(raw.clone()).map_err(|e| {
            SyncError::RemoteProtocol(format!("template {name} has an unexpected shape: {e}"))
        })?;
        Ok((template, raw))
    }

    pub async fn template_download_ticket(&self, archive_file_id: u64) -> Result<DownloadTicket> {
        let pathname = format!("/api/v1/files/{archive_file_id}/download-template");
        self.get_json::<DownloadTicket>(&pathname, &[]).await.and_then(non_empty_ticket)
    }

    pub async fn file_download_ticket(&self, file_id: u64, version_id: u64) -> Result<DownloadTicket> {
        let pathname = format!("/api/v1/files/{file_id}/download");
        self.get_json::<DownloadTicket>(&pathname, &[("versionId", version_id.to_string())])
            .await
            .and_then(non_empty_ticket)
    }

    /// Resolve the ticket for one file version and fetch its bytes.
    pub async fn download_file(&self, file_id: u64, version_id: u64) -> Result<Bytes> {
        let ticket = self.file_download_ticket(file_id, version_id).await?;
        self.fetch_signed(&ticket.download_url).await
    }

    pub async fn list_softwares(&self, project_id: u64, page: u64, page_size: u64) -> Result<SoftwarePage> {
        let pathname = format!("/api/v1/projects/{project_id}/softwares");
        self.get_json(
            &pathname,
            &[("page", page.to_string()), ("pageSize", page_size.to_string())],
        )
        .await
    }

    /// All softwares of a project, page by page until the reported total is
    /// reached or a page comes back empty. The page number only moves forward,
    /// whatever page the server claims to have answered.
    pub async fn list_all_softwares(&self, project_id: u64, page_size: u64) -> Result<Vec<Software>> {
        let mut softwares = Vec::new();
        let mut page = 1u64;

        loop {
            let resp = self.list_softwares(project_id, page, page_size).await?;
            let fetched = resp.list.len();
            softwares.extend(
                resp.list
                    .into_iter()
                    .map(|mut s| {
                        s.name = s.name.trim().to_string();
                        s
                    })
                    .filter(|s| !s.name.is_empty()),
            );

            let total = resp.page.total;
            let size = resp.page.page_size.filter(|s| *s > 0).unwrap_or(page_size);
            if total == 0 || fetched == 0 || page * size >= total || softwares.len() as u64 >= total {
                break;
            }
            page += 1;
        }

        debug!("Listed {} softwares for project {}", softwares.len(), project_id);
        Ok(softwares)
    }

    pub async fn find_software(&self, project_id: u64, name: &str, page_size: u64) -> Result<Option<Software>> {
        let softwares = self.list_all_softwares(project_id, page_size).await?;
        Ok(softwares.into_iter().find(|s| s.name == name))
    }

    pub async fn create_software(&self, project_id: u64, body: &CreateSoftwareRequest) -> Result<serde_json::Value> {
        let pathname = format!("/api/v1/projects/{project_id}/softwares");
        self.post_json(&pathname, body).await
    }

    pub async fn manifest_records(&self, project_id: u64, software_ids: &[u64]) -> Result<Vec<ManifestRecord>> {
        let pathname = format!("/api/v1/projects/{project_id}/software_manifests");
        let ids = software_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let resp: ManifestRecordList = self.get_json(&pathname, &[("software_ids", ids)]).await?;
        Ok(resp.list)
    }

    /// Latest usable manifest pointer of one software, if any.
    pub async fn latest_manifest(&self, project_id: u64, software_id: u64) -> Result<Option<ManifestPointer>> {
        let records = self.manifest_records(project_id, &[software_id]).await?;
        Ok(records
            .iter()
            .filter(|r| r.software_id == software_id)
            .find_map(ManifestRecord::pointer))
    }

    pub async fn preupload(&self, body: &PreUploadRequest) -> Result<PreUploadTicket> {
        let ticket: PreUploadTicket = self.post_json("/api/v1/files/preupload", body).await?;
        if ticket.upload_url.is_empty() || ticket.content_type.is_empty() {
            return Err(SyncError::RemoteProtocol(format!(
                "preupload response invalid for {}",
                body.name
            )));
        }
        Ok(ticket)
    }

    /// Two-phase upload: allocate ids through preupload, then PUT the bytes.
    pub async fn upload_blob(&self, body: &PreUploadRequest, content: Vec<u8>) -> Result<PreUploadTicket> {
        let ticket = self.preupload(body).await?;
        self.put_signed(&ticket.upload_url, &ticket.content_type, content).await?;
        info!(
            "Uploaded {} ({} bytes) as file {} version {}",
            body.name, body.size_bytes, ticket.file_id, ticket.version_id
        );
        Ok(ticket)
    }

    pub async fn create_software_manifest(&self, body: &CreateManifestRequest) -> Result<serde_json::Value> {
        self.post_json("/api/v1/software-manifests", body).await
    }

    pub async fn create_build_version(&self, body: &CreateBuildVersionRequest) -> Result<BuildVersionCreated> {
        self.post_json("/api/v1/build-versions", body).await
    }
}

fn non_empty_ticket(ticket: DownloadTicket) -> Result<DownloadTicket> {
    if ticket.download_url.trim().is_empty() {
        return Err(SyncError::RemoteProtocol("downloadUrl is missing".to_string()));
    }
    Ok(ticket)
}
