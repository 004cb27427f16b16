//! In-process fake of the platform API for orchestrator tests.

#![allow(dead_code)]

use axum::extract::{Path, Query, Request, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use project_sync::api::{PlatformClient, TransportOptions};
use project_sync::config::SyncConfig;
use project_sync::ToolContext;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path as FsPath, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const PROJECT_ID: u64 = 42;
pub const TOKEN: &str = "test-token";

#[derive(Debug, Clone)]
pub struct Published {
    pub software_id: u64,
    pub manifest_id: u64,
    pub version_number: u64,
    pub file_id: u64,
    pub version_id: u64,
}

#[derive(Debug, Default)]
pub struct Platform {
    pub base_url: String,
    next_id: u64,
    file_ids: HashMap<String, u64>,
    version_counts: HashMap<u64, u64>,
    pub blobs: HashMap<u64, Vec<u8>>,
    pub preuploaded: Vec<String>,
    pub blob_requests_with_auth: usize,
    pub softwares: Vec<Value>,
    pub manifests: Vec<Published>,
    pub build_versions: Vec<Value>,
    pub template_archive: Vec<u8>,
    pub software_list_requests: usize,

    /// Answer every software listing with page 1, ignoring the query
    pub echo_first_page: bool,

    /// Reject every signed upload with a 500
    pub fail_blob_puts: bool,
}

impl Platform {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn add_software(&mut self, name: &str) -> u64 {
        let id = self.softwares.len() as u64 + 1;
        self.softwares.push(json!({
            "id": id,
            "name": name,
            "templateId": 2,
            "status": "active",
        }));
        id
    }

    /// Bytes of the most recently published manifest of `software_id`.
    pub fn latest_manifest_blob(&self, software_id: u64) -> Option<Vec<u8>> {
        self.manifests
            .iter()
            .filter(|m| m.software_id == software_id)
            .last()
            .and_then(|m| self.blobs.get(&m.version_id).cloned())
    }

    /// Overwrite the blob behind the latest manifest of `software_id`.
    pub fn replace_latest_manifest_blob(&mut self, software_id: u64, content: &[u8]) {
        let version_id = self
            .manifests
            .iter()
            .filter(|m| m.software_id == software_id)
            .last()
            .map(|m| m.version_id)
            .expect("software has a published manifest");
        self.blobs.insert(version_id, content.to_vec());
    }
}

pub type Shared = Arc<Mutex<Platform>>;

pub struct Harness {
    pub platform: Shared,
    pub base_url: String,
    pub temp_dir: TempDir,
}

impl Harness {
    pub async fn start() -> Self {
        let platform: Shared = Arc::new(Mutex::new(Platform::default()));

        let api = Router::new()
            .route("/api/v1/projects/{project_id}/softwares", get(list_softwares).post(create_software))
            .route("/api/v1/projects/{project_id}/software_manifests", get(manifest_records))
            .route("/api/v1/files/preupload", post(preupload))
            .route("/api/v1/files/{file_id}/download", get(download_ticket))
            .route("/api/v1/files/{file_id}/download-template", get(template_ticket))
            .route("/api/v1/software-templates/by-name/{name}", get(template_by_name))
            .route("/api/v1/software-manifests", post(create_manifest))
            .route("/api/v1/build-versions", post(create_build_version))
            .route_layer(middleware::from_fn(require_bearer));

        let app = Router::new()
            .merge(api)
            .route("/blob/{version_id}", get(get_blob).put(put_blob))
            .route("/template-archive", get(get_template_archive))
            .with_state(platform.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        platform.lock().unwrap().base_url = base_url.clone();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            platform,
            base_url,
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Project directory `{tmp}/{name}/42`.
    pub fn project_dir(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name).join(PROJECT_ID.to_string())
    }

    pub fn ctx(&self, project_dir: &FsPath) -> ToolContext {
        let client = PlatformClient::new(&self.base_url, TOKEN, &TransportOptions::default()).unwrap();
        ToolContext {
            client,
            project_id: PROJECT_ID,
            project_dir: project_dir.to_path_buf(),
            sync: SyncConfig::default(),
        }
    }

    pub fn with<T>(&self, f: impl FnOnce(&mut Platform) -> T) -> T {
        f(&mut self.platform.lock().unwrap())
    }
}

/// Write `files` under `root`, creating parent directories.
pub fn write_tree(root: &FsPath, files: &[(&str, &[u8])]) {
    for (rel, content) in files {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
}

async fn require_bearer(req: Request, next: Next) -> Result<Response, StatusCode> {
    let expected = format!("Bearer {TOKEN}");
    let authorized = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(req).await)
}

fn query_u64(query: &HashMap<String, String>, key: &str, default: u64) -> u64 {
    query.get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

async fn list_softwares(
    State(state): State<Shared>,
    Path(_project_id): Path<u64>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.software_list_requests += 1;
    let page = if state.echo_first_page {
        1
    } else {
        query_u64(&query, "page", 1).max(1)
    };
    let page_size = query_u64(&query, "pageSize", 20).max(1);

    let list: Vec<Value> = state
        .softwares
        .iter()
        .skip(((page - 1) * page_size) as usize)
        .take(page_size as usize)
        .cloned()
        .collect();

    Json(json!({
        "list": list,
        "page": {"total": state.softwares.len(), "page": page, "pageSize": page_size},
    }))
}

async fn create_software(
    State(state): State<Shared>,
    Path(_project_id): Path<u64>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut state = state.lock().unwrap();
    let name = body["name"].as_str().unwrap_or_default().to_string();
    let id = state.add_software(&name);
    Json(json!({"id": id, "name": name, "templateId": body["templateId"]}))
}

async fn manifest_records(
    State(state): State<Shared>,
    Path(_project_id): Path<u64>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let state = state.lock().unwrap();
    let ids: Vec<u64> = query
        .get("software_ids")
        .map(|s| s.split(',').filter_map(|id| id.trim().parse().ok()).collect())
        .unwrap_or_default();

    let list: Vec<Value> = ids
        .iter()
        .map(|id| match state.manifests.iter().filter(|m| m.software_id == *id).last() {
            Some(m) => json!({
                "softwareId": id,
                "hasRecord": true,
                "manifestFileId": m.file_id,
                "manifestFileVersionId": m.version_id.to_string(),
                "manifestId": m.manifest_id,
                "versionNumber": m.version_number,
            }),
            None => json!({"softwareId": id, "hasRecord": false}),
        })
        .collect();

    Json(json!({ "list": list }))
}

async fn preupload(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    let name = body["name"].as_str().unwrap_or_default().to_string();

    let candidate = 1000 + state.file_ids.len() as u64 + 1;
    let file_id = *state.file_ids.entry(name.clone()).or_insert(candidate);
    let version_id = state.next_id();
    let version_number = {
        let count = state.version_counts.entry(file_id).or_insert(0);
        *count += 1;
        *count
    };
    state.preuploaded.push(name);

    Json(json!({
        "uploadUrl": format!("{}/blob/{}", state.base_url, version_id),
        "contentType": "application/octet-stream",
        "fileId": file_id,
        "versionId": version_id.to_string(),
        "versionNumber": version_number,
    }))
}

async fn put_blob(
    State(state): State<Shared>,
    Path(version_id): Path<u64>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let mut state = state.lock().unwrap();
    if headers.contains_key(AUTHORIZATION) {
        state.blob_requests_with_auth += 1;
    }
    if state.fail_blob_puts {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    state.blobs.insert(version_id, body.to_vec());
    StatusCode::OK
}

async fn get_blob(
    State(state): State<Shared>,
    Path(version_id): Path<u64>,
    headers: HeaderMap,
) -> Result<Vec<u8>, StatusCode> {
    let mut state = state.lock().unwrap();
    if headers.contains_key(AUTHORIZATION) {
        state.blob_requests_with_auth += 1;
    }
    state.blobs.get(&version_id).cloned().ok_or(StatusCode::NOT_FOUND)
}

async fn download_ticket(
    State(state): State<Shared>,
    Path(_file_id): Path<u64>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    let state = state.lock().unwrap();
    let version_id = query
        .get("versionId")
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or(StatusCode::BAD_REQUEST)?;
    Ok(Json(json!({
        "downloadUrl": format!("{}/blob/{}", state.base_url, version_id),
    })))
}

async fn template_by_name(Path(name): Path<String>) -> Result<Json<Value>, StatusCode> {
    if name != "phaser starter" {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!({"id": 7, "name": name, "archiveFileId": "70"})))
}

async fn template_ticket(State(state): State<Shared>, Path(file_id): Path<u64>) -> Result<Json<Value>, StatusCode> {
    if file_id != 70 {
        return Err(StatusCode::NOT_FOUND);
    }
    let state = state.lock().unwrap();
    Ok(Json(json!({"downloadUrl": format!("{}/template-archive", state.base_url)})))
}

async fn get_template_archive(State(state): State<Shared>) -> Vec<u8> {
    state.lock().unwrap().template_archive.clone()
}

async fn create_manifest(State(state): State<Shared>, Json(body): Json<Value>) -> Result<Json<Value>, StatusCode> {
    let mut state = state.lock().unwrap();
    let software_id = body["softwareId"].as_u64().ok_or(StatusCode::BAD_REQUEST)?;
    let file_id = body["manifestFileId"].as_u64().ok_or(StatusCode::BAD_REQUEST)?;
    let version_id = body["manifestFileVersionId"].as_u64().ok_or(StatusCode::BAD_REQUEST)?;
    if !state.blobs.contains_key(&version_id) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let manifest_id = state.next_id();
    let version_number = state.manifests.iter().filter(|m| m.software_id == software_id).count() as u64 + 1;
    state.manifests.push(Published {
        software_id,
        manifest_id,
        version_number,
        file_id,
        version_id,
    });
    Ok(Json(json!({"id": manifest_id, "versionNumber": version_number})))
}

async fn create_build_version(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.build_versions.push(body);
    let n = state.build_versions.len();
    Json(json!({"buildVersionId": 500 + n, "versionNumber": n}))
}
