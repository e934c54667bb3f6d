use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use common::metrics::{BACKING_STORE_ERRORS_TOTAL, BACKING_STORE_REQUESTS_TOTAL};

use super::{ContentEntry, ContentStore, StoredFile};
use crate::errors::ServiceError;

const USER_AGENT: &str = concat!("notes-backend/", env!("CARGO_PKG_VERSION"));

/// [`ContentStore`] over the GitHub repository contents API.
pub struct GitHubContentStore {
    client: Client,
    api_url: Url,
    owner: String,
    repo: String,
    branch: String,
    token: String,
}

#[derive(Deserialize)]
struct FileResponse {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Deserialize)]
struct DirItem {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    path: String,
    download_url: Option<String>,
}

#[derive(Deserialize)]
struct PutResponse {
    content: Option<PutContent>,
}

#[derive(Deserialize)]
struct PutContent {
    sha: String,
}

#[derive(Serialize)]
struct PutBody<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Serialize)]
struct DeleteBody<'a> {
    message: &'a str,
    sha: &'a str,
    branch: &'a str,
}

impl GitHubContentStore {
    pub fn from_config(
        github: &configs::GithubConfig,
        http: &configs::HttpClientConfig,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(http.connect_timeout_secs))
            .timeout(Duration::from_secs(http.request_timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;
        let api_url = Url::parse(&github.api_url)
            .map_err(|e| ServiceError::Validation(format!("invalid api url {}: {e}", github.api_url)))?;
        Ok(Self {
            client,
            api_url,
            owner: github.owner.clone(),
            repo: github.repo.clone(),
            branch: github.branch.clone(),
            token: github.token.clone(),
        })
    }

    /// `{api}/repos/{owner}/{repo}/contents/{path}`, each segment percent-encoded.
    fn contents_url(&self, path: &str) -> Result<Url, ServiceError> {
        let mut url = self.api_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ServiceError::Validation("api url cannot be a base".into()))?;
            segments
                .pop_if_empty()
                .extend(["repos", self.owner.as_str(), self.repo.as_str(), "contents"])
                .extend(path.split('/').filter(|s| !s.is_empty()));
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/vnd.github+json")
    }

    async fn send(&self, op: &'static str, req: RequestBuilder) -> Result<Response, ServiceError> {
        BACKING_STORE_REQUESTS_TOTAL.with_label_values(&[op]).inc();
        req.send().await.map_err(|e| {
            BACKING_STORE_ERRORS_TOTAL.with_label_values(&[op]).inc();
            warn!(op, error = %e, "backing store request failed");
            ServiceError::from(e)
        })
    }
}

async fn upstream_error(op: &'static str, resp: Response) -> ServiceError {
    BACKING_STORE_ERRORS_TOTAL.with_label_values(&[op]).inc();
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    warn!(op, status, "backing store returned an error status");
    ServiceError::Upstream { status, body }
}

fn decode_content(file: FileResponse) -> Result<StoredFile, ServiceError> {
    let content = match file.encoding.as_deref() {
        Some("base64") | None => {
            // the API wraps base64 at 60 columns
            let compact: String = file.content.chars().filter(|c| !c.is_whitespace()).collect();
            STANDARD.decode(compact).map_err(|e| ServiceError::Upstream {
                status: StatusCode::OK.as_u16(),
                body: format!("undecodable file content: {e}"),
            })?
        }
        // large blobs come back with `encoding: none` and no inline content
        Some(_) => Vec::new(),
    };
    Ok(StoredFile { version: file.sha, content })
}

#[async_trait]
impl ContentStore for GitHubContentStore {
    #[instrument(skip(self), fields(branch = %self.branch))]
    async fn get(&self, path: &str) -> Result<Option<StoredFile>, ServiceError> {
        let url = self.contents_url(path)?;
        let req = self.request(Method::GET, url).query(&[("ref", self.branch.as_str())]);
        let resp = self.send("get", req).await?;
        match resp.status() {
            StatusCode::OK => {
                let file: FileResponse = resp.json().await?;
                debug!(sha = %file.sha, "fetched file");
                decode_content(file).map(Some)
            }
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(upstream_error("get", resp).await),
        }
    }

    #[instrument(skip(self, content, message), fields(size = content.len(), conditional = version.is_some()))]
    async fn put(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        version: Option<&str>,
    ) -> Result<String, ServiceError> {
        let url = self.contents_url(path)?;
        let body = PutBody { message, content: STANDARD.encode(content), branch: &self.branch, sha: version };
        let resp = self.send("put", self.request(Method::PUT, url).json(&body)).await?;
        let status = resp.status();
        if status == StatusCode::OK || status == StatusCode::CREATED {
            let out: PutResponse = resp.json().await?;
            return out
                .content
                .map(|c| c.sha)
                .ok_or_else(|| ServiceError::Upstream { status: status.as_u16(), body: "missing content sha".into() });
        }
        if status == StatusCode::CONFLICT {
            BACKING_STORE_ERRORS_TOTAL.with_label_values(&["put"]).inc();
            return Err(ServiceError::VersionConflict { path: path.to_string() });
        }
        let err = upstream_error("put", resp).await;
        match err {
            // creating over an existing file without its sha is the same race
            ServiceError::Upstream { status: 422, ref body } if body.contains("sha") => {
                Err(ServiceError::VersionConflict { path: path.to_string() })
            }
            other => Err(other),
        }
    }

    #[instrument(skip(self, message))]
    async fn delete(&self, path: &str, version: &str, message: &str) -> Result<(), ServiceError> {
        let url = self.contents_url(path)?;
        let body = DeleteBody { message, sha: version, branch: &self.branch };
        let resp = self.send("delete", self.request(Method::DELETE, url).json(&body)).await?;
        match resp.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
            StatusCode::NOT_FOUND => Err(ServiceError::NotFound("File not found".into())),
            _ => Err(upstream_error("delete", resp).await),
        }
    }

    #[instrument(skip(self))]
    async fn list(&self, dir: &str) -> Result<Vec<ContentEntry>, ServiceError> {
        let url = self.contents_url(dir)?;
        let req = self.request(Method::GET, url).query(&[("ref", self.branch.as_str())]);
        let resp = self.send("list", req).await?;
        match resp.status() {
            StatusCode::OK => {
                let value: serde_json::Value = resp.json().await?;
                // a file path answers with an object, not an array
                let items: Vec<DirItem> = serde_json::from_value(value).map_err(|e| ServiceError::Upstream {
                    status: StatusCode::OK.as_u16(),
                    body: format!("expected a directory listing: {e}"),
                })?;
                Ok(items
                    .into_iter()
                    .filter(|it| it.kind == "file")
                    .map(|it| ContentEntry { name: it.name, path: it.path, download_url: it.download_url })
                    .collect())
            }
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            _ => Err(upstream_error("list", resp).await),
        }
    }
}
