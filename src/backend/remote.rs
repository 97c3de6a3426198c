//! Remote backend over the GitHub repository contents API.
//!
//! Every record lives at `{api_base}/repos/{owner}/{repo}/contents/{path}`:
//!
//! | Operation | Request | Notes |
//! |-----------|---------|-------|
//! | list      | `GET` album path | 404 means no albums |
//! | read      | `GET` record path | base64 `content` + blob `sha` |
//! | write     | `PUT` portfolio path | `{message, content, branch?}`; no `sha`, so an existing file is a conflict |
//! | delete    | `DELETE` record path | `{message, sha, branch?}` |
//!
//! Fine-grained tokens (`github_pat_…`) authenticate with `Bearer`, classic
//! tokens with `token`. Requests are blocking; the converter is sequential.

use super::{BackendError, Cause, RecordStore};
use crate::frontmatter;
use crate::naming;
use crate::types::{PortfolioRecord, RecordHandle, VersionToken};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const MEDIA_TYPE: &str = "application/vnd.github+json";

/// Where the remote records live and how to authenticate.
#[derive(Clone)]
pub struct RemoteSettings {
    pub api_base: String,
    pub owner: String,
    pub repo: String,
    pub branch: Option<String>,
    pub token: String,
    pub albums_path: String,
    pub portfolio_path: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for RemoteSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSettings")
            .field("api_base", &self.api_base)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("token", &"<redacted>")
            .field("albums_path", &self.albums_path)
            .field("portfolio_path", &self.portfolio_path)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Classification of a non-2xx response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpFailureKind {
    Unauthorized,
    RateLimited,
    Conflict,
    NotFound,
    Other,
}

impl HttpFailureKind {
    /// `rate_remaining` is the `x-ratelimit-remaining` header, if present.
    /// GitHub answers an exhausted primary rate limit with 403 and `0`.
    pub fn classify(status: u16, rate_remaining: Option<&str>) -> Self {
        match status {
            403 if rate_remaining.map(str::trim) == Some("0") => Self::RateLimited,
            401 | 403 => Self::Unauthorized,
            429 => Self::RateLimited,
            409 | 422 => Self::Conflict,
            404 => Self::NotFound,
            _ => Self::Other,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::RateLimited => "rate limited",
            Self::Conflict => "conflict",
            Self::NotFound => "not found",
            Self::Other => "unexpected status",
        }
    }
}

/// A non-2xx response from the contents API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("HTTP {status} ({}): {message}", .kind.label())]
pub struct HttpFailure {
    pub status: u16,
    pub kind: HttpFailureKind,
    pub message: String,
}

impl HttpFailure {
    pub fn new(status: u16, rate_remaining: Option<&str>, message: String) -> Self {
        Self {
            status,
            kind: HttpFailureKind::classify(status, rate_remaining),
            message,
        }
    }
}

/// `Authorization` header value for a personal access token.
pub fn auth_header_value(token: &str) -> String {
    let token = token.trim();
    if token.starts_with("github_pat_") {
        format!("Bearer {token}")
    } else {
        format!("token {token}")
    }
}

/// Decode the API's base64 `content`, which arrives wrapped at 60 columns.
pub fn decode_content(encoded: &str) -> Result<String, Cause> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| Cause::Invalid(format!("content is not valid base64: {e}")))?;
    String::from_utf8(bytes).map_err(|_| Cause::Invalid("content is not valid UTF-8".into()))
}

pub fn encode_content(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

pub fn create_message(record: &PortfolioRecord) -> String {
    format!("Add portfolio photo: {}", record.title)
}

pub fn delete_message(handle: &RecordHandle) -> String {
    format!("Remove converted album: {}", handle.path)
}

/// One entry of a directory listing.
#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

/// A single file as returned by `GET contents/{path}`.
#[derive(Debug, Deserialize)]
struct ContentFile {
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateRequest<'a> {
    message: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    message: String,
    sha: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

/// Album file handles from a directory listing body.
///
/// Only regular files with the record extension are albums; subdirectories
/// and stray files are ignored. A body that is a single object means the
/// album path is a file, not a directory.
fn album_handles(body: &str) -> Result<Vec<RecordHandle>, Cause> {
    let entries: Vec<ContentEntry> = serde_json::from_str(body)
        .map_err(|e| Cause::Invalid(format!("album path is not a directory listing: {e}")))?;
    Ok(entries
        .into_iter()
        .filter(|e| e.kind == "file" && naming::is_record_file(&e.name))
        .map(|e| RecordHandle::new(e.path, e.name))
        .collect())
}

fn parse_file(body: &str) -> Result<(String, VersionToken), Cause> {
    let file: ContentFile = serde_json::from_str(body)
        .map_err(|e| Cause::Invalid(format!("unexpected contents response: {e}")))?;
    match file.encoding.as_deref() {
        Some("base64") | None => {}
        Some(other) => {
            return Err(Cause::Invalid(format!(
                "content delivered with unsupported encoding `{other}`"
            )));
        }
    }
    let content = file
        .content
        .ok_or_else(|| Cause::Invalid("response has no content".into()))?;
    Ok((decode_content(&content)?, VersionToken(file.sha)))
}

/// Turn a non-2xx response into an [`HttpFailure`], keeping the API's
/// `message` when the body has one.
fn http_failure(response: Response) -> HttpFailure {
    let status = response.status().as_u16();
    let remaining = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().unwrap_or_default();
    let message = serde_json::from_str::<ApiMessage>(&body)
        .map(|m| m.message)
        .unwrap_or_else(|_| body.trim().to_string());
    HttpFailure::new(status, remaining.as_deref(), message)
}

pub struct RemoteBackend {
    client: Client,
    settings: RemoteSettings,
}

impl RemoteBackend {
    pub fn new(settings: RemoteSettings) -> Self {
        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, settings }
    }

    pub fn settings(&self) -> &RemoteSettings {
        &self.settings
    }

    /// `{api_base}/repos/{owner}/{repo}/contents/{path}`, with each path
    /// segment percent-encoded.
    pub fn contents_url(&self, path: &str) -> Result<Url, Cause> {
        let s = &self.settings;
        let mut url = Url::parse(&s.api_base)
            .map_err(|e| Cause::Invalid(format!("invalid API base `{}`: {e}", s.api_base)))?;
        url.path_segments_mut()
            .map_err(|_| Cause::Invalid(format!("API base `{}` cannot hold a path", s.api_base)))?
            .pop_if_empty()
            .extend(["repos", s.owner.as_str(), s.repo.as_str(), "contents"])
            .extend(path.split('/').filter(|seg| !seg.is_empty()));
        Ok(url)
    }

    fn read_url(&self, path: &str) -> Result<Url, Cause> {
        let mut url = self.contents_url(path)?;
        if let Some(branch) = &self.settings.branch {
            url.query_pairs_mut().append_pair("ref", branch);
        }
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(AUTHORIZATION, auth_header_value(&self.settings.token))
            .header(ACCEPT, MEDIA_TYPE)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    fn portfolio_path(&self, record: &PortfolioRecord) -> String {
        let dir = self.settings.portfolio_path.trim_end_matches('/');
        format!("{dir}/{}", naming::record_file_name(&record.id))
    }
}

impl RecordStore for RemoteBackend {
    fn list_album_records(&self) -> Result<Vec<RecordHandle>, BackendError> {
        let path = &self.settings.albums_path;
        let url = self
            .read_url(path)
            .map_err(|e| BackendError::list(path, e))?;
        debug!(%url, "listing albums");

        let response = self
            .authorized(self.client.get(url))
            .send()
            .map_err(|e| BackendError::list(path, e))?;
        if !response.status().is_success() {
            let failure = http_failure(response);
            if failure.kind == HttpFailureKind::NotFound {
                return Ok(Vec::new());
            }
            return Err(BackendError::list(path, failure));
        }
        let body = response.text().map_err(|e| BackendError::list(path, e))?;
        album_handles(&body).map_err(|e| BackendError::list(path, e))
    }

    fn read_record(&self, handle: &RecordHandle) -> Result<(String, VersionToken), BackendError> {
        let path = &handle.path;
        let url = self.read_url(path).map_err(|e| BackendError::read(path, e))?;
        debug!(%url, "reading record");

        let response = self
            .authorized(self.client.get(url))
            .send()
            .map_err(|e| BackendError::read(path, e))?;
        if !response.status().is_success() {
            let failure = http_failure(response);
            if failure.kind == HttpFailureKind::NotFound {
                return Err(BackendError::NotFound(path.clone()));
            }
            return Err(BackendError::read(path, failure));
        }
        let body = response.text().map_err(|e| BackendError::read(path, e))?;
        parse_file(&body).map_err(|e| BackendError::read(path, e))
    }

    fn write_portfolio_record(&self, record: &PortfolioRecord) -> Result<RecordHandle, BackendError> {
        let path = self.portfolio_path(record);
        let url = self
            .contents_url(&path)
            .map_err(|e| BackendError::write(&path, e))?;
        let text = frontmatter::render(record).map_err(|e| BackendError::write(&path, e))?;
        let body = CreateRequest {
            message: create_message(record),
            content: encode_content(&text),
            branch: self.settings.branch.as_deref(),
        };
        debug!(%url, "creating record");

        let response = self
            .authorized(self.client.put(url))
            .json(&body)
            .send()
            .map_err(|e| BackendError::write(&path, e))?;
        if !response.status().is_success() {
            return Err(BackendError::write(&path, http_failure(response)));
        }
        Ok(RecordHandle::new(
            path,
            naming::record_file_name(&record.id),
        ))
    }

    fn delete_record(&self, handle: &RecordHandle, token: &VersionToken) -> Result<(), BackendError> {
        let path = &handle.path;
        let url = self
            .contents_url(path)
            .map_err(|e| BackendError::delete(path, e))?;
        let body = DeleteRequest {
            message: delete_message(handle),
            sha: token.as_str(),
            branch: self.settings.branch.as_deref(),
        };
        debug!(%url, sha = token.as_str(), "deleting record");

        let response = self
            .authorized(self.client.delete(url))
            .json(&body)
            .send()
            .map_err(|e| BackendError::delete(path, e))?;
        if !response.status().is_success() {
            let failure = http_failure(response);
            if failure.kind == HttpFailureKind::NotFound {
                return Err(BackendError::NotFound(path.clone()));
            }
            return Err(BackendError::delete(path, failure));
        }
        Ok(())
    }

    fn location(&self) -> String {
        let s = &self.settings;
        match &s.branch {
            Some(branch) => format!("{}/{}@{branch}:{}", s.owner, s.repo, s.albums_path),
            None => format!("{}/{}:{}", s.owner, s.repo, s.albums_path),
        }
    }
}
