//! Dropbox HTTP API v2 backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{
    Download, FileMetadata, FolderEntry, RemoteStorage, SharedLink, StorageError, StorageResult,
    Visibility, WriteMode,
};
use crate::config::DropboxConfig;
use crate::error::{LessonDropError, Result};
use crate::oauth::OAuthSession;

/// Header carrying arguments of content endpoints.
const API_ARG_HEADER: &str = "Dropbox-API-Arg";

/// Header carrying the result of content endpoints.
const API_RESULT_HEADER: &str = "Dropbox-API-Result";

/// Maximum length of an error summary kept in [`StorageError::Api`].
const MAX_SUMMARY_LEN: usize = 512;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_summary: String,
    #[serde(default)]
    error: Value,
}

#[derive(Debug, Deserialize)]
struct ListFolderResult {
    #[serde(default)]
    entries: Vec<FolderEntry>,
    #[serde(default)]
    cursor: String,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct ListSharedLinksResult {
    #[serde(default)]
    links: Vec<SharedLink>,
}

#[derive(Debug, Deserialize)]
struct DeleteResult {
    metadata: FileMetadata,
}

#[derive(Debug, Serialize)]
struct PathArg<'a> {
    path: &'a str,
}

/// [`RemoteStorage`] backed by the Dropbox HTTP API.
#[derive(Debug, Clone)]
pub struct DropboxClient {
    http: Client,
    api_url: String,
    content_url: String,
    session: Arc<OAuthSession>,
}

impl DropboxClient {
    /// Create a client that authenticates through `session`.
    pub fn new(config: &DropboxConfig, session: Arc<OAuthSession>) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .build()
            .map_err(|e| LessonDropError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            content_url: config.content_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    async fn authorized(&self, request: RequestBuilder) -> StorageResult<Response> {
        let token = self.session.access_token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(classify_error(status, &body))
        }
    }

    /// Call an RPC endpoint (JSON in, JSON out).
    async fn rpc<A, T>(&self, endpoint: &str, arg: &A) -> StorageResult<T>
    where
        A: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .http
            .post(format!("{}/2/{}", self.api_url, endpoint))
            .json(arg);
        self.authorized(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| StorageError::Decode(format!("{endpoint}: {e}")))
    }
}

/// Serialize `arg` for the `Dropbox-API-Arg` header.
///
/// HTTP headers must be ASCII, so every non-ASCII character (and DEL) is
/// written as a JSON `\uXXXX` escape.
fn header_arg(arg: &Value) -> StorageResult<String> {
    let json = serde_json::to_string(arg).map_err(|e| StorageError::Decode(e.to_string()))?;
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() && c != '\u{7f}' {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    Ok(out)
}

fn mode_arg(mode: &WriteMode) -> Value {
    match mode {
        WriteMode::Add => json!("add"),
        WriteMode::Overwrite => json!("overwrite"),
        WriteMode::Update(rev) => json!({ ".tag": "update", "update": rev }),
    }
}

/// Dropbox expects "" rather than "/" for the root folder.
fn folder_arg(path: &str) -> &str {
    if path == "/" {
        ""
    } else {
        path
    }
}

/// Chain of `.tag` values from the outermost union to the innermost one.
///
/// `{".tag": "path", "path": {".tag": "not_found"}}` yields
/// `["path", "not_found"]`; upload errors nest under `reason` instead.
fn tag_chain(error: &Value) -> Vec<&str> {
    let mut tags = Vec::new();
    let mut current = error;
    while let Some(tag) = current.get(".tag").and_then(Value::as_str) {
        tags.push(tag);
        match current.get(tag).or_else(|| current.get("reason")) {
            Some(next) if next.is_object() => current = next,
            _ => break,
        }
    }
    tags
}

fn truncate_summary(mut summary: String) -> String {
    if summary.len() > MAX_SUMMARY_LEN {
        let mut end = MAX_SUMMARY_LEN;
        while !summary.is_char_boundary(end) {
            end -= 1;
        }
        summary.truncate(end);
    }
    summary
}

/// Map an error response to a structured kind.
fn classify_error(status: StatusCode, body: &str) -> StorageError {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok();

    if status == StatusCode::UNAUTHORIZED {
        let summary = parsed
            .map(|b| b.error_summary)
            .unwrap_or_else(|| body.to_string());
        return StorageError::Unauthorized(truncate_summary(summary));
    }

    let Some(parsed) = parsed else {
        return StorageError::Api {
            status: status.as_u16(),
            summary: truncate_summary(body.to_string()),
        };
    };

    if status == StatusCode::CONFLICT {
        let tags = tag_chain(&parsed.error);
        match tags.as_slice() {
            ["shared_link_already_exists", ..] => return StorageError::LinkAlreadyExists,
            ["path" | "path_lookup", "not_found", ..] => return StorageError::PathNotFound,
            _ if tags.contains(&"conflict") => return StorageError::Conflict,
            _ => {}
        }
    }

    StorageError::Api {
        status: status.as_u16(),
        summary: truncate_summary(parsed.error_summary),
    }
}

#[async_trait]
impl RemoteStorage for DropboxClient {
    async fn upload(
        &self,
        path: &str,
        contents: Bytes,
        mode: WriteMode,
        autorename: bool,
    ) -> StorageResult<FileMetadata> {
        let arg = header_arg(&json!({
            "path": path,
            "mode": mode_arg(&mode),
            "autorename": autorename,
            "mute": false,
        }))?;
        let request = self
            .http
            .post(format!("{}/2/files/upload", self.content_url))
            .header(API_ARG_HEADER, arg)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(contents);

        self.authorized(request)
            .await?
            .json::<FileMetadata>()
            .await
            .map_err(|e| StorageError::Decode(format!("files/upload: {e}")))
    }

    async fn download(&self, path: &str) -> StorageResult<Download> {
        let arg = header_arg(&json!({ "path": path }))?;
        let request = self
            .http
            .post(format!("{}/2/files/download", self.content_url))
            .header(API_ARG_HEADER, arg);

        let response = self.authorized(request).await?;
        let metadata = response
            .headers()
            .get(API_RESULT_HEADER)
            .ok_or_else(|| StorageError::Decode(format!("missing {API_RESULT_HEADER} header")))
            .and_then(|value| {
                serde_json::from_slice::<FileMetadata>(value.as_bytes())
                    .map_err(|e| StorageError::Decode(format!("files/download metadata: {e}")))
            })?;
        let contents = response
            .bytes()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        Ok(Download { metadata, contents })
    }

    async fn list_folder(&self, path: &str, recursive: bool) -> StorageResult<Vec<FolderEntry>> {
        let mut page: ListFolderResult = self
            .rpc(
                "files/list_folder",
                &json!({ "path": folder_arg(path), "recursive": recursive }),
            )
            .await?;
        let mut entries = std::mem::take(&mut page.entries);

        while page.has_more {
            page = self
                .rpc("files/list_folder/continue", &json!({ "cursor": page.cursor }))
                .await?;
            entries.append(&mut page.entries);
        }

        Ok(entries)
    }

    async fn create_shared_link(
        &self,
        path: &str,
        visibility: Visibility,
    ) -> StorageResult<SharedLink> {
        self.rpc(
            "sharing/create_shared_link_with_settings",
            &json!({
                "path": path,
                "settings": { "requested_visibility": visibility },
            }),
        )
        .await
    }

    async fn list_shared_links(
        &self,
        path: &str,
        direct_only: bool,
    ) -> StorageResult<Vec<SharedLink>> {
        let result: ListSharedLinksResult = self
            .rpc(
                "sharing/list_shared_links",
                &json!({ "path": path, "direct_only": direct_only }),
            )
            .await?;
        Ok(result.links)
    }

    async fn delete(&self, path: &str) -> StorageResult<FileMetadata> {
        let result: DeleteResult = self.rpc("files/delete_v2", &PathArg { path }).await?;
        Ok(result.metadata)
    }
}
