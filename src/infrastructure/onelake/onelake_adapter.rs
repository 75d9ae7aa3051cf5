//! OneLake adapter speaking the ADLS Gen2 REST API.
//!
//! All calls are synchronous and authenticated with a cached bearer token.
//! Listing and recursive deletion follow the x-ms-continuation header until
//! the service reports completion.

use crate::domain::errors::{CopyError, Result};
use crate::infrastructure::onelake::credentials::{AccessToken, TokenCredential};
use crate::ports::lakehouse_port::{LakehousePort, RemoteEntry};
use log::{debug, info};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode, Url};
use serde::Deserialize;
use std::sync::Mutex;

const API_VERSION: &str = "2023-11-03";

/// Resolves the account endpoint. `None` or an empty string selects the
/// public OneLake endpoint, a full `https://` URL is taken as-is, and any
/// other value is treated as a Fabric account name.
pub fn account_url(account: Option<&str>) -> String {
    let account = match account {
        Some(name) if !name.is_empty() => name,
        _ => "onelake",
    };
    if account.starts_with("https://") {
        account.trim_end_matches('/').to_string()
    } else {
        format!("https://{}.dfs.fabric.microsoft.com", account)
    }
}

/// HTTP client for one OneLake account.
///
/// The workspace acts as the filesystem and every path below it is addressed
/// as `<account>/<workspace>/<path>`.
pub struct OneLakeClient {
    http: Client,
    account_url: String,
    credential: TokenCredential,
    token_cache: Mutex<Option<AccessToken>>,
}

impl OneLakeClient {
    /// Creates a client for `account` (see [`account_url`]). No request
    /// timeout is configured; transfers run until the platform gives up.
    pub fn new(account: Option<&str>, credential: TokenCredential) -> Result<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| CopyError::RemoteIoError(format!("failed to build HTTP client: {}", e)))?;
        let account_url = account_url(account);
        info!("Created OneLake client for {}", account_url);
        Ok(Self {
            http,
            account_url,
            credential,
            token_cache: Mutex::new(None),
        })
    }

    /// Returns a valid bearer token, refreshing the cached one if needed.
    fn bearer_token(&self) -> Result<String> {
        let mut cache = self
            .token_cache
            .lock()
            .map_err(|_| CopyError::CredentialError("token cache poisoned".to_string()))?;
        if let Some(token) = cache.as_ref() {
            if !token.is_expired() {
                return Ok(token.token.clone());
            }
        }
        let token = self.credential.fetch_token(&self.http)?;
        let value = token.token.clone();
        *cache = Some(token);
        Ok(value)
    }

    /// URL for a path inside a workspace, percent-encoding each segment.
    fn path_url(&self, workspace: &str, path: &str) -> Result<Url> {
        let mut url = self.base_url()?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                CopyError::RemoteIoError(format!("account URL {} cannot be a base", self.account_url))
            })?;
            segments.push(workspace);
            for segment in path.split('/') {
                segments.push(segment);
            }
        }
        Ok(url)
    }

    /// URL for the workspace filesystem itself.
    fn workspace_url(&self, workspace: &str) -> Result<Url> {
        let mut url = self.base_url()?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                CopyError::RemoteIoError(format!("account URL {} cannot be a base", self.account_url))
            })?;
            segments.push(workspace);
        }
        Ok(url)
    }

    fn base_url(&self) -> Result<Url> {
        Url::parse(&self.account_url).map_err(|e| {
            CopyError::RemoteIoError(format!("invalid account URL {}: {}", self.account_url, e))
        })
    }

    fn request(&self, method: Method, url: Url) -> Result<RequestBuilder> {
        let token = self.bearer_token()?;
        Ok(self
            .http
            .request(method, url)
            .bearer_auth(token)
            .header("x-ms-version", API_VERSION))
    }
}

impl LakehousePort for OneLakeClient {
    fn directory_exists(&self, workspace: &str, path: &str) -> Result<bool> {
        let url = self.path_url(workspace, path)?;
        let response = send(self.request(Method::HEAD, url)?, "probe", path)?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(request_failed("probe", path, response)),
        }
    }

    fn create_directory(&self, workspace: &str, path: &str) -> Result<()> {
        let url = self.path_url(workspace, path)?;
        let response = send(
            self.request(Method::PUT, url)?
                .query(&[("resource", "directory")])
                .header("Content-Length", "0"),
            "create directory",
            path,
        )?;
        if !response.status().is_success() {
            return Err(request_failed("create directory", path, response));
        }
        Ok(())
    }

    fn delete_directory(&self, workspace: &str, path: &str) -> Result<()> {
        let mut continuation: Option<String> = None;
        loop {
            let url = self.path_url(workspace, path)?;
            let mut builder = self
                .request(Method::DELETE, url)?
                .query(&[("recursive", "true")]);
            if let Some(token) = &continuation {
                builder = builder.query(&[("continuation", token.as_str())]);
            }
            let response = send(builder, "delete", path)?;
            if response.status() == StatusCode::NOT_FOUND {
                // Already absent.
                return Ok(());
            }
            if !response.status().is_success() {
                return Err(request_failed("delete", path, response));
            }
            continuation = header_value(&response, "x-ms-continuation");
            if continuation.is_none() {
                return Ok(());
            }
        }
    }

    fn delete_file(&self, workspace: &str, path: &str) -> Result<()> {
        let url = self.path_url(workspace, path)?;
        let response = send(self.request(Method::DELETE, url)?, "delete file", path)?;
        if !response.status().is_success() {
            return Err(request_failed("delete file", path, response));
        }
        Ok(())
    }

    fn upload_file(&self, workspace: &str, path: &str, data: &[u8], overwrite: bool) -> Result<()> {
        debug!("Uploading {} bytes to {}", data.len(), path);

        // 1. Create (or truncate) the file.
        let url = self.path_url(workspace, path)?;
        let mut builder = self
            .request(Method::PUT, url)?
            .query(&[("resource", "file")])
            .header("Content-Length", "0");
        if !overwrite {
            builder = builder.header("If-None-Match", "*");
        }
        let response = send(builder, "create file", path)?;
        if !response.status().is_success() {
            return Err(request_failed("create file", path, response));
        }

        // 2. Append the bytes at offset zero.
        if !data.is_empty() {
            let url = self.path_url(workspace, path)?;
            let response = send(
                self.request(Method::PATCH, url)?
                    .query(&[("action", "append"), ("position", "0")])
                    .body(data.to_vec()),
                "append",
                path,
            )?;
            if !response.status().is_success() {
                return Err(request_failed("append", path, response));
            }
        }

        // 3. Flush to commit the final length.
        let url = self.path_url(workspace, path)?;
        let position = data.len().to_string();
        let response = send(
            self.request(Method::PATCH, url)?
                .query(&[("action", "flush"), ("position", position.as_str())])
                .header("Content-Length", "0"),
            "flush",
            path,
        )?;
        if !response.status().is_success() {
            return Err(request_failed("flush", path, response));
        }
        Ok(())
    }

    fn list_paths(&self, workspace: &str, directory: &str) -> Result<Vec<RemoteEntry>> {
        let mut entries = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let url = self.workspace_url(workspace)?;
            let mut builder = self.request(Method::GET, url)?.query(&[
                ("resource", "filesystem"),
                ("recursive", "true"),
                ("directory", directory),
            ]);
            if let Some(token) = &continuation {
                builder = builder.query(&[("continuation", token.as_str())]);
            }
            let response = send(builder, "list", directory)?;
            if !response.status().is_success() {
                return Err(request_failed("list", directory, response));
            }
            // The continuation header must be read before the body consumes
            // the response.
            continuation = header_value(&response, "x-ms-continuation");
            let page: PathList = response.json().map_err(|e| {
                CopyError::RemoteIoError(format!("malformed listing for {}: {}", directory, e))
            })?;
            entries.extend(page.paths.into_iter().map(RemoteEntry::from));
            if continuation.is_none() {
                return Ok(entries);
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct PathList {
    paths: Vec<PathItem>,
}

/// One entry of a filesystem listing. The service serializes booleans as
/// strings and omits `isDirectory` for plain files.
#[derive(Debug, Deserialize)]
struct PathItem {
    name: String,
    #[serde(rename = "isDirectory", default)]
    is_directory: Option<String>,
}

impl From<PathItem> for RemoteEntry {
    fn from(item: PathItem) -> Self {
        RemoteEntry {
            is_directory: item.is_directory.as_deref() == Some("true"),
            name: item.name,
        }
    }
}

fn send(builder: RequestBuilder, action: &str, path: &str) -> Result<Response> {
    builder
        .send()
        .map_err(|e| CopyError::RemoteIoError(format!("{} {} failed: {}", action, path, e)))
}

fn request_failed(action: &str, path: &str, response: Response) -> CopyError {
    let status = response.status();
    let body = response.text().unwrap_or_default();
    CopyError::RemoteIoError(format!(
        "{} {} failed with {}: {}",
        action,
        path,
        status,
        body.trim()
    ))
}

fn header_value(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
