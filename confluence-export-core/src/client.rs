//! Authenticated HTTP access to the Confluence REST API.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response};
use std::fmt;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use crate::config::ExportConfig;
use crate::contract::{ContentSource, CONTENT_EXPAND};
use crate::error::{ExportError, FetchError};
use crate::model::ContentBatch;

/// Credentials attached to every outbound request.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Personal access token, sent as `Authorization: Bearer <token>`.
    Bearer { token: String },
    /// Username + API/access token, sent as HTTP Basic.
    Basic { username: String, token: String },
}

impl Credentials {
    /// The one precedence rule for credentials: a personal access token wins,
    /// then a username + access token pair. Blank values count as absent.
    pub fn resolve(
        username: Option<&str>,
        access_token: Option<&str>,
        personal_access_token: Option<&str>,
    ) -> Option<Self> {
        let present = |v: Option<&str>| v.filter(|v| !v.trim().is_empty()).map(str::to_string);

        if let Some(token) = present(personal_access_token) {
            return Some(Credentials::Bearer { token });
        }
        match (present(username), present(access_token)) {
            (Some(username), Some(token)) => Some(Credentials::Basic { username, token }),
            _ => None,
        }
    }

    /// Value of the `Authorization` header.
    pub fn header_value(&self) -> String {
        match self {
            Credentials::Bearer { token } => format!("Bearer {token}"),
            Credentials::Basic { username, token } => {
                let encoded = STANDARD.encode(format!("{username}:{token}"));
                format!("Basic {encoded}")
            }
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            Credentials::Bearer { .. } => "bearer",
            Credentials::Basic { .. } => "basic",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Bearer { token } => f
                .debug_struct("Bearer")
                .field("token_len", &token.len())
                .finish(),
            Credentials::Basic { username, token } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("token_len", &token.len())
                .finish(),
        }
    }
}

/// reqwest-backed [`ContentSource`].
#[derive(Debug, Clone)]
pub struct ConfluenceClient {
    http: Client,
    base_url: String,
    cloud: bool,
    credentials: Credentials,
}

impl ConfluenceClient {
    pub fn new(base_url: impl Into<String>, cloud: bool, credentials: Credentials) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string(); // avoid "//"
        Self {
            http: Client::new(),
            base_url,
            cloud,
            credentials,
        }
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(
            config.base_url.clone(),
            config.cloud,
            config.credentials.clone(),
        )
    }

    /// `<base>` for self-managed servers, `<base>/wiki` for cloud.
    pub fn api_root(&self) -> String {
        if self.cloud {
            format!("{}/wiki", self.base_url)
        } else {
            self.base_url.clone()
        }
    }

    pub fn content_url(&self, space_key: &str, start: usize, limit: usize) -> String {
        format!(
            "{}/rest/api/content?spaceKey={}&limit={}&start={}&expand={}",
            self.api_root(),
            space_key,
            limit,
            start,
            CONTENT_EXPAND
        )
    }

    /// Absolute links are kept; relative ones are resolved against [`Self::api_root`].
    pub fn resolve_download_url(&self, link: &str) -> String {
        if link.starts_with("http") {
            link.to_string()
        } else {
            format!("{}{}", self.api_root(), link)
        }
    }

    /// Plain unauthenticated GET on the base URL; any failure means the run cannot start.
    pub async fn check_base_url(&self) -> Result<(), ExportError> {
        ping_base_url(&self.http, &self.base_url).await
    }

    /// Authenticated GET returning the parsed JSON body.
    pub async fn get_json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        let response = self
            .send(url, |req| {
                req.header(CONTENT_TYPE, "application/json")
                    .header(ACCEPT, "application/json")
            })
            .await?;
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| FetchError::Decode {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn send<F>(&self, url: &str, decorate: F) -> Result<Response, FetchError>
    where
        F: FnOnce(reqwest::RequestBuilder) -> reqwest::RequestBuilder,
    {
        debug!(url = %url, auth = self.credentials.scheme(), "GET");
        let request = self
            .http
            .get(url)
            .header(AUTHORIZATION, self.credentials.header_value());
        let response = decorate(request)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ContentSource for ConfluenceClient {
    async fn fetch_batch(
        &self,
        space_key: &str,
        start: usize,
        limit: usize,
    ) -> Result<ContentBatch, FetchError> {
        let url = self.content_url(space_key, start, limit);
        info!(url = %url, start, limit, "Fetching Confluence pages");
        let value = self.get_json(&url).await?;
        serde_json::from_value(value).map_err(|e| FetchError::Decode {
            url,
            reason: e.to_string(),
        })
    }

    async fn download_attachment(&self, link: &str, dest: &Path) -> Result<String, FetchError> {
        let url = self.resolve_download_url(link);
        info!(url = %url, dest = %dest.display(), "Downloading attachment");

        let response = self
            .send(&url, |req| req.header(ACCEPT, "application/json"))
            .await?;

        let io_err = |source: std::io::Error| FetchError::Io {
            path: dest.display().to_string(),
            source,
        };
        let mut file = tokio::fs::File::create(dest).await.map_err(io_err)?;
        let mut stream = response.bytes_stream();
        let mut written = 0usize;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| FetchError::Request {
                url: url.clone(),
                source,
            })?;
            file.write_all(&chunk).await.map_err(io_err)?;
            written += chunk.len();
        }
        file.flush().await.map_err(io_err)?;

        debug!(url = %url, bytes = written, "Attachment saved");
        Ok(url)
    }
}

/// [`ConfluenceClient::check_base_url`] without credentials, for use before they are validated.
pub async fn check_reachable(base_url: &str) -> Result<(), ExportError> {
    ping_base_url(&Client::new(), base_url.trim_end_matches('/')).await
}

async fn ping_base_url(http: &Client, base_url: &str) -> Result<(), ExportError> {
    info!(url = %base_url, "Checking Confluence base URL");
    let response = http.get(base_url).send().await.map_err(|e| {
        error!(error = ?e, url = %base_url, "Base URL unreachable");
        ExportError::Connectivity {
            url: base_url.to_string(),
            reason: e.to_string(),
        }
    })?;
    let status = response.status();
    if !status.is_success() {
        error!(status = %status, url = %base_url, "Base URL returned error status");
        return Err(ExportError::Connectivity {
            url: base_url.to_string(),
            reason: format!("HTTP {status}"),
        });
    }
    Ok(())
}
