//! Error types for the export pipeline.
//!
//! Two layers exist:
//! - [`ExportError`] aborts a whole run (bad input, unreachable server, disk failures).
//! - [`FetchError`] describes a single failed HTTP call. Callers log it and carry on
//!   with whatever data they already have; it never aborts a run on its own.

use thiserror::Error;

/// Run-level failure. Returned from validation and from the pipeline entrypoints.
#[derive(Debug, Error)]
pub enum ExportError {
    /// No base URL was supplied (config file or `CONFLUENCE_BASE_URL`).
    #[error("missing Confluence base URL")]
    MissingBaseUrl,

    /// No space key was supplied (config file or `CONFLUENCE_SPACE_KEY`).
    #[error("missing Confluence space key")]
    MissingSpaceKey,

    /// Neither a personal access token nor a username + access token pair was supplied.
    #[error(
        "missing credentials: provide CONFLUENCE_PERSONAL_ACCESS_TOKEN, or CONFLUENCE_USERNAME and CONFLUENCE_ACCESS_TOKEN"
    )]
    MissingCredentials,

    /// The base URL could not be reached before the run started.
    #[error("invalid base URL {url}: {reason}")]
    Connectivity { url: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Failure of a single outbound request.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response (DNS, TLS, connection reset, ...).
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-2xx status.
    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// The body was not the JSON shape we expected.
    #[error("failed to decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// Writing a downloaded body to disk failed.
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// URL (or path, for disk failures) the error refers to.
    pub fn target(&self) -> &str {
        match self {
            FetchError::Request { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::Decode { url, .. } => url,
            FetchError::Io { path, .. } => path,
        }
    }
}
