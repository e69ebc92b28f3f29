use std::path::PathBuf;
use tracing::{debug, info};

use crate::client::Credentials;
use crate::error::ExportError;
use crate::serialize::OutputFormat;

/// Default number of pages requested per API call.
pub const DEFAULT_PAGE_LIMIT: usize = 25;

/// Raw, unvalidated inputs for a run, as gathered from a config file and the environment.
///
/// Every connection field is optional here; [`ExportSettings::validate`] turns this into an
/// [`ExportConfig`] or reports which required input is missing.
#[derive(Clone, Default)]
pub struct ExportSettings {
    pub base_url: Option<String>,
    pub space_key: Option<String>,
    pub username: Option<String>,
    pub access_token: Option<String>,
    pub personal_access_token: Option<String>,
    pub cloud: bool,
    pub output_format: OutputFormat,
    pub process_attachments: bool,
    pub output_dir: PathBuf,
    pub page_limit: Option<usize>,
    pub max_pages: Option<usize>,
}

impl ExportSettings {
    /// The trimmed base URL, or [`ExportError::MissingBaseUrl`].
    pub fn require_base_url(&self) -> Result<String, ExportError> {
        non_empty(self.base_url.clone())
            .map(|url| url.trim_end_matches('/').to_string())
            .ok_or(ExportError::MissingBaseUrl)
    }

    /// Offline checks, in order: base URL, credentials, then space key.
    ///
    /// Reachability needs the network; [`crate::export::prepare_export`] runs it between
    /// the base URL and the credential check.
    pub fn validate(self) -> Result<ExportConfig, ExportError> {
        let base_url = self.require_base_url()?;
        let credentials = Credentials::resolve(
            self.username.as_deref(),
            self.access_token.as_deref(),
            self.personal_access_token.as_deref(),
        )
        .ok_or(ExportError::MissingCredentials)?;
        let space_key = non_empty(self.space_key).ok_or(ExportError::MissingSpaceKey)?;

        Ok(ExportConfig {
            base_url,
            space_key,
            credentials,
            cloud: self.cloud,
            output_format: self.output_format,
            process_attachments: self.process_attachments,
            output_dir: self.output_dir,
            page_limit: self.page_limit.filter(|l| *l > 0).unwrap_or(DEFAULT_PAGE_LIMIT),
            max_pages: self.max_pages,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Validated configuration for one export run. Passed by reference into the pipeline.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub base_url: String,
    pub space_key: String,
    pub credentials: Credentials,
    /// Cloud-hosted instances serve the REST API and attachments under `/wiki`.
    pub cloud: bool,
    pub output_format: OutputFormat,
    pub process_attachments: bool,
    /// Root under which the timestamped export tree and the archive are written.
    pub output_dir: PathBuf,
    pub page_limit: usize,
    pub max_pages: Option<usize>,
}

impl ExportConfig {
    pub fn trace_loaded(&self) {
        info!(
            base_url = %self.base_url,
            space_key = %self.space_key,
            cloud = self.cloud,
            format = %self.output_format,
            process_attachments = self.process_attachments,
            output_dir = %self.output_dir.display(),
            "Loaded export config"
        );
        debug!(?self, "Export config loaded (full debug)");
    }
}
