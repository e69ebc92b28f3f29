/// `load_config` module: loads a static YAML config and injects secrets from the environment.
///
/// This module is the only place where untrusted YAML is parsed and mapped onto the core
/// crate's [`ExportSettings`].
///
/// # Responsibilities
/// - Parse the user-supplied YAML file into type-safe structs
/// - Fall back to `CONFLUENCE_BASE_URL` / `CONFLUENCE_SPACE_KEY` when the file leaves them out
/// - Read credentials from the environment only; the YAML file never holds secrets
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
///
/// Accepted schema:
///
/// ```yaml
/// confluence:
///   base_url: https://example.atlassian.net
///   space_key: DOCS
///   cloud: true
/// export:
///   output_dir: ./download
///   format: json
///   process_attachments: true
///   page_limit: 25
///   max_pages: 100
/// ```
use anyhow::{Context, Result};
use confluence_export_core::config::{ExportConfig, ExportSettings};
use confluence_export_core::serialize::OutputFormat;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const ENV_BASE_URL: &str = "CONFLUENCE_BASE_URL";
pub const ENV_SPACE_KEY: &str = "CONFLUENCE_SPACE_KEY";
pub const ENV_USERNAME: &str = "CONFLUENCE_USERNAME";
pub const ENV_ACCESS_TOKEN: &str = "CONFLUENCE_ACCESS_TOKEN";
pub const ENV_PERSONAL_ACCESS_TOKEN: &str = "CONFLUENCE_PERSONAL_ACCESS_TOKEN";

#[derive(Debug, Default, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub confluence: ConfluenceSection,
    #[serde(default)]
    pub export: ExportSection,
}

#[derive(Debug, Deserialize)]
pub struct ConfluenceSection {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub space_key: Option<String>,
    #[serde(default = "default_true")]
    pub cloud: bool,
}

impl Default for ConfluenceSection {
    fn default() -> Self {
        Self {
            base_url: None,
            space_key: None,
            cloud: true,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExportSection {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Kept as a string so format names parse case-insensitively.
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default = "default_true")]
    pub process_attachments: bool,
    #[serde(default)]
    pub page_limit: Option<usize>,
    #[serde(default)]
    pub max_pages: Option<usize>,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            format: None,
            process_attachments: true,
            page_limit: None,
            max_pages: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./download")
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Reads the YAML file and the environment into unvalidated [`ExportSettings`].
///
/// CLI overrides are applied on the result before [`ExportSettings::validate`].
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<ExportSettings> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let raw: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let output_format = match raw.export.format.as_deref() {
        Some(name) => name.parse::<OutputFormat>()?,
        None => OutputFormat::default(),
    };

    Ok(ExportSettings {
        base_url: raw.confluence.base_url.or_else(|| env_var(ENV_BASE_URL)),
        space_key: raw.confluence.space_key.or_else(|| env_var(ENV_SPACE_KEY)),
        username: env_var(ENV_USERNAME),
        access_token: env_var(ENV_ACCESS_TOKEN),
        personal_access_token: env_var(ENV_PERSONAL_ACCESS_TOKEN),
        cloud: raw.confluence.cloud,
        output_format,
        process_attachments: raw.export.process_attachments,
        output_dir: raw.export.output_dir,
        page_limit: raw.export.page_limit,
        max_pages: raw.export.max_pages,
    })
}

/// Loads and validates in one step.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ExportConfig> {
    let config = load_settings(path)?
        .validate()
        .context("Invalid export configuration")?;
    Ok(config)
}
