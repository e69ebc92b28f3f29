//! High-level pipeline: fetch → extract → assemble → serialize → archive for one space.
//!
//! This module wires the other modules together for a single export run:
//!   - Lists every page of the configured space through a [`ContentSource`]
//!   - Extracts page text and code blocks, and (optionally) attachment text
//!   - Assembles one [`Document`] per page and writes it in the configured format
//!   - Packs the run directory into an in-memory ZIP archive
//!
//! # Major Types
//! - [`ExportPaths`]: the timestamped directory layout of one run
//! - [`ExportReport`]: what was written, what was skipped, and the archive bytes
//!
//! # Responsibilities
//! - Strictly sequential: one request in flight at a time, pages processed in fetch order
//! - Best effort on remote data: failed batches truncate the listing, failed attachment
//!   downloads are skipped. Only disk and archive failures abort the run.
//!
//! # Navigation
//! - Main entrypoints: [`prepare_export`] then [`run_export`] (real client), or
//!   [`export_space`] (any source)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::archive::create_zip_archive;
use crate::attachment::{process_attachment, AttachmentText};
use crate::client::{check_reachable, ConfluenceClient};
use crate::config::{ExportConfig, ExportSettings};
use crate::content::extract_page_text;
use crate::contract::ContentSource;
use crate::document::{assemble_document, Document};
use crate::error::ExportError;
use crate::paginate::fetch_all_pages;
use crate::serialize::save_documents;

/// Local time formatted as `YYYYMMDDHHMM`, used to name the run directory and archive.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d%H%M").to_string()
}

/// Directory layout of one run.
///
/// ```text
/// <output_root>/
///   confluence_export_<ts>.zip
///   <ts>/                         run_dir (archived)
///     confluence/<ts>/            export_dir
///       <slug>_<n>.<ext>
///       attachments/
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub timestamp: String,
    pub output_root: PathBuf,
    pub run_dir: PathBuf,
    pub export_dir: PathBuf,
    pub attachments_dir: PathBuf,
    pub archive_name: String,
}

impl ExportPaths {
    pub fn new(output_root: impl Into<PathBuf>, timestamp: &str) -> Self {
        let output_root = output_root.into();
        let run_dir = output_root.join(timestamp);
        let export_dir = run_dir.join("confluence").join(timestamp);
        let attachments_dir = export_dir.join("attachments");
        Self {
            timestamp: timestamp.to_string(),
            archive_name: format!("confluence_export_{timestamp}.zip"),
            output_root,
            run_dir,
            export_dir,
            attachments_dir,
        }
    }

    /// Where the CLI writes the archive: next to the run directory.
    pub fn archive_path(&self) -> PathBuf {
        self.output_root.join(&self.archive_name)
    }
}

/// Outcome of one export run.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub pages: usize,
    /// Failed batch fetches; non-zero means the export holds only part of the space.
    pub fetch_failures: usize,
    /// Offset at which pagination stopped because of a failure.
    pub truncated_at: Option<usize>,
    /// Written document files, in page order.
    pub files: Vec<PathBuf>,
    pub export_dir: PathBuf,
    pub archive_path: PathBuf,
    /// ZIP bytes of the run directory. `None` when the space had no pages.
    pub archive: Option<Vec<u8>>,
}

impl ExportReport {
    pub fn is_complete(&self) -> bool {
        self.fetch_failures == 0
    }

    /// Write the archive to [`ExportReport::archive_path`], if there is one.
    pub fn write_archive(&self) -> Result<Option<&Path>, ExportError> {
        let Some(bytes) = self.archive.as_deref() else {
            return Ok(None);
        };
        if let Some(parent) = self.archive_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.archive_path, bytes)?;
        info!(path = %self.archive_path.display(), bytes = bytes.len(), "Wrote archive");
        Ok(Some(self.archive_path.as_path()))
    }
}

/// Export one space from `source` into the layout described by `paths`.
pub async fn export_space<S>(
    config: &ExportConfig,
    source: &S,
    paths: &ExportPaths,
) -> Result<ExportReport, ExportError>
where
    S: ContentSource + ?Sized,
{
    info!(
        space_key = %config.space_key,
        export_dir = %paths.export_dir.display(),
        "Starting Confluence export"
    );
    std::fs::create_dir_all(&paths.export_dir)?;
    if config.process_attachments {
        std::fs::create_dir_all(&paths.attachments_dir)?;
    }

    let listing = fetch_all_pages(
        source,
        &config.space_key,
        config.page_limit,
        config.max_pages,
    )
    .await;

    let mut report = ExportReport {
        pages: listing.pages.len(),
        fetch_failures: listing.fetch_failures,
        truncated_at: listing.truncated_at,
        files: Vec::new(),
        export_dir: paths.export_dir.clone(),
        archive_path: paths.archive_path(),
        archive: None,
    };

    if listing.pages.is_empty() {
        warn!(space_key = %config.space_key, "No pages found in space, nothing to export");
        return Ok(report);
    }

    let mut documents: Vec<Document> = Vec::with_capacity(listing.pages.len());
    for page in &listing.pages {
        debug!(id = ?page.id, title = ?page.title, "Processing page");
        let page_text = extract_page_text(page.storage_body());

        let mut attachments: Vec<AttachmentText> = Vec::new();
        if config.process_attachments {
            for attachment in page.attachments() {
                if let Some(text) =
                    process_attachment(source, attachment, &paths.attachments_dir).await
                {
                    attachments.push(text);
                }
            }
        }

        documents.push(assemble_document(
            page,
            &page_text,
            &attachments,
            &config.base_url,
            &config.space_key,
            config.cloud,
        ));
    }

    report.files = save_documents(&documents, &paths.export_dir, config.output_format)?;
    report.archive = Some(create_zip_archive(&paths.run_dir)?.into_inner());

    info!(
        pages = report.pages,
        files = report.files.len(),
        fetch_failures = report.fetch_failures,
        archive = %paths.archive_name,
        "Export finished"
    );
    Ok(report)
}

/// Upfront checks before any fetch: base URL present, base URL reachable, credentials,
/// then space key. The first failure is returned.
pub async fn prepare_export(settings: ExportSettings) -> Result<ExportConfig, ExportError> {
    let base_url = settings.require_base_url()?;
    check_reachable(&base_url).await?;
    settings.validate()
}

/// Export with the real client into a fresh timestamped layout.
///
/// Expects a config from [`prepare_export`], which has already checked the base URL.
pub async fn run_export(config: &ExportConfig) -> Result<ExportReport, ExportError> {
    let client = ConfluenceClient::from_config(config);
    let paths = ExportPaths::new(&config.output_dir, &timestamp());
    export_space(config, &client, &paths).await
}
