/// # confluence-export CLI Interface (Module)
///
/// Command parsing and the async entrypoint. All export logic lives in the
/// [`confluence-export-core`] crate; this module only loads configuration, applies
/// command-line overrides, runs the export and writes the archive.
///
/// - For command-line users: use the installed `confluence-export` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`confluence-export-core`]: ../../confluence-export-core/
use crate::load_config::load_settings;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use confluence_export_core::export::{prepare_export, run_export};
use confluence_export_core::serialize::OutputFormat;
use std::path::PathBuf;

/// CLI for confluence-export: snapshot a Confluence space to files and a ZIP archive.
#[derive(Parser)]
#[clap(
    name = "confluence-export",
    version,
    about = "Export a Confluence space to txt, md, pdf or json documents packaged as a ZIP archive"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export every page of the configured space
    Export {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Output format (txt, md, pdf, json); overrides the config file
        #[clap(long)]
        format: Option<OutputFormat>,
        /// Root directory for the export tree and archive; overrides the config file
        #[clap(long)]
        output_dir: Option<PathBuf>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Export {
            config,
            format,
            output_dir,
        } => {
            let mut settings = load_settings(&config)?;
            if let Some(format) = format {
                settings.output_format = format;
            }
            if let Some(output_dir) = output_dir {
                settings.output_dir = output_dir;
            }
            let config = prepare_export(settings)
                .await
                .context("Invalid export configuration")?;
            config.trace_loaded();

            tracing::info!(command = "export", space_key = %config.space_key, "Starting export");
            let report = run_export(&config).await.context("Export failed")?;

            if !report.is_complete() {
                tracing::warn!(
                    command = "export",
                    fetch_failures = report.fetch_failures,
                    truncated_at = ?report.truncated_at,
                    "Page listing was truncated; the export is incomplete"
                );
            }

            match report.write_archive()? {
                Some(archive) => {
                    tracing::info!(command = "export", pages = report.pages, archive = %archive.display(), "Export complete");
                    println!(
                        "Exported {} pages from space {} to {}",
                        report.pages,
                        config.space_key,
                        archive.display()
                    );
                    if let Some(offset) = report.truncated_at {
                        println!("Warning: listing stopped at offset {offset} after a failed request; the export is partial");
                    }
                }
                None => match report.truncated_at {
                    Some(offset) => {
                        println!(
                            "No pages exported from space {}: listing failed at offset {offset}; the export is partial",
                            config.space_key
                        );
                    }
                    None => {
                        println!("No pages found in space {}", config.space_key);
                    }
                },
            }
            Ok(())
        }
    }
}
