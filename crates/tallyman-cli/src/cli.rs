//! CLI command definitions and argument parsing.

use crate::config::Overrides;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tallyman_domain::DocumentId;

/// Tallyman CLI - Fill in receipt amounts and dates on Paperless documents.
#[derive(Debug, Parser)]
#[command(name = "tallyman")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "TALLYMAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Document API base URL
    #[arg(long, global = true, env = "PAPERLESS_API_URL")]
    pub paperless_url: Option<String>,

    /// Document API token
    #[arg(long, global = true, env = "PAPERLESS_API_KEY", hide_env_values = true)]
    pub paperless_token: Option<String>,

    /// Extraction endpoint base URL
    #[arg(long, global = true, env = "HELPER_URL")]
    pub helper_url: Option<String>,

    /// Prediction cache directory
    #[arg(long, global = true, env = "TALLYMAN_PRED_DIR")]
    pub pred_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Config values given on the command line or in the environment.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            paperless_url: self.paperless_url.clone(),
            paperless_token: self.paperless_token.clone(),
            helper_url: self.helper_url.clone(),
            store_dir: self.pred_dir.clone(),
        }
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (values only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract and write amount and date for a newly consumed document
    Consume(ConsumeArgs),

    /// Show the stored prediction for a document
    Show(ShowArgs),

    /// Resolve and list the custom field IDs
    Fields,
}

/// Arguments for the consume command.
#[derive(Debug, Parser)]
pub struct ConsumeArgs {
    /// Document to process
    #[arg(long, env = "DOCUMENT_ID")]
    pub document_id: Option<DocumentId>,
}

/// Arguments for the show command.
#[derive(Debug, Parser)]
pub struct ShowArgs {
    /// Document ID
    pub doc_id: DocumentId,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}
