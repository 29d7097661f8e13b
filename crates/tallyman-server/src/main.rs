//! Tallyman server binary
//!
//! Starts the extraction and webhook HTTP service.

use clap::Parser;
use std::path::PathBuf;
use std::process;
use tallyman_server::config::{Overrides, ServerConfig};
use tallyman_server::{start_server, ServerError};
use tracing_subscriber::EnvFilter;

/// Receipt extraction service for Paperless
#[derive(Parser, Debug)]
#[command(name = "tallyman-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "TALLYMAN_CONFIG")]
    config: Option<PathBuf>,

    /// Document API base URL
    #[arg(long, env = "PAPERLESS_API_URL")]
    paperless_url: Option<String>,

    /// Document API token
    #[arg(long, env = "PAPERLESS_API_KEY", hide_env_values = true)]
    paperless_token: Option<String>,

    /// Model runtime endpoint
    #[arg(long, env = "LLM_ENDPOINT")]
    llm_endpoint: Option<String>,

    /// Model name
    #[arg(long, env = "LLM_MODEL")]
    llm_model: Option<String>,

    /// Thread hint for the model runtime
    #[arg(long, env = "LLM_N_THREADS")]
    llm_threads: Option<u32>,

    /// Prediction cache directory
    #[arg(long, env = "TALLYMAN_PRED_DIR")]
    pred_dir: Option<PathBuf>,

    /// Listen address, as address:port
    #[arg(long, env = "TALLYMAN_BIND")]
    bind: Option<String>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            paperless_url: self.paperless_url.clone(),
            paperless_token: self.paperless_token.clone(),
            llm_endpoint: self.llm_endpoint.clone(),
            llm_model: self.llm_model.clone(),
            llm_threads: self.llm_threads,
            store_dir: self.pred_dir.clone(),
            bind: self.bind.clone(),
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args).await {
        tracing::error!("{}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), ServerError> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    config.apply_overrides(args.overrides())?;

    start_server(config).await
}
