//! Tallyman CLI - consumption trigger and prediction inspection.

use clap::Parser;
use tallyman_cli::commands;
use tallyman_cli::config::OutputFormat;
use tallyman_cli::{Cli, Command, Config, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    // Config may be what failed, so errors only honor the flag
    let errors = Formatter::new(OutputFormat::Table, !cli.no_color);

    if let Err(e) = run(cli).await {
        tracing::error!("{}", e);
        eprintln!("{}", errors.error(&e.to_string()));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> tallyman_cli::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_overrides(cli.overrides());

    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        Command::Consume(args) => commands::execute_consume(args, &config, &formatter).await?,
        Command::Show(args) => commands::execute_show(args, &config, &formatter)?,
        Command::Fields => commands::execute_fields(&config, &formatter).await?,
    }

    Ok(())
}
