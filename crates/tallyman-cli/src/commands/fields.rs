//! Fields command implementation.

use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use tallyman_paperless::{resolve_field_ids, PaperlessClient};

/// Execute the fields command.
pub async fn execute_fields(config: &Config, formatter: &Formatter) -> Result<()> {
    config.validate_paperless()?;

    let api = PaperlessClient::new(&config.paperless)?;
    let names = config.fields.names();
    let resolved = resolve_field_ids(&api, &names, config.fields.retry_policy()).await?;

    println!("{}", formatter.format_fields(&resolved)?);
    Ok(())
}
