//! Show command implementation.

use crate::cli::ShowArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use tallyman_domain::traits::PredictionStore;
use tallyman_store::FilePredictionStore;

/// Execute the show command.
pub fn execute_show(args: ShowArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let store = FilePredictionStore::new(&config.store.dir);
    let record = store
        .load(args.doc_id)?
        .ok_or(CliError::NotFound(args.doc_id))?;

    println!("{}", formatter.format_record(&record)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use tallyman_domain::DocumentId;
    use tempfile::TempDir;

    #[test]
    fn test_show_missing_record() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.store.dir = dir.path().to_path_buf();
        let formatter = Formatter::new(OutputFormat::Json, false);

        let result = execute_show(
            ShowArgs {
                doc_id: DocumentId::new(3),
            },
            &config,
            &formatter,
        );
        assert!(matches!(result, Err(CliError::NotFound(id)) if id == DocumentId::new(3)));
    }
}
