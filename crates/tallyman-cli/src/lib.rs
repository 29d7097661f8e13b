//! Tallyman CLI library.
//!
//! Command-line side of the receipt pipeline: the consumption-time trigger
//! that writes predicted amount and date onto a new document, plus commands
//! for inspecting stored predictions and resolved field IDs.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod helper;
pub mod output;

pub use cli::{Cli, Command};
pub use config::Config;
pub use error::{CliError, Result};
pub use helper::{ExtractionSource, HelperClient};
pub use output::Formatter;
