//! Command implementations.

pub mod consume;
pub mod fields;
pub mod show;

pub use self::consume::{consume_document, execute_consume};
pub use self::fields::execute_fields;
pub use self::show::execute_show;
