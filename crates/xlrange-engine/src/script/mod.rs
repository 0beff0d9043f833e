//! AppleScript request building and response parsing.

mod builder;
mod literal;

pub use builder::{HELPERS, ScriptBuilder, date_literal, envelope, literal, quote, sheet_ref};
pub use literal::{DATE_FORMAT, LiteralError, parse_literal};
