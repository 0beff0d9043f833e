//! xlrange-engine - pure spreadsheet range logic.
//!
//! Nothing in this crate performs I/O: it parses and formats addresses,
//! navigates ranges, plans chunked writes, infers outlines and builds and
//! parses AppleScript text.

pub mod engine;
pub mod script;
