//! xlrange - spreadsheet range addressing over AppleScript, a live
//! automation host, or xlsx files written on close.

pub mod config;
pub mod error;

pub use xlrange_core::*;
pub use xlrange_engine::engine::{decode, encode};
