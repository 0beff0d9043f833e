//! Error types for xlrange core.

use std::fmt;
use thiserror::Error;

use crate::config::EngineKind;
use xlrange_engine::engine::{AddressError, BlockError};
use xlrange_engine::script::LiteralError;

/// What a failed lookup was looking for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementKind {
    Workbook,
    Sheet,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ElementKind::Workbook => "Workbook",
            ElementKind::Sheet => "Sheet",
        })
    }
}

/// Errors raised by sessions and engine adapters.
#[derive(Error, Debug)]
pub enum XlError {
    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    /// The external interpreter or host failed. `request` is the full text
    /// that was sent, unmodified.
    #[error("Engine communication error: {message}\n--- request ---\n{request}")]
    EngineCommunication { message: String, request: String },

    #[error("{kind} '{name}' not found")]
    ElementNotFound { kind: ElementKind, name: String },

    #[error("Operation '{operation}' is not supported by the {engine} engine")]
    Unsupported {
        engine: EngineKind,
        operation: &'static str,
    },

    #[error("Datatype error: {0}")]
    Datatype(String),

    #[error("Cannot parse engine response: {0}")]
    Literal(#[from] LiteralError),

    #[error("No workbook currently open")]
    NoWorkbookOpen,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XLSX write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Workbook read error: {0}")]
    Read(#[from] calamine::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<BlockError> for XlError {
    fn from(err: BlockError) -> Self {
        XlError::Datatype(err.to_string())
    }
}

impl XlError {
    pub fn unsupported(engine: EngineKind, operation: &'static str) -> Self {
        XlError::Unsupported { engine, operation }
    }

    pub fn workbook_not_found(name: &str) -> Self {
        XlError::ElementNotFound {
            kind: ElementKind::Workbook,
            name: name.to_string(),
        }
    }

    pub fn sheet_not_found(name: &str) -> Self {
        XlError::ElementNotFound {
            kind: ElementKind::Sheet,
            name: name.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, XlError>;
