//! xlrange-core - spreadsheet sessions over interchangeable engines.

pub mod adapter;
pub mod chunked;
pub mod config;
pub mod error;
pub mod host;
pub mod session;
pub mod transport;
pub mod xlsx;

pub use adapter::{
    Axis, Calculation, ClearTarget, Comparison, EngineAdapter, HighlightRule, SheetRef, SortKey, SortOrder,
};
pub use config::{EngineKind, SessionConfig};
pub use error::{ElementKind, Result, XlError};
pub use session::{Font, FormatRule, Outline, Range, Session, Sheet, Workbook};

pub use xlrange_engine::engine::{Address, CellBlock, CellFormat, HAlign, OutlineBoundary, Resize, Rgb, VAlign, Value};
