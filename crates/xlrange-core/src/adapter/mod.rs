//! The backend contract every engine implements.
//!
//! A session talks to exactly one [`EngineAdapter`]. The required methods are
//! the primitives all three engines support; the provided methods are end
//! effects that an engine may not have, and default to
//! [`XlError::Unsupported`].

mod automation;
mod deferred;
mod script;

pub use automation::LiveAutomation;
pub use deferred::DeferredFile;
pub use script::InteractiveScript;

use crate::config::EngineKind;
use crate::error::{Result, XlError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use xlrange_engine::engine::{Address, CellFormat, OutlineBoundary, Rgb, Value};

/// A sheet by name inside a workbook by name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SheetRef {
    pub workbook: String,
    pub sheet: String,
}

impl SheetRef {
    pub fn new(workbook: impl Into<String>, sheet: impl Into<String>) -> Self {
        SheetRef {
            workbook: workbook.into(),
            sheet: sheet.into(),
        }
    }
}

impl fmt::Display for SheetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]{}", self.workbook, self.sheet)
    }
}

/// Names reported by the backend for a workbook it just created or opened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenedWorkbook {
    pub name: String,
    pub sheets: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Calculation {
    Manual,
    #[default]
    Automatic,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Sort by the column whose header cell reads `label`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub label: String,
    pub order: SortOrder,
}

impl SortKey {
    pub fn ascending(label: impl Into<String>) -> Self {
        SortKey {
            label: label.into(),
            order: SortOrder::Ascending,
        }
    }

    pub fn descending(label: impl Into<String>) -> Self {
        SortKey {
            label: label.into(),
            order: SortOrder::Descending,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
}

impl Comparison {
    /// Parse `==`, `!=`, `>`, `<`, `>=` or `<=`.
    pub fn parse(op: &str) -> Option<Comparison> {
        Some(match op {
            "==" => Comparison::Equal,
            "!=" => Comparison::NotEqual,
            ">" => Comparison::Greater,
            "<" => Comparison::Less,
            ">=" => Comparison::GreaterEqual,
            "<=" => Comparison::LessEqual,
            _ => return None,
        })
    }
}

/// Conditional fill for cells whose value compares true against `threshold`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HighlightRule {
    pub condition: Comparison,
    pub threshold: f64,
    pub fill: Rgb,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Rows,
    Columns,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClearTarget {
    Contents,
    Formats,
}

/// Primitive operations over workbooks, sheets and ranges.
///
/// Addresses are absolute on the named sheet. Grid reads return one inner
/// vector per row.
pub trait EngineAdapter {
    fn kind(&self) -> EngineKind;

    // Session
    fn workbook_names(&mut self) -> Result<Vec<String>>;
    fn sheet_names(&mut self, workbook: &str) -> Result<Vec<String>>;
    fn set_calculation(&mut self, mode: Calculation) -> Result<()>;
    /// The selection of the active sheet of the active workbook.
    fn active_range(&mut self) -> Result<(SheetRef, Address)>;
    /// Every cell address of the current selection, area by area.
    fn selected_cells(&mut self) -> Result<(SheetRef, Vec<Address>)>;

    // Workbooks and sheets
    fn create_workbook(&mut self) -> Result<OpenedWorkbook>;
    fn open_workbook(&mut self, path: &Path) -> Result<OpenedWorkbook>;
    fn close_workbook(&mut self, workbook: &str) -> Result<()>;
    /// Returns the workbook's new name.
    fn save_workbook_as(&mut self, workbook: &str, path: &Path) -> Result<String>;
    /// Returns the name actually given, which is made unique if `name` is taken.
    fn create_sheet(&mut self, workbook: &str, name: &str) -> Result<String>;
    fn rename_sheet(&mut self, sheet: &SheetRef, name: &str) -> Result<String>;

    // Ranges
    fn get_value(&mut self, sheet: &SheetRef, address: &Address) -> Result<Value>;
    /// Put one scalar into every cell of `address`.
    fn set_value(&mut self, sheet: &SheetRef, address: &Address, value: &Value) -> Result<()>;
    fn get_formula(&mut self, sheet: &SheetRef, address: &Address) -> Result<Value>;
    fn set_formula(&mut self, sheet: &SheetRef, address: &Address, formula: &str, as_array: bool) -> Result<()>;
    fn format(&mut self, sheet: &SheetRef, address: &Address, format: &CellFormat) -> Result<()>;
    /// Write `rows` with their first cell at the top-left of `address`.
    fn write_block(&mut self, sheet: &SheetRef, address: &Address, rows: &[Vec<Value>]) -> Result<()>;
    fn read_block(&mut self, sheet: &SheetRef, address: &Address) -> Result<Vec<Vec<Value>>>;
    fn current_region(&mut self, sheet: &SheetRef, address: &Address) -> Result<Address>;
    /// Group rows of a table whose first data row is `origin`'s top row.
    /// Summary rows are set above their groups and made bold.
    fn group(&mut self, sheet: &SheetRef, origin: &Address, boundaries: &[OutlineBoundary]) -> Result<()>;
    fn clear(&mut self, sheet: &SheetRef, address: &Address, target: ClearTarget) -> Result<()>;

    // End effects
    fn select(&mut self, _sheet: &SheetRef, _address: &Address) -> Result<()> {
        Err(XlError::unsupported(self.kind(), "select"))
    }

    fn sort(&mut self, _sheet: &SheetRef, _address: &Address, _keys: &[SortKey], _header: bool) -> Result<()> {
        Err(XlError::unsupported(self.kind(), "sort"))
    }

    fn goal_seek(&mut self, _sheet: &SheetRef, _target: &Address, _goal: f64, _changing: &Address) -> Result<()> {
        Err(XlError::unsupported(self.kind(), "goal_seek"))
    }

    fn insert_image(&mut self, _sheet: &SheetRef, _at: &Address, _path: &Path, _width: u32, _height: u32) -> Result<()> {
        Err(XlError::unsupported(self.kind(), "insert_image"))
    }

    fn highlight(&mut self, _sheet: &SheetRef, _address: &Address, _rule: &HighlightRule) -> Result<()> {
        Err(XlError::unsupported(self.kind(), "highlight"))
    }

    fn autofit(&mut self, _sheet: &SheetRef, _address: &Address, _axis: Axis) -> Result<()> {
        Err(XlError::unsupported(self.kind(), "autofit"))
    }

    fn freeze_panes(&mut self, _sheet: &SheetRef, _at: &Address) -> Result<()> {
        Err(XlError::unsupported(self.kind(), "freeze_panes"))
    }

    /// Insert whole rows (or columns) where `address` sits, pushing the
    /// existing ones down (or right).
    fn insert(&mut self, _sheet: &SheetRef, _address: &Address, _axis: Axis) -> Result<()> {
        Err(XlError::unsupported(self.kind(), "insert"))
    }

    /// Delete the whole rows (or columns) `address` spans.
    fn delete(&mut self, _sheet: &SheetRef, _address: &Address, _axis: Axis) -> Result<()> {
        Err(XlError::unsupported(self.kind(), "delete"))
    }

    /// Copy the top row of `address` into every row below it.
    fn fill_down(&mut self, _sheet: &SheetRef, _address: &Address) -> Result<()> {
        Err(XlError::unsupported(self.kind(), "fill_down"))
    }

    /// Collapse the sheet's row outline to its first `levels` levels.
    fn show_levels(&mut self, _sheet: &SheetRef, _levels: u32) -> Result<()> {
        Err(XlError::unsupported(self.kind(), "show_levels"))
    }
}

/// Absolute sheet rows (1-based, inclusive) covered by one boundary.
pub(crate) fn boundary_rows(origin: &Address, boundary: &OutlineBoundary) -> (u32, u32) {
    let base = origin.top_left().row;
    (base + boundary.first_row, base + boundary.last_row)
}

/// Shape a range read into rows. Hosts answer a multi-cell read with a list
/// of row lists, but a single row or column may come back flat and a single
/// cell as a bare scalar.
pub(crate) fn into_rows(value: Value, cols: usize) -> Vec<Vec<Value>> {
    match value {
        Value::List(items) if items.iter().all(|v| matches!(v, Value::List(_))) => items
            .into_iter()
            .map(|row| match row {
                Value::List(cells) => cells,
                scalar => vec![scalar],
            })
            .collect(),
        Value::List(items) if cols == 1 => items.into_iter().map(|v| vec![v]).collect(),
        Value::List(items) => vec![items],
        scalar => vec![vec![scalar]],
    }
}

pub(crate) fn text_of(value: Value, what: &str) -> Result<String> {
    match value {
        Value::Text(s) => Ok(s),
        other => Err(XlError::Datatype(format!("expected {} as text, got {:?}", what, other))),
    }
}

/// `base`, or `base(1)`, `base(2)`... whichever is not taken yet.
pub(crate) fn unique_name(base: &str, taken: &[String]) -> String {
    let mut candidate = base.to_string();
    let mut i = 0;
    while taken.iter().any(|t| *t == candidate) {
        i += 1;
        candidate = format!("{}({})", base, i);
    }
    candidate
}

/// Split a selection address like `$A$1:$B$2,$D$4` into its areas.
pub(crate) fn parse_areas(text: &str) -> Result<Vec<Address>> {
    text.split(',')
        .map(str::trim)
        .filter(|area| !area.is_empty())
        .map(|area| Ok(xlrange_engine::engine::decode(area)?))
        .collect()
}
