//! Dispatch-style host object model used by the Live-Automation engine.
//!
//! A host exposes properties and methods on four kinds of object, addressed
//! by [`ObjectPath`]. Property and method names follow the spreadsheet
//! automation object model (`Value`, `Font.Bold`, `Workbooks.Add`, ...); the
//! constants in [`names`] list the ones this crate uses.

mod memory;

pub use memory::{HostSheet, MemoryHost, Picture};

use crate::error::Result;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use xlrange_engine::engine::{Address, Value};

/// Which object a property or method belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObjectPath {
    Application,
    Workbook(String),
    Sheet {
        workbook: String,
        sheet: String,
    },
    Range {
        workbook: String,
        sheet: String,
        address: Address,
    },
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectPath::Application => write!(f, "Application"),
            ObjectPath::Workbook(wb) => write!(f, "Workbooks({:?})", wb),
            ObjectPath::Sheet { workbook, sheet } => write!(f, "Workbooks({:?}).Sheets({:?})", workbook, sheet),
            ObjectPath::Range {
                workbook,
                sheet,
                address,
            } => write!(
                f,
                "Workbooks({:?}).Sheets({:?}).Range({:?})",
                workbook,
                sheet,
                address.to_string()
            ),
        }
    }
}

/// A live spreadsheet application reachable through property get/set and
/// method calls. Calls block until the host answers.
pub trait HostApplication {
    fn get(&mut self, target: &ObjectPath, property: &str) -> Result<Value>;
    fn put(&mut self, target: &ObjectPath, property: &str, value: Value) -> Result<()>;
    fn call(&mut self, target: &ObjectPath, method: &str, args: &[Value]) -> Result<Value>;
}

/// Lets the caller keep a handle on a host after giving one to a session.
impl<H: HostApplication> HostApplication for Rc<RefCell<H>> {
    fn get(&mut self, target: &ObjectPath, property: &str) -> Result<Value> {
        self.borrow_mut().get(target, property)
    }

    fn put(&mut self, target: &ObjectPath, property: &str, value: Value) -> Result<()> {
        self.borrow_mut().put(target, property, value)
    }

    fn call(&mut self, target: &ObjectPath, method: &str, args: &[Value]) -> Result<Value> {
        self.borrow_mut().call(target, method, args)
    }
}

pub mod names {
    // Application
    pub const WORKBOOKS: &str = "Workbooks";
    pub const ACTIVE_WORKBOOK: &str = "ActiveWorkbook";
    pub const ACTIVE_SHEET: &str = "ActiveSheet";
    pub const SELECTION: &str = "Selection";
    pub const CALCULATION: &str = "Calculation";
    pub const SCREEN_UPDATING: &str = "ScreenUpdating";
    pub const WORKBOOKS_ADD: &str = "Workbooks.Add";
    pub const WORKBOOKS_OPEN: &str = "Workbooks.Open";

    // Workbook
    pub const SHEETS: &str = "Sheets";
    pub const SHEETS_ADD: &str = "Sheets.Add";
    pub const CLOSE: &str = "Close";
    pub const SAVE_AS: &str = "SaveAs";

    // Sheet
    pub const NAME: &str = "Name";
    pub const SUMMARY_ROW: &str = "Outline.SummaryRow";
    pub const SHOW_LEVELS: &str = "Outline.ShowLevels";

    // Range
    pub const VALUE: &str = "Value";
    pub const FORMULA: &str = "Formula";
    pub const FORMULA_ARRAY: &str = "FormulaArray";
    pub const NUMBER_FORMAT: &str = "NumberFormat";
    pub const HORIZONTAL_ALIGNMENT: &str = "HorizontalAlignment";
    pub const VERTICAL_ALIGNMENT: &str = "VerticalAlignment";
    pub const WRAP_TEXT: &str = "WrapText";
    pub const FONT_BOLD: &str = "Font.Bold";
    pub const FONT_ITALIC: &str = "Font.Italic";
    pub const FONT_NAME: &str = "Font.Name";
    pub const FONT_SIZE: &str = "Font.Size";
    pub const FONT_COLOR: &str = "Font.Color";
    pub const INTERIOR_COLOR: &str = "Interior.Color";
    pub const COLUMN_WIDTH: &str = "ColumnWidth";
    pub const ROW_HEIGHT: &str = "RowHeight";
    pub const CURRENT_REGION: &str = "CurrentRegion";
    pub const GROUP: &str = "Rows.Group";
    pub const CLEAR_CONTENTS: &str = "ClearContents";
    pub const CLEAR_FORMATS: &str = "ClearFormats";
    pub const SELECT: &str = "Select";
    pub const AUTOFIT_ROWS: &str = "Rows.AutoFit";
    pub const AUTOFIT_COLUMNS: &str = "Columns.AutoFit";
    pub const FREEZE_PANES: &str = "FreezePanes";
    pub const INSERT_PICTURE: &str = "Pictures.Insert";
    pub const INSERT_ROWS: &str = "EntireRow.Insert";
    pub const DELETE_ROWS: &str = "EntireRow.Delete";
    pub const INSERT_COLUMNS: &str = "EntireColumn.Insert";
    pub const DELETE_COLUMNS: &str = "EntireColumn.Delete";
    pub const FILL_DOWN: &str = "FillDown";
}
