//! In-process host application.
//!
//! Keeps workbooks, sheets, cell values, formulas and formats in memory and
//! answers the same property/method names a desktop automation server does.
//! Formulas are stored verbatim and never calculated: reading the `Value` of
//! a formula cell yields `Null`.

use super::names::*;
use super::{HostApplication, ObjectPath};
use crate::adapter::Axis;
use crate::error::{Result, XlError};
use crate::xlsx::{BandOptions, ImageSpec, SheetBuffer, write_workbook};
use calamine::{Data, Reader, open_workbook_auto};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use xlrange_engine::engine::{Address, CellFormat, Coord, HAlign, MAX_COLS, MAX_ROWS, Rect, Rgb, VAlign, Value};

/// Longest sheet name a workbook accepts.
const MAX_SHEET_NAME: usize = 31;

#[derive(Clone, Debug, PartialEq)]
pub struct Picture {
    pub at: Coord,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, Default)]
struct HostCell {
    value: Value,
    formula: Option<String>,
    format: CellFormat,
}

/// One sheet of a [`MemoryHost`] workbook.
#[derive(Clone, Debug, Default)]
pub struct HostSheet {
    name: String,
    cells: BTreeMap<Coord, HostCell>,
    row_formats: BTreeMap<u32, CellFormat>,
    column_formats: BTreeMap<u32, CellFormat>,
    selection: Option<Address>,
    row_groups: Vec<(u32, u32)>,
    summary_above: bool,
    pictures: Vec<Picture>,
    frozen_at: Option<Coord>,
    shown_levels: Option<u32>,
}

impl HostSheet {
    fn new(name: impl Into<String>) -> Self {
        HostSheet {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Grouped row spans, 1-based and inclusive, in the order they were grouped.
    pub fn row_groups(&self) -> &[(u32, u32)] {
        &self.row_groups
    }

    pub fn summary_above(&self) -> bool {
        self.summary_above
    }

    pub fn pictures(&self) -> &[Picture] {
        &self.pictures
    }

    pub fn frozen_at(&self) -> Option<Coord> {
        self.frozen_at
    }

    /// Row outline levels left showing by the last `Outline.ShowLevels`.
    pub fn shown_levels(&self) -> Option<u32> {
        self.shown_levels
    }

    pub fn value_at(&self, at: Coord) -> Value {
        self.cells.get(&at).map(|c| c.value.clone()).unwrap_or(Value::Null)
    }

    pub fn formula_at(&self, at: Coord) -> Option<&str> {
        self.cells.get(&at).and_then(|c| c.formula.as_deref())
    }

    /// Column, then row, then cell format layered together.
    pub fn format_at(&self, at: Coord) -> CellFormat {
        let mut format = CellFormat::default();
        if let Some(f) = self.column_formats.get(&at.col) {
            format.merge(f);
        }
        if let Some(f) = self.row_formats.get(&at.row) {
            format.merge(f);
        }
        if let Some(c) = self.cells.get(&at) {
            format.merge(&c.format);
        }
        format
    }

    fn occupied(&self) -> Vec<Address> {
        self.cells
            .iter()
            .filter(|(_, c)| !c.value.is_null() || c.formula.is_some())
            .map(|(at, _)| Address::Cell(*at))
            .collect()
    }

    fn set_cell(&mut self, at: Coord, value: Value) {
        let cell = self.cells.entry(at).or_default();
        match value {
            Value::Text(s) if s.starts_with('=') => {
                cell.formula = Some(s);
                cell.value = Value::Null;
            }
            other => {
                cell.formula = None;
                cell.value = other.sanitized();
            }
        }
    }

    fn write_values(&mut self, rect: Rect, value: Value) -> std::result::Result<(), String> {
        let (width, height) = (rect.width() as usize, rect.height() as usize);
        match value {
            Value::List(rows) if rows.iter().all(|r| matches!(r, Value::List(_))) => {
                if rows.len() != height {
                    return Err(format!("{} rows supplied for {} rows", rows.len(), height));
                }
                for (i, row) in rows.into_iter().enumerate() {
                    let Value::List(cells) = row else { continue };
                    if cells.len() != width {
                        return Err(format!("row {} has {} cells for {} columns", i, cells.len(), width));
                    }
                    for (j, v) in cells.into_iter().enumerate() {
                        self.set_cell(Coord::new(rect.left + j as u32, rect.top + i as u32), v);
                    }
                }
            }
            Value::List(items) => {
                let horizontal = height == 1 && items.len() == width;
                let vertical = width == 1 && items.len() == height;
                if !horizontal && !vertical {
                    return Err(format!("{} values do not fit a {}x{} range", items.len(), height, width));
                }
                for (k, v) in items.into_iter().enumerate() {
                    let at = if horizontal {
                        Coord::new(rect.left + k as u32, rect.top)
                    } else {
                        Coord::new(rect.left, rect.top + k as u32)
                    };
                    self.set_cell(at, v);
                }
            }
            scalar => {
                for row in rect.top..=rect.bottom {
                    for col in rect.left..=rect.right {
                        self.set_cell(Coord::new(col, row), scalar.clone());
                    }
                }
            }
        }
        Ok(())
    }

    fn read(&self, address: &Address, cell: impl Fn(&HostSheet, Coord) -> Value) -> Value {
        let rect = address.rect();
        if rect.width() == 1 && rect.height() == 1 {
            return cell(self, rect.top_left());
        }
        Value::List(
            (rect.top..=rect.bottom)
                .map(|row| Value::List((rect.left..=rect.right).map(|col| cell(self, Coord::new(col, row))).collect()))
                .collect(),
        )
    }

    fn apply_format(&mut self, rect: Rect, format: &CellFormat) {
        if format.column_width.is_some() {
            let width = CellFormat {
                column_width: format.column_width,
                ..Default::default()
            };
            for col in rect.left..=rect.right {
                self.column_formats.entry(col).or_default().merge(&width);
            }
        }
        if format.row_height.is_some() {
            let height = CellFormat {
                row_height: format.row_height,
                ..Default::default()
            };
            for row in rect.top..=rect.bottom {
                self.row_formats.entry(row).or_default().merge(&height);
            }
        }
        let mut style = format.clone();
        style.column_width = None;
        style.row_height = None;
        if style.is_empty() {
            return;
        }
        if rect.is_column_band() {
            for col in rect.left..=rect.right {
                self.column_formats.entry(col).or_default().merge(&style);
            }
        } else if rect.is_row_band() {
            for row in rect.top..=rect.bottom {
                self.row_formats.entry(row).or_default().merge(&style);
            }
        } else {
            for row in rect.top..=rect.bottom {
                for col in rect.left..=rect.right {
                    self.cells.entry(Coord::new(col, row)).or_default().format.merge(&style);
                }
            }
        }
    }

    fn clear_formats(&mut self, rect: Rect) {
        for (at, cell) in self.cells.iter_mut() {
            if rect.contains(*at) {
                cell.format = CellFormat::default();
            }
        }
        if rect.is_row_band() {
            self.row_formats.retain(|row, _| !(rect.top..=rect.bottom).contains(row));
        }
        if rect.is_column_band() {
            self.column_formats.retain(|col, _| !(rect.left..=rect.right).contains(col));
        }
    }

    /// Insert (or delete) rows or columns `first..=last`, moving cells, band
    /// formats, pictures and row groups after them. Cells pushed off the grid
    /// are dropped.
    fn reshape(&mut self, axis: Axis, first: u32, last: u32, insert: bool) {
        let max = match axis {
            Axis::Rows => MAX_ROWS,
            Axis::Columns => MAX_COLS,
        };
        let count = last - first + 1;
        let moved = |i: u32| -> Option<u32> {
            if i < first {
                Some(i)
            } else if insert {
                Some(i + count).filter(|j| *j <= max)
            } else if i <= last {
                None
            } else {
                Some(i - count)
            }
        };
        let relocate = |at: Coord| -> Option<Coord> {
            match axis {
                Axis::Rows => moved(at.row).map(|row| Coord::new(at.col, row)),
                Axis::Columns => moved(at.col).map(|col| Coord::new(col, at.row)),
            }
        };

        self.cells = std::mem::take(&mut self.cells)
            .into_iter()
            .filter_map(|(at, cell)| Some((relocate(at)?, cell)))
            .collect();
        self.pictures.retain_mut(|p| match relocate(p.at) {
            Some(at) => {
                p.at = at;
                true
            }
            None => false,
        });
        let bands = match axis {
            Axis::Rows => &mut self.row_formats,
            Axis::Columns => &mut self.column_formats,
        };
        *bands = std::mem::take(bands)
            .into_iter()
            .filter_map(|(i, f)| Some((moved(i)?, f)))
            .collect();

        if axis == Axis::Rows {
            // A group keeps whatever part of it survives.
            self.row_groups = std::mem::take(&mut self.row_groups)
                .into_iter()
                .filter_map(|(top, bottom)| {
                    let top = match moved(top) {
                        Some(row) => row,
                        None if insert => return None,
                        None => first,
                    };
                    let bottom = match moved(bottom) {
                        Some(row) => row,
                        None if insert => max,
                        None => first - 1,
                    };
                    (top <= bottom).then_some((top, bottom))
                })
                .collect();
        }
    }

    /// Copy the top row of `rect` into the rows below it. Formulas are copied
    /// as written.
    fn fill_down(&mut self, rect: Rect) {
        for col in rect.left..=rect.right {
            let source = self.cells.get(&Coord::new(col, rect.top)).cloned().unwrap_or_default();
            for row in rect.top + 1..=rect.bottom {
                self.cells.insert(Coord::new(col, row), source.clone());
            }
        }
    }

    fn clear_contents(&mut self, rect: Rect) {
        for (at, cell) in self.cells.iter_mut() {
            if rect.contains(*at) {
                cell.value = Value::Null;
                cell.formula = None;
            }
        }
    }

    fn to_buffer(&self) -> SheetBuffer {
        let mut buffer = SheetBuffer::new(self.name.clone());
        for (at, cell) in &self.cells {
            let value = match &cell.formula {
                Some(f) => Value::Text(f.clone()),
                None => cell.value.clone(),
            };
            if !value.is_null() {
                buffer.cell_data.insert(Address::Cell(*at), value);
            }
            if !cell.format.is_empty() {
                buffer.cell_formats.insert(Address::Cell(*at), cell.format.clone());
            }
        }
        for (row, format) in &self.row_formats {
            buffer
                .cell_formats
                .insert(Address::Rect(Rect::new(1, *row, MAX_COLS, *row)), format.clone());
        }
        for (col, format) in &self.column_formats {
            buffer
                .cell_formats
                .insert(Address::Rect(Rect::new(*col, 1, *col, MAX_ROWS)), format.clone());
        }
        let mut levels: BTreeMap<u32, u32> = BTreeMap::new();
        for (first, last) in &self.row_groups {
            for row in *first..=*last {
                *levels.entry(row).or_insert(0) += 1;
            }
        }
        for (row, level) in levels {
            buffer.cell_options.insert(
                Address::Rect(Rect::new(1, row, MAX_COLS, row)),
                BandOptions { outline_level: level },
            );
        }
        buffer.images = self
            .pictures
            .iter()
            .map(|p| ImageSpec {
                at: p.at,
                path: p.path.clone(),
                width: p.width,
                height: p.height,
            })
            .collect();
        buffer
    }
}

#[derive(Clone, Debug)]
struct HostWorkbook {
    name: String,
    path: Option<PathBuf>,
    sheets: Vec<HostSheet>,
    active_sheet: usize,
}

impl HostWorkbook {
    fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets.iter().position(|s| s.name == name)
    }
}

/// A complete host application living in this process.
#[derive(Clone, Debug)]
pub struct MemoryHost {
    workbooks: Vec<HostWorkbook>,
    active: Option<usize>,
    calculation: String,
    screen_updating: bool,
    created: u32,
}

impl Default for MemoryHost {
    fn default() -> Self {
        MemoryHost {
            workbooks: Vec::new(),
            active: None,
            calculation: "automatic".to_string(),
            screen_updating: true,
            created: 0,
        }
    }
}

fn host_error(target: &ObjectPath, member: &str, message: impl Into<String>) -> XlError {
    XlError::EngineCommunication {
        message: message.into(),
        request: format!("{}.{}", target, member),
    }
}

fn expect_text<'v>(target: &ObjectPath, member: &str, value: &'v Value) -> Result<&'v str> {
    value
        .as_str()
        .ok_or_else(|| host_error(target, member, format!("expected text, got {:?}", value)))
}

fn expect_number(target: &ObjectPath, member: &str, value: &Value) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| host_error(target, member, format!("expected a number, got {:?}", value)))
}

fn expect_bool(target: &ObjectPath, member: &str, value: &Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(host_error(target, member, format!("expected a boolean, got {:?}", other))),
    }
}

fn from_cell_data(data: &Data) -> Option<Value> {
    Some(match data {
        Data::Empty => return None,
        Data::Int(i) => Value::Number(*i as f64),
        Data::Float(f) => Value::Number(*f),
        Data::String(s) => Value::Text(s.clone()),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => dt.as_datetime().map(Value::Date).unwrap_or(Value::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.clone()),
        Data::Error(e) => Value::Text(e.to_string()),
    })
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view of a sheet, for embedding code and tests.
    pub fn sheet(&self, workbook: &str, sheet: &str) -> Option<&HostSheet> {
        self.workbooks
            .iter()
            .find(|w| w.name == workbook)
            .and_then(|w| w.sheets.iter().find(|s| s.name == sheet))
    }

    pub fn calculation(&self) -> &str {
        &self.calculation
    }

    pub fn screen_updating(&self) -> bool {
        self.screen_updating
    }

    fn workbook_index(&self, name: &str) -> Result<usize> {
        self.workbooks
            .iter()
            .position(|w| w.name == name)
            .ok_or_else(|| XlError::workbook_not_found(name))
    }

    fn sheet_mut(&mut self, workbook: &str, sheet: &str) -> Result<&mut HostSheet> {
        let wb = self.workbook_index(workbook)?;
        let book = &mut self.workbooks[wb];
        let idx = book.sheet_index(sheet).ok_or_else(|| XlError::sheet_not_found(sheet))?;
        Ok(&mut book.sheets[idx])
    }

    fn sheet_ref(&self, workbook: &str, sheet: &str) -> Result<&HostSheet> {
        let wb = self.workbook_index(workbook)?;
        let book = &self.workbooks[wb];
        let idx = book.sheet_index(sheet).ok_or_else(|| XlError::sheet_not_found(sheet))?;
        Ok(&book.sheets[idx])
    }

    fn active_sheet(&self) -> Option<(&HostWorkbook, &HostSheet)> {
        let book = &self.workbooks[self.active?];
        book.sheets.get(book.active_sheet).map(|s| (book, s))
    }

    fn add_workbook(&mut self) -> String {
        loop {
            self.created += 1;
            let name = format!("Book{}", self.created);
            if self.workbook_index(&name).is_err() {
                self.push_workbook(name.clone(), None, vec![HostSheet::new("Sheet1")]);
                return name;
            }
        }
    }

    fn push_workbook(&mut self, name: String, path: Option<PathBuf>, sheets: Vec<HostSheet>) {
        self.workbooks.push(HostWorkbook {
            name,
            path,
            sheets,
            active_sheet: 0,
        });
        self.active = Some(self.workbooks.len() - 1);
    }

    fn open(&mut self, path: &Path) -> Result<String> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| XlError::Config(format!("not a file path: {}", path.display())))?;
        if let Ok(idx) = self.workbook_index(&name) {
            self.active = Some(idx);
            return Ok(name);
        }

        let mut book = open_workbook_auto(path)?;
        let mut sheets = Vec::new();
        for sheet_name in book.sheet_names() {
            let mut sheet = HostSheet::new(sheet_name.clone());
            let values = book.worksheet_range(&sheet_name)?;
            let (row0, col0) = values.start().unwrap_or((0, 0));
            for (r, c, data) in values.used_cells() {
                if let Some(value) = from_cell_data(data) {
                    sheet.set_cell(Coord::new(col0 + c as u32 + 1, row0 + r as u32 + 1), value);
                }
            }
            if let Ok(formulas) = book.worksheet_formula(&sheet_name) {
                let (row0, col0) = formulas.start().unwrap_or((0, 0));
                for (r, c, formula) in formulas.used_cells() {
                    if !formula.is_empty() {
                        let at = Coord::new(col0 + c as u32 + 1, row0 + r as u32 + 1);
                        sheet.set_cell(at, Value::Text(format!("={}", formula)));
                    }
                }
            }
            sheets.push(sheet);
        }
        if sheets.is_empty() {
            sheets.push(HostSheet::new("Sheet1"));
        }
        info!(workbook = %name, sheets = sheets.len(), "workbook loaded into memory host");
        self.push_workbook(name.clone(), Some(path.to_path_buf()), sheets);
        Ok(name)
    }

    fn get_application(&self, target: &ObjectPath, property: &str) -> Result<Value> {
        match property {
            WORKBOOKS => Ok(Value::List(
                self.workbooks.iter().map(|w| Value::Text(w.name.clone())).collect(),
            )),
            ACTIVE_WORKBOOK => Ok(self
                .active_sheet()
                .map(|(b, _)| Value::Text(b.name.clone()))
                .unwrap_or(Value::Null)),
            ACTIVE_SHEET => Ok(self
                .active_sheet()
                .map(|(_, s)| Value::Text(s.name.clone()))
                .unwrap_or(Value::Null)),
            SELECTION => Ok(self
                .active_sheet()
                .map(|(_, s)| Value::Text(s.selection.unwrap_or(Address::cell(1, 1)).to_string()))
                .unwrap_or(Value::Null)),
            CALCULATION => Ok(Value::Text(self.calculation.clone())),
            SCREEN_UPDATING => Ok(Value::Bool(self.screen_updating)),
            other => Err(host_error(target, other, "unknown property")),
        }
    }

    fn get_range(&self, target: &ObjectPath, workbook: &str, sheet: &str, address: &Address, property: &str) -> Result<Value> {
        let sh = self.sheet_ref(workbook, sheet)?;
        let format_value = |f: fn(&CellFormat) -> Value| sh.read(address, |s, at| f(&s.format_at(at)));
        match property {
            VALUE => Ok(sh.read(address, HostSheet::value_at)),
            FORMULA => Ok(sh.read(address, |s, at| match s.formula_at(at) {
                Some(f) => Value::Text(f.to_string()),
                None => s.value_at(at),
            })),
            CURRENT_REGION => Ok(Value::Text(address.current_region(&sh.occupied()).to_string())),
            NUMBER_FORMAT => Ok(format_value(|f| {
                Value::Text(f.number_format.clone().unwrap_or_else(|| "General".to_string()))
            })),
            FONT_BOLD => Ok(format_value(|f| Value::Bool(f.bold.unwrap_or(false)))),
            FONT_ITALIC => Ok(format_value(|f| Value::Bool(f.italic.unwrap_or(false)))),
            INTERIOR_COLOR => Ok(format_value(|f| {
                f.fill.map(|c| Value::Number(c.to_bgr() as f64)).unwrap_or(Value::Null)
            })),
            other => Err(host_error(target, other, "unknown property")),
        }
    }

    fn put_range(&mut self, target: &ObjectPath, workbook: &str, sheet: &str, address: &Address, property: &str, value: Value) -> Result<()> {
        let rect = address.rect();
        let format = match property {
            VALUE | FORMULA => {
                let sh = self.sheet_mut(workbook, sheet)?;
                return sh.write_values(rect, value).map_err(|m| host_error(target, property, m));
            }
            FORMULA_ARRAY => {
                let text = expect_text(target, property, &value)?.to_string();
                let sh = self.sheet_mut(workbook, sheet)?;
                for row in rect.top..=rect.bottom {
                    for col in rect.left..=rect.right {
                        let cell = sh.cells.entry(Coord::new(col, row)).or_default();
                        cell.formula = Some(format!("{{{}}}", text));
                        cell.value = Value::Null;
                    }
                }
                return Ok(());
            }
            NUMBER_FORMAT => CellFormat::number(expect_text(target, property, &value)?),
            HORIZONTAL_ALIGNMENT => CellFormat {
                h_align: Some(match expect_text(target, property, &value)? {
                    "left" => HAlign::Left,
                    "center" => HAlign::Center,
                    "right" => HAlign::Right,
                    other => return Err(host_error(target, property, format!("bad alignment '{}'", other))),
                }),
                ..Default::default()
            },
            VERTICAL_ALIGNMENT => CellFormat {
                v_align: Some(match expect_text(target, property, &value)? {
                    "top" => VAlign::Top,
                    "center" => VAlign::Middle,
                    "bottom" => VAlign::Bottom,
                    other => return Err(host_error(target, property, format!("bad alignment '{}'", other))),
                }),
                ..Default::default()
            },
            WRAP_TEXT => CellFormat {
                wrap_text: Some(expect_bool(target, property, &value)?),
                ..Default::default()
            },
            FONT_BOLD => CellFormat {
                bold: Some(expect_bool(target, property, &value)?),
                ..Default::default()
            },
            FONT_ITALIC => CellFormat {
                italic: Some(expect_bool(target, property, &value)?),
                ..Default::default()
            },
            FONT_NAME => CellFormat {
                font_name: Some(expect_text(target, property, &value)?.to_string()),
                ..Default::default()
            },
            FONT_SIZE => CellFormat {
                font_size: Some(expect_number(target, property, &value)?),
                ..Default::default()
            },
            FONT_COLOR => CellFormat {
                font_color: Some(Rgb::from_bgr(expect_number(target, property, &value)? as u32)),
                ..Default::default()
            },
            INTERIOR_COLOR => CellFormat {
                fill: Some(Rgb::from_bgr(expect_number(target, property, &value)? as u32)),
                ..Default::default()
            },
            COLUMN_WIDTH => CellFormat {
                column_width: Some(expect_number(target, property, &value)?),
                ..Default::default()
            },
            ROW_HEIGHT => CellFormat {
                row_height: Some(expect_number(target, property, &value)?),
                ..Default::default()
            },
            other => return Err(host_error(target, other, "unknown property")),
        };
        self.sheet_mut(workbook, sheet)?.apply_format(rect, &format);
        Ok(())
    }

    fn call_range(&mut self, target: &ObjectPath, workbook: &str, sheet: &str, address: &Address, method: &str, args: &[Value]) -> Result<Value> {
        let rect = address.rect();
        match method {
            GROUP => self.sheet_mut(workbook, sheet)?.row_groups.push((rect.top, rect.bottom)),
            CLEAR_CONTENTS => self.sheet_mut(workbook, sheet)?.clear_contents(rect),
            CLEAR_FORMATS => self.sheet_mut(workbook, sheet)?.clear_formats(rect),
            AUTOFIT_ROWS | AUTOFIT_COLUMNS => {
                // No text metrics here: fitting only drops explicit sizes.
                let sh = self.sheet_mut(workbook, sheet)?;
                if method == AUTOFIT_ROWS {
                    for row in rect.top..=rect.bottom {
                        if let Some(f) = sh.row_formats.get_mut(&row) {
                            f.row_height = None;
                        }
                    }
                } else {
                    for col in rect.left..=rect.right {
                        if let Some(f) = sh.column_formats.get_mut(&col) {
                            f.column_width = None;
                        }
                    }
                }
            }
            SELECT => {
                let wb = self.workbook_index(workbook)?;
                let idx = self.workbooks[wb]
                    .sheet_index(sheet)
                    .ok_or_else(|| XlError::sheet_not_found(sheet))?;
                self.workbooks[wb].active_sheet = idx;
                self.workbooks[wb].sheets[idx].selection = Some(*address);
                self.active = Some(wb);
            }
            FREEZE_PANES => self.sheet_mut(workbook, sheet)?.frozen_at = Some(rect.top_left()),
            INSERT_ROWS => self.sheet_mut(workbook, sheet)?.reshape(Axis::Rows, rect.top, rect.bottom, true),
            DELETE_ROWS => self.sheet_mut(workbook, sheet)?.reshape(Axis::Rows, rect.top, rect.bottom, false),
            INSERT_COLUMNS => self.sheet_mut(workbook, sheet)?.reshape(Axis::Columns, rect.left, rect.right, true),
            DELETE_COLUMNS => self.sheet_mut(workbook, sheet)?.reshape(Axis::Columns, rect.left, rect.right, false),
            FILL_DOWN => self.sheet_mut(workbook, sheet)?.fill_down(rect),
            INSERT_PICTURE => {
                let [path, width, height] = args else {
                    return Err(host_error(target, method, "expected path, width, height"));
                };
                let path = PathBuf::from(expect_text(target, method, path)?);
                if !path.is_file() {
                    return Err(host_error(target, method, format!("no such file: {}", path.display())));
                }
                let picture = Picture {
                    at: rect.top_left(),
                    path,
                    width: expect_number(target, method, width)? as u32,
                    height: expect_number(target, method, height)? as u32,
                };
                self.sheet_mut(workbook, sheet)?.pictures.push(picture);
            }
            other => return Err(host_error(target, other, "unknown method")),
        }
        Ok(Value::Null)
    }
}

impl HostApplication for MemoryHost {
    fn get(&mut self, target: &ObjectPath, property: &str) -> Result<Value> {
        match target {
            ObjectPath::Application => self.get_application(target, property),
            ObjectPath::Workbook(wb) => {
                let book = &self.workbooks[self.workbook_index(wb)?];
                match property {
                    SHEETS => Ok(Value::List(book.sheets.iter().map(|s| Value::Text(s.name.clone())).collect())),
                    NAME => Ok(Value::Text(book.name.clone())),
                    other => Err(host_error(target, other, "unknown property")),
                }
            }
            ObjectPath::Sheet { workbook, sheet } => match property {
                NAME => Ok(Value::Text(self.sheet_ref(workbook, sheet)?.name.clone())),
                SUMMARY_ROW => Ok(Value::Text(
                    if self.sheet_ref(workbook, sheet)?.summary_above { "above" } else { "below" }.to_string(),
                )),
                other => Err(host_error(target, other, "unknown property")),
            },
            ObjectPath::Range {
                workbook,
                sheet,
                address,
            } => self.get_range(target, workbook, sheet, address, property),
        }
    }

    fn put(&mut self, target: &ObjectPath, property: &str, value: Value) -> Result<()> {
        debug!(target = %target, property, "memory host put");
        match target {
            ObjectPath::Application => match property {
                CALCULATION => {
                    self.calculation = expect_text(target, property, &value)?.to_string();
                    Ok(())
                }
                SCREEN_UPDATING => {
                    self.screen_updating = expect_bool(target, property, &value)?;
                    Ok(())
                }
                other => Err(host_error(target, other, "read-only or unknown property")),
            },
            ObjectPath::Workbook(_) => Err(host_error(target, property, "read-only or unknown property")),
            ObjectPath::Sheet { workbook, sheet } => match property {
                NAME => {
                    let new_name = expect_text(target, property, &value)?.to_string();
                    if new_name.is_empty()
                        || new_name.chars().count() > MAX_SHEET_NAME
                        || new_name.contains(['[', ']', ':', '*', '?', '/', '\\'])
                    {
                        return Err(host_error(target, property, format!("'{}' is not a valid sheet name", new_name)));
                    }
                    let wb = self.workbook_index(workbook)?;
                    let book = &mut self.workbooks[wb];
                    let idx = book.sheet_index(sheet).ok_or_else(|| XlError::sheet_not_found(sheet))?;
                    if book.sheet_index(&new_name).is_some_and(|other| other != idx) {
                        return Err(host_error(target, property, format!("name '{}' is already taken", new_name)));
                    }
                    book.sheets[idx].name = new_name;
                    Ok(())
                }
                SUMMARY_ROW => {
                    let above = expect_text(target, property, &value)? == "above";
                    self.sheet_mut(workbook, sheet)?.summary_above = above;
                    Ok(())
                }
                other => Err(host_error(target, other, "read-only or unknown property")),
            },
            ObjectPath::Range {
                workbook,
                sheet,
                address,
            } => self.put_range(target, workbook, sheet, address, property, value),
        }
    }

    fn call(&mut self, target: &ObjectPath, method: &str, args: &[Value]) -> Result<Value> {
        debug!(target = %target, method, args = args.len(), "memory host call");
        match target {
            ObjectPath::Application => match method {
                WORKBOOKS_ADD => Ok(Value::Text(self.add_workbook())),
                WORKBOOKS_OPEN => {
                    let path = args
                        .first()
                        .ok_or_else(|| host_error(target, method, "missing path"))?;
                    let path = PathBuf::from(expect_text(target, method, path)?);
                    Ok(Value::Text(self.open(&path)?))
                }
                other => Err(host_error(target, other, "unknown method")),
            },
            ObjectPath::Workbook(wb) => {
                let idx = self.workbook_index(wb)?;
                match method {
                    CLOSE => {
                        self.workbooks.remove(idx);
                        self.active = if self.workbooks.is_empty() {
                            None
                        } else {
                            Some(self.workbooks.len() - 1)
                        };
                        Ok(Value::Null)
                    }
                    SAVE_AS => {
                        let path = args
                            .first()
                            .ok_or_else(|| host_error(target, method, "missing path"))?;
                        let path = PathBuf::from(expect_text(target, method, path)?);
                        let name = path
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .ok_or_else(|| host_error(target, method, "path has no file name"))?;
                        let buffers: Vec<SheetBuffer> = self.workbooks[idx].sheets.iter().map(HostSheet::to_buffer).collect();
                        write_workbook(&path, &buffers)?;
                        let book = &mut self.workbooks[idx];
                        book.name = name.clone();
                        book.path = Some(path);
                        Ok(Value::Text(name))
                    }
                    SHEETS_ADD => {
                        let book = &mut self.workbooks[idx];
                        let mut n = book.sheets.len() + 1;
                        while book.sheet_index(&format!("Sheet{}", n)).is_some() {
                            n += 1;
                        }
                        let name = format!("Sheet{}", n);
                        book.sheets.push(HostSheet::new(name.clone()));
                        Ok(Value::Text(name))
                    }
                    other => Err(host_error(target, other, "unknown method")),
                }
            }
            ObjectPath::Sheet { workbook, sheet } => match method {
                SHOW_LEVELS => {
                    let levels = args
                        .first()
                        .ok_or_else(|| host_error(target, method, "missing level count"))?;
                    let levels = expect_number(target, method, levels)? as u32;
                    self.sheet_mut(workbook, sheet)?.shown_levels = Some(levels);
                    Ok(Value::Null)
                }
                other => Err(host_error(target, other, "unknown method")),
            },
            ObjectPath::Range {
                workbook,
                sheet,
                address,
            } => self.call_range(target, workbook, sheet, address, method, args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(wb: &str, sheet: &str, addr: &str) -> ObjectPath {
        ObjectPath::Range {
            workbook: wb.to_string(),
            sheet: sheet.to_string(),
            address: addr.parse().unwrap(),
        }
    }

    #[test]
    fn test_values_round_trip_through_properties() {
        let mut host = MemoryHost::new();
        let wb = host.call(&ObjectPath::Application, WORKBOOKS_ADD, &[]).unwrap();
        let wb = wb.as_str().unwrap().to_string();
        let target = range(&wb, "Sheet1", "A1:B2");
        let rows = Value::List(vec![Value::from(vec![1, 2]), Value::from(vec!["a", "=A1*2"])]);
        host.put(&target, VALUE, rows).unwrap();

        let back = host.get(&target, VALUE).unwrap();
        assert_eq!(
            back,
            Value::List(vec![Value::from(vec![1, 2]), Value::List(vec![Value::from("a"), Value::Null])])
        );
        assert_eq!(
            host.get(&range(&wb, "Sheet1", "B2"), FORMULA).unwrap(),
            Value::from("=A1*2")
        );
    }

    #[test]
    fn test_shape_mismatch_is_a_host_error() {
        let mut host = MemoryHost::new();
        host.call(&ObjectPath::Application, WORKBOOKS_ADD, &[]).unwrap();
        let err = host
            .put(&range("Book1", "Sheet1", "A1:C1"), VALUE, Value::from(vec![1, 2]))
            .unwrap_err();
        assert!(matches!(err, XlError::EngineCommunication { .. }));
    }

    #[test]
    fn test_unknown_workbook_fails_closed() {
        let mut host = MemoryHost::new();
        let err = host.get(&range("Nope", "Sheet1", "A1"), VALUE).unwrap_err();
        assert!(matches!(err, XlError::ElementNotFound { .. }));
    }

    #[test]
    fn test_current_region_and_selection() {
        let mut host = MemoryHost::new();
        host.call(&ObjectPath::Application, WORKBOOKS_ADD, &[]).unwrap();
        host.put(&range("Book1", "Sheet1", "B2:C3"), VALUE, Value::from(1)).unwrap();
        assert_eq!(
            host.get(&range("Book1", "Sheet1", "B2"), CURRENT_REGION).unwrap(),
            Value::from("B2:C3")
        );
        host.call(&range("Book1", "Sheet1", "C3"), SELECT, &[]).unwrap();
        assert_eq!(host.get(&ObjectPath::Application, SELECTION).unwrap(), Value::from("C3"));
    }

    #[test]
    fn test_band_formats_layer_under_cell_formats() {
        let mut host = MemoryHost::new();
        host.call(&ObjectPath::Application, WORKBOOKS_ADD, &[]).unwrap();
        host.put(&range("Book1", "Sheet1", "2:2"), FONT_BOLD, Value::Bool(true)).unwrap();
        host.put(&range("Book1", "Sheet1", "B2"), NUMBER_FORMAT, Value::from("0.0")).unwrap();
        let sheet = host.sheet("Book1", "Sheet1").unwrap();
        let f = sheet.format_at(Coord::new(2, 2));
        assert_eq!(f.bold, Some(true));
        assert_eq!(f.number_format.as_deref(), Some("0.0"));
        assert_eq!(sheet.format_at(Coord::new(2, 3)).bold, None);
    }

    #[test]
    fn test_row_groups_follow_inserted_and_deleted_rows() {
        let mut host = MemoryHost::new();
        host.call(&ObjectPath::Application, WORKBOOKS_ADD, &[]).unwrap();
        host.call(&range("Book1", "Sheet1", "3:6"), GROUP, &[]).unwrap();
        host.put(&range("Book1", "Sheet1", "A12"), VALUE, Value::from("end")).unwrap();

        host.call(&range("Book1", "Sheet1", "1:1"), INSERT_ROWS, &[]).unwrap();
        assert_eq!(host.sheet("Book1", "Sheet1").unwrap().row_groups(), &[(4, 7)]);

        host.call(&range("Book1", "Sheet1", "6:9"), DELETE_ROWS, &[]).unwrap();
        let sheet = host.sheet("Book1", "Sheet1").unwrap();
        assert_eq!(sheet.row_groups(), &[(4, 5)]);
        assert_eq!(sheet.value_at(Coord::new(1, 9)), Value::from("end"));
        assert_eq!(sheet.value_at(Coord::new(1, 13)), Value::Null);
    }

    #[test]
    fn test_duplicate_sheet_name_is_rejected() {
        let mut host = MemoryHost::new();
        host.call(&ObjectPath::Application, WORKBOOKS_ADD, &[]).unwrap();
        let wb = ObjectPath::Workbook("Book1".into());
        let added = host.call(&wb, SHEETS_ADD, &[]).unwrap();
        assert_eq!(added, Value::from("Sheet2"));
        let sheet2 = ObjectPath::Sheet {
            workbook: "Book1".into(),
            sheet: "Sheet2".into(),
        };
        assert!(host.put(&sheet2, NAME, Value::from("Sheet1")).is_err());
        host.put(&sheet2, NAME, Value::from("Data")).unwrap();
        assert_eq!(
            host.get(&wb, SHEETS).unwrap(),
            Value::from(vec!["Sheet1", "Data"])
        );
    }
}
