//! Live-Automation engine: primitives map onto property access and method
//! calls against a running host's object model.
//!
//! Sort, goal seek and conditional highlighting are not wired up on this
//! engine and report [`XlError::Unsupported`].

use super::{
    Axis, Calculation, ClearTarget, EngineAdapter, OpenedWorkbook, SheetRef, boundary_rows, into_rows, text_of,
    unique_name,
};
use crate::config::EngineKind;
use crate::error::{Result, XlError};
use crate::host::names::*;
use crate::host::{HostApplication, ObjectPath};
use std::path::Path;
use tracing::{debug, info};
use xlrange_engine::engine::{Address, CellFormat, HAlign, OutlineBoundary, Rect, Resize, VAlign, Value, decode};

pub struct LiveAutomation {
    host: Box<dyn HostApplication>,
}

fn range_path(sheet: &SheetRef, address: &Address) -> ObjectPath {
    ObjectPath::Range {
        workbook: sheet.workbook.clone(),
        sheet: sheet.sheet.clone(),
        address: *address,
    }
}

fn sheet_path(sheet: &SheetRef) -> ObjectPath {
    ObjectPath::Sheet {
        workbook: sheet.workbook.clone(),
        sheet: sheet.sheet.clone(),
    }
}

fn text_list(value: Value) -> Vec<String> {
    match value {
        Value::List(items) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::Text(s) => Some(s),
                _ => None,
            })
            .collect(),
        Value::Text(s) => vec![s],
        _ => Vec::new(),
    }
}

/// Property/value pairs for every attribute set in `format`.
fn format_properties(format: &CellFormat) -> Vec<(&'static str, Value)> {
    let mut props = Vec::new();
    if let Some(nf) = &format.number_format {
        props.push((NUMBER_FORMAT, Value::from(nf.as_str())));
    }
    if let Some(h) = format.h_align {
        let h = match h {
            HAlign::Left => "left",
            HAlign::Center => "center",
            HAlign::Right => "right",
        };
        props.push((HORIZONTAL_ALIGNMENT, Value::from(h)));
    }
    if let Some(v) = format.v_align {
        let v = match v {
            VAlign::Top => "top",
            VAlign::Middle => "center",
            VAlign::Bottom => "bottom",
        };
        props.push((VERTICAL_ALIGNMENT, Value::from(v)));
    }
    if let Some(wrap) = format.wrap_text {
        props.push((WRAP_TEXT, Value::Bool(wrap)));
    }
    if let Some(bold) = format.bold {
        props.push((FONT_BOLD, Value::Bool(bold)));
    }
    if let Some(italic) = format.italic {
        props.push((FONT_ITALIC, Value::Bool(italic)));
    }
    if let Some(name) = &format.font_name {
        props.push((FONT_NAME, Value::from(name.as_str())));
    }
    if let Some(size) = format.font_size {
        props.push((FONT_SIZE, Value::Number(size)));
    }
    if let Some(color) = format.font_color {
        props.push((FONT_COLOR, Value::Number(color.to_bgr() as f64)));
    }
    if let Some(fill) = format.fill {
        props.push((INTERIOR_COLOR, Value::Number(fill.to_bgr() as f64)));
    }
    if let Some(width) = format.column_width {
        props.push((COLUMN_WIDTH, Value::Number(width)));
    }
    if let Some(height) = format.row_height {
        props.push((ROW_HEIGHT, Value::Number(height)));
    }
    props
}

impl LiveAutomation {
    pub fn new(host: Box<dyn HostApplication>) -> Self {
        LiveAutomation { host }
    }

    /// Give `sheet` the first of `base`, `base(1)`, `base(2)`... not already
    /// used in its workbook. A name the host refuses is an error.
    fn assign_unique_name(&mut self, sheet: &SheetRef, base: &str) -> Result<String> {
        let taken: Vec<String> = self
            .sheet_names(&sheet.workbook)?
            .into_iter()
            .filter(|name| *name != sheet.sheet)
            .collect();
        let name = unique_name(base, &taken);
        self.host.put(&sheet_path(sheet), NAME, Value::from(name.as_str()))?;
        debug!(from = %sheet.sheet, to = %name, "sheet renamed");
        Ok(name)
    }

    fn active_names(&mut self) -> Result<SheetRef> {
        let workbook = self.host.get(&ObjectPath::Application, ACTIVE_WORKBOOK)?;
        let sheet = self.host.get(&ObjectPath::Application, ACTIVE_SHEET)?;
        match (workbook, sheet) {
            (Value::Text(wb), Value::Text(sh)) => Ok(SheetRef::new(wb, sh)),
            _ => Err(XlError::NoWorkbookOpen),
        }
    }

    fn selection_text(&mut self) -> Result<String> {
        match self.host.get(&ObjectPath::Application, SELECTION)? {
            Value::Text(s) => Ok(s),
            _ => Err(XlError::NoWorkbookOpen),
        }
    }

    fn describe(&mut self, name: String) -> Result<OpenedWorkbook> {
        let sheets = text_list(self.host.get(&ObjectPath::Workbook(name.clone()), SHEETS)?);
        Ok(OpenedWorkbook { name, sheets })
    }
}

impl EngineAdapter for LiveAutomation {
    fn kind(&self) -> EngineKind {
        EngineKind::Automation
    }

    fn workbook_names(&mut self) -> Result<Vec<String>> {
        Ok(text_list(self.host.get(&ObjectPath::Application, WORKBOOKS)?))
    }

    fn sheet_names(&mut self, workbook: &str) -> Result<Vec<String>> {
        Ok(text_list(self.host.get(&ObjectPath::Workbook(workbook.to_string()), SHEETS)?))
    }

    fn set_calculation(&mut self, mode: Calculation) -> Result<()> {
        let (calc, updating) = match mode {
            Calculation::Manual => ("manual", false),
            Calculation::Automatic => ("automatic", true),
        };
        self.host.put(&ObjectPath::Application, CALCULATION, Value::from(calc))?;
        self.host
            .put(&ObjectPath::Application, SCREEN_UPDATING, Value::Bool(updating))
    }

    fn active_range(&mut self) -> Result<(SheetRef, Address)> {
        let at = self.active_names()?;
        let selection = self.selection_text()?;
        let first = selection.split(',').next().unwrap_or_default();
        Ok((at, decode(first)?))
    }

    fn selected_cells(&mut self) -> Result<(SheetRef, Vec<Address>)> {
        let at = self.active_names()?;
        let selection = self.selection_text()?;
        let cells = super::parse_areas(&selection)?
            .iter()
            .flat_map(Address::cells)
            .collect();
        Ok((at, cells))
    }

    fn create_workbook(&mut self) -> Result<OpenedWorkbook> {
        let name = text_of(
            self.host.call(&ObjectPath::Application, WORKBOOKS_ADD, &[])?,
            "workbook name",
        )?;
        info!(workbook = %name, "workbook created");
        self.describe(name)
    }

    fn open_workbook(&mut self, path: &Path) -> Result<OpenedWorkbook> {
        let absolute = std::path::absolute(path)?;
        let arg = Value::from(absolute.to_string_lossy().as_ref());
        let name = text_of(
            self.host.call(&ObjectPath::Application, WORKBOOKS_OPEN, &[arg])?,
            "workbook name",
        )?;
        info!(workbook = %name, path = %absolute.display(), "workbook opened");
        self.describe(name)
    }

    fn close_workbook(&mut self, workbook: &str) -> Result<()> {
        self.host
            .call(&ObjectPath::Workbook(workbook.to_string()), CLOSE, &[])?;
        info!(workbook, "workbook closed");
        Ok(())
    }

    fn save_workbook_as(&mut self, workbook: &str, path: &Path) -> Result<String> {
        let absolute = std::path::absolute(path)?;
        let arg = Value::from(absolute.to_string_lossy().as_ref());
        let name = text_of(
            self.host
                .call(&ObjectPath::Workbook(workbook.to_string()), SAVE_AS, &[arg])?,
            "workbook name",
        )?;
        info!(workbook, saved_as = %name, "workbook saved");
        Ok(name)
    }

    fn create_sheet(&mut self, workbook: &str, name: &str) -> Result<String> {
        let added = text_of(
            self.host
                .call(&ObjectPath::Workbook(workbook.to_string()), SHEETS_ADD, &[])?,
            "sheet name",
        )?;
        if added == name {
            return Ok(added);
        }
        self.assign_unique_name(&SheetRef::new(workbook, added), name)
    }

    fn rename_sheet(&mut self, sheet: &SheetRef, name: &str) -> Result<String> {
        if sheet.sheet == name {
            return Ok(name.to_string());
        }
        self.assign_unique_name(sheet, name)
    }

    fn get_value(&mut self, sheet: &SheetRef, address: &Address) -> Result<Value> {
        self.host.get(&range_path(sheet, address), VALUE)
    }

    fn set_value(&mut self, sheet: &SheetRef, address: &Address, value: &Value) -> Result<()> {
        if !value.is_scalar() {
            return Err(XlError::Datatype("set_value takes a scalar; use write_block for lists".to_string()));
        }
        self.host.put(&range_path(sheet, address), VALUE, value.clone())
    }

    fn get_formula(&mut self, sheet: &SheetRef, address: &Address) -> Result<Value> {
        self.host.get(&range_path(sheet, address), FORMULA)
    }

    fn set_formula(&mut self, sheet: &SheetRef, address: &Address, formula: &str, as_array: bool) -> Result<()> {
        let property = if as_array { FORMULA_ARRAY } else { FORMULA };
        self.host
            .put(&range_path(sheet, address), property, Value::from(formula))
    }

    fn format(&mut self, sheet: &SheetRef, address: &Address, format: &CellFormat) -> Result<()> {
        let target = range_path(sheet, address);
        for (property, value) in format_properties(format) {
            self.host.put(&target, property, value)?;
        }
        Ok(())
    }

    fn write_block(&mut self, sheet: &SheetRef, address: &Address, rows: &[Vec<Value>]) -> Result<()> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if width == 0 {
            return Ok(());
        }
        let target = address.resize(rows.len() as i64, width as i64, Resize::Absolute)?;
        let grid = Value::List(rows.iter().map(|r| Value::List(r.clone())).collect());
        debug!(sheet = %sheet, target = %target, cells = rows.len() * width, "block written");
        self.host.put(&range_path(sheet, &target), VALUE, grid)
    }

    fn read_block(&mut self, sheet: &SheetRef, address: &Address) -> Result<Vec<Vec<Value>>> {
        let value = self.get_value(sheet, address)?;
        let (cols, _) = address.size();
        Ok(into_rows(value, cols as usize))
    }

    fn current_region(&mut self, sheet: &SheetRef, address: &Address) -> Result<Address> {
        let text = text_of(
            self.host.get(&range_path(sheet, address), CURRENT_REGION)?,
            "region address",
        )?;
        Ok(decode(&text)?)
    }

    fn group(&mut self, sheet: &SheetRef, origin: &Address, boundaries: &[OutlineBoundary]) -> Result<()> {
        self.host.put(&sheet_path(sheet), SUMMARY_ROW, Value::from("above"))?;
        let span = origin.rect();
        for boundary in boundaries {
            let (first, last) = boundary_rows(origin, boundary);
            let rows = Address::Rect(Rect::new(span.left, first, span.right, last)).entire_row();
            self.host.call(&range_path(sheet, &rows), GROUP, &[])?;
            if first > 1 {
                let summary = Address::Rect(Rect::new(span.left, first - 1, span.right, first - 1));
                self.host
                    .put(&range_path(sheet, &summary), FONT_BOLD, Value::Bool(true))?;
            }
        }
        Ok(())
    }

    fn clear(&mut self, sheet: &SheetRef, address: &Address, target: ClearTarget) -> Result<()> {
        let method = match target {
            ClearTarget::Contents => CLEAR_CONTENTS,
            ClearTarget::Formats => CLEAR_FORMATS,
        };
        self.host.call(&range_path(sheet, address), method, &[])?;
        Ok(())
    }

    fn select(&mut self, sheet: &SheetRef, address: &Address) -> Result<()> {
        self.host.call(&range_path(sheet, address), SELECT, &[])?;
        Ok(())
    }

    fn insert_image(&mut self, sheet: &SheetRef, at: &Address, path: &Path, width: u32, height: u32) -> Result<()> {
        let absolute = std::path::absolute(path)?;
        let args = [
            Value::from(absolute.to_string_lossy().as_ref()),
            Value::Number(width as f64),
            Value::Number(height as f64),
        ];
        self.host.call(&range_path(sheet, at), INSERT_PICTURE, &args)?;
        Ok(())
    }

    fn autofit(&mut self, sheet: &SheetRef, address: &Address, axis: Axis) -> Result<()> {
        let method = match axis {
            Axis::Rows => AUTOFIT_ROWS,
            Axis::Columns => AUTOFIT_COLUMNS,
        };
        self.host.call(&range_path(sheet, address), method, &[])?;
        Ok(())
    }

    fn freeze_panes(&mut self, sheet: &SheetRef, at: &Address) -> Result<()> {
        let target = range_path(sheet, at);
        self.host.call(&target, SELECT, &[])?;
        self.host.call(&target, FREEZE_PANES, &[])?;
        Ok(())
    }

    fn insert(&mut self, sheet: &SheetRef, address: &Address, axis: Axis) -> Result<()> {
        let method = match axis {
            Axis::Rows => INSERT_ROWS,
            Axis::Columns => INSERT_COLUMNS,
        };
        self.host.call(&range_path(sheet, address), method, &[])?;
        Ok(())
    }

    fn delete(&mut self, sheet: &SheetRef, address: &Address, axis: Axis) -> Result<()> {
        let method = match axis {
            Axis::Rows => DELETE_ROWS,
            Axis::Columns => DELETE_COLUMNS,
        };
        self.host.call(&range_path(sheet, address), method, &[])?;
        Ok(())
    }

    fn fill_down(&mut self, sheet: &SheetRef, address: &Address) -> Result<()> {
        self.host.call(&range_path(sheet, address), FILL_DOWN, &[])?;
        Ok(())
    }

    fn show_levels(&mut self, sheet: &SheetRef, levels: u32) -> Result<()> {
        self.host
            .call(&sheet_path(sheet), SHOW_LEVELS, &[Value::Number(levels as f64)])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{HighlightRule, SortKey};
    use crate::host::MemoryHost;
    use std::cell::RefCell;
    use std::rc::Rc;
    use xlrange_engine::engine::{Coord, Rgb};

    fn engine() -> (LiveAutomation, Rc<RefCell<MemoryHost>>) {
        let host = Rc::new(RefCell::new(MemoryHost::new()));
        (LiveAutomation::new(Box::new(host.clone())), host)
    }

    #[test]
    fn test_create_sheet_makes_names_unique() {
        let (mut xl, _) = engine();
        let wb = xl.create_workbook().unwrap();
        assert_eq!(wb.sheets, vec!["Sheet1".to_string()]);
        assert_eq!(xl.create_sheet(&wb.name, "Data").unwrap(), "Data");
        assert_eq!(xl.create_sheet(&wb.name, "Data").unwrap(), "Data(1)");
        assert_eq!(xl.create_sheet(&wb.name, "Data").unwrap(), "Data(2)");
        assert_eq!(xl.sheet_names(&wb.name).unwrap(), vec!["Sheet1", "Data", "Data(1)", "Data(2)"]);
    }

    #[test]
    fn test_refused_sheet_name_is_reported() {
        let (mut xl, _) = engine();
        let wb = xl.create_workbook().unwrap();
        let sheet = SheetRef::new(&wb.name, "Sheet1");
        let err = xl.rename_sheet(&sheet, "Q1/Q2").unwrap_err();
        assert!(matches!(err, XlError::EngineCommunication { .. }));
        assert_eq!(xl.sheet_names(&wb.name).unwrap(), vec!["Sheet1"]);
    }

    #[test]
    fn test_format_colors_travel_as_bgr() {
        let (mut xl, host) = engine();
        let wb = xl.create_workbook().unwrap();
        let sheet = SheetRef::new(&wb.name, "Sheet1");
        let format = CellFormat {
            fill: Some(Rgb(0x11, 0x22, 0x33)),
            ..Default::default()
        };
        xl.format(&sheet, &decode("A1").unwrap(), &format).unwrap();
        let color = xl
            .host
            .get(&range_path(&sheet, &decode("A1").unwrap()), INTERIOR_COLOR)
            .unwrap();
        assert_eq!(color, Value::Number(0x332211 as f64));
        let host = host.borrow();
        let stored = host.sheet(&wb.name, "Sheet1").unwrap().format_at(Coord::new(1, 1));
        assert_eq!(stored.fill, Some(Rgb(0x11, 0x22, 0x33)));
    }

    #[test]
    fn test_group_records_rows_and_bold_summary() {
        let (mut xl, host) = engine();
        let wb = xl.create_workbook().unwrap();
        let sheet = SheetRef::new(&wb.name, "Sheet1");
        let boundaries = [OutlineBoundary {
            level: 0,
            first_row: 1,
            last_row: 3,
        }];
        xl.group(&sheet, &decode("A2:B6").unwrap(), &boundaries).unwrap();
        let host = host.borrow();
        let s = host.sheet(&wb.name, "Sheet1").unwrap();
        assert_eq!(s.row_groups(), &[(3, 5)]);
        assert!(s.summary_above());
        assert_eq!(s.format_at(Coord::new(1, 2)).bold, Some(true));
    }

    #[test]
    fn test_unbacked_end_effects_are_unsupported() {
        let (mut xl, _) = engine();
        let sheet = SheetRef::new("Book1", "Sheet1");
        let a1 = decode("A1").unwrap();
        assert!(matches!(
            xl.sort(&sheet, &a1, &[SortKey::ascending("x")], true),
            Err(XlError::Unsupported { operation: "sort", .. })
        ));
        assert!(matches!(xl.goal_seek(&sheet, &a1, 1.0, &a1), Err(XlError::Unsupported { .. })));
        let rule = HighlightRule {
            condition: crate::adapter::Comparison::Greater,
            threshold: 0.0,
            fill: Rgb::RED,
        };
        assert!(matches!(xl.highlight(&sheet, &a1, &rule), Err(XlError::Unsupported { .. })));
    }

    #[test]
    fn test_active_range_without_workbook() {
        let (mut xl, _) = engine();
        assert!(matches!(xl.active_range(), Err(XlError::NoWorkbookOpen)));
    }
}
