//! Deferred-File engine: nothing leaves the process until a workbook is
//! closed.
//!
//! Each sheet accumulates values, formats, row options and images in a
//! [`SheetBuffer`]. Closing a workbook reconciles its buffers into one xlsx
//! file (see [`crate::xlsx`]) and forgets it. There is no live application
//! behind this engine, so anything that needs one (opening files, the
//! selection, sorting) is unsupported.

use super::{Axis, Calculation, ClearTarget, EngineAdapter, OpenedWorkbook, SheetRef, unique_name};
use crate::config::EngineKind;
use crate::error::{Result, XlError};
use crate::xlsx::{ImageSpec, SheetBuffer, write_workbook};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use xlrange_engine::engine::{Address, CellFormat, OutlineBoundary, Rect, Value, row_levels};

const DEFAULT_WORKBOOK: &str = "Workbook.xlsx";
const DEFAULT_SHEET: &str = "Sheet";

struct BufferedWorkbook {
    name: String,
    path: Option<PathBuf>,
    sheets: Vec<SheetBuffer>,
}

impl BufferedWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }
}

pub struct DeferredFile {
    output_dir: PathBuf,
    workbooks: Vec<BufferedWorkbook>,
}

fn unique_workbook_name(taken: &[String]) -> String {
    let stem = DEFAULT_WORKBOOK.trim_end_matches(".xlsx");
    let mut candidate = DEFAULT_WORKBOOK.to_string();
    let mut i = 0;
    while taken.iter().any(|t| *t == candidate) {
        i += 1;
        candidate = format!("{}({}).xlsx", stem, i);
    }
    candidate
}

fn grid(rect: Rect, cell: impl Fn(Address) -> Value) -> Value {
    if rect.width() == 1 && rect.height() == 1 {
        return cell(Address::Cell(rect.top_left()));
    }
    Value::List(
        (rect.top..=rect.bottom)
            .map(|row| Value::List((rect.left..=rect.right).map(|col| cell(Address::cell(col, row))).collect()))
            .collect(),
    )
}

impl DeferredFile {
    /// Workbooks closed without an explicit save path are written to `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        DeferredFile {
            output_dir: output_dir.into(),
            workbooks: Vec::new(),
        }
    }

    fn workbook_index(&self, name: &str) -> Result<usize> {
        self.workbooks
            .iter()
            .position(|w| w.name == name)
            .ok_or_else(|| XlError::workbook_not_found(name))
    }

    fn buffer(&self, sheet: &SheetRef) -> Result<&SheetBuffer> {
        let wb = &self.workbooks[self.workbook_index(&sheet.workbook)?];
        wb.sheets
            .iter()
            .find(|s| s.name == sheet.sheet)
            .ok_or_else(|| XlError::sheet_not_found(&sheet.sheet))
    }

    fn buffer_mut(&mut self, sheet: &SheetRef) -> Result<&mut SheetBuffer> {
        let idx = self.workbook_index(&sheet.workbook)?;
        self.workbooks[idx]
            .sheets
            .iter_mut()
            .find(|s| s.name == sheet.sheet)
            .ok_or_else(|| XlError::sheet_not_found(&sheet.sheet))
    }

    /// Value stored at one cell. Cells covered by an array formula read as blank.
    fn cell_value(buffer: &SheetBuffer, at: Address) -> Value {
        match buffer.cell_data.get(&at) {
            Some(v) if !v.is_formula() => v.clone(),
            _ => Value::Null,
        }
    }

    fn cell_formula(buffer: &SheetBuffer, at: Address) -> Value {
        if let Some(v) = buffer.cell_data.get(&at) {
            return v.clone();
        }
        let coord = at.top_left();
        buffer
            .cell_data
            .iter()
            .find(|(key, v)| v.is_array_formula() && key.contains(coord))
            .map(|(_, v)| v.clone())
            .unwrap_or(Value::Null)
    }

    /// Drop any value keyed inside `rect`, including array formulas that overlap it.
    fn forget_values(buffer: &mut SheetBuffer, rect: Rect) {
        buffer.cell_data.retain(|key, _| {
            let k = key.rect();
            k.right < rect.left || k.left > rect.right || k.bottom < rect.top || k.top > rect.bottom
        });
    }
}

impl EngineAdapter for DeferredFile {
    fn kind(&self) -> EngineKind {
        EngineKind::File
    }

    fn workbook_names(&mut self) -> Result<Vec<String>> {
        Ok(self.workbooks.iter().map(|w| w.name.clone()).collect())
    }

    fn sheet_names(&mut self, workbook: &str) -> Result<Vec<String>> {
        let idx = self.workbook_index(workbook)?;
        Ok(self.workbooks[idx].sheet_names())
    }

    fn set_calculation(&mut self, mode: Calculation) -> Result<()> {
        // Files are recalculated by whoever opens them.
        debug!(?mode, "calculation mode has no effect on file output");
        Ok(())
    }

    fn active_range(&mut self) -> Result<(SheetRef, Address)> {
        Err(XlError::unsupported(self.kind(), "active_range"))
    }

    fn selected_cells(&mut self) -> Result<(SheetRef, Vec<Address>)> {
        Err(XlError::unsupported(self.kind(), "selected_cells"))
    }

    fn create_workbook(&mut self) -> Result<OpenedWorkbook> {
        let taken: Vec<String> = self.workbooks.iter().map(|w| w.name.clone()).collect();
        let name = unique_workbook_name(&taken);
        self.workbooks.push(BufferedWorkbook {
            name: name.clone(),
            path: None,
            sheets: vec![SheetBuffer::new(DEFAULT_SHEET)],
        });
        info!(workbook = %name, "workbook buffered");
        Ok(OpenedWorkbook {
            name,
            sheets: vec![DEFAULT_SHEET.to_string()],
        })
    }

    fn open_workbook(&mut self, _path: &Path) -> Result<OpenedWorkbook> {
        Err(XlError::unsupported(self.kind(), "open_workbook"))
    }

    /// Finalize: write every buffered sheet and drop the workbook.
    fn close_workbook(&mut self, workbook: &str) -> Result<()> {
        let idx = self.workbook_index(workbook)?;
        let wb = &self.workbooks[idx];
        let path = wb
            .path
            .clone()
            .unwrap_or_else(|| self.output_dir.join(&wb.name));
        write_workbook(&path, &wb.sheets)?;
        info!(workbook, path = %path.display(), sheets = wb.sheets.len(), "workbook finalized");
        self.workbooks.remove(idx);
        Ok(())
    }

    /// Records the destination; the file itself is written on close.
    fn save_workbook_as(&mut self, workbook: &str, path: &Path) -> Result<String> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| XlError::Config(format!("not a file path: {}", path.display())))?;
        let idx = self.workbook_index(workbook)?;
        let wb = &mut self.workbooks[idx];
        wb.name = name.clone();
        wb.path = Some(path.to_path_buf());
        Ok(name)
    }

    fn create_sheet(&mut self, workbook: &str, name: &str) -> Result<String> {
        let idx = self.workbook_index(workbook)?;
        let wb = &mut self.workbooks[idx];
        let name = unique_name(name, &wb.sheet_names());
        wb.sheets.push(SheetBuffer::new(name.clone()));
        Ok(name)
    }

    fn rename_sheet(&mut self, sheet: &SheetRef, name: &str) -> Result<String> {
        if sheet.sheet == name {
            return Ok(name.to_string());
        }
        let idx = self.workbook_index(&sheet.workbook)?;
        let wb = &mut self.workbooks[idx];
        let unique = unique_name(name, &wb.sheet_names());
        let buffer = wb
            .sheets
            .iter_mut()
            .find(|s| s.name == sheet.sheet)
            .ok_or_else(|| XlError::sheet_not_found(&sheet.sheet))?;
        buffer.name = unique.clone();
        Ok(unique)
    }

    fn get_value(&mut self, sheet: &SheetRef, address: &Address) -> Result<Value> {
        let buffer = self.buffer(sheet)?;
        Ok(grid(address.rect(), |at| Self::cell_value(buffer, at)))
    }

    fn set_value(&mut self, sheet: &SheetRef, address: &Address, value: &Value) -> Result<()> {
        if !value.is_scalar() {
            return Err(XlError::Datatype("set_value takes a scalar; use write_block for lists".to_string()));
        }
        let buffer = self.buffer_mut(sheet)?;
        let rect = address.rect();
        Self::forget_values(buffer, rect);
        for cell in address.cells() {
            buffer.cell_data.insert(cell, value.clone().sanitized());
        }
        Ok(())
    }

    fn get_formula(&mut self, sheet: &SheetRef, address: &Address) -> Result<Value> {
        let buffer = self.buffer(sheet)?;
        Ok(grid(address.rect(), |at| Self::cell_formula(buffer, at)))
    }

    fn set_formula(&mut self, sheet: &SheetRef, address: &Address, formula: &str, as_array: bool) -> Result<()> {
        let body = formula.trim_start_matches(['{', '=']).trim_end_matches('}');
        let buffer = self.buffer_mut(sheet)?;
        let rect = address.rect();
        Self::forget_values(buffer, rect);
        if as_array {
            buffer
                .cell_data
                .insert(Address::Rect(rect), Value::Text(format!("{{={}}}", body)));
        } else {
            for cell in address.cells() {
                buffer.cell_data.insert(cell, Value::Text(format!("={}", body)));
            }
        }
        Ok(())
    }

    fn format(&mut self, sheet: &SheetRef, address: &Address, format: &CellFormat) -> Result<()> {
        let buffer = self.buffer_mut(sheet)?;
        let mut style = format.clone();
        // Sizes belong to whole rows and columns.
        if let Some(width) = style.column_width.take() {
            let band = if address.rect().is_column_band() { *address } else { address.entire_column() };
            let width = CellFormat {
                column_width: Some(width),
                ..Default::default()
            };
            buffer.cell_formats.entry(band).or_default().merge(&width);
        }
        if let Some(height) = style.row_height.take() {
            let band = if address.rect().is_row_band() { *address } else { address.entire_row() };
            let height = CellFormat {
                row_height: Some(height),
                ..Default::default()
            };
            buffer.cell_formats.entry(band).or_default().merge(&height);
        }
        if !style.is_empty() {
            buffer.cell_formats.entry(*address).or_default().merge(&style);
        }
        Ok(())
    }

    fn write_block(&mut self, sheet: &SheetRef, address: &Address, rows: &[Vec<Value>]) -> Result<()> {
        let buffer = self.buffer_mut(sheet)?;
        let origin = address.top_left();
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        if rows.is_empty() || width == 0 {
            return Ok(());
        }
        let block = Rect::checked(
            origin.col as i64,
            origin.row as i64,
            origin.col as i64 + width as i64 - 1,
            origin.row as i64 + rows.len() as i64 - 1,
        )?;
        Self::forget_values(buffer, block);
        // Blanks stay as explicit entries so the block keeps its full extent.
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                let at = address.cell_at(r as u32, c as u32)?;
                buffer.cell_data.insert(at, value.clone().sanitized());
            }
        }
        debug!(sheet = %sheet, origin = %origin, rows = rows.len(), "block buffered");
        Ok(())
    }

    fn read_block(&mut self, sheet: &SheetRef, address: &Address) -> Result<Vec<Vec<Value>>> {
        let buffer = self.buffer(sheet)?;
        let rect = address.rect();
        Ok((rect.top..=rect.bottom)
            .map(|row| {
                (rect.left..=rect.right)
                    .map(|col| Self::cell_value(buffer, Address::cell(col, row)))
                    .collect()
            })
            .collect())
    }

    fn current_region(&mut self, sheet: &SheetRef, address: &Address) -> Result<Address> {
        let buffer = self.buffer(sheet)?;
        Ok(address.current_region(buffer.cell_data.keys()))
    }

    fn group(&mut self, sheet: &SheetRef, origin: &Address, boundaries: &[OutlineBoundary]) -> Result<()> {
        let buffer = self.buffer_mut(sheet)?;
        let span = origin.rect();
        for (row, level) in row_levels(boundaries) {
            let band = Address::Rect(Rect::new(1, span.top + row, 1, span.top + row)).entire_row();
            let options = buffer.cell_options.entry(band).or_default();
            options.outline_level = options.outline_level.max(level);
        }
        for boundary in boundaries {
            let first = span.top + boundary.first_row;
            if first > 1 {
                let summary = Address::Rect(Rect::new(span.left, first - 1, span.right, first - 1));
                buffer.cell_formats.entry(summary).or_default().merge(&CellFormat::bold());
            }
        }
        Ok(())
    }

    fn clear(&mut self, sheet: &SheetRef, address: &Address, target: ClearTarget) -> Result<()> {
        let buffer = self.buffer_mut(sheet)?;
        let rect = address.rect();
        match target {
            ClearTarget::Contents => Self::forget_values(buffer, rect),
            ClearTarget::Formats => buffer.cell_formats.retain(|key, _| {
                let k = key.rect();
                !(k.left >= rect.left && k.right <= rect.right && k.top >= rect.top && k.bottom <= rect.bottom)
            }),
        }
        Ok(())
    }

    fn insert_image(&mut self, sheet: &SheetRef, at: &Address, path: &Path, width: u32, height: u32) -> Result<()> {
        if !path.is_file() {
            return Err(XlError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("image not found: {}", path.display()),
            )));
        }
        let buffer = self.buffer_mut(sheet)?;
        buffer.images.push(ImageSpec {
            at: at.top_left(),
            path: path.to_path_buf(),
            width,
            height,
        });
        Ok(())
    }

    /// Only whole-sheet column fitting exists in the file format.
    fn autofit(&mut self, sheet: &SheetRef, _address: &Address, axis: Axis) -> Result<()> {
        match axis {
            Axis::Columns => {
                self.buffer_mut(sheet)?.autofit = true;
                Ok(())
            }
            Axis::Rows => Err(XlError::unsupported(self.kind(), "autofit rows")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xlrange_engine::engine::decode;

    fn engine() -> (DeferredFile, SheetRef, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut xl = DeferredFile::new(dir.path());
        let wb = xl.create_workbook().unwrap();
        let sheet = SheetRef::new(wb.name, wb.sheets[0].clone());
        (xl, sheet, dir)
    }

    #[test]
    fn test_new_workbook_has_one_sheet_and_unique_names() {
        let (mut xl, sheet, _dir) = engine();
        assert_eq!(sheet, SheetRef::new("Workbook.xlsx", "Sheet"));
        assert_eq!(xl.create_workbook().unwrap().name, "Workbook(1).xlsx");
        assert_eq!(xl.create_sheet("Workbook.xlsx", "Sheet").unwrap(), "Sheet(1)");
        assert_eq!(xl.create_sheet("Workbook.xlsx", "Sheet").unwrap(), "Sheet(2)");
    }

    #[test]
    fn test_values_read_back_from_buffers() {
        let (mut xl, sheet, _dir) = engine();
        let rows = vec![vec![Value::from(1), Value::from("x")], vec![Value::from(2), Value::from("=A1+A2")]];
        xl.write_block(&sheet, &decode("B2").unwrap(), &rows).unwrap();
        assert_eq!(
            xl.read_block(&sheet, &decode("B2:C3").unwrap()).unwrap(),
            vec![vec![Value::from(1), Value::from("x")], vec![Value::from(2), Value::Null]]
        );
        assert_eq!(xl.get_formula(&sheet, &decode("C3").unwrap()).unwrap(), Value::from("=A1+A2"));
        assert_eq!(
            xl.current_region(&sheet, &decode("B2").unwrap()).unwrap().to_string(),
            "B2:C3"
        );
    }

    #[test]
    fn test_array_formula_is_keyed_by_rectangle() {
        let (mut xl, sheet, _dir) = engine();
        xl.set_formula(&sheet, &decode("D1:D3").unwrap(), "=A1:A3*B1:B3", true).unwrap();
        let buffer = xl.buffer(&sheet).unwrap();
        assert_eq!(
            buffer.cell_data.get(&decode("D1:D3").unwrap()),
            Some(&Value::from("{=A1:A3*B1:B3}"))
        );
        assert_eq!(xl.get_formula(&sheet, &decode("D2").unwrap()).unwrap(), Value::from("{=A1:A3*B1:B3}"));
    }

    #[test]
    fn test_sizes_are_stored_on_bands() {
        let (mut xl, sheet, _dir) = engine();
        let format = CellFormat {
            column_width: Some(20.0),
            bold: Some(true),
            ..Default::default()
        };
        xl.format(&sheet, &decode("B2:C2").unwrap(), &format).unwrap();
        let buffer = xl.buffer(&sheet).unwrap();
        assert_eq!(buffer.cell_formats[&decode("B:C").unwrap()].column_width, Some(20.0));
        assert_eq!(buffer.cell_formats[&decode("B2:C2").unwrap()].bold, Some(true));
    }

    #[test]
    fn test_group_sets_row_levels_and_bold_summary() {
        let (mut xl, sheet, _dir) = engine();
        let boundaries = [
            OutlineBoundary {
                level: 0,
                first_row: 1,
                last_row: 5,
            },
            OutlineBoundary {
                level: 1,
                first_row: 2,
                last_row: 3,
            },
        ];
        xl.group(&sheet, &decode("A2:C8").unwrap(), &boundaries).unwrap();
        let buffer = xl.buffer(&sheet).unwrap();
        let level = |row: &str| buffer.cell_options.get(&decode(row).unwrap()).map(|o| o.outline_level);
        assert_eq!(level("3:3"), Some(1));
        assert_eq!(level("4:4"), Some(2));
        assert_eq!(level("7:7"), Some(1));
        assert_eq!(level("8:8"), None);
        assert_eq!(buffer.cell_formats[&decode("A2:C2").unwrap()].bold, Some(true));
        assert_eq!(buffer.cell_formats[&decode("A3:C3").unwrap()].bold, Some(true));
    }

    #[test]
    fn test_live_only_operations_are_unsupported() {
        let (mut xl, sheet, dir) = engine();
        assert!(matches!(xl.active_range(), Err(XlError::Unsupported { .. })));
        assert!(matches!(
            xl.open_workbook(&dir.path().join("x.xlsx")),
            Err(XlError::Unsupported { operation: "open_workbook", .. })
        ));
        assert!(matches!(xl.select(&sheet, &decode("A1").unwrap()), Err(XlError::Unsupported { .. })));
        assert!(matches!(xl.freeze_panes(&sheet, &decode("A1").unwrap()), Err(XlError::Unsupported { .. })));
    }

    #[test]
    fn test_close_writes_file_and_forgets_workbook() {
        let (mut xl, sheet, dir) = engine();
        xl.set_value(&sheet, &decode("A1").unwrap(), &Value::from("hello")).unwrap();
        let target = dir.path().join("report.xlsx");
        assert_eq!(xl.save_workbook_as(&sheet.workbook, &target).unwrap(), "report.xlsx");
        xl.close_workbook("report.xlsx").unwrap();
        assert!(target.is_file());
        assert!(xl.workbook_names().unwrap().is_empty());
        assert!(matches!(
            xl.sheet_names("report.xlsx"),
            Err(XlError::ElementNotFound { .. })
        ));
    }
}
