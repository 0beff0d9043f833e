//! xlsx serialisation of buffered sheet contents.
//!
//! A [`SheetBuffer`] holds everything a sheet has accumulated: values keyed
//! by cell (or by rectangle for array formulas), formats keyed by cell, row
//! band or column band, per-row outline options and images. [`write_workbook`]
//! reconciles those maps into one worksheet each and writes the file in one
//! go: bands first, then cells with their band formats merged underneath.

use crate::error::{Result, XlError};
use rust_xlsxwriter::{Color, Format, FormatAlign, Image, Workbook, Worksheet};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use xlrange_engine::engine::{Address, CellFormat, Coord, HAlign, Rect, VAlign, Value};

/// Number format given to date cells that have none of their own.
pub const DEFAULT_DATE_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Deepest outline level the file format supports.
const MAX_OUTLINE_LEVEL: u32 = 7;

#[derive(Clone, Debug, PartialEq)]
pub struct ImageSpec {
    pub at: Coord,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Options that apply to whole rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BandOptions {
    pub outline_level: u32,
}

#[derive(Clone, Debug, Default)]
pub struct SheetBuffer {
    pub name: String,
    pub cell_data: BTreeMap<Address, Value>,
    pub cell_formats: BTreeMap<Address, CellFormat>,
    /// Keyed by row band ("5:5").
    pub cell_options: BTreeMap<Address, BandOptions>,
    pub images: Vec<ImageSpec>,
    /// Size columns to their contents when written.
    pub autofit: bool,
}

impl SheetBuffer {
    pub fn new(name: impl Into<String>) -> Self {
        SheetBuffer {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// How a buffered address is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    Rows(u32, u32),
    Columns(u32, u32),
    Cells(Rect),
}

pub fn classify(address: &Address) -> Target {
    let r = address.rect();
    if r.is_column_band() {
        Target::Columns(r.left, r.right)
    } else if r.is_row_band() {
        Target::Rows(r.top, r.bottom)
    } else {
        Target::Cells(r)
    }
}

/// Serialise `sheets` and move the result to `path`. The file appears
/// complete or not at all.
pub fn write_workbook(path: &Path, sheets: &[SheetBuffer]) -> Result<()> {
    let mut workbook = Workbook::new();
    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        write_sheet(worksheet, sheet)?;
    }
    let bytes = workbook.save_to_buffer()?;

    let file_name = path
        .file_name()
        .ok_or_else(|| XlError::Config(format!("not a file path: {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));
    fs::write(&tmp, &bytes)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    debug!(path = %path.display(), bytes = bytes.len(), sheets = sheets.len(), "xlsx written");
    Ok(())
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &SheetBuffer) -> Result<()> {
    worksheet.set_name(&sheet.name)?;
    worksheet.group_symbols_above(true);

    let mut row_formats: BTreeMap<u32, CellFormat> = BTreeMap::new();
    let mut col_formats: BTreeMap<u32, CellFormat> = BTreeMap::new();
    let mut cell_formats: BTreeMap<Coord, CellFormat> = BTreeMap::new();
    for (address, format) in &sheet.cell_formats {
        match classify(address) {
            Target::Rows(top, bottom) => {
                for row in top..=bottom {
                    row_formats.entry(row).or_default().merge(format);
                }
            }
            Target::Columns(left, right) => {
                for col in left..=right {
                    col_formats.entry(col).or_default().merge(format);
                }
            }
            Target::Cells(rect) => {
                for row in rect.top..=rect.bottom {
                    for col in rect.left..=rect.right {
                        cell_formats.entry(Coord::new(col, row)).or_default().merge(format);
                    }
                }
            }
        }
    }

    for (&row, format) in &row_formats {
        if has_style(format) {
            worksheet.set_row_format(row - 1, &build_format(format))?;
        }
        if let Some(height) = format.row_height {
            worksheet.set_row_height(row - 1, height)?;
        }
    }
    for (&col, format) in &col_formats {
        let col = col_index(col)?;
        if has_style(format) {
            worksheet.set_column_format(col, &build_format(format))?;
        }
        if let Some(width) = format.column_width {
            worksheet.set_column_width(col, width)?;
        }
    }

    apply_outline(worksheet, sheet)?;

    let mut written = 0usize;
    for (address, value) in &sheet.cell_data {
        let at = address.top_left();
        let format = effective_format(at, &row_formats, &col_formats, &cell_formats);
        write_value(worksheet, address, value, format)?;
        written += 1;
    }
    // Formatted cells without a value still carry their format. Cells under
    // an array formula belong to it.
    let arrays: Vec<Rect> = sheet
        .cell_data
        .keys()
        .filter(|address| !address.is_cell())
        .map(Address::rect)
        .collect();
    for coord in cell_formats.keys() {
        if sheet.cell_data.contains_key(&Address::Cell(*coord)) || arrays.iter().any(|r| r.contains(*coord)) {
            continue;
        }
        let format = effective_format(*coord, &row_formats, &col_formats, &cell_formats);
        worksheet.write_blank(coord.row - 1, col_index(coord.col)?, &build_format(&format))?;
    }

    for image in &sheet.images {
        let picture = Image::new(&image.path)?.set_scale_to_size(image.width as f64, image.height as f64, false);
        worksheet.insert_image(image.at.row - 1, col_index(image.at.col)?, &picture)?;
    }

    if sheet.autofit {
        worksheet.autofit();
    }

    debug!(sheet = %sheet.name, cells = written, images = sheet.images.len(), "sheet reconciled");
    Ok(())
}

fn effective_format(
    at: Coord,
    row_formats: &BTreeMap<u32, CellFormat>,
    col_formats: &BTreeMap<u32, CellFormat>,
    cell_formats: &BTreeMap<Coord, CellFormat>,
) -> CellFormat {
    let mut format = CellFormat::default();
    if let Some(f) = col_formats.get(&at.col) {
        format.merge(f);
    }
    if let Some(f) = row_formats.get(&at.row) {
        format.merge(f);
    }
    if let Some(f) = cell_formats.get(&at) {
        format.merge(f);
    }
    // Dimensions belong to the row/column, not the cell.
    format.column_width = None;
    format.row_height = None;
    format
}

fn write_value(worksheet: &mut Worksheet, address: &Address, value: &Value, mut format: CellFormat) -> Result<()> {
    let at = address.top_left();
    let (row, col) = (at.row - 1, col_index(at.col)?);
    match value {
        Value::Null => {
            worksheet.write_blank(row, col, &build_format(&format))?;
        }
        Value::Text(s) if s.is_empty() => {
            worksheet.write_blank(row, col, &build_format(&format))?;
        }
        Value::Text(s) if s.starts_with('{') => {
            let rect = address.rect();
            let formula = s.trim_start_matches('{').trim_end_matches('}');
            worksheet.write_array_formula_with_format(
                rect.top - 1,
                col,
                rect.bottom - 1,
                col_index(rect.right)?,
                formula,
                &build_format(&format),
            )?;
        }
        Value::Text(s) if s.starts_with('=') => {
            worksheet.write_formula_with_format(row, col, s.as_str(), &build_format(&format))?;
        }
        Value::Text(s) => {
            worksheet.write_string_with_format(row, col, s, &build_format(&format))?;
        }
        Value::Number(n) if !n.is_finite() => {
            worksheet.write_blank(row, col, &build_format(&format))?;
        }
        Value::Number(n) => {
            worksheet.write_number_with_format(row, col, *n, &build_format(&format))?;
        }
        Value::Bool(b) => {
            worksheet.write_boolean_with_format(row, col, *b, &build_format(&format))?;
        }
        Value::Date(d) => {
            if format.number_format.is_none() {
                format.number_format = Some(DEFAULT_DATE_FORMAT.to_string());
            }
            worksheet.write_datetime_with_format(row, col, d, &build_format(&format))?;
        }
        Value::List(_) => {
            return Err(XlError::Datatype(format!("nested list buffered at {}", address)));
        }
    }
    Ok(())
}

/// Turn per-row outline levels into nested row groups: one `group_rows` call
/// per contiguous run at or above each level.
fn apply_outline(worksheet: &mut Worksheet, sheet: &SheetBuffer) -> Result<()> {
    let mut levels: BTreeMap<u32, u32> = BTreeMap::new();
    for (address, options) in &sheet.cell_options {
        if options.outline_level == 0 {
            continue;
        }
        let rect = address.rect();
        for row in rect.top..=rect.bottom {
            let level = levels.entry(row).or_insert(0);
            *level = (*level).max(options.outline_level);
        }
    }
    let deepest = levels.values().copied().max().unwrap_or(0);
    if deepest > MAX_OUTLINE_LEVEL {
        warn!(sheet = %sheet.name, deepest, "outline deeper than {} levels is truncated", MAX_OUTLINE_LEVEL);
    }

    for level in 1..=deepest.min(MAX_OUTLINE_LEVEL) {
        let mut run: Option<(u32, u32)> = None;
        for (&row, &row_level) in &levels {
            if row_level < level {
                continue;
            }
            run = match run {
                Some((first, last)) if last + 1 == row => Some((first, row)),
                Some((first, last)) => {
                    worksheet.group_rows(first - 1, last - 1)?;
                    Some((row, row))
                }
                None => Some((row, row)),
            };
        }
        if let Some((first, last)) = run {
            worksheet.group_rows(first - 1, last - 1)?;
        }
    }
    Ok(())
}

fn col_index(col: u32) -> Result<u16> {
    u16::try_from(col - 1).map_err(|_| XlError::Datatype(format!("column {} out of range", col)))
}

fn has_style(format: &CellFormat) -> bool {
    let mut style = format.clone();
    style.column_width = None;
    style.row_height = None;
    !style.is_empty()
}

fn build_format(format: &CellFormat) -> Format {
    let mut out = Format::new();
    if let Some(num) = &format.number_format {
        out = out.set_num_format(num);
    }
    if format.bold == Some(true) {
        out = out.set_bold();
    }
    if format.italic == Some(true) {
        out = out.set_italic();
    }
    if let Some(name) = &format.font_name {
        out = out.set_font_name(name);
    }
    if let Some(size) = format.font_size {
        out = out.set_font_size(size);
    }
    if let Some(color) = format.font_color {
        out = out.set_font_color(Color::RGB(color.to_hex()));
    }
    if let Some(fill) = format.fill {
        out = out.set_background_color(Color::RGB(fill.to_hex()));
    }
    out = match format.h_align {
        Some(HAlign::Left) => out.set_align(FormatAlign::Left),
        Some(HAlign::Center) => out.set_align(FormatAlign::Center),
        Some(HAlign::Right) => out.set_align(FormatAlign::Right),
        None => out,
    };
    out = match format.v_align {
        Some(VAlign::Top) => out.set_align(FormatAlign::Top),
        Some(VAlign::Middle) => out.set_align(FormatAlign::VerticalCenter),
        Some(VAlign::Bottom) => out.set_align(FormatAlign::Bottom),
        None => out,
    };
    if format.wrap_text == Some(true) {
        out = out.set_text_wrap();
    }
    out
}
