use super::{Range, Session};
use crate::adapter::{ClearTarget, SheetRef};
use crate::chunked::write_chunked;
use crate::error::Result;
use tracing::debug;
use xlrange_engine::engine::{CellBlock, CellFormat, Rgb, Value};

/// Font attributes for [`Session::font_format`]. Unset fields are left alone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Font {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub name: Option<String>,
    pub size: Option<f64>,
    pub color: Option<Rgb>,
}

impl From<&Font> for CellFormat {
    fn from(font: &Font) -> Self {
        CellFormat {
            bold: font.bold,
            italic: font.italic,
            font_name: font.name.clone(),
            font_size: font.size,
            font_color: font.color,
            ..Default::default()
        }
    }
}

impl Session {
    /// The sheet behind `range`, which must be one the session knows.
    pub(crate) fn target<'r>(&self, range: &'r Range) -> Result<&'r SheetRef> {
        let sheet = range.sheet();
        self.sheet(&sheet.workbook, &sheet.sheet)?;
        Ok(sheet)
    }

    /// A scalar for one cell, a list of row lists for anything larger.
    pub fn get_value(&mut self, range: &Range) -> Result<Value> {
        let sheet = self.target(range)?;
        self.adapter.get_value(sheet, range.address())
    }

    /// Write `value` at `range`.
    ///
    /// A scalar fills every cell of the range. A list is written as a block
    /// anchored at the range's top-left (a flat list being one column) and
    /// the range covering what was written is returned.
    pub fn set_value(&mut self, range: &Range, value: impl Into<Value>) -> Result<Range> {
        let value = value.into();
        let sheet = self.target(range)?;
        if value.is_scalar() {
            self.adapter.set_value(sheet, range.address(), &value.sanitized())?;
            return Ok(range.clone());
        }
        let block = CellBlock::from_value(&value)?;
        self.write_block(range, &block)
    }

    /// Formula text per cell; literal values come back as themselves.
    pub fn get_formula(&mut self, range: &Range) -> Result<Value> {
        let sheet = self.target(range)?;
        self.adapter.get_formula(sheet, range.address())
    }

    pub fn set_formula(&mut self, range: &Range, formula: &str, as_array: bool) -> Result<()> {
        let sheet = self.target(range)?;
        self.adapter.set_formula(sheet, range.address(), formula, as_array)
    }

    pub fn format(&mut self, range: &Range, format: &CellFormat) -> Result<()> {
        let sheet = self.target(range)?;
        if format.is_empty() {
            debug!(range = %range, "empty format, nothing to apply");
            return Ok(());
        }
        self.adapter.format(sheet, range.address(), format)
    }

    /// Apply a number format code such as `"#,##0.00"`.
    pub fn number_format(&mut self, range: &Range, code: &str) -> Result<()> {
        self.format(range, &CellFormat::number(code))
    }

    pub fn font_format(&mut self, range: &Range, font: &Font) -> Result<()> {
        self.format(range, &CellFormat::from(font))
    }

    /// Interior fill.
    pub fn color(&mut self, range: &Range, fill: Rgb) -> Result<()> {
        self.format(
            range,
            &CellFormat {
                fill: Some(fill),
                ..Default::default()
            },
        )
    }

    pub fn column_width(&mut self, range: &Range, width: f64) -> Result<()> {
        self.format(
            range,
            &CellFormat {
                column_width: Some(width),
                ..Default::default()
            },
        )
    }

    pub fn row_height(&mut self, range: &Range, height: f64) -> Result<()> {
        self.format(
            range,
            &CellFormat {
                row_height: Some(height),
                ..Default::default()
            },
        )
    }

    pub fn clear_values(&mut self, range: &Range) -> Result<()> {
        let sheet = self.target(range)?;
        self.adapter.clear(sheet, range.address(), ClearTarget::Contents)
    }

    pub fn clear_formats(&mut self, range: &Range) -> Result<()> {
        let sheet = self.target(range)?;
        self.adapter.clear(sheet, range.address(), ClearTarget::Formats)
    }

    /// Values of `range` as a rectangular block.
    pub fn read_block(&mut self, range: &Range) -> Result<CellBlock> {
        let sheet = self.target(range)?;
        let rows = self.adapter.read_block(sheet, range.address())?;
        Ok(CellBlock::new(rows)?)
    }

    /// Write `block` anchored at the top-left of `range`, split under the
    /// configured cell limit. Returns the current region around the anchor.
    pub fn write_block(&mut self, range: &Range, block: &CellBlock) -> Result<Range> {
        let sheet = self.target(range)?.clone();
        let limit = self.config.cell_limit;
        let region = write_chunked(self.adapter.as_mut(), &sheet, range.address(), block, limit)?;
        Ok(Range::new(sheet, region))
    }

    /// The contiguous populated rectangle around `range`.
    pub fn current_region(&mut self, range: &Range) -> Result<Range> {
        let sheet = self.target(range)?;
        let region = self.adapter.current_region(sheet, range.address())?;
        Ok(Range::new(sheet.clone(), region))
    }
}
