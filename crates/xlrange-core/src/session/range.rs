use crate::adapter::SheetRef;
use crate::error::Result;
use std::fmt;
use xlrange_engine::engine::{Address, AddressError, Coord, Rect, Resize, decode};

/// An address on a named sheet.
///
/// Navigation never touches the backend: every method computes a new range
/// from the current rectangle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Range {
    sheet: SheetRef,
    address: Address,
}

impl Range {
    pub fn new(sheet: SheetRef, address: Address) -> Self {
        Range { sheet, address }
    }

    pub fn sheet(&self) -> &SheetRef {
        &self.sheet
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    fn with(&self, address: Address) -> Range {
        Range {
            sheet: self.sheet.clone(),
            address,
        }
    }

    /// Another range on the same sheet, from A1 text.
    pub fn arng(&self, address: &str) -> Result<Range> {
        Ok(self.with(decode(address)?))
    }

    /// A whole row (`row` only), a whole column (`col` only) or one cell.
    pub fn arng_at(&self, row: Option<u32>, col: Option<u32>) -> Result<Range> {
        Ok(self.with(address_at(row, col)?))
    }

    pub fn offset(&self, d_row: i64, d_col: i64) -> Result<Range> {
        Ok(self.with(self.address.offset(d_row, d_col)?))
    }

    pub fn resize(&self, rows: i64, cols: i64, mode: Resize) -> Result<Range> {
        Ok(self.with(self.address.resize(rows, cols, mode)?))
    }

    pub fn row(&self, idx: i64) -> Result<Range> {
        Ok(self.with(self.address.row(idx)?))
    }

    pub fn column(&self, idx: i64) -> Result<Range> {
        Ok(self.with(self.address.column(idx)?))
    }

    pub fn subrange(&self, top: u32, left: u32, n_rows: u32, n_cols: u32) -> Result<Range> {
        Ok(self.with(self.address.subrange(top, left, n_rows, n_cols)?))
    }

    /// Cell at 0-based `(r, c)` from the top-left.
    pub fn cell(&self, r: u32, c: u32) -> Result<Range> {
        Ok(self.with(self.address.cell_at(r, c)?))
    }

    pub fn entire_row(&self) -> Range {
        self.with(self.address.entire_row())
    }

    pub fn entire_column(&self) -> Range {
        self.with(self.address.entire_column())
    }

    /// `(cols, rows)`.
    pub fn size(&self) -> (u32, u32) {
        self.address.size()
    }

    pub fn coords(&self) -> (u32, u32, u32, u32) {
        self.address.coords()
    }

    /// Every single-cell range inside this one, row by row.
    pub fn cells(&self) -> Vec<Range> {
        self.address.cells().into_iter().map(|a| self.with(a)).collect()
    }

    pub(crate) fn set(&mut self, sheet: SheetRef, address: Address) {
        self.sheet = sheet;
        self.address = address;
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.sheet, self.address)
    }
}

pub(crate) fn address_at(row: Option<u32>, col: Option<u32>) -> std::result::Result<Address, AddressError> {
    match (row, col) {
        (Some(r), Some(c)) => Ok(Address::Cell(Coord::checked(c as i64, r as i64)?)),
        (Some(r), None) => {
            Coord::checked(1, r as i64)?;
            Ok(Address::Rect(Rect::new(1, r, 1, r)).entire_row())
        }
        (None, Some(c)) => {
            Coord::checked(c as i64, 1)?;
            Ok(Address::Rect(Rect::new(c, 1, c, 1)).entire_column())
        }
        (None, None) => Err(AddressError::Empty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(addr: &str) -> Range {
        Range::new(SheetRef::new("Book1", "Sheet1"), decode(addr).unwrap())
    }

    #[test]
    fn test_navigation_keeps_the_sheet() {
        let r = range("B2:D5");
        let moved = r.offset(1, 1).unwrap();
        assert_eq!(moved.sheet(), r.sheet());
        assert_eq!(moved.address().to_string(), "C3:E6");
        assert_eq!(r.row(-1).unwrap().address().to_string(), "B5:D5");
        assert_eq!(r.cell(1, 2).unwrap().address().to_string(), "D3");
        assert_eq!(r.entire_column().address().to_string(), "B:D");
    }

    #[test]
    fn test_arng_at_builds_bands_and_cells() {
        let r = range("A1");
        assert_eq!(r.arng_at(Some(3), None).unwrap().address().to_string(), "3:3");
        assert_eq!(r.arng_at(None, Some(3)).unwrap().address().to_string(), "C:C");
        assert_eq!(r.arng_at(Some(2), Some(3)).unwrap().address().to_string(), "C2");
        assert!(r.arng_at(None, None).is_err());
        assert!(r.arng_at(Some(0), None).is_err());
    }

    #[test]
    fn test_display_names_sheet_and_address() {
        assert_eq!(range("A1:B2").to_string(), "[Book1]Sheet1!A1:B2");
    }
}
