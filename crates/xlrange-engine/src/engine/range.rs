//! Range navigation as pure coordinate transforms.
//!
//! Every operation takes the current [`Address`] and returns a new one; none
//! of them look at sheet contents except [`Address::current_region`], which is
//! handed the set of populated addresses explicitly.

use super::address::{Address, AddressError, Coord, MAX_COLS, MAX_ROWS, Rect};

/// How [`Address::resize`] interprets its arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resize {
    /// Keep the top-left and become exactly `rows x cols` (at least 1x1).
    Absolute,
    /// Add `rows`/`cols` to the current extent, never shrinking past the top-left.
    Relative,
}

impl Address {
    /// Canonical `(left, top, right, bottom)`; a single cell is a degenerate rectangle.
    pub fn coords(&self) -> (u32, u32, u32, u32) {
        let r = self.rect();
        (r.left, r.top, r.right, r.bottom)
    }

    /// `(cols, rows)`.
    pub fn size(&self) -> (u32, u32) {
        let r = self.rect();
        (r.width(), r.height())
    }

    pub fn offset(&self, d_row: i64, d_col: i64) -> Result<Address, AddressError> {
        match *self {
            Address::Cell(c) => Ok(Address::Cell(Coord::checked(
                c.col as i64 + d_col,
                c.row as i64 + d_row,
            )?)),
            Address::Rect(r) => Ok(Address::Rect(Rect::checked(
                r.left as i64 + d_col,
                r.top as i64 + d_row,
                r.right as i64 + d_col,
                r.bottom as i64 + d_row,
            )?)),
        }
    }

    pub fn resize(&self, rows: i64, cols: i64, mode: Resize) -> Result<Address, AddressError> {
        let r = self.rect();
        let (left, top) = (r.left as i64, r.top as i64);
        let (right, bottom) = match mode {
            Resize::Absolute => (left + (cols - 1).max(0), top + (rows - 1).max(0)),
            Resize::Relative => (
                left.max(r.right as i64 + cols),
                top.max(r.bottom as i64 + rows),
            ),
        };
        Ok(Address::Rect(Rect::checked(left, top, right, bottom)?))
    }

    /// One row of the rectangle, 1-based; negative counts from the bottom
    /// (`-1` is the last row). Identity on a single cell.
    pub fn row(&self, idx: i64) -> Result<Address, AddressError> {
        let Address::Rect(r) = *self else {
            return Ok(*self);
        };
        let row = pick(r.top, r.bottom, idx, MAX_ROWS, |row| AddressError::OutOfBounds {
            col: r.left as i64,
            row,
        })?;
        Ok(Address::Rect(Rect::new(r.left, row, r.right, row)))
    }

    /// One column of the rectangle, 1-based; negative counts from the right.
    /// Identity on a single cell.
    pub fn column(&self, idx: i64) -> Result<Address, AddressError> {
        let Address::Rect(r) = *self else {
            return Ok(*self);
        };
        let col = pick(r.left, r.right, idx, MAX_COLS, |col| AddressError::OutOfBounds {
            col,
            row: r.top as i64,
        })?;
        Ok(Address::Rect(Rect::new(col, r.top, col, r.bottom)))
    }

    /// Rectangle of `n_rows x n_cols` whose top-left sits `top`/`left` cells
    /// (0-based) below and right of the current top-left.
    pub fn subrange(&self, top: u32, left: u32, n_rows: u32, n_cols: u32) -> Result<Address, AddressError> {
        let origin = self.top_left();
        let l = origin.col as i64 + left as i64;
        let t = origin.row as i64 + top as i64;
        Ok(Address::Rect(Rect::checked(
            l,
            t,
            l + n_cols.max(1) as i64 - 1,
            t + n_rows.max(1) as i64 - 1,
        )?))
    }

    /// Single cell at 0-based `(r, c)` from the top-left.
    pub fn cell_at(&self, r: u32, c: u32) -> Result<Address, AddressError> {
        let origin = self.top_left();
        Ok(Address::Cell(Coord::checked(
            origin.col as i64 + c as i64,
            origin.row as i64 + r as i64,
        )?))
    }

    pub fn entire_row(&self) -> Address {
        let r = self.rect();
        Address::Rect(Rect::new(1, r.top, MAX_COLS, r.bottom))
    }

    pub fn entire_column(&self) -> Address {
        let r = self.rect();
        Address::Rect(Rect::new(r.left, 1, r.right, MAX_ROWS))
    }

    /// Grow outward while any populated address touches the rectangle, corners
    /// included, until nothing more can be absorbed.
    pub fn current_region<'a, I>(&self, occupied: I) -> Address
    where
        I: IntoIterator<Item = &'a Address>,
    {
        let mut pending: Vec<Rect> = occupied.into_iter().map(Address::rect).collect();
        let mut region = self.rect();
        loop {
            let before = pending.len();
            pending.retain(|cand| {
                if touches(&region, cand) {
                    region = union(&region, cand);
                    false
                } else {
                    true
                }
            });
            if pending.len() == before {
                break;
            }
        }
        Address::Rect(region)
    }

    /// Every single-cell address inside the rectangle, row by row.
    pub fn cells(&self) -> Vec<Address> {
        let r = self.rect();
        let mut out = Vec::with_capacity((r.width() as usize) * (r.height() as usize));
        for row in r.top..=r.bottom {
            for col in r.left..=r.right {
                out.push(Address::cell(col, row));
            }
        }
        out
    }
}

fn pick(
    first: u32,
    last: u32,
    idx: i64,
    limit: u32,
    oob: impl Fn(i64) -> AddressError,
) -> Result<u32, AddressError> {
    let at = match idx {
        0 => return Err(oob(first as i64 - 1)),
        i if i < 0 => last as i64 + i + 1,
        i => first as i64 + i - 1,
    };
    if at < 1 || at > limit as i64 {
        return Err(oob(at));
    }
    Ok(at as u32)
}

fn touches(a: &Rect, b: &Rect) -> bool {
    b.right as i64 >= a.left as i64 - 1
        && b.left as i64 <= a.right as i64 + 1
        && b.bottom as i64 >= a.top as i64 - 1
        && b.top as i64 <= a.bottom as i64 + 1
}

fn union(a: &Rect, b: &Rect) -> Rect {
    Rect::new(
        a.left.min(b.left),
        a.top.min(b.top),
        a.right.max(b.right),
        a.bottom.max(b.bottom),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::address::decode;

    fn a(text: &str) -> Address {
        decode(text).unwrap()
    }

    #[test]
    fn test_offset_moves_all_edges() {
        assert_eq!(a("B2:D4").offset(1, 2).unwrap(), a("D3:F5"));
        assert_eq!(a("B2").offset(-1, -1).unwrap(), a("A1"));
        assert!(a("A1").offset(-1, 0).is_err());
    }

    #[test]
    fn test_resize_absolute_and_relative() {
        assert_eq!(a("B2").resize(3, 2, Resize::Absolute).unwrap(), a("B2:C4"));
        assert_eq!(a("B2:F9").resize(0, 0, Resize::Absolute).unwrap(), a("B2:B2"));
        assert_eq!(a("B2:C3").resize(2, 1, Resize::Relative).unwrap(), a("B2:D5"));
        // Relative shrink stops at the top-left.
        assert_eq!(a("B2:C3").resize(-10, -10, Resize::Relative).unwrap(), a("B2:B2"));
    }

    #[test]
    fn test_row_and_column_extraction() {
        let r = a("B2:D5");
        assert_eq!(r.row(1).unwrap(), a("B2:D2"));
        assert_eq!(r.row(-1).unwrap(), a("B5:D5"));
        assert_eq!(r.row(-2).unwrap(), a("B4:D4"));
        assert_eq!(r.column(2).unwrap(), a("C2:C5"));
        assert_eq!(r.column(-1).unwrap(), a("D2:D5"));
        assert!(r.row(0).is_err());
    }

    #[test]
    fn test_row_and_column_are_identity_on_single_cell() {
        assert_eq!(a("C3").row(4).unwrap(), a("C3"));
        assert_eq!(a("C3").column(-1).unwrap(), a("C3"));
    }

    #[test]
    fn test_subrange_and_cell_at_are_relative_to_top_left() {
        let r = a("B2:F9");
        assert_eq!(r.subrange(1, 1, 2, 3).unwrap(), a("C3:E4"));
        assert_eq!(r.subrange(0, 0, 1, 1).unwrap(), a("B2:B2"));
        assert_eq!(r.cell_at(2, 1).unwrap(), a("C4"));
    }

    #[test]
    fn test_entire_row_and_column() {
        assert_eq!(a("B2:D4").entire_row().to_string(), "2:4");
        assert_eq!(a("B2:D4").entire_column().to_string(), "B:D");
    }

    #[test]
    fn test_size_and_coords() {
        assert_eq!(a("B2:D9").size(), (3, 8));
        assert_eq!(a("C7").coords(), (3, 7, 3, 7));
    }

    #[test]
    fn test_current_region_absorbs_chains_including_diagonals() {
        let occupied = vec![a("A1"), a("B2"), a("C3:D3"), a("F6"), a("E4")];
        let region = a("A1").current_region(&occupied);
        assert_eq!(region, a("A1:E4"));
    }

    #[test]
    fn test_current_region_without_neighbours_is_unchanged() {
        let occupied = vec![a("D4")];
        assert_eq!(a("A1").current_region(&occupied), a("A1:A1"));
    }

    #[test]
    fn test_cells_are_row_major() {
        let cells: Vec<String> = a("A1:B2").cells().iter().map(|c| c.to_string()).collect();
        assert_eq!(cells, vec!["A1", "B1", "A2", "B2"]);
    }
}
