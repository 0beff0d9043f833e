//! A1 address parsing and formatting.
//!
//! Converts between spreadsheet notation ("B2", "B2:D9", "3:3", "C:C") and
//! 1-based column/row coordinates. Bare row or column halves resolve to full
//! bands at decode time, capped at [`MAX_ROWS`] and [`MAX_COLS`].
//!
//! # Examples
//!
//! ```
//! use xlrange_engine::engine::{Address, Rect};
//!
//! let addr: Address = "$B$2:D9".parse().unwrap();
//! assert_eq!(addr.rect(), Rect::new(2, 2, 4, 9));
//! assert_eq!(addr.to_string(), "B2:D9");
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Last addressable column (XFD).
pub const MAX_COLS: u32 = 16_384;
/// Last addressable row.
pub const MAX_ROWS: u32 = 1_048_576;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Empty address")]
    Empty,

    #[error("Malformed address '{0}'")]
    Malformed(String),

    #[error("Invalid column letters '{0}'")]
    InvalidColumn(String),

    #[error("Row numbers start at 1, got '{0}'")]
    NonPositiveRow(String),

    #[error("Unbalanced range separator in '{0}'")]
    UnbalancedSeparator(String),

    #[error("Coordinate out of bounds: column {col}, row {row}")]
    OutOfBounds { col: i64, row: i64 },
}

/// A single cell, 1-based.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Coord {
    pub row: u32,
    pub col: u32,
}

impl Coord {
    pub fn new(col: u32, row: u32) -> Coord {
        Coord { row, col }
    }

    /// Build a coordinate from signed values, rejecting anything off the grid.
    pub fn checked(col: i64, row: i64) -> Result<Coord, AddressError> {
        if col < 1 || row < 1 || col > MAX_COLS as i64 || row > MAX_ROWS as i64 {
            return Err(AddressError::OutOfBounds { col, row });
        }
        Ok(Coord::new(col as u32, row as u32))
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", index_to_col(self.col), self.row)
    }
}

/// Inclusive rectangle `(left, top, right, bottom)`, 1-based.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Rect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Rect {
    /// Corners in any order are normalised so that `left <= right` and `top <= bottom`.
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Rect {
        Rect {
            left: left.min(right),
            top: top.min(bottom),
            right: left.max(right),
            bottom: top.max(bottom),
        }
    }

    pub fn checked(left: i64, top: i64, right: i64, bottom: i64) -> Result<Rect, AddressError> {
        let a = Coord::checked(left, top)?;
        let b = Coord::checked(right, bottom)?;
        Ok(Rect::new(a.col, a.row, b.col, b.row))
    }

    pub fn top_left(&self) -> Coord {
        Coord::new(self.left, self.top)
    }

    pub fn width(&self) -> u32 {
        self.right - self.left + 1
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top + 1
    }

    pub fn contains(&self, c: Coord) -> bool {
        (self.left..=self.right).contains(&c.col) && (self.top..=self.bottom).contains(&c.row)
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }

    /// Spans every column of the grid.
    pub fn is_row_band(&self) -> bool {
        self.left == 1 && self.right == MAX_COLS
    }

    /// Spans every row of the grid.
    pub fn is_column_band(&self) -> bool {
        self.top == 1 && self.bottom == MAX_ROWS
    }
}

impl From<Coord> for Rect {
    fn from(c: Coord) -> Rect {
        Rect::new(c.col, c.row, c.col, c.row)
    }
}

/// Either one cell or a rectangle. A rectangle that happens to cover a single
/// cell ("B2:B2") stays a rectangle so that it encodes back the same way.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Address {
    Cell(Coord),
    Rect(Rect),
}

impl Address {
    pub fn cell(col: u32, row: u32) -> Address {
        Address::Cell(Coord::new(col, row))
    }

    pub fn rect(&self) -> Rect {
        match *self {
            Address::Cell(c) => Rect::from(c),
            Address::Rect(r) => r,
        }
    }

    pub fn is_cell(&self) -> bool {
        matches!(self, Address::Cell(_))
    }

    pub fn top_left(&self) -> Coord {
        self.rect().top_left()
    }

    pub fn contains(&self, c: Coord) -> bool {
        self.rect().contains(c)
    }
}

impl From<Coord> for Address {
    fn from(c: Coord) -> Address {
        Address::Cell(c)
    }
}

impl From<Rect> for Address {
    fn from(r: Rect) -> Address {
        Address::Rect(r)
    }
}

/// One side of a colon-separated range; either part may be missing.
struct Half {
    col: Option<u32>,
    row: Option<u32>,
}

fn half_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?<letters>[A-Za-z]*)(?<numbers>[0-9]*)$").expect("A1 half regex must compile")
    })
}

fn parse_half(text: &str, whole: &str) -> Result<Half, AddressError> {
    let caps = half_regex()
        .captures(text)
        .ok_or_else(|| AddressError::Malformed(whole.to_string()))?;
    let letters = &caps["letters"];
    let numbers = &caps["numbers"];
    if letters.is_empty() && numbers.is_empty() {
        return Err(AddressError::Malformed(whole.to_string()));
    }

    let col = if letters.is_empty() {
        None
    } else {
        Some(col_to_index(letters)?)
    };
    let row = if numbers.is_empty() {
        None
    } else {
        let row = numbers
            .parse::<u64>()
            .map_err(|_| AddressError::NonPositiveRow(numbers.to_string()))?;
        if row == 0 {
            return Err(AddressError::NonPositiveRow(numbers.to_string()));
        }
        if row > MAX_ROWS as u64 {
            return Err(AddressError::OutOfBounds {
                col: col.unwrap_or(1) as i64,
                row: row as i64,
            });
        }
        Some(row as u32)
    };
    Ok(Half { col, row })
}

/// Strip the decorations hosts add to addresses (`$` absolute markers, quotes).
pub fn normalize(text: &str) -> String {
    text.chars().filter(|c| *c != '$' && *c != '"').collect::<String>().trim().to_string()
}

/// Parse A1 text into an [`Address`].
pub fn decode(text: &str) -> Result<Address, AddressError> {
    let cleaned = normalize(text);
    if cleaned.is_empty() {
        return Err(AddressError::Empty);
    }

    let Some((first, second)) = cleaned.split_once(':') else {
        let half = parse_half(&cleaned, &cleaned)?;
        return match (half.col, half.row) {
            (Some(col), Some(row)) => Ok(Address::Cell(Coord::new(col, row))),
            _ => Err(AddressError::UnbalancedSeparator(cleaned)),
        };
    };
    if first.is_empty() || second.is_empty() || second.contains(':') {
        return Err(AddressError::UnbalancedSeparator(cleaned));
    }

    let a = parse_half(first, &cleaned)?;
    let b = parse_half(second, &cleaned)?;
    let rect = match (a.col, a.row, b.col, b.row) {
        (Some(left), Some(top), Some(right), Some(bottom)) => Rect::new(left, top, right, bottom),
        (None, Some(top), None, Some(bottom)) => Rect::new(1, top, MAX_COLS, bottom),
        (Some(left), None, Some(right), None) => Rect::new(left, 1, right, MAX_ROWS),
        // "A:3", "B2:C", "3:C" and the like mix cells, rows and columns.
        _ => return Err(AddressError::UnbalancedSeparator(cleaned)),
    };
    Ok(Address::Rect(rect))
}

/// Format an [`Address`] as A1 text. Full-width and full-height bands use the
/// compact "3:5" / "C:D" forms.
pub fn encode(address: &Address) -> String {
    match address {
        Address::Cell(c) => c.to_string(),
        Address::Rect(r) => {
            if r.is_row_band() && !r.is_column_band() {
                format!("{}:{}", r.top, r.bottom)
            } else if r.is_column_band() && !r.is_row_band() {
                format!("{}:{}", index_to_col(r.left), index_to_col(r.right))
            } else {
                format!("{}:{}", r.top_left(), Coord::new(r.right, r.bottom))
            }
        }
    }
}

/// Column letters to a 1-based index ("A" -> 1, "AA" -> 27).
pub fn col_to_index(letters: &str) -> Result<u32, AddressError> {
    if letters.is_empty() || !letters.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(AddressError::InvalidColumn(letters.to_string()));
    }
    let mut acc: u64 = 0;
    for b in letters.to_ascii_uppercase().bytes() {
        acc = acc * 26 + (b - b'A') as u64 + 1;
        if acc > MAX_COLS as u64 {
            return Err(AddressError::InvalidColumn(letters.to_string()));
        }
    }
    Ok(acc as u32)
}

/// 1-based index to column letters (1 -> A, 26 -> Z, 27 -> AA). Index 0 has no
/// letters and yields an empty string.
pub fn index_to_col(index: u32) -> String {
    let mut result = Vec::new();
    let mut n = index;
    while n > 0 {
        n -= 1;
        result.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    result.reverse();
    String::from_utf8(result).unwrap_or_default()
}

impl std::str::FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters_are_bijective_base26() {
        assert_eq!(index_to_col(1), "A");
        assert_eq!(index_to_col(26), "Z");
        assert_eq!(index_to_col(27), "AA");
        assert_eq!(index_to_col(52), "AZ");
        assert_eq!(index_to_col(703), "AAA");
        assert_eq!(index_to_col(MAX_COLS), "XFD");
        assert_eq!(col_to_index("xfd").unwrap(), MAX_COLS);
        assert_eq!(col_to_index("AZ").unwrap(), 52);
    }

    #[test]
    fn test_decode_cell_and_rect() {
        assert_eq!(decode("B2").unwrap(), Address::cell(2, 2));
        assert_eq!(decode("B2:D9").unwrap(), Address::Rect(Rect::new(2, 2, 4, 9)));
        assert_eq!(decode("D9:B2").unwrap(), Address::Rect(Rect::new(2, 2, 4, 9)));
    }

    #[test]
    fn test_union_covers_both_rects() {
        let a = Rect::new(2, 2, 3, 3);
        assert_eq!(a.union(&Rect::new(1, 4, 2, 6)), Rect::new(1, 2, 3, 6));
        assert_eq!(a.union(&a), a);
    }

    #[test]
    fn test_decode_strips_absolute_markers_and_quotes() {
        assert_eq!(decode("$A$1:$C$3").unwrap(), decode("A1:C3").unwrap());
        assert_eq!(decode("\"B7\"").unwrap(), Address::cell(2, 7));
    }

    #[test]
    fn test_bare_row_and_column_expand_to_full_bands() {
        let rows = decode("3:5").unwrap().rect();
        assert_eq!(rows, Rect::new(1, 3, MAX_COLS, 5));
        assert!(rows.is_row_band());

        let cols = decode("C:C").unwrap().rect();
        assert_eq!(cols, Rect::new(3, 1, 3, MAX_ROWS));
        assert!(cols.is_column_band());
    }

    #[test]
    fn test_encode_uses_compact_band_notation() {
        assert_eq!(decode("3:5").unwrap().to_string(), "3:5");
        assert_eq!(decode("C:D").unwrap().to_string(), "C:D");
        assert_eq!(decode("B2:B2").unwrap().to_string(), "B2:B2");
        assert_eq!(decode("b2").unwrap().to_string(), "B2");
    }

    #[test]
    fn test_decode_rejects_malformed_input() {
        assert_eq!(decode(""), Err(AddressError::Empty));
        assert!(matches!(decode("A0"), Err(AddressError::NonPositiveRow(_))));
        assert!(matches!(decode("A1:"), Err(AddressError::UnbalancedSeparator(_))));
        assert!(matches!(decode("A1:B2:C3"), Err(AddressError::UnbalancedSeparator(_))));
        assert!(matches!(decode("B"), Err(AddressError::UnbalancedSeparator(_))));
        assert!(matches!(decode("1A"), Err(AddressError::Malformed(_))));
        assert!(matches!(decode("A-1"), Err(AddressError::Malformed(_))));
        assert!(matches!(decode("XFE1"), Err(AddressError::InvalidColumn(_))));
        assert!(matches!(decode("A1048577"), Err(AddressError::OutOfBounds { .. })));
    }

    #[test]
    fn test_decode_rejects_mixed_halves() {
        for text in ["A:3", "C:5", "B2:C", "3:C", "A1:3", "3:A1", "C:B2"] {
            assert!(
                matches!(decode(text), Err(AddressError::UnbalancedSeparator(_))),
                "{} should not decode",
                text
            );
        }
    }
}
