//! Cell values and rectangular value blocks.

use super::address::Address;
use super::format::CellFormat;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// A value read from or written to a cell. `List` only appears for
/// multi-cell reads and writes; a cell itself always holds a scalar.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(NaiveDateTime),
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::List(_))
    }

    /// Text starting with `=`.
    pub fn is_formula(&self) -> bool {
        matches!(self, Value::Text(s) if s.starts_with('='))
    }

    /// Text wrapped in braces, e.g. `{=SUM(A1:A3*B1:B3)}`.
    pub fn is_array_formula(&self) -> bool {
        matches!(self, Value::Text(s) if s.starts_with('{'))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// NaN and infinities have no cell representation and are stored as blanks.
    pub fn sanitized(self) -> Value {
        match self {
            Value::Number(n) if !n.is_finite() => Value::Null,
            other => other,
        }
    }

    /// Nesting depth: 0 for a scalar, 1 for a flat list, 2 for a list of lists.
    pub fn depth(&self) -> usize {
        match self {
            Value::List(items) => 1 + items.iter().map(Value::depth).max().unwrap_or(0),
            _ => 0,
        }
    }

    /// Flatten any nesting into scalars, row-major.
    pub fn flatten(&self) -> Vec<Value> {
        match self {
            Value::List(items) => items.iter().flat_map(Value::flatten).collect(),
            scalar => vec![scalar.clone()],
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(d: NaiveDateTime) -> Self {
        Value::Date(d)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("Values nested {0} levels deep cannot be placed on a grid")]
    TooDeep(usize),

    #[error("Row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Block has no cells")]
    Empty,
}

/// A rectangular grid of scalar values, optionally with header rows and
/// formats keyed by sub-address (relative to the block's top-left, `A1` being
/// the first cell).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellBlock {
    rows: Vec<Vec<Value>>,
    header_rows: usize,
    pub attributes: BTreeMap<Address, CellFormat>,
}

impl CellBlock {
    pub fn new(rows: Vec<Vec<Value>>) -> Result<CellBlock, BlockError> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if width == 0 {
            return Err(BlockError::Empty);
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(BlockError::Ragged {
                    row: i,
                    expected: width,
                    found: row.len(),
                });
            }
            if let Some(nested) = row.iter().find(|v| !v.is_scalar()) {
                return Err(BlockError::TooDeep(2 + nested.depth()));
            }
        }
        Ok(CellBlock {
            rows,
            header_rows: 0,
            attributes: BTreeMap::new(),
        })
    }

    /// Shape a value for a grid write: a scalar is 1x1, a flat list is one
    /// column, a list of lists is one row per inner list.
    pub fn from_value(value: &Value) -> Result<CellBlock, BlockError> {
        match value {
            Value::List(items) if items.iter().all(Value::is_scalar) => {
                CellBlock::new(items.iter().map(|v| vec![v.clone().sanitized()]).collect())
            }
            Value::List(items) => {
                let depth = value.depth();
                if depth > 2 {
                    return Err(BlockError::TooDeep(depth));
                }
                let rows = items
                    .iter()
                    .map(|row| match row {
                        Value::List(cells) => cells.iter().cloned().map(Value::sanitized).collect(),
                        scalar => vec![scalar.clone().sanitized()],
                    })
                    .collect();
                CellBlock::new(rows)
            }
            scalar => CellBlock::new(vec![vec![scalar.clone().sanitized()]]),
        }
    }

    pub fn with_header_rows(mut self, n: usize) -> CellBlock {
        self.header_rows = n.min(self.rows.len());
        self
    }

    pub fn header_rows(&self) -> usize {
        self.header_rows
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<Value>> {
        self.rows
    }

    pub fn width(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn cell_count(&self) -> usize {
        self.width() * self.height()
    }

    /// First header row, or `None` when the block has no header.
    pub fn header(&self) -> Option<&[Value]> {
        if self.header_rows == 0 {
            return None;
        }
        self.rows.first().map(Vec::as_slice)
    }

    pub fn slice(&self, row_offset: usize, rows: usize) -> &[Vec<Value>] {
        let end = (row_offset + rows).min(self.rows.len());
        &self.rows[row_offset.min(end)..end]
    }

    /// Back to a nested list value (a list of row lists).
    pub fn to_value(&self) -> Value {
        Value::List(self.rows.iter().map(|r| Value::List(r.clone())).collect())
    }
}
