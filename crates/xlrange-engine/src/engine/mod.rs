//! Addressing and grid data model.
//!
//! - [`Address`], [`Coord`], [`Rect`] - A1 notation <-> 1-based coordinates
//! - range navigation methods on [`Address`] (offset, resize, row, column, ...)
//! - [`infer_boundaries`] - outline groups from a hierarchical row index
//! - [`plan_chunks`] - slicing bulk writes under a per-call cell limit
//! - [`Value`], [`CellBlock`], [`CellFormat`] - what gets written

mod address;
mod chunk;
mod format;
mod outline;
mod range;
mod value;

pub use address::{
    Address, AddressError, Coord, MAX_COLS, MAX_ROWS, Rect, col_to_index, decode, encode, index_to_col, normalize,
};
pub use chunk::{Chunk, DEFAULT_CELL_LIMIT, plan_chunks, rows_per_chunk};
pub use format::{CellFormat, HAlign, Rgb, VAlign};
pub use outline::{OutlineBoundary, assign_levels, infer_boundaries, row_levels};
pub use range::Resize;
pub use value::{BlockError, CellBlock, Value};
