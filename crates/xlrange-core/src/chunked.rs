//! Bulk writes split under the per-call cell limit.

use crate::adapter::{EngineAdapter, SheetRef};
use crate::error::Result;
use tracing::{debug, warn};
use xlrange_engine::engine::{Address, CellBlock, Rect, plan_chunks};

/// Write `block` with its first cell at the top-left of `anchor`, at most
/// `limit` cells per backend call, then apply the block's attribute map.
///
/// Returns the current region grown from the anchor's top-left, widened to
/// the written rectangle when blank edge rows or columns fall outside it.
pub fn write_chunked(
    adapter: &mut dyn EngineAdapter,
    sheet: &SheetRef,
    anchor: &Address,
    block: &CellBlock,
    limit: usize,
) -> Result<Address> {
    let origin = Address::Cell(anchor.top_left());
    let width = block.width();
    if width > limit {
        warn!(
            sheet = %sheet,
            width,
            limit,
            "a single row exceeds the cell limit; writing one row per call"
        );
    }

    let chunks = plan_chunks(block.height(), width, limit);
    debug!(
        sheet = %sheet,
        origin = %origin,
        rows = block.height(),
        cols = width,
        chunks = chunks.len(),
        "chunked write"
    );
    for chunk in &chunks {
        let target = origin.offset(chunk.row_offset as i64, 0)?;
        adapter.write_block(sheet, &target, block.slice(chunk.row_offset, chunk.rows))?;
    }

    // Attribute keys are relative to the block, A1 being its first cell.
    let (left, top) = (origin.top_left().col as i64 - 1, origin.top_left().row as i64 - 1);
    for (sub, format) in &block.attributes {
        let absolute = sub.offset(top, left)?;
        adapter.format(sheet, &absolute, format)?;
    }

    let region = adapter.current_region(sheet, &origin)?.rect();
    let start = origin.top_left();
    let written = Rect::checked(
        start.col as i64,
        start.row as i64,
        start.col as i64 + width.max(1) as i64 - 1,
        start.row as i64 + block.height().max(1) as i64 - 1,
    )?;
    let covered = region.union(&written);
    if covered.width() == 1 && covered.height() == 1 {
        return Ok(Address::Cell(covered.top_left()));
    }
    Ok(Address::Rect(covered))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{DeferredFile, LiveAutomation};
    use crate::error::XlError;
    use crate::host::MemoryHost;
    use std::cell::RefCell;
    use std::rc::Rc;
    use xlrange_engine::engine::{CellFormat, Coord, Value, decode};

    fn block(rows: usize, cols: usize) -> CellBlock {
        CellBlock::new(
            (0..rows)
                .map(|r| (0..cols).map(|c| Value::from((r * cols + c) as i64 + 1)).collect())
                .collect(),
        )
        .unwrap()
    }

    fn deferred() -> (DeferredFile, SheetRef, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut xl = DeferredFile::new(dir.path());
        let wb = xl.create_workbook().unwrap();
        (xl, SheetRef::new(wb.name, "Sheet"), dir)
    }

    #[test]
    fn test_slices_reassemble_into_one_region() {
        let (mut xl, sheet, _dir) = deferred();
        let data = block(10, 3);
        let region = write_chunked(&mut xl, &sheet, &decode("B2").unwrap(), &data, 7).unwrap();
        assert_eq!(region.to_string(), "B2:D11");
        assert_eq!(xl.read_block(&sheet, &region).unwrap(), data.rows());
    }

    #[test]
    fn test_attributes_are_placed_relative_to_anchor() {
        let host = Rc::new(RefCell::new(MemoryHost::new()));
        let mut xl = LiveAutomation::new(Box::new(host.clone()));
        let wb = xl.create_workbook().unwrap();
        let sheet = SheetRef::new(&wb.name, "Sheet1");
        let mut data = block(2, 2);
        data.attributes.insert(decode("A1:B1").unwrap(), CellFormat::bold());
        write_chunked(&mut xl, &sheet, &decode("C3").unwrap(), &data, 100).unwrap();

        let host = host.borrow();
        let s = host.sheet(&wb.name, "Sheet1").unwrap();
        assert_eq!(s.format_at(Coord::new(3, 3)).bold, Some(true));
        assert_eq!(s.format_at(Coord::new(4, 3)).bold, Some(true));
        assert_eq!(s.format_at(Coord::new(3, 4)).bold, None);
    }

    #[test]
    fn test_blank_edges_stay_inside_the_region() {
        let blank = Value::Null;
        let data = CellBlock::new(vec![
            vec![Value::from(1), Value::from(2), blank.clone()],
            vec![Value::from(3), Value::from(4), blank.clone()],
            vec![blank.clone(), blank.clone(), blank.clone()],
        ])
        .unwrap();

        let (mut xl, sheet, _dir) = deferred();
        let region = write_chunked(&mut xl, &sheet, &decode("A1").unwrap(), &data, 3).unwrap();
        assert_eq!(region.to_string(), "A1:C3");
        assert_eq!(xl.read_block(&sheet, &region).unwrap(), data.rows());

        let host = Rc::new(RefCell::new(MemoryHost::new()));
        let mut live = LiveAutomation::new(Box::new(host.clone()));
        let wb = live.create_workbook().unwrap();
        let sheet = SheetRef::new(&wb.name, "Sheet1");
        let region = write_chunked(&mut live, &sheet, &decode("B2").unwrap(), &data, 3).unwrap();
        assert_eq!(region.to_string(), "B2:D4");
    }

    #[test]
    fn test_wide_rows_still_write() {
        let (mut xl, sheet, _dir) = deferred();
        let data = block(3, 4);
        let region = write_chunked(&mut xl, &sheet, &decode("A1").unwrap(), &data, 2).unwrap();
        assert_eq!(region.to_string(), "A1:D3");
    }

    #[test]
    fn test_unknown_sheet_fails_before_writing() {
        let (mut xl, _, _dir) = deferred();
        let err = write_chunked(
            &mut xl,
            &SheetRef::new("Workbook.xlsx", "Missing"),
            &decode("A1").unwrap(),
            &block(1, 1),
            10,
        )
        .unwrap_err();
        assert!(matches!(err, XlError::ElementNotFound { .. }));
    }
}
