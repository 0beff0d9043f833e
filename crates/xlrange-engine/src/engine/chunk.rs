//! Splitting bulk writes into per-call slices.

/// Default number of cells a single backend write may carry.
pub const DEFAULT_CELL_LIMIT: usize = 5000;

/// A horizontal slice of a block: `rows` rows starting at `row_offset`
/// (0-based, relative to the block's first row). Slices always span the full
/// block width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub row_offset: usize,
    pub rows: usize,
}

/// Rows per slice so that `rows * cols` stays within `limit`. A row wider than
/// the limit still gets a slice of its own.
pub fn rows_per_chunk(cols: usize, limit: usize) -> usize {
    (limit / cols.max(1)).max(1)
}

/// Plan the slices for a `total_rows x cols` block, top to bottom.
pub fn plan_chunks(total_rows: usize, cols: usize, limit: usize) -> Vec<Chunk> {
    let step = rows_per_chunk(cols, limit);
    (0..total_rows)
        .step_by(step)
        .map(|row_offset| Chunk {
            row_offset,
            rows: step.min(total_rows - row_offset),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_covers_every_row_once() {
        let plan = plan_chunks(10, 3, 9);
        assert_eq!(
            plan,
            vec![
                Chunk { row_offset: 0, rows: 3 },
                Chunk { row_offset: 3, rows: 3 },
                Chunk { row_offset: 6, rows: 3 },
                Chunk { row_offset: 9, rows: 1 },
            ]
        );
    }

    #[test]
    fn test_small_block_is_one_chunk() {
        assert_eq!(plan_chunks(4, 4, DEFAULT_CELL_LIMIT), vec![Chunk { row_offset: 0, rows: 4 }]);
    }

    #[test]
    fn test_row_wider_than_limit_gets_single_row_slices() {
        assert_eq!(rows_per_chunk(7000, DEFAULT_CELL_LIMIT), 1);
        assert_eq!(plan_chunks(2, 7000, DEFAULT_CELL_LIMIT).len(), 2);
    }

    #[test]
    fn test_empty_block_has_no_chunks() {
        assert!(plan_chunks(0, 5, 10).is_empty());
    }
}
