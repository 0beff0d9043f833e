//! Row-group inference from a hierarchical row index.
//!
//! Each data row carries one label per index level. Rows whose label equals
//! the marker are group totals; the run of rows between two totals forms a
//! group whose summary row sits directly above it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A detected row group. Row numbers are 0-based positions in the data block
/// (header rows excluded); the summary row is `first_row - 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineBoundary {
    pub level: u32,
    pub first_row: u32,
    pub last_row: u32,
}

impl OutlineBoundary {
    pub fn summary_row(&self) -> u32 {
        self.first_row.saturating_sub(1)
    }

    pub fn contains(&self, row: u32) -> bool {
        (self.first_row..=self.last_row).contains(&row)
    }
}

/// Scan every index level and return the detected groups in discovery order.
///
/// Groups are keyed by their first row: a later level that closes a group
/// starting at the same row replaces the earlier span in place. Levels are
/// then assigned by [`assign_levels`], which depends on this order.
pub fn infer_boundaries<L: PartialEq>(index: &[Vec<L>], marker: &L) -> Vec<OutlineBoundary> {
    let n_rows = index.len();
    let n_levels = index.iter().map(Vec::len).min().unwrap_or(0);

    let mut spans: Vec<(u32, u32)> = Vec::new();
    let mut first = 1usize;
    for lvl in 0..n_levels {
        for i in 1..n_rows {
            let prev = &index[i - 1][lvl];
            let cur = &index[i][lvl];
            if prev == marker {
                first = i;
            }
            let at_end = i + 1 == n_rows;
            if (cur == marker && prev != marker) || at_end {
                let last = if at_end { i } else { i - 1 };
                let span = (first as u32, last as u32);
                match spans.iter_mut().find(|(f, _)| *f == span.0) {
                    Some(existing) => *existing = span,
                    None => spans.push(span),
                }
            }
        }
    }

    let mut boundaries: Vec<OutlineBoundary> = spans
        .into_iter()
        .map(|(first_row, last_row)| OutlineBoundary {
            level: 0,
            first_row,
            last_row,
        })
        .collect();
    assign_levels(&mut boundaries);
    boundaries
}

/// Give each boundary a nesting level. A boundary whose last row ends above
/// every previously seen one is one level deeper; anything else keeps the
/// current level. Correct only for outer-to-inner, top-down input.
pub fn assign_levels(boundaries: &mut [OutlineBoundary]) {
    let mut top = u32::MAX;
    let mut level: Option<u32> = None;
    for b in boundaries.iter_mut() {
        if b.last_row < top {
            top = b.last_row;
            level = Some(level.map_or(0, |l| l + 1));
        }
        b.level = level.unwrap_or(0);
    }
}

/// Outline level per data row: the deepest group covering it, counted from 1.
pub fn row_levels(boundaries: &[OutlineBoundary]) -> BTreeMap<u32, u32> {
    let mut levels = BTreeMap::new();
    for b in boundaries {
        for row in b.first_row..=b.last_row {
            let entry = levels.entry(row).or_insert(0);
            *entry = (*entry).max(b.level + 1);
        }
    }
    levels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(rows: &[(&'static str, &'static str)]) -> Vec<Vec<&'static str>> {
        rows.iter().map(|(a, b)| vec![*a, *b]).collect()
    }

    #[test]
    fn test_single_group_before_grand_total() {
        let idx = index(&[("A", "1"), ("A", "2"), ("A", "3"), ("ALL", "ALL")]);
        let got = infer_boundaries(&idx, &"ALL");
        assert_eq!(
            got,
            vec![OutlineBoundary {
                level: 0,
                first_row: 1,
                last_row: 3
            }]
        );
        assert_eq!(got[0].summary_row(), 0);
    }

    #[test]
    fn test_two_level_index_nests_subtotals() {
        // Summary rows above their groups:
        // 0 A/ALL, 1 A/x, 2 A/y, 3 A/z/ALL, 4 B/..., 5 B/...
        let idx: Vec<Vec<&str>> = vec![
            vec!["ALL", "ALL"],
            vec!["A", "ALL"],
            vec!["A", "x"],
            vec!["A", "y"],
            vec!["B", "ALL"],
            vec!["B", "z"],
        ];
        let got = infer_boundaries(&idx, &"ALL");
        assert_eq!(
            got,
            vec![
                OutlineBoundary { level: 0, first_row: 1, last_row: 5 },
                OutlineBoundary { level: 1, first_row: 2, last_row: 3 },
                OutlineBoundary { level: 1, first_row: 5, last_row: 5 },
            ]
        );
    }

    #[test]
    fn test_levels_depend_on_input_order() {
        let mut reversed = vec![
            OutlineBoundary { level: 0, first_row: 2, last_row: 3 },
            OutlineBoundary { level: 0, first_row: 1, last_row: 5 },
        ];
        assign_levels(&mut reversed);
        // Inner group seen first keeps level 0 and the outer one never goes deeper.
        assert_eq!(reversed[0].level, 0);
        assert_eq!(reversed[1].level, 0);
    }

    #[test]
    fn test_row_levels_take_deepest_cover() {
        let bounds = vec![
            OutlineBoundary { level: 0, first_row: 1, last_row: 5 },
            OutlineBoundary { level: 1, first_row: 2, last_row: 3 },
        ];
        let levels = row_levels(&bounds);
        assert_eq!(levels.get(&1), Some(&1));
        assert_eq!(levels.get(&2), Some(&2));
        assert_eq!(levels.get(&3), Some(&2));
        assert_eq!(levels.get(&4), Some(&1));
        assert_eq!(levels.get(&0), None);
    }

    #[test]
    fn test_empty_or_single_row_index_has_no_groups() {
        let empty: Vec<Vec<&str>> = Vec::new();
        assert!(infer_boundaries(&empty, &"ALL").is_empty());
        assert!(infer_boundaries(&[vec!["A"]], &"ALL").is_empty());
    }
}
