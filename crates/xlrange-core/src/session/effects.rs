//! Operations whose result is a change in the application itself: selection,
//! sorting, goal seeking, pictures and view settings. Support varies by
//! engine; an engine without one reports [`XlError::Unsupported`].
//!
//! [`XlError::Unsupported`]: crate::XlError::Unsupported

use super::{Range, Session, Sheet};
use crate::adapter::{Axis, HighlightRule, SortKey};
use crate::error::{Result, XlError};
use std::path::Path;

impl Session {
    pub fn select(&mut self, range: &Range) -> Result<()> {
        let sheet = self.target(range)?;
        self.adapter.select(sheet, range.address())
    }

    /// Bring `sheet` to the front with its current range selected.
    pub fn activate(&mut self, sheet: &Sheet) -> Result<()> {
        self.select(&sheet.range())
    }

    /// Sort `range` by header labels, first key most significant.
    pub fn sort(&mut self, range: &Range, keys: &[SortKey], header: bool) -> Result<()> {
        let sheet = self.target(range)?;
        if keys.is_empty() {
            return Err(XlError::Datatype("sort needs at least one key".to_string()));
        }
        self.adapter.sort(sheet, range.address(), keys, header)
    }

    /// Vary `changing` until the formula in `target` evaluates to `goal`.
    pub fn goal_seek(&mut self, target: &Range, goal: f64, changing: &Range) -> Result<()> {
        let sheet = self.target(target)?;
        if changing.sheet() != sheet {
            return Err(XlError::Datatype(format!(
                "goal seek target {} and changing cell {} must share a sheet",
                target, changing
            )));
        }
        self.adapter.goal_seek(sheet, target.address(), goal, changing.address())
    }

    pub fn insert_image(&mut self, at: &Range, path: &Path, width: u32, height: u32) -> Result<()> {
        let sheet = self.target(at)?;
        self.adapter.insert_image(sheet, at.address(), path, width, height)
    }

    /// Conditional fill for cells matching `rule`.
    pub fn highlight(&mut self, range: &Range, rule: &HighlightRule) -> Result<()> {
        let sheet = self.target(range)?;
        self.adapter.highlight(sheet, range.address(), rule)
    }

    pub fn autofit(&mut self, range: &Range, axis: Axis) -> Result<()> {
        let sheet = self.target(range)?;
        self.adapter.autofit(sheet, range.address(), axis)
    }

    /// Freeze rows above and columns left of `at`.
    pub fn freeze_panes(&mut self, at: &Range) -> Result<()> {
        let sheet = self.target(at)?;
        self.adapter.freeze_panes(sheet, at.address())
    }

    /// Insert a whole row (or column) at each 1-based position `at` of
    /// `range`, one after another in the order given.
    pub fn insert(&mut self, range: &Range, axis: Axis, at: &[i64]) -> Result<()> {
        let sheet = self.target(range)?;
        for line in lines(range, axis, at)? {
            self.adapter.insert(sheet, line.address(), axis)?;
        }
        Ok(())
    }

    /// Delete the whole row (or column) at each 1-based position `at` of
    /// `range`. Positions are resolved up front; each delete shifts the
    /// grid before the next one runs.
    pub fn delete(&mut self, range: &Range, axis: Axis, at: &[i64]) -> Result<()> {
        let sheet = self.target(range)?;
        for line in lines(range, axis, at)? {
            self.adapter.delete(sheet, line.address(), axis)?;
        }
        Ok(())
    }

    /// Copy the first row of `range` into the rest of it.
    pub fn fill_down(&mut self, range: &Range) -> Result<()> {
        let sheet = self.target(range)?;
        self.adapter.fill_down(sheet, range.address())
    }

    /// Collapse the row outline of `sheet` to `levels` visible levels.
    pub fn show_levels(&mut self, sheet: &Sheet, levels: u32) -> Result<()> {
        if !(1..=MAX_OUTLINE_LEVELS).contains(&levels) {
            return Err(XlError::Datatype(format!(
                "outline levels run from 1 to {}, got {}",
                MAX_OUTLINE_LEVELS, levels
            )));
        }
        let range = sheet.range();
        let target = self.target(&range)?;
        self.adapter.show_levels(target, levels)
    }
}

/// Row outlines nest at most this deep, the top level included.
const MAX_OUTLINE_LEVELS: u32 = 8;

fn lines(range: &Range, axis: Axis, at: &[i64]) -> Result<Vec<Range>> {
    at.iter()
        .map(|&i| match axis {
            Axis::Rows => range.row(i),
            Axis::Columns => range.column(i),
        })
        .collect()
}
