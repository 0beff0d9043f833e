use super::{Range, Session};
use crate::error::{Result, XlError};
use regex::Regex;
use std::collections::BTreeMap;
use tracing::{debug, info};
use xlrange_engine::engine::{Address, CellBlock, CellFormat, OutlineBoundary, Rect, Value, infer_boundaries};

/// How to find row groups in a table: the first `index_cols` columns of each
/// data row are its hierarchical labels, and a label equal to `marker` marks
/// a total row.
#[derive(Clone, Debug, PartialEq)]
pub struct Outline {
    pub index_cols: usize,
    pub marker: Value,
}

impl Outline {
    pub fn new(index_cols: usize, marker: impl Into<Value>) -> Self {
        Outline {
            index_cols,
            marker: marker.into(),
        }
    }
}

/// Format applied to every column whose header matches `pattern`.
#[derive(Clone, Debug)]
pub struct FormatRule {
    pub pattern: Regex,
    pub format: CellFormat,
}

impl FormatRule {
    pub fn new(pattern: &str, format: CellFormat) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| XlError::Config(format!("bad header pattern: {}", e)))?;
        Ok(FormatRule { pattern, format })
    }
}

impl Session {
    /// Write a table at `range` and, with an [`Outline`], group its rows.
    ///
    /// `range` is moved to the written region, which is also returned.
    pub fn write_table(&mut self, range: &mut Range, block: &CellBlock, outline: Option<&Outline>) -> Result<Range> {
        if let Some(outline) = outline {
            if outline.index_cols == 0 || outline.index_cols > block.width() {
                return Err(XlError::Datatype(format!(
                    "outline needs 1..={} index columns, got {}",
                    block.width(),
                    outline.index_cols
                )));
            }
        }

        let region = self.write_block(range, block)?;

        if let Some(outline) = outline {
            let data = &block.rows()[block.header_rows()..];
            let index: Vec<Vec<Value>> = data.iter().map(|row| row[..outline.index_cols].to_vec()).collect();
            let boundaries = infer_boundaries(&index, &outline.marker);
            debug!(range = %region, groups = boundaries.len(), "inferred row groups");
            if !boundaries.is_empty() {
                let anchor = range.address().top_left();
                let top = anchor.row + block.header_rows() as u32;
                let origin = Rect::checked(
                    anchor.col as i64,
                    top as i64,
                    anchor.col as i64 + block.width() as i64 - 1,
                    anchor.row as i64 + block.height() as i64 - 1,
                )?;
                self.group(&Range::new(region.sheet().clone(), Address::Rect(origin)), &boundaries)?;
            }
        }

        range.set(region.sheet().clone(), region.address().clone());
        info!(range = %region, rows = block.height(), "table written");
        Ok(region)
    }

    /// Group rows of the data range `origin`, whose top row is data row 0.
    /// Each group's summary row is bolded.
    pub fn group(&mut self, origin: &Range, boundaries: &[OutlineBoundary]) -> Result<()> {
        let sheet = self.target(origin)?;
        self.adapter.group(sheet, origin.address(), boundaries)
    }

    /// Map each header label in the first row of `range` to the column
    /// beneath it. A repeated label keeps its rightmost column.
    pub fn col_dict(&mut self, range: &Range) -> Result<BTreeMap<String, Range>> {
        let (cols, rows) = range.size();
        if rows < 2 {
            return Err(XlError::Datatype(format!("{} has no rows below its header", range)));
        }
        let header = self.read_block(&range.row(1)?)?;
        let mut columns = BTreeMap::new();
        for (i, label) in header.rows()[0].iter().enumerate().take(cols as usize) {
            let column = range.subrange(1, i as u32, rows - 1, 1)?;
            columns.insert(label.to_string(), column);
        }
        Ok(columns)
    }

    /// Apply every rule to the data below each matching header. Returns how
    /// many columns were formatted.
    pub fn format_range(&mut self, range: &Range, rules: &[FormatRule]) -> Result<usize> {
        let columns = self.col_dict(range)?;
        let mut formatted = 0;
        for (label, column) in &columns {
            let mut merged = CellFormat::default();
            for rule in rules.iter().filter(|r| r.pattern.is_match(label)) {
                merged.merge(&rule.format);
            }
            if merged.is_empty() {
                continue;
            }
            self.format(column, &merged)?;
            formatted += 1;
        }
        debug!(range = %range, formatted, "formatted columns by header");
        Ok(formatted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineKind, SessionConfig};
    use crate::host::MemoryHost;
    use std::cell::RefCell;
    use std::rc::Rc;
    use xlrange_engine::engine::Coord;

    fn host_session() -> (Session, Rc<RefCell<MemoryHost>>, Range) {
        let host = Rc::new(RefCell::new(MemoryHost::new()));
        let mut session =
            Session::with_host(SessionConfig::with_engine(EngineKind::Automation), Box::new(host.clone())).unwrap();
        let wb = session.create_workbook().unwrap();
        let a1 = wb.first_sheet().unwrap().range();
        (session, host, a1)
    }

    fn row(cells: &[&str], n: f64) -> Vec<Value> {
        let mut out: Vec<Value> = cells.iter().map(|c| Value::from(*c)).collect();
        out.push(Value::Number(n));
        out
    }

    fn sales() -> CellBlock {
        CellBlock::new(vec![
            vec![Value::from("Region"), Value::from("City"), Value::from("Sales")],
            row(&["Total", "Total"], 60.0),
            row(&["East", "Total"], 30.0),
            row(&["East", "Boston"], 10.0),
            row(&["East", "Albany"], 20.0),
            row(&["West", "Total"], 30.0),
            row(&["West", "Denver"], 30.0),
        ])
        .unwrap()
        .with_header_rows(1)
    }

    #[test]
    fn test_write_table_groups_and_moves_the_range() {
        let (mut session, host, a1) = host_session();
        let mut range = a1.arng("B2").unwrap();
        let region = session
            .write_table(&mut range, &sales(), Some(&Outline::new(2, "Total")))
            .unwrap();
        assert_eq!(region.address().to_string(), "B2:D8");
        assert_eq!(range, region);

        let host = host.borrow();
        let sheet = host.sheet("Book1", "Sheet1").unwrap();
        assert!(sheet.summary_above());
        assert!(!sheet.row_groups().is_empty());
        // Data row 0 is the grand total at sheet row 3; its group starts below.
        assert!(sheet.row_groups().iter().all(|(top, _)| *top >= 4));
        assert_eq!(sheet.format_at(Coord::new(2, 3)).bold, Some(true));
    }

    #[test]
    fn test_write_table_rejects_bad_index_before_writing() {
        let (mut session, host, a1) = host_session();
        let mut range = a1.clone();
        let err = session
            .write_table(&mut range, &sales(), Some(&Outline::new(4, "Total")))
            .unwrap_err();
        assert!(matches!(err, XlError::Datatype(_)));
        assert_eq!(range, a1);
        assert_eq!(
            host.borrow().sheet("Book1", "Sheet1").unwrap().value_at(Coord::new(1, 1)),
            Value::Null
        );
    }

    #[test]
    fn test_col_dict_maps_labels_to_data_columns() {
        let (mut session, _host, a1) = host_session();
        let mut range = a1.clone();
        session.write_table(&mut range, &sales(), None).unwrap();
        let columns = session.col_dict(&range).unwrap();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns["Sales"].address().to_string(), "C2:C7");
    }

    #[test]
    fn test_format_range_matches_headers() {
        let (mut session, host, a1) = host_session();
        let mut range = a1.clone();
        session.write_table(&mut range, &sales(), None).unwrap();
        let rules = vec![FormatRule::new("^Sal", CellFormat::number("#,##0")).unwrap()];
        assert_eq!(session.format_range(&range, &rules).unwrap(), 1);
        let host = host.borrow();
        let sheet = host.sheet("Book1", "Sheet1").unwrap();
        assert_eq!(sheet.format_at(Coord::new(3, 2)).number_format.as_deref(), Some("#,##0"));
        assert_eq!(sheet.format_at(Coord::new(3, 1)).number_format, None);
        assert_eq!(sheet.format_at(Coord::new(1, 2)).number_format, None);
    }

    #[test]
    fn test_bad_pattern_is_a_config_error() {
        assert!(matches!(
            FormatRule::new("(", CellFormat::bold()),
            Err(XlError::Config(_))
        ));
    }
}
