//! Interactive-Script engine: every primitive becomes one AppleScript request.

use super::{
    Axis, Calculation, ClearTarget, Comparison, EngineAdapter, HighlightRule, OpenedWorkbook, SheetRef, SortKey,
    SortOrder, boundary_rows, into_rows, parse_areas, text_of,
};
use crate::config::EngineKind;
use crate::error::{Result, XlError};
use crate::transport::ScriptTransport;
use std::path::Path;
use tracing::{debug, info};
use xlrange_engine::engine::{
    Address, CellFormat, HAlign, OutlineBoundary, Rect, Resize, Rgb, VAlign, Value, decode,
};
use xlrange_engine::script::{ScriptBuilder, literal, quote};

/// Excel accepts at most three sort keys per call.
const MAX_SORT_KEYS: usize = 3;

pub struct InteractiveScript {
    transport: ScriptTransport,
}

fn rgb_literal(color: Rgb) -> String {
    format!("{{{}, {}, {}}}", color.0, color.1, color.2)
}

fn number(n: f64) -> String {
    literal(&Value::Number(n))
}

/// Loop that tries `base`, then `base (1)`, `base (2)`... until the rename sticks.
fn unique_rename(script: &mut ScriptBuilder, target: &str, base: &str) {
    script
        .line(format!("set i to 0\nset sname to {}", quote(base)))
        .line(format!(
            "repeat\n\ttry\n\t\tset name of {} to sname\n\t\texit repeat\n\ton error\n\t\tset i to i + 1\n\t\tset sname to {} & \" (\" & i & \")\"\n\tend try\nend repeat",
            target,
            quote(base)
        ))
        .line("return sname");
}

fn sort_order(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Ascending => "sort ascending",
        SortOrder::Descending => "sort descending",
    }
}

fn operator(condition: Comparison) -> &'static str {
    match condition {
        Comparison::Equal => "operator equal",
        Comparison::NotEqual => "operator not equal",
        Comparison::Greater => "operator greater",
        Comparison::Less => "operator less",
        Comparison::GreaterEqual => "operator greater equal",
        Comparison::LessEqual => "operator less equal",
    }
}

impl InteractiveScript {
    pub fn new(transport: ScriptTransport) -> Self {
        InteractiveScript { transport }
    }

    /// Ask the host for `current date` and check that it comes back in the
    /// long format the literal parser understands.
    pub fn check_date_format(&mut self) -> Result<bool> {
        let response = self.transport.run("return current date")?;
        Ok(matches!(
            xlrange_engine::script::parse_literal(&response),
            Ok(Value::Date(_))
        ))
    }

    fn range_script(sheet: &SheetRef, address: &Address) -> ScriptBuilder {
        let mut script = ScriptBuilder::new();
        script.bind_range("rng", &sheet.workbook, &sheet.sheet, address);
        script
    }

    fn run(&mut self, script: &ScriptBuilder) -> Result<()> {
        self.transport.run(&script.body())?;
        Ok(())
    }

    fn query(&mut self, script: &ScriptBuilder) -> Result<Value> {
        self.transport.query(&script.body())
    }

    fn query_text(&mut self, script: &ScriptBuilder, what: &str) -> Result<String> {
        let value = self.query(script)?;
        text_of(value, what)
    }

    /// Active workbook, active sheet and the raw selection address.
    fn selection(&mut self) -> Result<(SheetRef, String)> {
        let reply = self
            .transport
            .query("return {name of active workbook, name of active sheet, get address of selection}")?;
        let Value::List(items) = reply else {
            return Err(XlError::NoWorkbookOpen);
        };
        let mut parts = items.into_iter();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(Value::Text(wb)), Some(Value::Text(sh)), Some(Value::Text(addr))) => Ok((SheetRef::new(wb, sh), addr)),
            _ => Err(XlError::NoWorkbookOpen),
        }
    }

    fn query_opened(&mut self, script: &ScriptBuilder) -> Result<OpenedWorkbook> {
        match self.query(script)? {
            Value::List(mut items) if items.len() == 2 => {
                let sheets = items.pop().map(names).unwrap_or_default();
                let name = items.pop().map(|v| text_of(v, "workbook name")).transpose()?.unwrap_or_default();
                Ok(OpenedWorkbook { name, sheets })
            }
            other => Err(XlError::Datatype(format!("unexpected workbook description {:?}", other))),
        }
    }
}

/// A listing of names; `missing value` means there are none.
fn names(value: Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Text(s) => vec![s],
        Value::List(items) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::Text(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn format_statements(script: &mut ScriptBuilder, format: &CellFormat) {
    if let Some(nf) = &format.number_format {
        script.line(format!("set number format of rng to {}", quote(nf)));
    }
    if let Some(h) = format.h_align {
        let h = match h {
            HAlign::Left => "left",
            HAlign::Center => "center",
            HAlign::Right => "right",
        };
        script.line(format!("set horizontal alignment of rng to horizontal align {}", h));
    }
    if let Some(v) = format.v_align {
        let v = match v {
            VAlign::Top => "top",
            VAlign::Middle => "center",
            VAlign::Bottom => "bottom",
        };
        script.line(format!("set vertical alignment of rng to vertical alignment {}", v));
    }
    if let Some(wrap) = format.wrap_text {
        script.line(format!("set wrap text of rng to {}", wrap));
    }
    if let Some(bold) = format.bold {
        script.line(format!("set bold of font object of rng to {}", bold));
    }
    if let Some(italic) = format.italic {
        script.line(format!("set italic of font object of rng to {}", italic));
    }
    if let Some(name) = &format.font_name {
        script.line(format!("set name of font object of rng to {}", quote(name)));
    }
    if let Some(size) = format.font_size {
        script.line(format!("set font size of font object of rng to {}", number(size)));
    }
    if let Some(color) = format.font_color {
        script.line(format!("set color of font object of rng to {}", rgb_literal(color)));
    }
    if let Some(fill) = format.fill {
        script.line(format!("set color of interior object of rng to {}", rgb_literal(fill)));
    }
    if let Some(width) = format.column_width {
        script.line(format!("set column width of rng to {}", number(width)));
    }
    if let Some(height) = format.row_height {
        script.line(format!("set row height of rng to {}", number(height)));
    }
}

impl EngineAdapter for InteractiveScript {
    fn kind(&self) -> EngineKind {
        EngineKind::Script
    }

    fn workbook_names(&mut self) -> Result<Vec<String>> {
        let listing = self.transport.query("return name of workbooks")?;
        Ok(names(listing))
    }

    fn sheet_names(&mut self, workbook: &str) -> Result<Vec<String>> {
        let listing = self
            .transport
            .query(&format!("return name of sheets of workbook {}", quote(workbook)))?;
        Ok(names(listing))
    }

    fn set_calculation(&mut self, mode: Calculation) -> Result<()> {
        let (calc, updating) = match mode {
            Calculation::Manual => ("manual", false),
            Calculation::Automatic => ("automatic", true),
        };
        self.transport.run(&format!(
            "set calculation to calculation {}\nset screen updating to {}",
            calc, updating
        ))?;
        Ok(())
    }

    fn active_range(&mut self) -> Result<(SheetRef, Address)> {
        let (at, selection) = self.selection()?;
        let first = selection.split(',').next().unwrap_or_default();
        Ok((at, decode(first)?))
    }

    fn selected_cells(&mut self) -> Result<(SheetRef, Vec<Address>)> {
        let (at, selection) = self.selection()?;
        let cells = parse_areas(&selection)?.iter().flat_map(Address::cells).collect();
        Ok((at, cells))
    }

    fn create_workbook(&mut self) -> Result<OpenedWorkbook> {
        let mut script = ScriptBuilder::new();
        script
            .line("set wb to make new workbook")
            .line("return {name of wb, name of sheets of wb}");
        let opened = self.query_opened(&script)?;
        info!(workbook = %opened.name, "workbook created");
        Ok(opened)
    }

    fn open_workbook(&mut self, path: &Path) -> Result<OpenedWorkbook> {
        let absolute = std::path::absolute(path)?;
        let mut script = ScriptBuilder::new();
        script
            .line(format!(
                "open workbook workbook file name POSIX file {}",
                quote(&absolute.to_string_lossy())
            ))
            .line("return {name of active workbook, name of sheets of active workbook}");
        let opened = self.query_opened(&script)?;
        info!(workbook = %opened.name, path = %absolute.display(), "workbook opened");
        Ok(opened)
    }

    fn close_workbook(&mut self, workbook: &str) -> Result<()> {
        self.transport
            .run(&format!("close workbook {} saving no", quote(workbook)))?;
        info!(workbook, "workbook closed");
        Ok(())
    }

    fn save_workbook_as(&mut self, workbook: &str, path: &Path) -> Result<String> {
        let absolute = std::path::absolute(path)?;
        let name = absolute
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| XlError::Config(format!("not a file path: {}", path.display())))?;
        let mut script = ScriptBuilder::new();
        script
            .line(format!(
                "set fname to (POSIX file {}) as string",
                quote(&absolute.to_string_lossy())
            ))
            .line(format!(
                "save workbook as workbook {} filename fname overwrite true",
                quote(workbook)
            ));
        self.run(&script)?;
        info!(workbook, saved_as = %name, "workbook saved");
        Ok(name)
    }

    fn create_sheet(&mut self, workbook: &str, name: &str) -> Result<String> {
        let mut script = ScriptBuilder::new();
        script.line(format!("set ns to make new sheet at workbook {}", quote(workbook)));
        unique_rename(&mut script, "ns", name);
        self.query_text(&script, "sheet name")
    }

    fn rename_sheet(&mut self, sheet: &SheetRef, name: &str) -> Result<String> {
        let mut script = ScriptBuilder::new();
        script.line(format!(
            "set ns to sheet {} of workbook {}",
            quote(&sheet.sheet),
            quote(&sheet.workbook)
        ));
        unique_rename(&mut script, "ns", name);
        self.query_text(&script, "sheet name")
    }

    fn get_value(&mut self, sheet: &SheetRef, address: &Address) -> Result<Value> {
        let mut script = Self::range_script(sheet, address);
        script.line("return value of rng");
        self.query(&script)
    }

    fn set_value(&mut self, sheet: &SheetRef, address: &Address, value: &Value) -> Result<()> {
        if !value.is_scalar() {
            return Err(XlError::Datatype("set_value takes a scalar; use write_block for lists".to_string()));
        }
        let mut script = Self::range_script(sheet, address);
        script.line(format!("set value of rng to {}", literal(value)));
        self.run(&script)
    }

    fn get_formula(&mut self, sheet: &SheetRef, address: &Address) -> Result<Value> {
        let mut script = Self::range_script(sheet, address);
        script.line("return formula of rng");
        self.query(&script)
    }

    fn set_formula(&mut self, sheet: &SheetRef, address: &Address, formula: &str, as_array: bool) -> Result<()> {
        let mut script = Self::range_script(sheet, address);
        let property = if as_array { "formula array" } else { "formula" };
        script.line(format!("set {} of rng to {}", property, quote(formula)));
        self.run(&script)
    }

    fn format(&mut self, sheet: &SheetRef, address: &Address, format: &CellFormat) -> Result<()> {
        if format.is_empty() {
            return Ok(());
        }
        let mut script = Self::range_script(sheet, address);
        format_statements(&mut script, format);
        self.run(&script)
    }

    fn write_block(&mut self, sheet: &SheetRef, address: &Address, rows: &[Vec<Value>]) -> Result<()> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if width == 0 {
            return Ok(());
        }
        let target = address.resize(rows.len() as i64, width as i64, Resize::Absolute)?;
        let grid = Value::List(rows.iter().map(|r| Value::List(r.clone())).collect());
        let mut script = Self::range_script(sheet, &target);
        script.line(format!("set value of rng to {}", literal(&grid)));
        debug!(sheet = %sheet, target = %target, cells = rows.len() * width, "block written");
        self.run(&script)
    }

    fn read_block(&mut self, sheet: &SheetRef, address: &Address) -> Result<Vec<Vec<Value>>> {
        let value = self.get_value(sheet, address)?;
        let (cols, _) = address.size();
        Ok(into_rows(value, cols as usize))
    }

    fn current_region(&mut self, sheet: &SheetRef, address: &Address) -> Result<Address> {
        let mut script = Self::range_script(sheet, address);
        script.line("return get address of current region of rng");
        let text = self.query_text(&script, "region address")?;
        Ok(decode(&text)?)
    }

    fn group(&mut self, sheet: &SheetRef, origin: &Address, boundaries: &[OutlineBoundary]) -> Result<()> {
        let mut script = Self::range_script(sheet, origin);
        script.line("set summary row of outline object of worksheet object of rng to summary above");
        let span = origin.rect();
        for boundary in boundaries {
            let (first, last) = boundary_rows(origin, boundary);
            let rows = Address::Rect(Rect::new(span.left, first, span.right, last)).entire_row();
            script
                .bind_range("rng", &sheet.workbook, &sheet.sheet, &rows)
                .line("group entire row of rng");
            if first > 1 {
                let summary = Address::Rect(Rect::new(span.left, first - 1, span.right, first - 1));
                script
                    .bind_range("rng", &sheet.workbook, &sheet.sheet, &summary)
                    .line("set bold of font object of rng to true");
            }
        }
        self.run(&script)
    }

    fn clear(&mut self, sheet: &SheetRef, address: &Address, target: ClearTarget) -> Result<()> {
        let mut script = Self::range_script(sheet, address);
        script.line(match target {
            ClearTarget::Contents => "clear contents rng",
            ClearTarget::Formats => "clear range formats rng",
        });
        self.run(&script)
    }

    fn select(&mut self, sheet: &SheetRef, address: &Address) -> Result<()> {
        let mut script = Self::range_script(sheet, address);
        script
            .line("activate object worksheet object of rng")
            .line("select rng");
        self.run(&script)
    }

    fn sort(&mut self, sheet: &SheetRef, address: &Address, keys: &[SortKey], header: bool) -> Result<()> {
        if keys.is_empty() {
            return Err(XlError::Datatype("sort needs at least one key".to_string()));
        }
        if keys.len() > MAX_SORT_KEYS {
            return Err(XlError::Datatype(format!(
                "at most {} sort keys are supported, got {}",
                MAX_SORT_KEYS,
                keys.len()
            )));
        }
        let mut script = Self::range_script(sheet, address);
        script
            .line("set r1 to row 1 of rng")
            .line("set f to cell 1 of r1")
            .line("set header to item 1 of (value of r1)");
        let mut clauses = Vec::with_capacity(keys.len());
        for (i, key) in keys.iter().enumerate() {
            script
                .line(format!("set idx_{i} to my index_of({}, header)", quote(&key.label)))
                .line(format!("if idx_{i} is 0 then error \"no column \" & {}", quote(&key.label)))
                .line(format!("set offs_{i} to get offset f column offset (idx_{i} - 1)"));
            clauses.push(format!("key{n} offs_{i} order{n} {}", sort_order(key.order), n = i + 1));
        }
        script
            .line("activate object worksheet object of rng")
            .line(format!(
                "sort rng {} {}",
                clauses.join(" "),
                if header { "header yes" } else { "header no" }
            ));
        self.run(&script)
    }

    fn goal_seek(&mut self, sheet: &SheetRef, target: &Address, goal: f64, changing: &Address) -> Result<()> {
        let mut script = Self::range_script(sheet, target);
        script
            .bind_range("rng2", &sheet.workbook, &sheet.sheet, changing)
            .line(format!("goal seek rng goal {} changing cell rng2", number(goal)));
        self.run(&script)
    }

    fn insert_image(&mut self, sheet: &SheetRef, at: &Address, path: &Path, width: u32, height: u32) -> Result<()> {
        let absolute = std::path::absolute(path)?;
        let mut script = Self::range_script(sheet, at);
        script
            .line("set ws to worksheet object of rng")
            .line(format!("set theFilePath to POSIX file {}", quote(&absolute.to_string_lossy())))
            .line("set newPic to make new picture at the beginning of ws with properties {file name:theFilePath}")
            .line("set left position of newPic to left position of rng")
            .line("set top of newPic to top of rng")
            .line(format!("set width of newPic to {}", width))
            .line(format!("set height of newPic to {}", height));
        self.run(&script)
    }

    fn highlight(&mut self, sheet: &SheetRef, address: &Address, rule: &HighlightRule) -> Result<()> {
        let mut script = Self::range_script(sheet, address);
        script.line(format!(
            "tell rng\n\ttry\n\t\tdelete (every format condition)\n\tend try\n\tset newFormatCondition to make new format condition at end with properties {{format condition type:cell value, condition operator:{}, formula1:{}}}\n\tset color of interior object of newFormatCondition to {}\nend tell",
            operator(rule.condition),
            number(rule.threshold),
            rgb_literal(rule.fill)
        ));
        self.run(&script)
    }

    fn autofit(&mut self, sheet: &SheetRef, address: &Address, axis: Axis) -> Result<()> {
        let mut script = Self::range_script(sheet, address);
        script.line(match axis {
            Axis::Rows => "autofit every row of rng",
            Axis::Columns => "autofit every column of rng",
        });
        self.run(&script)
    }

    fn freeze_panes(&mut self, sheet: &SheetRef, at: &Address) -> Result<()> {
        let mut script = Self::range_script(sheet, at);
        script
            .line("activate object worksheet object of rng")
            .line("select rng")
            .line("set freeze panes of active window to true");
        self.run(&script)
    }

    fn insert(&mut self, sheet: &SheetRef, address: &Address, axis: Axis) -> Result<()> {
        let mut script = Self::range_script(sheet, address);
        script.line(match axis {
            Axis::Rows => "insert into range entire row of rng shift shift down",
            Axis::Columns => "insert into range entire column of rng shift shift to right",
        });
        self.run(&script)
    }

    fn delete(&mut self, sheet: &SheetRef, address: &Address, axis: Axis) -> Result<()> {
        let mut script = Self::range_script(sheet, address);
        script.line(match axis {
            Axis::Rows => "delete range entire row of rng shift shift up",
            Axis::Columns => "delete range entire column of rng shift shift to left",
        });
        self.run(&script)
    }

    fn fill_down(&mut self, sheet: &SheetRef, address: &Address) -> Result<()> {
        let mut script = Self::range_script(sheet, address);
        script.line("fill down rng");
        self.run(&script)
    }

    fn show_levels(&mut self, sheet: &SheetRef, levels: u32) -> Result<()> {
        let mut script = Self::range_script(sheet, &Address::cell(1, 1));
        script.line(format!(
            "show levels outline object of worksheet object of rng row levels {}",
            levels
        ));
        self.run(&script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Transport;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Records every request and answers from a queue.
    #[derive(Clone, Default)]
    struct Recorder {
        sent: Rc<RefCell<Vec<String>>>,
        replies: Rc<RefCell<VecDeque<String>>>,
    }

    impl Transport for Recorder {
        fn execute(&mut self, request: &str) -> Result<String> {
            self.sent.borrow_mut().push(request.to_string());
            Ok(self.replies.borrow_mut().pop_front().unwrap_or_default())
        }
    }

    fn engine(replies: &[&str]) -> (InteractiveScript, Recorder) {
        let recorder = Recorder::default();
        recorder
            .replies
            .borrow_mut()
            .extend(replies.iter().map(|r| r.to_string()));
        let transport = ScriptTransport::new("Microsoft Excel", Box::new(recorder.clone()));
        (InteractiveScript::new(transport), recorder)
    }

    fn sheet() -> SheetRef {
        SheetRef::new("Book1", "Sheet1")
    }

    #[test]
    fn test_set_value_escapes_text() {
        let (mut xl, rec) = engine(&[""]);
        xl.set_value(&sheet(), &decode("B2").unwrap(), &Value::from("say \"hi\""))
            .unwrap();
        let sent = rec.sent.borrow();
        assert!(sent[0].starts_with("tell application \"Microsoft Excel\"\n"));
        assert!(sent[0].contains("set rng to range \"B2\" of worksheet \"Sheet1\" of workbook \"Book1\""));
        assert!(sent[0].contains(r#"set value of rng to "say \"hi\"""#));
        assert!(sent[0].contains("on index_of(theItem, theList)"));
    }

    #[test]
    fn test_missing_value_listing_means_no_workbooks() {
        let (mut xl, _) = engine(&["missing value"]);
        assert!(xl.workbook_names().unwrap().is_empty());
    }

    #[test]
    fn test_create_workbook_reads_names() {
        let (mut xl, _) = engine(&[r#"{"Workbook1", {"Sheet1"}}"#]);
        let opened = xl.create_workbook().unwrap();
        assert_eq!(opened.name, "Workbook1");
        assert_eq!(opened.sheets, vec!["Sheet1".to_string()]);
    }

    #[test]
    fn test_active_range_strips_absolute_markers() {
        let (mut xl, _) = engine(&[r#"{"Book1", "Data", "$B$2:$C$4"}"#]);
        let (at, address) = xl.active_range().unwrap();
        assert_eq!(at, SheetRef::new("Book1", "Data"));
        assert_eq!(address.to_string(), "B2:C4");
    }

    #[test]
    fn test_active_range_without_workbook() {
        let (mut xl, _) = engine(&["missing value"]);
        assert!(matches!(xl.active_range(), Err(XlError::NoWorkbookOpen)));
    }

    #[test]
    fn test_selected_cells_expand_every_area() {
        let (mut xl, _) = engine(&[r#"{"Book1", "Data", "$A$1:$B$1,$D$3"}"#]);
        let (_, cells) = xl.selected_cells().unwrap();
        let cells: Vec<String> = cells.iter().map(Address::to_string).collect();
        assert_eq!(cells, vec!["A1", "B1", "D3"]);
    }

    #[test]
    fn test_write_block_resizes_target() {
        let (mut xl, rec) = engine(&[""]);
        let rows = vec![vec![Value::from(1), Value::from("a")], vec![Value::from(2), Value::Null]];
        xl.write_block(&sheet(), &decode("C5").unwrap(), &rows).unwrap();
        let sent = rec.sent.borrow();
        assert!(sent[0].contains("range \"C5:D6\""));
        assert!(sent[0].contains(r#"set value of rng to {{1, "a"}, {2, missing value}}"#));
    }

    #[test]
    fn test_group_emits_summary_and_bold_rows() {
        let (mut xl, rec) = engine(&[""]);
        let origin = decode("A2:C9").unwrap();
        let boundaries = [OutlineBoundary {
            level: 0,
            first_row: 1,
            last_row: 3,
        }];
        xl.group(&sheet(), &origin, &boundaries).unwrap();
        let sent = rec.sent.borrow();
        assert!(sent[0].contains("summary above"));
        assert!(sent[0].contains("range \"3:5\""));
        assert!(sent[0].contains("group entire row of rng"));
        assert!(sent[0].contains("range \"A2:C2\""));
    }

    #[test]
    fn test_sort_looks_up_header_labels() {
        let (mut xl, rec) = engine(&[""]);
        let keys = [SortKey::descending("Amount"), SortKey::ascending("Name")];
        xl.sort(&sheet(), &decode("A1:C10").unwrap(), &keys, true).unwrap();
        let sent = rec.sent.borrow();
        assert!(sent[0].contains("my index_of(\"Amount\", header)"));
        assert!(sent[0].contains("key1 offs_0 order1 sort descending key2 offs_1 order2 sort ascending"));
    }

    #[test]
    fn test_reshaping_statements() {
        let (mut xl, rec) = engine(&[]);
        xl.insert(&sheet(), &decode("3:4").unwrap(), Axis::Rows).unwrap();
        xl.delete(&sheet(), &decode("C:C").unwrap(), Axis::Columns).unwrap();
        xl.fill_down(&sheet(), &decode("A2:B9").unwrap()).unwrap();
        xl.show_levels(&sheet(), 1).unwrap();
        let sent = rec.sent.borrow();
        assert!(sent[0].contains("range \"3:4\""));
        assert!(sent[0].contains("insert into range entire row of rng shift shift down"));
        assert!(sent[1].contains("delete range entire column of rng shift shift to left"));
        assert!(sent[2].contains("range \"A2:B9\""));
        assert!(sent[2].contains("fill down rng"));
        assert!(sent[3].contains("show levels outline object of worksheet object of rng row levels 1"));
    }

    #[test]
    fn test_sort_without_keys_sends_nothing() {
        let (mut xl, rec) = engine(&[]);
        let err = xl.sort(&sheet(), &decode("A1:C10").unwrap(), &[], true).unwrap_err();
        assert!(matches!(err, XlError::Datatype(_)));
        assert!(rec.sent.borrow().is_empty());
    }

    #[test]
    fn test_create_sheet_returns_unique_name() {
        let (mut xl, rec) = engine(&[r#""Data (1)""#]);
        assert_eq!(xl.create_sheet("Book1", "Data").unwrap(), "Data (1)");
        assert!(rec.sent.borrow()[0].contains("set sname to \"Data\" & \" (\" & i & \")\""));
    }

    #[test]
    fn test_date_format_check() {
        let (mut xl, _) = engine(&[r#"date "Monday, 05 January 2015 at 09:00:00""#, r#"date "05/01/2015""#]);
        assert!(xl.check_date_format().unwrap());
        assert!(!xl.check_date_format().unwrap());
    }

    #[test]
    fn test_format_maps_alignment_and_fill() {
        let (mut xl, rec) = engine(&[""]);
        let format = CellFormat {
            h_align: Some(HAlign::Center),
            v_align: Some(VAlign::Middle),
            fill: Some(Rgb(255, 0, 0)),
            ..Default::default()
        };
        xl.format(&sheet(), &decode("A1").unwrap(), &format).unwrap();
        let sent = rec.sent.borrow();
        assert!(sent[0].contains("horizontal align center"));
        assert!(sent[0].contains("vertical alignment center"));
        assert!(sent[0].contains("set color of interior object of rng to {255, 0, 0}"));
    }
}
