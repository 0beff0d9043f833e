//! End-to-end session flows over each engine.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use xlrange_core::host::MemoryHost;
use xlrange_core::{
    Axis, Calculation, CellBlock, CellFormat, EngineKind, Outline, Session, SessionConfig, Value, XlError,
};

fn numbers(rows: usize, cols: usize) -> CellBlock {
    let mut data = vec![(0..cols).map(|c| Value::from(format!("col{}", c + 1))).collect::<Vec<_>>()];
    for r in 0..rows {
        data.push((0..cols).map(|c| Value::from((r * cols + c) as i64)).collect());
    }
    CellBlock::new(data).unwrap().with_header_rows(1)
}

fn file_session(dir: &Path, cell_limit: usize) -> Session {
    let mut config = SessionConfig::with_engine(EngineKind::File);
    config.output_dir = Some(dir.to_path_buf());
    config.cell_limit = cell_limit;
    Session::new(config).unwrap()
}

#[test]
fn test_file_session_chunked_write_reads_back_identically() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = file_session(dir.path(), 4);
    let wb = session.create_workbook().unwrap();
    assert_eq!(wb.name(), "Workbook.xlsx");

    let block = numbers(25, 3);
    let mut range = wb.first_sheet().unwrap().arng("C5").unwrap();
    let region = session.write_table(&mut range, &block, None).unwrap();
    assert_eq!(region.address().to_string(), "C5:E30");
    assert_eq!(session.read_block(&region).unwrap().rows(), block.rows());
}

#[test]
fn test_file_session_keeps_blank_edges_of_a_chunked_block() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = file_session(dir.path(), 3);
    let wb = session.create_workbook().unwrap();
    let block = CellBlock::new(vec![
        vec![Value::from(1), Value::from(2), Value::Null],
        vec![Value::from(3), Value::from(4), Value::Null],
        vec![Value::Null, Value::Null, Value::Null],
    ])
    .unwrap();

    let region = session
        .write_block(&wb.first_sheet().unwrap().arng("A1").unwrap(), &block)
        .unwrap();
    assert_eq!(region.address().to_string(), "A1:C3");
    assert_eq!(session.read_block(&region).unwrap().rows(), block.rows());
}

#[test]
fn test_file_session_finalizes_on_close_and_reopens_in_host() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = file_session(dir.path(), 5000);
    let wb = session.create_workbook().unwrap();
    let sheet = wb.first_sheet().unwrap().clone();

    let mut range = sheet.arng("A1").unwrap();
    session.write_table(&mut range, &numbers(3, 2), None).unwrap();
    session.format(&range.row(1).unwrap(), &CellFormat::bold()).unwrap();
    session.autofit(&range, Axis::Columns).unwrap();

    let path = dir.path().join("report.xlsx");
    let saved = session.save_workbook_as(wb.name(), &path).unwrap();
    assert_eq!(saved, "report.xlsx");
    assert!(!path.exists(), "nothing is written before close");
    session.close_workbook(&saved).unwrap();
    assert!(path.exists());
    assert!(session.workbooks().is_empty());

    let mut host = Session::with_host(
        SessionConfig::with_engine(EngineKind::Automation),
        Box::new(MemoryHost::new()),
    )
    .unwrap();
    let reopened = host.open_workbook(&path).unwrap();
    assert_eq!(reopened.name(), "report.xlsx");
    let first = reopened.sheet("Sheet").unwrap();
    assert_eq!(host.get_value(&first.arng("A1").unwrap()).unwrap(), Value::from("col1"));
    assert_eq!(host.get_value(&first.arng("B4").unwrap()).unwrap(), Value::Number(5.0));
    let region = host.current_region(&first.arng("A1").unwrap()).unwrap();
    assert_eq!(region.address().to_string(), "A1:B4");
}

#[test]
fn test_unsupported_operations_on_file_engine() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = file_session(dir.path(), 5000);
    let wb = session.create_workbook().unwrap();
    let a1 = wb.first_sheet().unwrap().range();

    assert!(matches!(session.active_range(), Err(XlError::Unsupported { .. })));
    assert!(matches!(session.select(&a1), Err(XlError::Unsupported { .. })));
    assert!(matches!(session.freeze_panes(&a1), Err(XlError::Unsupported { .. })));
    assert!(matches!(session.fill_down(&a1), Err(XlError::Unsupported { .. })));
    assert!(matches!(
        session.insert(&a1, Axis::Rows, &[1]),
        Err(XlError::Unsupported { .. })
    ));
    // Calculation mode is accepted and ignored.
    session.set_calculation(Calculation::Manual).unwrap();
    assert_eq!(session.calculation(), Calculation::Manual);
}

#[test]
fn test_host_session_outline_and_sheet_names() {
    let host = Rc::new(RefCell::new(MemoryHost::new()));
    let mut session = Session::with_host(
        SessionConfig::with_engine(EngineKind::Automation),
        Box::new(host.clone()),
    )
    .unwrap();
    let wb = session.create_workbook().unwrap();
    let data = session.create_sheet(wb.name(), "Data").unwrap();
    let again = session.create_sheet(wb.name(), "Data").unwrap();
    assert_eq!(again.name(), "Data(1)");

    let block = CellBlock::new(vec![
        vec![Value::from("Region"), Value::from("Amount")],
        vec![Value::from("Total"), Value::from(30)],
        vec![Value::from("East"), Value::from(10)],
        vec![Value::from("East"), Value::from(20)],
    ])
    .unwrap()
    .with_header_rows(1);
    let mut range = data.arng("A1").unwrap();
    session
        .write_table(&mut range, &block, Some(&Outline::new(1, "Total")))
        .unwrap();

    let host = host.borrow();
    let sheet = host.sheet(wb.name(), "Data").unwrap();
    assert_eq!(sheet.row_groups(), &[(3, 4)]);
    assert!(sheet.summary_above());
}

#[test]
fn test_host_session_rename_collides_into_suffix() {
    let mut session = Session::with_host(
        SessionConfig::with_engine(EngineKind::Automation),
        Box::new(MemoryHost::new()),
    )
    .unwrap();
    let wb = session.create_workbook().unwrap();
    session.create_sheet(wb.name(), "Summary").unwrap();
    let first = wb.first_sheet().unwrap().sheet_ref();
    let renamed = session.rename_sheet(&first, "Summary").unwrap();
    assert_eq!(renamed.sheet, "Summary(1)");
    assert!(session.sheet(wb.name(), "Summary(1)").is_ok());
    assert!(session.sheet(wb.name(), "Sheet1").is_err());
}

#[cfg(unix)]
mod script {
    use super::*;
    use std::fs;

    /// A stand-in interpreter: logs each request and answers the listing
    /// queries with canned literals.
    fn fake_interpreter(dir: &Path) -> (Vec<String>, std::path::PathBuf) {
        let log = dir.join("requests.log");
        let script = dir.join("fake-osascript.sh");
        fs::write(
            &script,
            format!(
                r#"req=$(cat)
printf '%s\n----\n' "$req" >> '{}'
case "$req" in
  *"return name of workbooks"*) echo '{{"Book1"}}' ;;
  *"return name of sheets of workbook"*) echo '{{"Sheet1", "Data"}}' ;;
  *) echo '' ;;
esac
"#,
                log.display()
            ),
        )
        .unwrap();
        (vec!["sh".to_string(), script.display().to_string()], log)
    }

    fn config(interpreter: Vec<String>) -> SessionConfig {
        let mut config = SessionConfig::with_engine(EngineKind::Script);
        config.interpreter = interpreter;
        config.check_date_format = false;
        config
    }

    #[test]
    fn test_script_session_lists_and_sends_requests() {
        let dir = tempfile::tempdir().unwrap();
        let (interpreter, log) = fake_interpreter(dir.path());
        let mut session = Session::new(config(interpreter)).unwrap();

        let names: Vec<_> = session.workbook("Book1").unwrap().sheets().iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["Sheet1", "Data"]);

        session.set_calculation(Calculation::Manual).unwrap();
        let a1 = session.sheet("Book1", "Data").unwrap().arng("A1").unwrap();
        session.set_value(&a1, "hello").unwrap();

        let requests = fs::read_to_string(&log).unwrap();
        assert!(requests.contains("tell application \"Microsoft Excel\""));
        assert!(requests.contains("set calculation to calculation manual"));
        assert!(requests.contains("\"hello\""));
        assert!(requests.contains("\"Data\""));
    }

    #[test]
    fn test_interpreter_stderr_fails_with_the_request() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("broken.sh");
        fs::write(&script, "cat > /dev/null\necho 'execution error' >&2\nexit 1\n").unwrap();
        let err = Session::new(config(vec!["sh".to_string(), script.display().to_string()]))
            .err()
            .unwrap();
        match err {
            XlError::EngineCommunication { message, request } => {
                assert!(message.contains("execution error"));
                assert!(request.contains("return name of workbooks"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_missing_interpreter_is_reported() {
        let err = Session::new(config(vec!["/no/such/interpreter".to_string()]))
            .err()
            .unwrap();
        assert!(matches!(err, XlError::EngineCommunication { .. }));
    }
}
