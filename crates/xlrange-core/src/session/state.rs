use super::Range;
use super::range::address_at;
use crate::adapter::{
    Calculation, DeferredFile, EngineAdapter, InteractiveScript, LiveAutomation, OpenedWorkbook, SheetRef,
};
use crate::config::{EngineKind, SessionConfig};
use crate::error::{Result, XlError};
use crate::host::HostApplication;
use crate::transport::{ProcessTransport, ScriptTransport, Transport};
use std::path::Path;
use tracing::{debug, info, warn};
use xlrange_engine::engine::{Address, Coord, decode};

/// A sheet as last reported by the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sheet {
    name: String,
    workbook: String,
    current: Address,
}

impl Sheet {
    fn new(workbook: &str, name: impl Into<String>) -> Self {
        Sheet {
            name: name.into(),
            workbook: workbook.to_string(),
            current: Address::Cell(Coord::new(1, 1)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn workbook(&self) -> &str {
        &self.workbook
    }

    pub fn sheet_ref(&self) -> SheetRef {
        SheetRef::new(&self.workbook, &self.name)
    }

    /// The sheet's current range, `A1` until [`Session::set_current`] moves it.
    pub fn range(&self) -> Range {
        Range::new(self.sheet_ref(), self.current.clone())
    }

    pub fn arng(&self, address: &str) -> Result<Range> {
        Ok(Range::new(self.sheet_ref(), decode(address)?))
    }

    pub fn arng_at(&self, row: Option<u32>, col: Option<u32>) -> Result<Range> {
        Ok(Range::new(self.sheet_ref(), address_at(row, col)?))
    }
}

/// A workbook and its sheets, in backend order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Workbook {
    name: String,
    sheets: Vec<Sheet>,
}

impl Workbook {
    fn new(name: impl Into<String>, sheet_names: Vec<String>) -> Self {
        let name = name.into();
        let sheets = sheet_names.into_iter().map(|s| Sheet::new(&name, s)).collect();
        Workbook { name, sheets }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Result<&Sheet> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| XlError::sheet_not_found(name))
    }

    /// First sheet; every workbook a backend reports has at least one.
    pub fn first_sheet(&self) -> Result<&Sheet> {
        self.sheets.first().ok_or_else(|| XlError::sheet_not_found("(first)"))
    }

    fn rename(&mut self, name: &str) {
        self.name = name.to_string();
        for sheet in &mut self.sheets {
            sheet.workbook = name.to_string();
        }
    }
}

/// Owns one engine adapter and the workbook tree it reports.
///
/// Lookups fail closed: asking for a workbook or sheet the session does not
/// know is an [`XlError::ElementNotFound`], never a silent default.
pub struct Session {
    pub(crate) config: SessionConfig,
    pub(crate) adapter: Box<dyn EngineAdapter>,
    workbooks: Vec<Workbook>,
    calculation: Calculation,
}

impl Session {
    /// Build a session for `config.engine`.
    ///
    /// Script sessions spawn `config.interpreter` for every request. File
    /// sessions write into `config.output_dir` (the working directory when
    /// unset). Automation needs a live host, see [`Session::with_host`].
    pub fn new(config: SessionConfig) -> Result<Self> {
        match config.engine {
            EngineKind::Script => {
                let channel = ProcessTransport::new(&config.interpreter)?;
                Self::with_transport(config, Box::new(channel))
            }
            EngineKind::Automation => Err(XlError::unsupported(EngineKind::Automation, "session without a host")),
            EngineKind::File => {
                let dir = config.output_dir.clone().unwrap_or_else(|| ".".into());
                Self::with_adapter(config, Box::new(DeferredFile::new(dir)))
            }
        }
    }

    /// Script session over any request channel.
    pub fn with_transport(config: SessionConfig, channel: Box<dyn Transport>) -> Result<Self> {
        let mut script = InteractiveScript::new(ScriptTransport::new(&config.application, channel));
        if config.check_date_format && !script.check_date_format()? {
            warn!(
                application = %config.application,
                "host date format is not the long format; date values will come back as text"
            );
        }
        Self::with_adapter(config, Box::new(script))
    }

    /// Automation session over a live host object model.
    pub fn with_host(config: SessionConfig, host: Box<dyn HostApplication>) -> Result<Self> {
        Self::with_adapter(config, Box::new(LiveAutomation::new(host)))
    }

    pub fn with_adapter(config: SessionConfig, adapter: Box<dyn EngineAdapter>) -> Result<Self> {
        let mut session = Session {
            config,
            adapter,
            workbooks: Vec::new(),
            calculation: Calculation::default(),
        };
        session.refresh()?;
        info!(engine = %session.kind(), workbooks = session.workbooks.len(), "session started");
        Ok(session)
    }

    pub fn kind(&self) -> EngineKind {
        self.adapter.kind()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn calculation(&self) -> Calculation {
        self.calculation
    }

    /// Re-read workbook and sheet names from the backend. Current ranges of
    /// sheets that still exist are kept.
    pub fn refresh(&mut self) -> Result<()> {
        let mut fresh = Vec::new();
        for name in self.adapter.workbook_names()? {
            let sheets = self.adapter.sheet_names(&name)?;
            let mut workbook = Workbook::new(&name, sheets);
            for sheet in &mut workbook.sheets {
                if let Some(old) = self.find_sheet(&name, &sheet.name) {
                    sheet.current = old.current.clone();
                }
            }
            fresh.push(workbook);
        }
        debug!(workbooks = fresh.len(), "refreshed workbook list");
        self.workbooks = fresh;
        Ok(())
    }

    fn find_sheet(&self, workbook: &str, sheet: &str) -> Option<&Sheet> {
        self.workbooks
            .iter()
            .find(|w| w.name == workbook)
            .and_then(|w| w.sheets.iter().find(|s| s.name == sheet))
    }

    pub fn workbooks(&self) -> &[Workbook] {
        &self.workbooks
    }

    pub fn workbook(&self, name: &str) -> Result<&Workbook> {
        self.workbooks
            .iter()
            .find(|w| w.name == name)
            .ok_or_else(|| XlError::workbook_not_found(name))
    }

    pub fn sheet(&self, workbook: &str, sheet: &str) -> Result<&Sheet> {
        self.workbook(workbook)?.sheet(sheet)
    }

    fn workbook_mut(&mut self, name: &str) -> Result<&mut Workbook> {
        self.workbooks
            .iter_mut()
            .find(|w| w.name == name)
            .ok_or_else(|| XlError::workbook_not_found(name))
    }

    /// Make `range` the current range of its sheet.
    pub fn set_current(&mut self, range: &Range) -> Result<()> {
        let target = range.sheet();
        let sheet = self
            .workbook_mut(&target.workbook)?
            .sheets
            .iter_mut()
            .find(|s| s.name == target.sheet)
            .ok_or_else(|| XlError::sheet_not_found(&target.sheet))?;
        sheet.current = range.address().clone();
        Ok(())
    }

    /// Ensure the session knows `sheet`, refreshing once if the backend has
    /// something the session has not seen yet.
    fn known(&mut self, sheet: &SheetRef) -> Result<()> {
        if self.find_sheet(&sheet.workbook, &sheet.sheet).is_none() {
            self.refresh()?;
        }
        self.sheet(&sheet.workbook, &sheet.sheet).map(|_| ())
    }

    pub fn active_workbook(&mut self) -> Result<&Workbook> {
        let (sheet, _) = self.adapter.active_range()?;
        self.known(&sheet)?;
        self.workbook(&sheet.workbook)
    }

    pub fn active_range(&mut self) -> Result<Range> {
        let (sheet, address) = self.adapter.active_range()?;
        self.known(&sheet)?;
        Ok(Range::new(sheet, address))
    }

    /// Every area of the current selection, one range per area.
    pub fn selected_cells(&mut self) -> Result<Vec<Range>> {
        let (sheet, areas) = self.adapter.selected_cells()?;
        self.known(&sheet)?;
        Ok(areas.into_iter().map(|a| Range::new(sheet.clone(), a)).collect())
    }

    /// Point `range` at whatever is selected in the backend right now.
    pub fn resync(&mut self, range: &mut Range) -> Result<()> {
        let (sheet, address) = self.adapter.active_range()?;
        self.known(&sheet)?;
        range.set(sheet, address);
        Ok(())
    }

    pub fn set_calculation(&mut self, mode: Calculation) -> Result<()> {
        self.adapter.set_calculation(mode)?;
        self.calculation = mode;
        Ok(())
    }

    fn adopt(&mut self, opened: OpenedWorkbook) -> Workbook {
        let workbook = Workbook::new(opened.name, opened.sheets);
        self.workbooks.retain(|w| w.name != workbook.name);
        self.workbooks.push(workbook.clone());
        workbook
    }

    pub fn create_workbook(&mut self) -> Result<Workbook> {
        let opened = self.adapter.create_workbook()?;
        info!(workbook = %opened.name, "created workbook");
        Ok(self.adopt(opened))
    }

    pub fn open_workbook(&mut self, path: &Path) -> Result<Workbook> {
        let opened = self.adapter.open_workbook(path)?;
        info!(workbook = %opened.name, path = %path.display(), "opened workbook");
        Ok(self.adopt(opened))
    }

    pub fn close_workbook(&mut self, name: &str) -> Result<()> {
        self.workbook(name)?;
        self.adapter.close_workbook(name)?;
        self.workbooks.retain(|w| w.name != name);
        info!(workbook = %name, "closed workbook");
        Ok(())
    }

    /// Save under `path`. The workbook takes the name the backend reports
    /// afterwards, which is returned.
    pub fn save_workbook_as(&mut self, name: &str, path: &Path) -> Result<String> {
        self.workbook(name)?;
        let saved = self.adapter.save_workbook_as(name, path)?;
        self.workbook_mut(name)?.rename(&saved);
        info!(workbook = %saved, path = %path.display(), "saved workbook");
        Ok(saved)
    }

    /// Add a sheet; an existing name gets a numeric suffix.
    pub fn create_sheet(&mut self, workbook: &str, name: &str) -> Result<Sheet> {
        self.workbook(workbook)?;
        let actual = self.adapter.create_sheet(workbook, name)?;
        let sheet = Sheet::new(workbook, &actual);
        self.workbook_mut(workbook)?.sheets.push(sheet.clone());
        debug!(workbook = %workbook, sheet = %actual, "created sheet");
        Ok(sheet)
    }

    pub fn rename_sheet(&mut self, sheet: &SheetRef, name: &str) -> Result<SheetRef> {
        self.sheet(&sheet.workbook, &sheet.sheet)?;
        let actual = self.adapter.rename_sheet(sheet, name)?;
        if let Some(s) = self
            .workbook_mut(&sheet.workbook)?
            .sheets
            .iter_mut()
            .find(|s| s.name == sheet.sheet)
        {
            s.name = actual.clone();
        }
        Ok(SheetRef::new(&sheet.workbook, actual))
    }
}
