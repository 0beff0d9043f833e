//! Session construction settings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use xlrange_engine::engine::DEFAULT_CELL_LIMIT;

/// Which backend a [`Session`](crate::Session) drives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// AppleScript requests through an external interpreter.
    #[serde(alias = "applescript")]
    Script,
    /// Property access on a live host object model.
    #[serde(alias = "com")]
    Automation,
    /// Buffered changes written to an xlsx file on close.
    #[default]
    #[serde(alias = "xlsx")]
    File,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EngineKind::Script => "interactive-script",
            EngineKind::Automation => "live-automation",
            EngineKind::File => "deferred-file",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub engine: EngineKind,
    /// Maximum cells per backend write call.
    pub cell_limit: usize,
    /// Application addressed by `tell application`.
    pub application: String,
    /// Interpreter command line; the request is fed on stdin.
    pub interpreter: Vec<String>,
    /// Where Deferred-File workbooks are written when no explicit path was given.
    pub output_dir: Option<PathBuf>,
    /// Check the host date format when a script session starts.
    pub check_date_format: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            engine: EngineKind::default(),
            cell_limit: DEFAULT_CELL_LIMIT,
            application: "Microsoft Excel".to_string(),
            interpreter: vec!["osascript".to_string(), "-s".to_string(), "s".to_string(), "-".to_string()],
            output_dir: None,
            check_date_format: true,
        }
    }
}

impl SessionConfig {
    pub fn with_engine(engine: EngineKind) -> Self {
        SessionConfig {
            engine,
            ..Default::default()
        }
    }
}
