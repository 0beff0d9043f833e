//! `config.toml` loading for the `xlrange` binary.

use crate::error::{ConfigError, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::debug;
use xlrange_core::{EngineKind, SessionConfig};

/// `<config dir>/xlrange/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "xlrange")?;
    let mut path = proj.config_dir().to_path_buf();
    path.push("config.toml");
    Some(path)
}

pub fn parse_config(text: &str, path: &Path) -> Result<SessionConfig> {
    toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load an explicitly named file, or the default one.
///
/// A missing default file means defaults; a missing explicit file is an error.
pub fn load_config(explicit: Option<&Path>) -> Result<SessionConfig> {
    let (path, required) = match explicit {
        Some(p) => (p.to_path_buf(), true),
        None => match default_config_path() {
            Some(p) => (p, false),
            None => return Ok(SessionConfig::default()),
        },
    };
    match std::fs::read_to_string(&path) {
        Ok(text) => {
            debug!(path = %path.display(), "loading config");
            parse_config(&text, &path)
        }
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => Ok(SessionConfig::default()),
        Err(source) => Err(ConfigError::Io { path, source }),
    }
}

pub fn parse_engine(name: &str) -> Result<EngineKind> {
    match name.to_ascii_lowercase().as_str() {
        "script" | "applescript" => Ok(EngineKind::Script),
        "automation" | "com" => Ok(EngineKind::Automation),
        "file" | "xlsx" => Ok(EngineKind::File),
        _ => Err(ConfigError::UnknownEngine(name.to_string())),
    }
}
