//! Errors raised while preparing a session from the command line.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown engine '{0}' (expected script, automation or file)")]
    UnknownEngine(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
