//! XDG-compliant path resolution for rafiq.
//!
//! Resolves the configuration, data, and state directories following the
//! XDG Base Directory Specification, with standard `$HOME` fallbacks.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

/// Errors from path resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum PathError {
    #[error("cannot determine home directory")]
    #[diagnostic(
        code(rafiq::paths::no_home),
        help("Set the HOME environment variable or ensure a valid user profile exists.")
    )]
    NoHome,

    #[error("failed to create directory: {path}")]
    #[diagnostic(
        code(rafiq::paths::create_dir),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type PathResult<T> = std::result::Result<T, PathError>;

/// XDG-compliant directories for rafiq.
#[derive(Debug, Clone)]
pub struct RafiqPaths {
    /// `$XDG_CONFIG_HOME/rafiq/`
    pub config_dir: PathBuf,
    /// `$XDG_DATA_HOME/rafiq/`
    pub data_dir: PathBuf,
    /// `$XDG_STATE_HOME/rafiq/`
    pub state_dir: PathBuf,
}

impl RafiqPaths {
    /// Resolve XDG directories from environment variables with standard fallbacks.
    pub fn resolve() -> PathResult<Self> {
        let home = std::env::var("HOME")
            .map(PathBuf::from)
            .map_err(|_| PathError::NoHome)?;

        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".config"))
            .join("rafiq");

        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".local/share"))
            .join("rafiq");

        let state_dir = std::env::var("XDG_STATE_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".local/state"))
            .join("rafiq");

        Ok(Self {
            config_dir,
            data_dir,
            state_dir,
        })
    }

    /// Default settings file location.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Knowledge base database file inside a data directory.
    pub fn kb_file(data_dir: &Path) -> PathBuf {
        data_dir.join("kb.redb")
    }

    /// Create the data directory if it does not exist.
    pub fn ensure_data_dir(data_dir: &Path) -> PathResult<()> {
        std::fs::create_dir_all(data_dir).map_err(|e| PathError::CreateDir {
            path: data_dir.display().to_string(),
            source: e,
        })
    }
}
