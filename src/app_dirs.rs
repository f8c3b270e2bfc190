//! Where pathosynth keeps its files: one `.pathosynth` folder holding
//! `config.toml` and `logs/`.
//!
//! The folder sits in the OS config directory unless `PATHOSYNTH_CONFIG_HOME`
//! names another base (portable installs, test runs).

use std::path::PathBuf;

use directories::BaseDirs;
use thiserror::Error;

pub const APP_DIR_NAME: &str = ".pathosynth";
pub const CONFIG_HOME_ENV: &str = "PATHOSYNTH_CONFIG_HOME";
const LOGS_DIR_NAME: &str = "logs";

#[derive(Debug, Error)]
pub enum AppDirError {
    #[error("No suitable base config directory available for application files")]
    NoBaseDir,
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The `.pathosynth` folder, created on demand.
pub fn app_root_dir() -> Result<PathBuf, AppDirError> {
    let base = config_base_dir().ok_or(AppDirError::NoBaseDir)?;
    ensure_dir(base.join(APP_DIR_NAME))
}

/// `logs/` inside the application folder, created on demand.
pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    ensure_dir(app_root_dir()?.join(LOGS_DIR_NAME))
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf, AppDirError> {
    match std::fs::create_dir_all(&path) {
        Ok(()) => Ok(path),
        Err(source) => Err(AppDirError::CreateDir { path, source }),
    }
}

/// An empty override counts as unset.
fn config_base_dir() -> Option<PathBuf> {
    std::env::var_os(CONFIG_HOME_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn ensure_dir_creates_nested_folders() {
        let base = tempdir().unwrap();
        let nested = base.path().join(APP_DIR_NAME).join(LOGS_DIR_NAME);
        assert_eq!(ensure_dir(nested.clone()).unwrap(), nested);
        assert!(nested.is_dir());
        // Already present is fine.
        assert!(ensure_dir(nested).is_ok());
    }

    #[test]
    fn ensure_dir_reports_the_blocked_path() {
        let base = tempdir().unwrap();
        let file = base.path().join("occupied");
        std::fs::write(&file, b"not a folder").unwrap();
        let blocked = file.join(LOGS_DIR_NAME);
        match ensure_dir(blocked.clone()) {
            Err(AppDirError::CreateDir { path, .. }) => assert_eq!(path, blocked),
            other => panic!("expected CreateDir, got {other:?}"),
        }
    }
}
