use std::path::{Path, PathBuf};

use tracing::info;

use super::config_types::{ConfigError, Settings};
use crate::app_dirs;

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Resolve the configuration file path, ensuring the parent directory exists.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root_dir().map_err(map_app_dir_error)?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Load settings from the application directory, returning defaults if missing.
pub fn load_or_default() -> Result<Settings, ConfigError> {
    load_settings_from(&config_path()?)
}

/// Load settings from an explicit path; a missing file yields defaults.
pub fn load_settings_from(path: &Path) -> Result<Settings, ConfigError> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let settings: Settings = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(settings.normalized())
}

/// Write settings as TOML, creating parent directories as needed.
pub fn save_settings_to_path(settings: &Settings, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let text = toml::to_string_pretty(settings).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, text).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a defaults file on first launch so the knobs are discoverable.
pub fn ensure_config_file(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Ok(());
    }
    save_settings_to_path(&Settings::default(), path)?;
    info!("Wrote default settings to {}", path.display());
    Ok(())
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> ConfigError {
    match error {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => ConfigError::CreateDir { path, source },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let settings = load_settings_from(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(
            settings.matching.affinity_threshold,
            crate::immune::DEFAULT_THRESHOLD
        );
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "[scheduler]\ntick_interval_ms = 50\nseed = 7\n\n[matching]\naffinity_threshold = 1.3\n",
        )
        .unwrap();
        let settings = load_settings_from(&path).unwrap();
        assert_eq!(settings.scheduler.tick_interval_ms, 50);
        assert_eq!(settings.scheduler.seed, Some(7));
        assert_eq!(settings.scheduler.rematch_every_ticks, 30);
        assert_eq!(settings.matching.affinity_threshold, 1.3);
        assert_eq!(settings.render.sample_rate, 44_100);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "[scheduler]\nconverging_probability = 4.0\nglobal_cap = 0\n\n[playback]\nmaster_gain = -2.0\n",
        )
        .unwrap();
        let settings = load_settings_from(&path).unwrap();
        assert_eq!(settings.scheduler.converging_probability, 1.0);
        assert_eq!(settings.scheduler.global_cap, 1);
        assert_eq!(settings.playback.master_gain, 0.0);
    }

    #[test]
    fn saved_settings_load_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let mut settings = Settings::default();
        settings.scheduler.seed = Some(42);
        settings.memory.amplitude_floor = 0.3;
        save_settings_to_path(&settings, &path).unwrap();
        assert_eq!(load_settings_from(&path).unwrap(), settings);
    }

    #[test]
    fn invalid_toml_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[scheduler\n").unwrap();
        let err = load_settings_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
    }
}
