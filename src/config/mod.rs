//! TOML-backed settings for the scheduler, matching engine, renderer and output.

mod config_defaults;
mod config_io;
mod config_types;

pub use config_io::{
    CONFIG_FILE_NAME, config_path, ensure_config_file, load_or_default, load_settings_from,
    save_settings_to_path,
};
pub use config_types::{
    ConfigError, MatchingSettings, MemorySettings, PlaybackSettings, RenderSettings,
    SchedulerSettings, Settings,
};
