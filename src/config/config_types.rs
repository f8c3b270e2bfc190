use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::config_defaults::*;

/// Settings loaded from `config.toml`.
///
/// Config tables (TOML): `scheduler`, `matching`, `render`, `memory`, `playback`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub render: RenderSettings,
    #[serde(default)]
    pub memory: MemorySettings,
    #[serde(default)]
    pub playback: PlaybackSettings,
}

impl Settings {
    /// Clamp loaded values into ranges the scheduler can run with.
    pub fn normalized(mut self) -> Self {
        let scheduler = &mut self.scheduler;
        scheduler.tick_interval_ms = scheduler.tick_interval_ms.max(1);
        scheduler.rematch_every_ticks = scheduler.rematch_every_ticks.max(1);
        scheduler.global_cap = scheduler.global_cap.max(1);
        scheduler.baseline_probability_high = clamp_probability(scheduler.baseline_probability_high);
        scheduler.baseline_probability_low = clamp_probability(scheduler.baseline_probability_low);
        scheduler.converging_probability = clamp_probability(scheduler.converging_probability);
        scheduler.converged_probability = clamp_probability(scheduler.converged_probability);
        self.matching.survivors = self.matching.survivors.max(1);
        if !self.matching.affinity_threshold.is_finite() {
            self.matching.affinity_threshold = default_affinity_threshold();
        }
        self.render.sample_rate = clamp_sample_rate(self.render.sample_rate);
        self.render.comparison_seconds = clamp_comparison_seconds(self.render.comparison_seconds);
        self.memory.amplitude_floor = clamp_amplitude_floor(self.memory.amplitude_floor);
        self.memory.amplitude_decay = clamp_amplitude_decay(self.memory.amplitude_decay);
        self.playback.master_gain = clamp_gain(self.playback.master_gain);
        self
    }
}

/// Tick cadence, population floor, concurrency caps and trigger probabilities.
///
/// Config keys: `tick_interval_ms`, `rematch_every_ticks`, `baseline_floor`,
/// `initial_baseline`, `baseline_cap`, `converging_cap`, `converged_cap`, `global_cap`,
/// `baseline_probability_high`, `baseline_probability_low`, `converging_probability`,
/// `converged_probability`, `seed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerSettings {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Breeding rounds for converging populations are re-dispatched every this many ticks.
    #[serde(default = "default_rematch_every_ticks")]
    pub rematch_every_ticks: u64,
    /// Fewer baseline candidates than this triggers one spawn per tick.
    #[serde(default = "default_baseline_floor")]
    pub baseline_floor: usize,
    /// Baseline candidates created with the scheduler.
    #[serde(default = "default_baseline_floor")]
    pub initial_baseline: usize,
    #[serde(default = "default_category_cap")]
    pub baseline_cap: usize,
    #[serde(default = "default_category_cap")]
    pub converging_cap: usize,
    #[serde(default = "default_category_cap")]
    pub converged_cap: usize,
    #[serde(default = "default_global_cap")]
    pub global_cap: usize,
    /// Baseline trigger probability while fewer than two voices sound.
    #[serde(default = "default_baseline_probability_high")]
    pub baseline_probability_high: f64,
    #[serde(default = "default_baseline_probability_low")]
    pub baseline_probability_low: f64,
    #[serde(default = "default_converging_probability")]
    pub converging_probability: f64,
    #[serde(default = "default_converged_probability")]
    pub converged_probability: f64,
    /// Fixed RNG seed; a fresh one is drawn per launch when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SchedulerSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            rematch_every_ticks: default_rematch_every_ticks(),
            baseline_floor: default_baseline_floor(),
            initial_baseline: default_baseline_floor(),
            baseline_cap: default_category_cap(),
            converging_cap: default_category_cap(),
            converged_cap: default_category_cap(),
            global_cap: default_global_cap(),
            baseline_probability_high: default_baseline_probability_high(),
            baseline_probability_low: default_baseline_probability_low(),
            converging_probability: default_converging_probability(),
            converged_probability: default_converged_probability(),
            seed: None,
        }
    }
}

/// Config keys: `affinity_threshold`, `survivors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingSettings {
    /// Best affinity above this value ends the search for a target.
    #[serde(default = "default_affinity_threshold")]
    pub affinity_threshold: f64,
    /// Ranked survivors kept per round; rank `i` breeds `survivors - i` offspring.
    #[serde(default = "default_survivors")]
    pub survivors: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            affinity_threshold: default_affinity_threshold(),
            survivors: default_survivors(),
        }
    }
}

/// Config keys: `sample_rate`, `comparison_seconds`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Length of the offline render compared against each target.
    #[serde(default = "default_comparison_seconds")]
    pub comparison_seconds: f64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            comparison_seconds: default_comparison_seconds(),
        }
    }
}

/// Config keys: `amplitude_floor`, `amplitude_decay`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySettings {
    /// Level memory voices fade toward with repeated plays.
    #[serde(default = "default_amplitude_floor")]
    pub amplitude_floor: f64,
    /// Per-play factor applied to the distance above the floor.
    #[serde(default = "default_amplitude_decay")]
    pub amplitude_decay: f64,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            amplitude_floor: default_amplitude_floor(),
            amplitude_decay: default_amplitude_decay(),
        }
    }
}

/// Config keys: `enabled`, `master_gain`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSettings {
    /// Open the speaker output; when false voices are tracked silently.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_master_gain")]
    pub master_gain: f32,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            master_gain: default_master_gain(),
        }
    }
}

/// Errors that may occur while loading or saving settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to create the config directory.
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
    /// No usable config directory found.
    #[error("No suitable config directory found")]
    NoConfigDir,
}
