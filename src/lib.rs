//! Library exports for the binary, benchmarks and integration tests.
/// Spectral features and target comparison.
pub mod analysis;
/// Application directory resolution.
pub mod app_dirs;
/// Buffers, WAV loading and live voice output.
pub mod audio;
/// Command-line parsing for the binary.
pub mod cli;
/// TOML settings.
pub mod config;
/// Matching engine, candidate lifecycle and the population scheduler.
pub mod immune;
/// Tracing subscriber setup.
pub mod logging;
/// Feedback resonator synth and its parameter space.
pub mod synth;
