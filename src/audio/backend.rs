use std::collections::HashSet;
use std::f64::consts::FRAC_PI_4;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::synth::SynthParams;

/// Distance at which a voice is attenuated to half its level.
const HALF_LEVEL_DISTANCE: f64 = 10.0;
/// Lateral offset that pans a voice fully to one side.
const FULL_PAN_OFFSET: f64 = 15.0;

/// Position of a voice on the installation floor; `x` is lateral, `z` is depth.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Position {
    pub x: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }

    pub fn distance(&self) -> f64 {
        self.x.hypot(self.z)
    }

    /// Equal-power left/right gains including distance attenuation.
    pub fn stereo_gains(&self) -> (f32, f32) {
        let pan = (self.x / FULL_PAN_OFFSET).clamp(-1.0, 1.0);
        let angle = (pan + 1.0) * FRAC_PI_4;
        let attenuation = 1.0 / (1.0 + self.distance() / HALF_LEVEL_DISTANCE);
        (
            (angle.cos() * attenuation) as f32,
            (angle.sin() * attenuation) as f32,
        )
    }
}

/// Everything a backend needs to start one voice.
#[derive(Debug, Clone)]
pub struct VoiceRequest {
    pub params: SynthParams,
    pub amplitude: f64,
    pub position: Position,
    pub duration: Duration,
}

/// Opaque token for a started voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceHandle(pub u64);

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Failed to open audio output: {0}")]
    OpenStream(String),
    #[error("Voice cannot be built: {0}")]
    InvalidVoice(#[from] crate::synth::RenderError),
    #[error("Playback unavailable: {0}")]
    Unavailable(String),
}

/// Live output the scheduler starts and stops voices on.
///
/// Only ever driven from the tick thread.
pub trait PlaybackBackend {
    fn start(&mut self, request: &VoiceRequest) -> Result<VoiceHandle, PlaybackError>;

    /// Release a voice; unknown or already finished handles are ignored.
    fn stop(&mut self, handle: VoiceHandle);

    /// Overall output gain; 0.0 mutes the installation.
    fn set_master_gain(&mut self, _gain: f32) {}

    fn active_voices(&self) -> usize;
}

/// Backend that tracks voices without producing sound.
#[derive(Debug, Default)]
pub struct SilentBackend {
    next_handle: u64,
    active: HashSet<VoiceHandle>,
    started: u64,
}

impl SilentBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Voices started over the backend's lifetime.
    pub fn started(&self) -> u64 {
        self.started
    }
}

impl PlaybackBackend for SilentBackend {
    fn start(&mut self, request: &VoiceRequest) -> Result<VoiceHandle, PlaybackError> {
        if request.params.freqs.is_empty() {
            return Err(PlaybackError::InvalidVoice(
                crate::synth::RenderError::NoFrequencies,
            ));
        }
        let handle = VoiceHandle(self.next_handle);
        self.next_handle += 1;
        self.started += 1;
        self.active.insert(handle);
        Ok(handle)
    }

    fn stop(&mut self, handle: VoiceHandle) {
        self.active.remove(&handle);
    }

    fn active_voices(&self) -> usize {
        self.active.len()
    }
}
