use thiserror::Error;

use super::network::FeedbackNetwork;
use super::params::SynthParams;
use crate::audio::RawAudioBuffer;

/// Drive used for comparison renders, matching the sustained part of a live voice.
const OFFLINE_DRIVE: f64 = 0.9;

/// Errors raised while rendering a parameter set to audio.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Synth has no resonator frequencies")]
    NoFrequencies,
    #[error("Frequency {freq} Hz is not renderable at {sample_rate} Hz")]
    FrequencyOutOfRange { freq: f64, sample_rate: u32 },
    #[error("Render length must be positive, got {seconds} s")]
    InvalidLength { seconds: f64 },
    /// Catch-all for external renderers.
    #[error("Render failed: {0}")]
    Failed(String),
}

/// Produces audio for a parameter set; deterministic for a given configuration.
///
/// Implementations run on breeding-round worker threads.
pub trait AudioRenderer: Send + Sync {
    fn render(&self, params: &SynthParams) -> Result<RawAudioBuffer, RenderError>;
}

/// Renders a fixed-length mono excerpt of the voice at its sustained level.
#[derive(Debug, Clone)]
pub struct OfflineRenderer {
    sample_rate: u32,
    seconds: f64,
}

impl OfflineRenderer {
    pub fn new(sample_rate: u32, seconds: f64) -> Self {
        Self {
            sample_rate,
            seconds,
        }
    }
}

impl AudioRenderer for OfflineRenderer {
    fn render(&self, params: &SynthParams) -> Result<RawAudioBuffer, RenderError> {
        validate(params, self.sample_rate)?;
        if !self.seconds.is_finite() || self.seconds <= 0.0 {
            return Err(RenderError::InvalidLength {
                seconds: self.seconds,
            });
        }
        let frames = (self.seconds * self.sample_rate as f64).round() as usize;
        let mut network = FeedbackNetwork::new(params, self.sample_rate);
        let samples = (0..frames)
            .map(|_| network.next_sample(OFFLINE_DRIVE) as f32)
            .collect();
        Ok(RawAudioBuffer::new(samples, self.sample_rate))
    }
}

/// Check that every resonator sits below Nyquist and is finite.
pub(crate) fn validate(params: &SynthParams, sample_rate: u32) -> Result<(), RenderError> {
    if params.freqs.is_empty() {
        return Err(RenderError::NoFrequencies);
    }
    let nyquist = sample_rate as f64 / 2.0;
    if let Some(&freq) = params
        .freqs
        .iter()
        .find(|f| !f.is_finite() || **f <= 0.0 || **f >= nyquist)
    {
        return Err(RenderError::FrequencyOutOfRange { freq, sample_rate });
    }
    Ok(())
}
