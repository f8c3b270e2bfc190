use pathosynth::analysis::{AnalysisError, FeatureExtractor, FeatureSummary};
use pathosynth::audio::RawAudioBuffer;
use pathosynth::synth::{AudioRenderer, RenderError, SynthParams};

pub const BANDS: [f64; 5] = [1.0, 0.7, 0.4, 0.2, 0.05];

/// Renders the primary frequency as a one-sample buffer.
pub struct PrimaryRenderer;

impl AudioRenderer for PrimaryRenderer {
    fn render(&self, params: &SynthParams) -> Result<RawAudioBuffer, RenderError> {
        let freq = params.primary_frequency().ok_or(RenderError::NoFrequencies)?;
        Ok(RawAudioBuffer::new(vec![freq as f32], 44_100))
    }
}

pub struct FailingRenderer;

impl AudioRenderer for FailingRenderer {
    fn render(&self, _params: &SynthParams) -> Result<RawAudioBuffer, RenderError> {
        Err(RenderError::Failed("renderer offline".into()))
    }
}

/// Reads the first sample back as the only peak, with a fixed band profile.
pub struct SampleExtractor;

impl FeatureExtractor for SampleExtractor {
    fn analyze(&self, buffer: &RawAudioBuffer) -> Result<FeatureSummary, AnalysisError> {
        let peak = buffer.samples().first().ok_or(AnalysisError::EmptyBuffer)?;
        Ok(FeatureSummary::new(vec![*peak as f64], BANDS.to_vec()))
    }
}
