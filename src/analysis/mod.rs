//! Spectral feature extraction and comparison used to score candidates against targets.

mod compare;
mod features;
mod spectrum;

use thiserror::Error;

use crate::audio::RawAudioBuffer;

pub use compare::{ComparisonError, compare};
pub use features::{ComparisonResult, FeatureSummary};
pub use spectrum::SpectralAnalyzer;

/// Errors raised while summarizing a buffer.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Cannot analyze an empty buffer")]
    EmptyBuffer,
    #[error("Buffer has no sample rate")]
    ZeroSampleRate,
    #[error("No spectral peaks found in the analysis range")]
    NoPeaks,
    #[error("Buffer carries no band energy")]
    Silent,
    /// Catch-all for external extractors.
    #[error("Analysis failed: {0}")]
    Failed(String),
}

/// Turns raw audio into the summary the comparison step consumes.
///
/// Implementations run on breeding-round worker threads.
pub trait FeatureExtractor: Send + Sync {
    fn analyze(&self, buffer: &RawAudioBuffer) -> Result<FeatureSummary, AnalysisError>;
}
