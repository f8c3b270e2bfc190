use serde::{Deserialize, Serialize};

/// Spectral profile of a buffer, as consumed by the comparison step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureSummary {
    /// Peak frequencies in Hz, strongest first.
    pub peaks: Vec<f64>,
    /// Bark band energies normalized so the loudest band is 1.0.
    pub bands: Vec<f64>,
}

impl FeatureSummary {
    pub fn new(peaks: Vec<f64>, bands: Vec<f64>) -> Self {
        Self { peaks, bands }
    }

    /// Strongest peak, if any were detected.
    pub fn dominant_peak(&self) -> Option<f64> {
        self.peaks.first().copied()
    }
}

/// Outcome of comparing a target summary against a candidate's rendering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ComparisonResult {
    /// Strongest peak of the target, in Hz.
    pub target_peak: f64,
    /// Target minus candidate frequency for the closest pair of peaks.
    pub peak_distance: f64,
    /// Pearson correlation of the band profiles, in `[-1, 1]`.
    pub band_correlation: f64,
}
