//! Whole-buffer spectral analysis: peak picking and Bark band energies.

use ordered_float::OrderedFloat;
use rustfft::{FftPlanner, num_complex::Complex};

use super::{AnalysisError, FeatureExtractor, features::FeatureSummary};
use crate::audio::RawAudioBuffer;

/// Upper edges of the Bark critical bands in Hz (lower edge of the first band is 0).
const BARK_EDGES_HZ: [f64; 28] = [
    50.0, 100.0, 150.0, 200.0, 300.0, 400.0, 510.0, 630.0, 770.0, 920.0, 1080.0, 1270.0, 1480.0,
    1720.0, 2000.0, 2320.0, 2700.0, 3150.0, 3700.0, 4400.0, 5300.0, 6400.0, 7700.0, 9500.0,
    12000.0, 15500.0, 20500.0, 27000.0,
];

/// Peak picking and band-energy extractor backed by a single zero-padded FFT.
#[derive(Debug, Clone)]
pub struct SpectralAnalyzer {
    pub max_peaks: usize,
    pub min_frequency: f64,
    pub max_frequency: f64,
    /// Longest input considered; longer buffers are truncated before the FFT.
    pub max_samples: usize,
}

impl Default for SpectralAnalyzer {
    fn default() -> Self {
        Self {
            max_peaks: 12,
            min_frequency: 70.0,
            max_frequency: 9000.0,
            max_samples: 1 << 18,
        }
    }
}

impl FeatureExtractor for SpectralAnalyzer {
    fn analyze(&self, buffer: &RawAudioBuffer) -> Result<FeatureSummary, AnalysisError> {
        if buffer.sample_rate() == 0 {
            return Err(AnalysisError::ZeroSampleRate);
        }
        if buffer.is_empty() {
            return Err(AnalysisError::EmptyBuffer);
        }
        let magnitudes = magnitude_spectrum(buffer.samples(), self.max_samples);
        let bin_hz = buffer.sample_rate() as f64 / ((magnitudes.len() - 1) * 2) as f64;
        let peaks = self.spectral_peaks(&magnitudes, bin_hz);
        if peaks.is_empty() {
            return Err(AnalysisError::NoPeaks);
        }
        let bands = bark_bands(&magnitudes, bin_hz, buffer.sample_rate());
        let loudest = bands.iter().copied().fold(0.0_f64, f64::max);
        if loudest <= 0.0 || !loudest.is_finite() {
            return Err(AnalysisError::Silent);
        }
        let bands = bands.into_iter().map(|energy| energy / loudest).collect();
        Ok(FeatureSummary::new(peaks, bands))
    }
}

impl SpectralAnalyzer {
    fn spectral_peaks(&self, magnitudes: &[f64], bin_hz: f64) -> Vec<f64> {
        let mut found: Vec<(f64, f64)> = Vec::new();
        for bin in 1..magnitudes.len().saturating_sub(1) {
            let (left, center, right) = (magnitudes[bin - 1], magnitudes[bin], magnitudes[bin + 1]);
            if center <= 0.0 || center <= left || center < right {
                continue;
            }
            let (offset, height) = parabolic_peak(left, center, right);
            let frequency = (bin as f64 + offset) * bin_hz;
            if frequency < self.min_frequency || frequency > self.max_frequency {
                continue;
            }
            found.push((frequency, height));
        }
        found.sort_by_key(|(_, height)| std::cmp::Reverse(OrderedFloat(*height)));
        found.truncate(self.max_peaks);
        found.into_iter().map(|(frequency, _)| frequency).collect()
    }
}

/// Magnitudes for bins `0..=n/2` of the zero-padded input.
fn magnitude_spectrum(samples: &[f32], max_samples: usize) -> Vec<f64> {
    let used = &samples[..samples.len().min(max_samples.max(2))];
    let size = used.len().next_power_of_two().max(2);
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(size);
    let mut spectrum: Vec<Complex<f64>> = used
        .iter()
        .map(|&sample| Complex::new(sample as f64, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(size)
        .collect();
    fft.process(&mut spectrum);
    spectrum[..=size / 2].iter().map(|bin| bin.norm()).collect()
}

/// Vertex of the parabola through three neighbouring bins: (offset in bins, height).
fn parabolic_peak(left: f64, center: f64, right: f64) -> (f64, f64) {
    let denom = left - 2.0 * center + right;
    if denom.abs() <= f64::EPSILON {
        return (0.0, center);
    }
    let offset = (0.5 * (left - right) / denom).clamp(-0.5, 0.5);
    (offset, center - 0.25 * (left - right) * offset)
}

/// Power summed per Bark band, restricted to bands below Nyquist.
fn bark_bands(magnitudes: &[f64], bin_hz: f64, sample_rate: u32) -> Vec<f64> {
    let nyquist = sample_rate as f64 / 2.0;
    let band_count = BARK_EDGES_HZ
        .iter()
        .position(|edge| *edge > nyquist)
        .map(|idx| idx + 1)
        .unwrap_or(BARK_EDGES_HZ.len());
    let mut bands = vec![0.0_f64; band_count];
    for (bin, magnitude) in magnitudes.iter().enumerate() {
        let frequency = bin as f64 * bin_hz;
        let Some(band) = BARK_EDGES_HZ[..band_count]
            .iter()
            .position(|edge| frequency < *edge)
        else {
            continue;
        };
        bands[band] += magnitude * magnitude;
    }
    bands
}
