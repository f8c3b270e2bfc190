use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use super::curves::{deviate, exprand, fold, lincurve, rnd};
use crate::analysis::ComparisonResult;

pub const FREQ_MIN_HZ: f64 = 50.0;
pub const FREQ_MAX_HZ: f64 = 8000.0;
pub const RING_AMP_MIN: f64 = 0.001;
pub const RING_AMP_MAX: f64 = 0.4;

const RING_AMP_CHOICES: [f64; 4] = [0.0, 0.1, 0.2, 0.3];
/// Fraction of the gap to the target peak the primary frequency may travel per mutation.
const PEAK_PULL: f64 = 0.35;
const RING_PULL: f64 = 0.5;

/// Parameter set of the feedback-delay resonator voice.
///
/// `Clone` is the exact copy; [`SynthParams::mutate`] produces a perturbed offspring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthParams {
    /// Resonator centre frequencies; the first one is steered toward the target peak.
    pub freqs: Vec<f64>,
    /// Depth of the ring modulation between neighbouring resonators.
    pub ring_amp: f64,
    /// Feedback delay per resonator, in seconds.
    pub delay_times: Vec<f64>,
    /// Rate of the LFO scaling the feedback path, in Hz.
    pub lfo_rate: f64,
}

impl SynthParams {
    /// Spontaneous parameter set with 2-4 resonators.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let count = exprand(rng, 2.0, 4.0).round() as usize;
        let freqs: Vec<f64> = (0..count)
            .map(|_| exprand(rng, 60.0, FREQ_MAX_HZ))
            .collect();
        let delay_times = (0..count).map(|_| exprand(rng, 0.01, 0.1)).collect();
        let ring_amp = RING_AMP_CHOICES.choose(rng).copied().unwrap_or(0.0);
        Self {
            freqs,
            ring_amp,
            delay_times,
            lfo_rate: exprand(rng, 0.15, 1.1),
        }
    }

    /// Offspring nudged by how this configuration compared against a target.
    ///
    /// The primary frequency moves toward the target's strongest peak; the remaining
    /// frequencies scatter more the weaker the band correlation was. Every perturbed
    /// value is folded back into its valid range.
    pub fn mutate<R: Rng + ?Sized>(&self, comparison: &ComparisonResult, rng: &mut R) -> Self {
        let correlation = comparison.band_correlation;
        let spread = lincurve(correlation.abs(), 0.0, 1.0, 2.0, 1.0, -6.0);
        let freqs = self
            .freqs
            .iter()
            .enumerate()
            .map(|(idx, &freq)| {
                if idx == 0 {
                    let offset = rnd(rng, comparison.target_peak - freq, 0.0) * PEAK_PULL;
                    fold(freq + offset, FREQ_MIN_HZ, FREQ_MAX_HZ)
                } else {
                    deviate(rng, freq, spread, FREQ_MIN_HZ, FREQ_MAX_HZ)
                }
            })
            .collect();
        let ring_offset = rnd(rng, correlation, 0.0) * RING_PULL;
        Self {
            freqs,
            ring_amp: fold(self.ring_amp + ring_offset, RING_AMP_MIN, RING_AMP_MAX),
            delay_times: self.delay_times.clone(),
            lfo_rate: self.lfo_rate,
        }
    }

    pub fn primary_frequency(&self) -> Option<f64> {
        self.freqs.first().copied()
    }
}
