//! Bounded similarity score between a candidate rendering and a target.

use crate::analysis::ComparisonResult;
use crate::synth::curves::linlin;

/// Peak distance (Hz) at which the peak term reaches zero.
pub const PEAK_DISTANCE_RANGE_HZ: f64 = 100.0;
const CORRELATION_EXPONENT: f64 = 1.2;
const SCALE: f64 = 0.95;

/// Highest score [`affinity`] can return.
pub const MAX_AFFINITY: f64 = 2.0 * SCALE;
pub const DEFAULT_THRESHOLD: f64 = 1.1;

/// Score a comparison in `[0, MAX_AFFINITY]`.
///
/// Rises as the closest peaks approach each other and as the band profiles
/// correlate (in either direction).
pub fn affinity(comparison: &ComparisonResult) -> f64 {
    let peak_term = linlin(
        comparison.peak_distance.abs(),
        0.0,
        PEAK_DISTANCE_RANGE_HZ,
        1.0,
        0.0,
    );
    let band_term = comparison
        .band_correlation
        .abs()
        .min(1.0)
        .powf(CORRELATION_EXPONENT);
    (peak_term + band_term) * SCALE
}
