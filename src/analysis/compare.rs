use ordered_float::OrderedFloat;
use thiserror::Error;

use super::features::{ComparisonResult, FeatureSummary};

/// Reasons a pair of summaries cannot be compared.
#[derive(Debug, Error, PartialEq)]
pub enum ComparisonError {
    /// One side had no detectable spectral peaks.
    #[error("No spectral peaks to compare ({side} side)")]
    NoPeaks { side: &'static str },
    /// Band profiles were empty or had zero variance, so correlation is undefined.
    #[error("Band profiles cannot be correlated")]
    DegenerateBands,
}

/// Compare a target against a candidate rendering.
pub fn compare(
    target: &FeatureSummary,
    candidate: &FeatureSummary,
) -> Result<ComparisonResult, ComparisonError> {
    let target_peak = target
        .dominant_peak()
        .ok_or(ComparisonError::NoPeaks { side: "target" })?;
    if candidate.peaks.is_empty() {
        return Err(ComparisonError::NoPeaks { side: "candidate" });
    }
    let peak_distance = closest_peak_distance(&target.peaks, &candidate.peaks)
        .ok_or(ComparisonError::NoPeaks { side: "candidate" })?;
    let band_correlation =
        pearson(&target.bands, &candidate.bands).ok_or(ComparisonError::DegenerateBands)?;
    Ok(ComparisonResult {
        target_peak,
        peak_distance,
        band_correlation,
    })
}

/// Signed difference (`target - candidate`) of the pair with the smallest absolute gap.
fn closest_peak_distance(target: &[f64], candidate: &[f64]) -> Option<f64> {
    target
        .iter()
        .flat_map(|t| candidate.iter().map(move |c| t - c))
        .filter(|d| d.is_finite())
        .min_by_key(|d| OrderedFloat(d.abs()))
}

/// Pearson correlation over the shared prefix of both profiles.
pub(crate) fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let len = x.len().min(y.len());
    if len < 2 {
        return None;
    }
    let (x, y) = (&x[..len], &y[..len]);
    let mean_x = x.iter().sum::<f64>() / len as f64;
    let mean_y = y.iter().sum::<f64>() / len as f64;
    let mut cov = 0.0;
    let mut norm_x = 0.0;
    let mut norm_y = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        norm_x += dx * dx;
        norm_y += dy * dy;
    }
    let denom = norm_x.sqrt() * norm_y.sqrt();
    if denom <= f64::EPSILON {
        return None;
    }
    let r = cov / denom;
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}
