//! Range mapping and randomization helpers shared by the synth and the scheduler.

use rand::Rng;

/// Map `x` from `[in_min, in_max]` to `[out_min, out_max]`, clamping outside the input range.
pub fn linlin(x: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    if x <= in_min {
        return out_min;
    }
    if x >= in_max {
        return out_max;
    }
    (x - in_min) / (in_max - in_min) * (out_max - out_min) + out_min
}

/// Map `x` onto a curved segment; negative `curve` bends toward `out_max` early.
///
/// Falls back to [`linlin`] when the curve is effectively flat.
pub fn lincurve(x: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64, curve: f64) -> f64 {
    if x <= in_min {
        return out_min;
    }
    if x >= in_max {
        return out_max;
    }
    if curve.abs() < 0.001 {
        return linlin(x, in_min, in_max, out_min, out_max);
    }
    let grow = curve.exp();
    let a = (out_max - out_min) / (1.0 - grow);
    let b = out_min + a;
    let scaled = (x - in_min) / (in_max - in_min);
    b - a * grow.powf(scaled)
}

/// Reflect `x` back into `[lo, hi]`, mirroring at both bounds until it lands inside.
///
/// In-range input is returned untouched. Non-finite input and empty ranges collapse to `lo`.
pub fn fold(x: f64, lo: f64, hi: f64) -> f64 {
    if x >= lo && x <= hi {
        return x;
    }
    let range = hi - lo;
    if !x.is_finite() || !range.is_finite() || range <= 0.0 {
        return lo;
    }
    let period = 2.0 * range;
    let phase = (x - lo).rem_euclid(period);
    let folded = if phase > range {
        lo + (period - phase)
    } else {
        lo + phase
    };
    folded.clamp(lo, hi)
}

/// Uniform value between `a` and `b`, in either order.
pub fn rnd<R: Rng + ?Sized>(rng: &mut R, a: f64, b: f64) -> f64 {
    let lo = a.min(b);
    let hi = a.max(b);
    rng.random::<f64>() * (hi - lo) + lo
}

/// Exponentially distributed value between `lo` and `hi` (both positive).
pub fn exprand<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    lo * ((hi / lo).ln() * rng.random::<f64>()).exp()
}

/// Random sign flip.
pub fn bipolar<R: Rng + ?Sized>(rng: &mut R, value: f64) -> f64 {
    if rng.random_bool(0.5) { value } else { -value }
}

/// Multiply or divide `value` by a random factor in `[1, deviation]`, then fold into range.
pub fn deviate<R: Rng + ?Sized>(rng: &mut R, value: f64, deviation: f64, lo: f64, hi: f64) -> f64 {
    let factor = rnd(rng, 1.0, deviation);
    if rng.random::<f64>() > 0.5 {
        fold(value * factor, lo, hi)
    } else {
        fold(value / factor, lo, hi)
    }
}
