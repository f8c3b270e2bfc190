pub(super) fn default_tick_interval_ms() -> u64 {
    200
}

pub(super) fn default_rematch_every_ticks() -> u64 {
    30
}

pub(super) fn default_baseline_floor() -> usize {
    5
}

pub(super) fn default_category_cap() -> usize {
    2
}

pub(super) fn default_global_cap() -> usize {
    3
}

pub(super) fn default_baseline_probability_high() -> f64 {
    0.1
}

pub(super) fn default_baseline_probability_low() -> f64 {
    0.04
}

pub(super) fn default_converging_probability() -> f64 {
    0.07
}

pub(super) fn default_converged_probability() -> f64 {
    0.06
}

pub(super) fn default_affinity_threshold() -> f64 {
    crate::immune::DEFAULT_THRESHOLD
}

pub(super) fn default_survivors() -> usize {
    3
}

pub(super) fn default_sample_rate() -> u32 {
    44_100
}

pub(super) fn default_comparison_seconds() -> f64 {
    2.9
}

pub(super) fn default_amplitude_floor() -> f64 {
    0.2
}

pub(super) fn default_amplitude_decay() -> f64 {
    0.7
}

pub(super) fn default_master_gain() -> f32 {
    1.0
}

pub(super) fn default_true() -> bool {
    true
}

pub(super) fn clamp_probability(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

pub(super) fn clamp_sample_rate(value: u32) -> u32 {
    value.clamp(8_000, 192_000)
}

/// Comparison renders shorter than this carry too little spectrum to rank on.
pub(super) fn clamp_comparison_seconds(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.1, 30.0)
    } else {
        default_comparison_seconds()
    }
}

pub(super) fn clamp_amplitude_floor(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.01, 1.0)
    } else {
        default_amplitude_floor()
    }
}

pub(super) fn clamp_amplitude_decay(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        default_amplitude_decay()
    }
}

pub(super) fn clamp_gain(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        default_master_gain()
    }
}
