//! Sample-by-sample feedback resonator network shared by offline renders and live voices.

use std::f64::consts::PI;

use super::params::SynthParams;

const RESONATOR_Q: f64 = 5.0;
const EXCITATION_LEVEL: f64 = 0.1;
const COMPRESSOR_THRESHOLD: f64 = 0.1;
const COMPRESSOR_RATIO: f64 = 13.0;
const COMPRESSOR_MAKEUP: f64 = 0.8;
const INNER_GAIN: f64 = 0.5;
const LFO_MIN: f64 = 0.18;
const LFO_MAX: f64 = 1.0;

/// Constant-peak bandpass biquad (RBJ cookbook).
#[derive(Debug, Clone)]
struct Bandpass {
    b0: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Bandpass {
    fn new(freq: f64, q: f64, sample_rate: f64) -> Self {
        let omega = 2.0 * PI * freq / sample_rate;
        let alpha = omega.sin() / (2.0 * q);
        let a0 = 1.0 + alpha;
        Self {
            b0: alpha / a0,
            b2: -alpha / a0,
            a1: -2.0 * omega.cos() / a0,
            a2: (1.0 - alpha) / a0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    fn process(&mut self, x: f64) -> f64 {
        let y = self.b0 * x + self.b2 * self.x2 - self.a1 * self.y1 - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

#[derive(Debug, Clone)]
struct DelayLine {
    buffer: Vec<f64>,
    cursor: usize,
}

impl DelayLine {
    fn new(samples: usize) -> Self {
        Self {
            buffer: vec![0.0; samples.max(1)],
            cursor: 0,
        }
    }

    fn process(&mut self, x: f64) -> f64 {
        let out = self.buffer[self.cursor];
        self.buffer[self.cursor] = x;
        self.cursor = (self.cursor + 1) % self.buffer.len();
        out
    }
}

#[derive(Debug, Clone)]
struct Resonator {
    filter: Bandpass,
    delay: DelayLine,
}

/// Running state of one voice: resonators, delays, ring modulation and the feedback loop.
#[derive(Debug, Clone)]
pub struct FeedbackNetwork {
    resonators: Vec<Resonator>,
    taps: Vec<f64>,
    ring_amp: f64,
    lfo_phase: f64,
    lfo_step: f64,
    feedback: f64,
}

impl FeedbackNetwork {
    pub fn new(params: &SynthParams, sample_rate: u32) -> Self {
        let rate = sample_rate.max(1) as f64;
        let resonators: Vec<Resonator> = params
            .freqs
            .iter()
            .enumerate()
            .map(|(idx, &freq)| {
                let delay_seconds = params.delay_times.get(idx).copied().unwrap_or(0.01);
                Resonator {
                    filter: Bandpass::new(freq, RESONATOR_Q, rate),
                    delay: DelayLine::new((delay_seconds * rate).round() as usize),
                }
            })
            .collect();
        let taps = vec![0.0; resonators.len()];
        Self {
            resonators,
            taps,
            ring_amp: params.ring_amp,
            lfo_phase: 0.0,
            lfo_step: 2.0 * PI * params.lfo_rate / rate,
            feedback: 0.0,
        }
    }

    /// Advance one sample; `drive` scales the inner feedback stage.
    pub fn next_sample(&mut self, drive: f64) -> f64 {
        let lfo = LFO_MIN + (LFO_MAX - LFO_MIN) * 0.5 * (1.0 + self.lfo_phase.sin());
        self.lfo_phase = (self.lfo_phase + self.lfo_step) % (2.0 * PI);
        let input = EXCITATION_LEVEL + self.feedback * lfo;

        for (tap, resonator) in self.taps.iter_mut().zip(self.resonators.iter_mut()) {
            *tap = resonator.delay.process(resonator.filter.process(input));
        }
        let count = self.taps.len();
        let ring: f64 = (0..count)
            .map(|idx| self.taps[idx] * self.taps[(idx + 1) % count])
            .sum::<f64>()
            * self.ring_amp;
        let mix = self.taps.iter().sum::<f64>() + ring;
        let inner = compress(mix) * COMPRESSOR_MAKEUP * INNER_GAIN * drive;
        self.feedback = if inner.is_finite() { inner } else { 0.0 };
        self.feedback
    }
}

/// Hard-knee downward compression followed by soft saturation.
fn compress(x: f64) -> f64 {
    let magnitude = x.abs();
    let compressed = if magnitude > COMPRESSOR_THRESHOLD {
        COMPRESSOR_THRESHOLD + (magnitude - COMPRESSOR_THRESHOLD) / COMPRESSOR_RATIO
    } else {
        magnitude
    };
    (compressed * x.signum()).tanh()
}
