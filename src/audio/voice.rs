use std::time::Duration;

use rodio::Source;

use super::backend::VoiceRequest;
use crate::synth::{Envelope, FeedbackNetwork};

/// The network idles around -40 dBFS; lift it into a useful range before the soft limiter.
const MAKEUP_GAIN: f64 = 60.0;

/// Stereo rodio source that synthesizes a voice lazily on the output thread.
pub(crate) struct VoiceSource {
    network: FeedbackNetwork,
    envelope: Envelope,
    amplitude: f64,
    gains: (f32, f32),
    sample_rate: u32,
    frame: u64,
    total_frames: u64,
    pending_right: Option<f32>,
}

impl VoiceSource {
    pub(crate) fn new(request: &VoiceRequest, sample_rate: u32) -> Self {
        let seconds = request.duration.as_secs_f64();
        Self {
            network: FeedbackNetwork::new(&request.params, sample_rate),
            envelope: Envelope::new(seconds),
            amplitude: request.amplitude,
            gains: request.position.stereo_gains(),
            sample_rate,
            frame: 0,
            total_frames: (seconds * sample_rate as f64).round() as u64,
            pending_right: None,
        }
    }
}

impl Iterator for VoiceSource {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(right) = self.pending_right.take() {
            return Some(right);
        }
        if self.frame >= self.total_frames {
            return None;
        }
        let t = self.frame as f64 / self.sample_rate.max(1) as f64;
        self.frame += 1;
        let dry = self.network.next_sample(self.envelope.drive(t));
        let sample = (dry * MAKEUP_GAIN * self.envelope.gain(t) * self.amplitude).tanh() as f32;
        self.pending_right = Some(sample * self.gains.1);
        Some(sample * self.gains.0)
    }
}

impl Source for VoiceSource {
    #[inline]
    fn current_span_len(&self) -> Option<usize> {
        None
    }

    #[inline]
    fn channels(&self) -> u16 {
        2
    }

    #[inline]
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f64(
            self.total_frames as f64 / self.sample_rate.max(1) as f64,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Position;
    use crate::synth::SynthParams;

    fn request(seconds: f64, x: f64) -> VoiceRequest {
        VoiceRequest {
            params: SynthParams {
                freqs: vec![330.0, 990.0],
                ring_amp: 0.2,
                delay_times: vec![0.01, 0.02],
                lfo_rate: 0.5,
            },
            amplitude: 1.0,
            position: Position::new(x, 0.0),
            duration: Duration::from_secs_f64(seconds),
        }
    }

    #[test]
    fn emits_interleaved_stereo_for_the_full_duration() {
        let source = VoiceSource::new(&request(0.5, 0.0), 8_000);
        assert_eq!(source.channels(), 2);
        assert_eq!(source.count(), 8_000);
    }

    #[test]
    fn centred_voice_is_audible_without_clipping() {
        let samples: Vec<f32> = VoiceSource::new(&request(2.0, 0.0), 44_100).collect();
        let peak = samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()));
        assert!(peak > 0.02, "peak {peak}");
        assert!(peak <= 1.0);
    }

    #[test]
    fn hard_right_voice_leaves_left_channel_silent() {
        let source = VoiceSource::new(&request(0.25, 30.0), 8_000);
        let samples: Vec<f32> = source.collect();
        let left: f32 = samples.iter().step_by(2).map(|s| s.abs()).sum();
        let right: f32 = samples.iter().skip(1).step_by(2).map(|s| s.abs()).sum();
        assert!(left < 1e-3);
        assert!(right > left);
    }
}
