/// Mono audio captured from a recording or produced by an offline render.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl RawAudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }
}
