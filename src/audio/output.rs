//! Speaker output for live voices via rodio.

use std::collections::HashMap;

use rodio::{OutputStream, OutputStreamBuilder, Sink};
use tracing::{debug, info};

use super::backend::{PlaybackBackend, PlaybackError, VoiceHandle, VoiceRequest};
use super::voice::VoiceSource;
use crate::synth;

/// Plays each voice on its own sink mixed into the default output device.
pub struct RodioBackend {
    stream: OutputStream,
    sinks: HashMap<VoiceHandle, Sink>,
    next_handle: u64,
    sample_rate: u32,
    master_gain: f32,
}

impl RodioBackend {
    /// Open the default output device; voices are synthesized at `sample_rate`.
    pub fn open_default(sample_rate: u32) -> Result<Self, PlaybackError> {
        let stream = OutputStreamBuilder::open_default_stream()
            .map_err(|err| PlaybackError::OpenStream(err.to_string()))?;
        info!("Audio output opened; voices rendered at {sample_rate} Hz");
        Ok(Self {
            stream,
            sinks: HashMap::new(),
            next_handle: 0,
            sample_rate,
            master_gain: 1.0,
        })
    }

    fn prune_finished(&mut self) {
        self.sinks.retain(|_, sink| !sink.empty());
    }
}

impl PlaybackBackend for RodioBackend {
    fn start(&mut self, request: &VoiceRequest) -> Result<VoiceHandle, PlaybackError> {
        synth::validate(&request.params, self.sample_rate)?;
        self.prune_finished();
        let sink = Sink::connect_new(self.stream.mixer());
        sink.set_volume(self.master_gain);
        sink.append(VoiceSource::new(request, self.sample_rate));
        sink.play();
        let handle = VoiceHandle(self.next_handle);
        self.next_handle += 1;
        self.sinks.insert(handle, sink);
        debug!(
            "Voice {} started ({:.1} s, amp {:.2})",
            handle.0,
            request.duration.as_secs_f32(),
            request.amplitude
        );
        Ok(handle)
    }

    fn stop(&mut self, handle: VoiceHandle) {
        if let Some(sink) = self.sinks.remove(&handle) {
            sink.stop();
        }
    }

    fn set_master_gain(&mut self, gain: f32) {
        self.master_gain = gain.clamp(0.0, 1.0);
        for sink in self.sinks.values() {
            sink.set_volume(self.master_gain);
        }
    }

    fn active_voices(&self) -> usize {
        self.sinks.values().filter(|sink| !sink.empty()).count()
    }
}
