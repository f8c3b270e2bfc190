//! Candidate synth configurations and their play/deletion lifecycle.

use std::fmt;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tracing::debug;

use super::pathogens::PathogenId;
use crate::audio::{PlaybackBackend, PlaybackError, Position, VoiceHandle, VoiceRequest};
use crate::config::MemorySettings;
use crate::synth::curves::{bipolar, exprand, rnd};
use crate::synth::{Envelope, SynthParams};

/// Extra time allowed after a voice's nominal duration before it counts as complete.
pub const PLAY_TAIL: Duration = Duration::from_millis(100);

/// Process-unique candidate identity, issued by the owning scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AntibodyId(pub u64);

impl fmt::Display for AntibodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ab#{}", self.0)
    }
}

/// Lifecycle stage of a candidate. Transitions only move forward; a converging
/// candidate is replaced by its offspring rather than changed in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AntibodyState {
    Baseline,
    Converging { target: PathogenId, generation: u32 },
    Converged { target: PathogenId },
}

/// Playback grouping used for concurrency caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Baseline,
    Converging,
    Converged,
}

impl Category {
    /// Order in which the tick considers categories for playback.
    pub const PLAYBACK_ORDER: [Category; 3] =
        [Category::Baseline, Category::Converging, Category::Converged];
}

impl AntibodyState {
    pub fn category(&self) -> Category {
        match self {
            AntibodyState::Baseline => Category::Baseline,
            AntibodyState::Converging { .. } => Category::Converging,
            AntibodyState::Converged { .. } => Category::Converged,
        }
    }

    /// Completed plays after which the candidate is flagged for deletion.
    pub fn play_limit(&self) -> Option<u32> {
        match self {
            AntibodyState::Baseline => Some(1),
            AntibodyState::Converging { .. } => None,
            AntibodyState::Converged { .. } => Some(4),
        }
    }

    fn draw_duration<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let seconds = match self {
            AntibodyState::Baseline => exprand(rng, 3.0, 9.0),
            AntibodyState::Converging { .. } => exprand(rng, 4.0, 12.0),
            AntibodyState::Converged { .. } => exprand(rng, 15.0, 40.0),
        };
        Duration::from_secs_f64(seconds)
    }

    fn draw_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Position {
        let axis = |rng: &mut R| match self {
            AntibodyState::Baseline => {
                let offset = rnd(rng, 3.0, 12.0);
                bipolar(rng, offset)
            }
            AntibodyState::Converging { .. } => rnd(rng, -5.0, 5.0),
            AntibodyState::Converged { .. } => {
                let offset = rnd(rng, 5.0, 15.0);
                bipolar(rng, offset)
            }
        };
        let x = axis(&mut *rng);
        let z = axis(&mut *rng);
        Position::new(x, z)
    }
}

/// A voice currently sounding for a candidate, timed on the scheduler's logical clock.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ActiveVoice {
    handle: VoiceHandle,
    started_at: Duration,
    ends_at: Duration,
    amplitude: f64,
    envelope: Envelope,
}

/// One live candidate in the population.
#[derive(Debug)]
pub struct Antibody {
    id: AntibodyId,
    params: SynthParams,
    state: AntibodyState,
    plays: u32,
    marked_for_deletion: bool,
    position: Position,
    duration: Duration,
    voice: Option<ActiveVoice>,
}

impl Antibody {
    /// Build a candidate, drawing its duration and position from the state's ranges.
    pub fn spawn<R: Rng + ?Sized>(
        id: AntibodyId,
        params: SynthParams,
        state: AntibodyState,
        rng: &mut R,
    ) -> Self {
        let duration = state.draw_duration(rng);
        let position = state.draw_position(rng);
        Self {
            id,
            params,
            state,
            plays: 0,
            marked_for_deletion: false,
            position,
            duration,
            voice: None,
        }
    }

    pub fn id(&self) -> AntibodyId {
        self.id
    }

    pub fn params(&self) -> &SynthParams {
        &self.params
    }

    pub fn state(&self) -> AntibodyState {
        self.state
    }

    pub fn category(&self) -> Category {
        self.state.category()
    }

    pub fn plays(&self) -> u32 {
        self.plays
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_marked_for_deletion(&self) -> bool {
        self.marked_for_deletion
    }

    pub fn is_playing(&self) -> bool {
        self.voice.is_some()
    }

    /// Flag for removal. The flag is never cleared.
    pub fn mark_for_deletion(&mut self) {
        self.marked_for_deletion = true;
    }

    /// Flagged and silent.
    pub fn can_be_deleted(&self) -> bool {
        self.marked_for_deletion && self.voice.is_none()
    }

    /// Level the next play starts at. Memory voices fade toward the floor as they repeat.
    pub fn amplitude(&self, memory: &MemorySettings) -> f64 {
        match self.state {
            AntibodyState::Baseline | AntibodyState::Converging { .. } => 1.0,
            AntibodyState::Converged { .. } => {
                let floor = memory.amplitude_floor;
                floor + (1.0 - floor) * memory.amplitude_decay.powi(self.plays as i32)
            }
        }
    }

    /// Instantaneous output level at logical time `now`; zero while silent.
    pub fn level(&self, now: Duration) -> f64 {
        match &self.voice {
            Some(voice) => {
                let elapsed = now.saturating_sub(voice.started_at).as_secs_f64();
                voice.amplitude * voice.envelope.gain(elapsed)
            }
            None => 0.0,
        }
    }

    /// Start a voice at logical time `now`, replacing any voice still held.
    ///
    /// On failure the candidate stays silent and its play count is unchanged.
    pub fn play(
        &mut self,
        backend: &mut dyn PlaybackBackend,
        now: Duration,
        memory: &MemorySettings,
    ) -> Result<(), PlaybackError> {
        self.release(backend);
        let amplitude = self.amplitude(memory);
        let request = VoiceRequest {
            params: self.params.clone(),
            amplitude,
            position: self.position,
            duration: self.duration,
        };
        let handle = backend.start(&request)?;
        self.voice = Some(ActiveVoice {
            handle,
            started_at: now,
            ends_at: now + self.duration + PLAY_TAIL,
            amplitude,
            envelope: Envelope::new(self.duration.as_secs_f64()),
        });
        debug!("{} started ({:?}, amp {:.2})", self.id, self.state, amplitude);
        Ok(())
    }

    /// Finish the voice if its end time has passed. Returns true when a play completed.
    pub fn complete_if_due(&mut self, backend: &mut dyn PlaybackBackend, now: Duration) -> bool {
        let due = self.voice.is_some_and(|voice| now >= voice.ends_at);
        if !due {
            return false;
        }
        self.release(backend);
        self.plays += 1;
        if self
            .state
            .play_limit()
            .is_some_and(|limit| self.plays >= limit)
        {
            self.mark_for_deletion();
        }
        true
    }

    /// Stop and drop any held voice without counting a play.
    pub fn release(&mut self, backend: &mut dyn PlaybackBackend) {
        if let Some(voice) = self.voice.take() {
            backend.stop(voice.handle);
        }
    }
}
