//! Audio buffers, live voice playback, and WAV input.

mod backend;
mod buffer;
pub mod output;
mod voice;
pub mod wav;

pub use backend::{
    PlaybackBackend, PlaybackError, Position, SilentBackend, VoiceHandle, VoiceRequest,
};
pub use buffer::RawAudioBuffer;
pub use output::RodioBackend;
pub use wav::{WavError, load_wav};
