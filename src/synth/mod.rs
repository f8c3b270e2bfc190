//! Feedback-delay resonator synthesizer: parameters, mutation, and rendering.

pub mod curves;
mod envelope;
mod network;
mod params;
mod render;

pub use envelope::Envelope;
pub use network::FeedbackNetwork;
pub use params::{FREQ_MAX_HZ, FREQ_MIN_HZ, RING_AMP_MAX, RING_AMP_MIN, SynthParams};
pub use render::{AudioRenderer, OfflineRenderer, RenderError};
pub(crate) use render::validate;
