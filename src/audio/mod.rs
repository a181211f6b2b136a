pub mod pcm;
pub mod output;
pub mod ticker;
pub mod controller;
pub mod narrator;

pub use controller::{format_clock, PlaybackError, PlaybackState, PlaybackStatus};
pub use narrator::Narrator;
pub use output::RodioBackend;
pub use pcm::{decode_narration, DecodeError, SampleBuffer};
