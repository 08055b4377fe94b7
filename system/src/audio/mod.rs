//! Audio
//!
//! - `sound`: owned sound buffers and their container tags
//! - `source`: read-only cursor over a sound
//! - `generator`: decoder contract, decoder table, output sinks, sessions
//! - `wav`, `rtttl`: built-in decoders
//! - `player`: the command-driven playback engine

pub mod generator;
pub mod player;
pub mod rtttl;
pub mod sound;
pub mod source;
pub mod wav;

pub use generator::{BuiltinDecoders, Decoders, Generator, SharedOutput, Step};
pub use player::{AudioConfig, AudioPlayer};
pub use sound::{Sound, SoundKind};
pub use source::BufferSource;
