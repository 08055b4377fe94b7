//! Audio output
//!
//! PCM sink contract and the factory for the board's default sink.

use alloc::boxed::Box;

/// PCM stream format announced to a sink before the first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Frames per second.
    pub sample_rate: u32,
    /// Channels in the source material (frames are always delivered stereo).
    pub channels: u8,
    /// Bits per sample in the source material.
    pub bits_per_sample: u8,
}

impl AudioFormat {
    pub const fn new(sample_rate: u32, channels: u8, bits_per_sample: u8) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
        }
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::new(44_100, 2, 16)
    }
}

/// Sink for signed 16-bit stereo frames.
pub trait AudioOutput: Send {
    /// Prepare for a stream. Returns false if the format is not supported.
    fn begin(&mut self, format: AudioFormat) -> bool;

    /// Accept one `[left, right]` frame. Returns false when the sink buffer is
    /// full; the caller retries the same frame later.
    fn consume(&mut self, frame: [i16; 2]) -> bool;

    /// Output gain, already clamped by the caller.
    fn set_gain(&mut self, gain: f32);

    /// Flush and silence the output.
    fn stop(&mut self);
}

/// Board audio hardware.
pub trait AudioHardware: Send + Sync {
    /// Build a fresh default sink (the built-in DAC/amplifier).
    fn default_output(&self) -> Box<dyn AudioOutput>;
}
