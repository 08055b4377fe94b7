//! Decoding pipeline
//!
//! A session is a `Generator` reading from a `BufferSource` and feeding a
//! `Sink`. Only the playback task calls `step`; `begin` runs in the caller
//! context before the task exists, `stop` after it is deleted.

use alloc::boxed::Box;
use alloc::sync::Arc;

use pocket_hal::AudioOutput;
use spin::Mutex;

use super::rtttl::RtttlGenerator;
use super::sound::SoundKind;
use super::source::BufferSource;
use super::wav::WavGenerator;
use crate::error::AudioError;

/// Result of one generator step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Frames were delivered; call again.
    Continue,
    /// The sink is full; call again later.
    Blocked,
    /// End of stream.
    Done,
}

/// Format decoder.
pub trait Generator: Send {
    /// Parse headers and announce the stream format to `output`.
    fn begin(&mut self, source: &mut BufferSource, output: &mut dyn AudioOutput) -> Result<(), AudioError>;

    /// Decode a small batch of frames into `output`.
    fn step(&mut self, source: &mut BufferSource, output: &mut dyn AudioOutput) -> Step;

    /// Silence and release decoder state.
    fn stop(&mut self, output: &mut dyn AudioOutput) {
        output.stop();
    }
}

/// Maps sound kinds to generators.
pub trait Decoders: Send + Sync {
    fn generator(&self, kind: SoundKind) -> Option<Box<dyn Generator>>;
}

/// Decoders built into the system: WAV and RTTTL.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinDecoders;

impl Decoders for BuiltinDecoders {
    fn generator(&self, kind: SoundKind) -> Option<Box<dyn Generator>> {
        match kind {
            SoundKind::Wav => Some(Box::new(WavGenerator::new())),
            SoundKind::Rtttl => Some(Box::new(RtttlGenerator::new())),
            _ => None,
        }
    }
}

/// A caller-supplied output. The caller keeps its own clone; the player
/// never owns it.
#[derive(Clone)]
pub struct SharedOutput(Arc<Mutex<Box<dyn AudioOutput>>>);

impl SharedOutput {
    pub fn new(output: Box<dyn AudioOutput>) -> Self {
        Self(Arc::new(Mutex::new(output)))
    }

    /// Run `f` with exclusive access to the output.
    pub fn with<R>(&self, f: impl FnOnce(&mut dyn AudioOutput) -> R) -> R {
        let mut out = self.0.lock();
        f(&mut **out)
    }
}

/// Session output.
pub enum Sink {
    /// Default hardware output, dropped with the session.
    Owned(Box<dyn AudioOutput>),
    /// Caller's output, only released.
    Shared(SharedOutput),
}

impl Sink {
    pub fn with<R>(&mut self, f: impl FnOnce(&mut dyn AudioOutput) -> R) -> R {
        match self {
            Sink::Owned(out) => f(&mut **out),
            Sink::Shared(shared) => shared.with(f),
        }
    }
}

/// One playback session.
pub struct Session {
    generator: Box<dyn Generator>,
    source: BufferSource,
    sink: Sink,
}

impl Session {
    pub fn new(generator: Box<dyn Generator>, source: BufferSource, sink: Sink) -> Self {
        Self {
            generator,
            source,
            sink,
        }
    }

    pub fn begin(&mut self) -> Result<(), AudioError> {
        let Session {
            generator,
            source,
            sink,
        } = self;
        sink.with(|out| generator.begin(source, out))
    }

    pub fn step(&mut self) -> Step {
        let Session {
            generator,
            source,
            sink,
        } = self;
        sink.with(|out| generator.step(source, out))
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.sink.with(|out| out.set_gain(gain));
    }

    pub fn stop(&mut self) {
        let Session { generator, sink, .. } = self;
        sink.with(|out| generator.stop(out));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::sound::Sound;
    use pocket_hal::host::RecordingOutput;
    use pocket_hal::AudioFormat;

    /// Emits `left` silent frames, one per step.
    struct Countdown {
        left: u32,
    }

    impl Generator for Countdown {
        fn begin(&mut self, _: &mut BufferSource, output: &mut dyn AudioOutput) -> Result<(), AudioError> {
            if output.begin(AudioFormat::default()) {
                Ok(())
            } else {
                Err(AudioError::OutputRejected)
            }
        }

        fn step(&mut self, _: &mut BufferSource, output: &mut dyn AudioOutput) -> Step {
            if self.left == 0 {
                return Step::Done;
            }
            if !output.consume([0, 0]) {
                return Step::Blocked;
            }
            self.left -= 1;
            Step::Continue
        }
    }

    fn source() -> BufferSource {
        BufferSource::new(Arc::new(Sound::new(vec![], SoundKind::Wav)))
    }

    #[test]
    fn builtin_decoders_cover_wav_and_rtttl() {
        let d = BuiltinDecoders;
        assert!(d.generator(SoundKind::Wav).is_some());
        assert!(d.generator(SoundKind::Rtttl).is_some());
        assert!(d.generator(SoundKind::Mp3).is_none());
    }

    #[test]
    fn session_drives_shared_output() {
        let rec = RecordingOutput::new();
        let shared = SharedOutput::new(Box::new(rec.clone()));
        let mut session = Session::new(
            Box::new(Countdown { left: 2 }),
            source(),
            Sink::Shared(shared),
        );
        session.begin().unwrap();
        session.set_gain(2.0);
        while session.step() != Step::Done {}
        session.stop();

        assert_eq!(rec.frames(), 2);
        assert_eq!(rec.gain(), Some(2.0));
        assert!(rec.is_stopped());
    }
}
