//! Recording audio sink

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use std::time::Instant;

use spin::Mutex;

use crate::audio::{AudioFormat, AudioHardware, AudioOutput};

/// Frames a realtime sink accepts ahead of the clock.
const REALTIME_SLACK_FRAMES: u64 = 256;

/// Frames kept for inspection.
const CAPTURE_LIMIT: usize = 16 * 1024;

#[derive(Default)]
struct OutputState {
    format: Option<AudioFormat>,
    begun: u32,
    frames: u64,
    captured: Vec<[i16; 2]>,
    gain: Option<f32>,
    stopped: bool,
    released: bool,
    realtime: bool,
    started_at: Option<Instant>,
}

/// Sink that records what it is fed.
///
/// In realtime mode the sink refuses frames once it is more than a small
/// buffer ahead of the wall clock, the way a DMA-fed DAC would.
#[derive(Clone, Default)]
pub struct RecordingOutput {
    state: Arc<Mutex<OutputState>>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn realtime() -> Self {
        let out = Self::default();
        out.state.lock().realtime = true;
        out
    }

    pub fn format(&self) -> Option<AudioFormat> {
        self.state.lock().format
    }

    /// Times `begin` was called.
    pub fn begin_count(&self) -> u32 {
        self.state.lock().begun
    }

    pub fn frames(&self) -> u64 {
        self.state.lock().frames
    }

    /// The first frames received, up to a fixed limit.
    pub fn captured(&self) -> Vec<[i16; 2]> {
        self.state.lock().captured.clone()
    }

    pub fn gain(&self) -> Option<f32> {
        self.state.lock().gain
    }

    pub fn is_stopped(&self) -> bool {
        self.state.lock().stopped
    }

    /// Whether a sink built by [`RecordingOutput::into_sink`] was dropped.
    pub fn is_released(&self) -> bool {
        self.state.lock().released
    }

    /// Box a sink sharing this recording. Dropping the box marks the
    /// recording released.
    pub fn into_sink(self) -> Box<dyn AudioOutput> {
        Box::new(ReleasingSink(self))
    }
}

struct ReleasingSink(RecordingOutput);

impl AudioOutput for ReleasingSink {
    fn begin(&mut self, format: AudioFormat) -> bool {
        self.0.begin(format)
    }

    fn consume(&mut self, frame: [i16; 2]) -> bool {
        self.0.consume(frame)
    }

    fn set_gain(&mut self, gain: f32) {
        self.0.set_gain(gain)
    }

    fn stop(&mut self) {
        self.0.stop()
    }
}

impl Drop for ReleasingSink {
    fn drop(&mut self) {
        self.0.state.lock().released = true;
    }
}

impl AudioOutput for RecordingOutput {
    fn begin(&mut self, format: AudioFormat) -> bool {
        let mut st = self.state.lock();
        st.format = Some(format);
        st.begun += 1;
        st.stopped = false;
        st.started_at = Some(Instant::now());
        true
    }

    fn consume(&mut self, frame: [i16; 2]) -> bool {
        let mut st = self.state.lock();
        if st.realtime {
            let rate = st.format.map(|f| f.sample_rate as u64).unwrap_or(44_100);
            let elapsed = st.started_at.map(|t| t.elapsed().as_millis() as u64).unwrap_or(0);
            if st.frames >= elapsed * rate / 1000 + REALTIME_SLACK_FRAMES {
                return false;
            }
        }
        st.frames += 1;
        if st.captured.len() < CAPTURE_LIMIT {
            st.captured.push(frame);
        }
        true
    }

    fn set_gain(&mut self, gain: f32) {
        self.state.lock().gain = Some(gain);
    }

    fn stop(&mut self) {
        self.state.lock().stopped = true;
    }
}

/// Host audio hardware. Every default output it builds is kept so tests can
/// inspect it.
#[derive(Clone, Default)]
pub struct HostAudio {
    realtime: bool,
    outputs: Arc<Mutex<Vec<RecordingOutput>>>,
}

impl HostAudio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hardware whose outputs are throttled to the wall clock.
    pub fn realtime() -> Self {
        Self {
            realtime: true,
            ..Self::default()
        }
    }

    /// Outputs built so far, oldest first.
    pub fn outputs(&self) -> Vec<RecordingOutput> {
        self.outputs.lock().clone()
    }

    pub fn last_output(&self) -> Option<RecordingOutput> {
        self.outputs.lock().last().cloned()
    }
}

impl AudioHardware for HostAudio {
    fn default_output(&self) -> Box<dyn AudioOutput> {
        let out = if self.realtime {
            RecordingOutput::realtime()
        } else {
            RecordingOutput::new()
        };
        self.outputs.lock().push(out.clone());
        out.into_sink()
    }
}
