//! Host implementations
//!
//! Collaborators for running the OS core on a development machine:
//!
//! - [`HostRtos`]: one OS thread per task
//! - [`MemoryDisplay`]: framebuffer in RAM with blit counters
//! - [`HostAudio`] / [`RecordingOutput`]: audio sink that records what it is fed

mod audio;
mod display;
mod rtos;

pub use audio::{HostAudio, RecordingOutput};
pub use display::MemoryDisplay;
pub use rtos::{HostRtos, ManualClock};
