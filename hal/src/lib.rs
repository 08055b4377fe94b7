//! Pocket OS Hardware Abstraction Layer
//!
//! Contracts between the OS core and the things it does not implement
//! itself: the RTOS task primitives, the display panel, the audio output
//! and the key-value settings store.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │      pocket-system (scheduler, audio)    │
//! ├─────────────────────────────────────────┤
//! │         pocket_hal (this crate)          │
//! │  ┌──────┐ ┌─────────┐ ┌───────┐ ┌──────┐ │
//! │  │ task │ │ display │ │ audio │ │ kv   │ │
//! │  └──┬───┘ └────┬────┘ └───┬───┘ └──┬───┘ │
//! └─────┼──────────┼──────────┼────────┼─────┘
//!       │          │          │        │
//!   RTOS kernel  panel     I2S DAC   flash
//! ```
//!
//! # Modules
//!
//! - `task`: task spawn/suspend/resume/delete, delays, uptime, halt
//! - `sync`: bounded message queue built on `spin`
//! - `display`: blit canvases to the physical panel
//! - `audio`: PCM sink and the factory for the default sink
//! - `settings`: persisted booleans and integers by `(namespace, key)`
//! - `host` (feature `std`): implementations for a development host

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod audio;
pub mod display;
pub mod settings;
pub mod sync;
pub mod task;

#[cfg(any(test, feature = "std"))]
pub mod host;

pub use audio::{AudioFormat, AudioHardware, AudioOutput};
pub use display::Display;
pub use settings::{MemorySettings, Settings};
pub use sync::BoundedQueue;
pub use task::{CoreAffinity, Rtos, TaskEntry, TaskHandle, TaskSpec};

use alloc::string::String;
use core::fmt;

/// HAL error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HalError {
    /// The RTOS could not create a task (out of memory, too many tasks).
    SpawnFailed(String),
    /// The handle does not name a live task.
    InvalidTask,
    /// A queue was full and the operation does not block.
    QueueFull,
    /// The settings store rejected a write.
    StorageFailed(String),
    /// Generic error with message
    Other(String),
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HalError::SpawnFailed(msg) => write!(f, "task spawn failed: {}", msg),
            HalError::InvalidTask => write!(f, "invalid task handle"),
            HalError::QueueFull => write!(f, "queue full"),
            HalError::StorageFailed(msg) => write!(f, "settings write failed: {}", msg),
            HalError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

/// Result alias for HAL operations
pub type Result<T> = core::result::Result<T, HalError>;
