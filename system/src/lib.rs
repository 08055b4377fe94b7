//! Pocket OS System Core
//!
//! The part of the OS that multiplexes one display and one audio output
//! among independently written applications and background services.
//!
//! # Architecture
//!
//! ```text
//!  app tasks ──run_app/start_toast──► Launcher ─┐
//!      │                                        │ lock
//!      └─present()──► back buffers ◄── AppManager::tick() ──► Display
//!
//!  callers ──play/pause/stop──► AudioPlayer ──commands──► audio task ──► AudioOutput
//!
//!  ServiceManager ──start_all──► one task per Service (runs forever)
//! ```
//!
//! # Modules
//!
//! - `app`: application trait, lifecycle state, stack scheduler, compositor and toast
//! - `service`: background services with persisted enable flags
//! - `audio`: sounds, decoders and the command-driven playback engine
//! - `input`: button events routed to the foreground application
//! - `system`: the context object tying everything together
//! - `config`: compile-time limits and defaults
//! - `error`: error types

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod app;
pub mod audio;
pub mod config;
pub mod error;
pub mod input;
pub mod service;
pub mod system;

pub use app::{
    AppConfig, AppContext, AppFlags, AppInfo, AppManager, AppState, Application, Launcher,
    ToastStyle,
};
pub use audio::{AudioConfig, AudioPlayer, BuiltinDecoders, Decoders, SharedOutput, Sound, SoundKind};
pub use error::{AppError, AudioError, FatalError, ServiceError, SystemError};
pub use input::{Button, InputEvent};
pub use service::{Service, ServiceContext, ServiceHandle, ServiceManager};
pub use system::System;
