//! System Error Types
//!
//! One error enum per subsystem, collected by [`SystemError`].

use alloc::string::String;
use core::fmt;

use pocket_hal::HalError;

use crate::audio::SoundKind;

/// Application management error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// `set_panel` was already called.
    PanelAlreadySet,
    /// The RTOS refused to create the application task.
    SpawnFailed(HalError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::PanelAlreadySet => write!(f, "panel already installed"),
            AppError::SpawnFailed(e) => write!(f, "app spawn failed: {}", e),
        }
    }
}

/// Unrecoverable scheduler fault. Only observable when a halt hook that
/// returns is installed; on a device the system halts instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalError {
    /// The last application was popped off the stack.
    EmptyAppStack,
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalError::EmptyAppStack => write!(f, "application stack is empty"),
        }
    }
}

/// Service error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// `start` was already called for this service.
    AlreadyStarted,
    /// A service with this name is already registered.
    AlreadyRegistered(String),
    /// No service with this name.
    NotFound,
    /// The RTOS refused to create the service task.
    SpawnFailed(HalError),
    /// The settings store rejected the enable flag.
    Storage(HalError),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::AlreadyStarted => write!(f, "service already started"),
            ServiceError::AlreadyRegistered(name) => {
                write!(f, "service '{}' already registered", name)
            }
            ServiceError::NotFound => write!(f, "service not found"),
            ServiceError::SpawnFailed(e) => write!(f, "service spawn failed: {}", e),
            ServiceError::Storage(e) => write!(f, "service settings: {}", e),
        }
    }
}

/// Audio playback error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    /// No generator is available for this kind of sound.
    UnsupportedFormat(SoundKind),
    /// The sound data is malformed.
    InvalidData(&'static str),
    /// The output sink refused the stream format.
    OutputRejected,
    /// The RTOS refused to create the playback task.
    SpawnFailed(HalError),
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioError::UnsupportedFormat(kind) => write!(f, "unsupported sound format: {}", kind),
            AudioError::InvalidData(what) => write!(f, "invalid sound data: {}", what),
            AudioError::OutputRejected => write!(f, "output rejected stream format"),
            AudioError::SpawnFailed(e) => write!(f, "audio task spawn failed: {}", e),
        }
    }
}

/// Any system error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemError {
    App(AppError),
    Fatal(FatalError),
    Service(ServiceError),
    Audio(AudioError),
    Hal(HalError),
}

impl fmt::Display for SystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemError::App(e) => write!(f, "app: {}", e),
            SystemError::Fatal(e) => write!(f, "fatal: {}", e),
            SystemError::Service(e) => write!(f, "service: {}", e),
            SystemError::Audio(e) => write!(f, "audio: {}", e),
            SystemError::Hal(e) => write!(f, "hal: {}", e),
        }
    }
}

impl From<AppError> for SystemError {
    fn from(e: AppError) -> Self {
        SystemError::App(e)
    }
}

impl From<FatalError> for SystemError {
    fn from(e: FatalError) -> Self {
        SystemError::Fatal(e)
    }
}

impl From<ServiceError> for SystemError {
    fn from(e: ServiceError) -> Self {
        SystemError::Service(e)
    }
}

impl From<AudioError> for SystemError {
    fn from(e: AudioError) -> Self {
        SystemError::Audio(e)
    }
}

impl From<HalError> for SystemError {
    fn from(e: HalError) -> Self {
        SystemError::Hal(e)
    }
}
