//! Application contract
//!
//! ```text
//! Created ──start──► Running ──suspend──► Suspended
//!                      ▲  │                  │
//!                      │  └──── resume ◄─────┘
//!                      │
//!                      └─(run returns)──► Deleted (terminal)
//! ```
//!
//! Only the scheduler suspends and resumes. Only the application's own task
//! moves it to `Deleted`, by returning from [`Application::run`].

use alloc::string::String;

use pocket_graphics::Rect;
use pocket_hal::CoreAffinity;

use super::context::AppContext;
use super::flags::AppFlags;
use crate::config::APP_STACK_SIZE;

// ── Types ───────────────────────────────────────────────────

/// Lifecycle state of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AppState {
    Created = 0,
    Running = 1,
    Suspended = 2,
    Deleted = 3,
}

impl AppState {
    pub(crate) const fn from_u8(v: u8) -> Self {
        match v {
            1 => AppState::Running,
            2 => AppState::Suspended,
            3 => AppState::Deleted,
            _ => AppState::Created,
        }
    }

    /// Human-readable label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            AppState::Created => "created",
            AppState::Running => "running",
            AppState::Suspended => "suspended",
            AppState::Deleted => "deleted",
        }
    }
}

/// Static description of an application, read once at launch.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Task name, also shown in logs.
    pub name: String,
    /// Screen area covered by the application's canvases.
    pub bounds: Rect,
    pub flags: AppFlags,
    /// Task stack size hint.
    pub stack_size: usize,
    /// Task core hint.
    pub core: CoreAffinity,
}

impl AppConfig {
    pub fn new(name: &str, bounds: Rect) -> Self {
        Self {
            name: String::from(name),
            bounds,
            flags: AppFlags::empty(),
            stack_size: APP_STACK_SIZE,
            core: CoreAffinity::Any,
        }
    }

    /// Set flags.
    pub fn flags(mut self, flags: AppFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set stack size hint.
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }

    /// Set core hint.
    pub fn core(mut self, core: CoreAffinity) -> Self {
        self.core = core;
        self
    }
}

/// A unit of UI logic with its own task and render surface.
pub trait Application: Send + 'static {
    /// Launch parameters.
    fn config(&self) -> AppConfig;

    /// Task body. Draw into `cx.canvas()`, publish with `cx.present()`,
    /// and return to terminate. Suspension happens at the context's
    /// checkpoints (`delay_ms`, `yield_now`).
    fn run(&mut self, cx: &mut AppContext);
}
