//! RTOS task primitives
//!
//! The OS core never creates threads itself. Every application, service and
//! audio session runs as an RTOS task created through [`Rtos`].
//!
//! ```text
//!   spawn()          suspend()
//!  ────────► Ready ◄──────────► Suspended
//!              │      resume()      ▲
//!              │ park() (self)      │
//!              └────────────────────┘
//!              │
//!              │ delete() (from another task)
//!              ▼
//!           reclaimed
//! ```
//!
//! `delete` is always issued by the owner from its own context so the task
//! stack is reclaimed before `delete` returns. A task that has finished its
//! work parks itself and waits to be deleted; it never deletes itself.

use alloc::boxed::Box;
use alloc::string::String;
use core::fmt;

use crate::Result;

/// Task entry point.
pub type TaskEntry = Box<dyn FnOnce() + Send + 'static>;

/// Opaque handle to a spawned task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskHandle(pub u32);

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// CPU affinity hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoreAffinity {
    /// Let the RTOS choose.
    #[default]
    Any,
    /// Pin to one core.
    Core(u8),
}

/// Parameters for a new task.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    /// Task name (shown in RTOS task lists).
    pub name: String,
    /// Stack size in bytes.
    pub stack_size: usize,
    /// Priority (higher = more urgent).
    pub priority: u8,
    /// Core to run on.
    pub core: CoreAffinity,
}

impl TaskSpec {
    /// Default stack size for tasks that do not ask for one.
    pub const DEFAULT_STACK_SIZE: usize = 4096;

    /// Default priority, above idle.
    pub const DEFAULT_PRIORITY: u8 = 1;

    pub fn new(name: &str) -> Self {
        Self {
            name: String::from(name),
            stack_size: Self::DEFAULT_STACK_SIZE,
            priority: Self::DEFAULT_PRIORITY,
            core: CoreAffinity::Any,
        }
    }

    /// Set stack size.
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }

    /// Set priority.
    pub fn priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Set core affinity.
    pub fn core(mut self, core: CoreAffinity) -> Self {
        self.core = core;
        self
    }
}

/// Task primitives provided by the underlying RTOS.
pub trait Rtos: Send + Sync {
    /// Create and start a task.
    fn spawn(&self, spec: &TaskSpec, entry: TaskEntry) -> Result<TaskHandle>;

    /// Stop scheduling `task` until it is resumed.
    fn suspend(&self, task: TaskHandle);

    /// Make a suspended task schedulable again.
    fn resume(&self, task: TaskHandle);

    /// Destroy `task` and reclaim its stack before returning. The task no
    /// longer counts as live once this returns, even where the port can
    /// only stop it at its next scheduling point.
    ///
    /// Must not be called by `task` itself.
    fn delete(&self, task: TaskHandle);

    /// Suspend the calling task. Returns when resumed; never returns if the
    /// task is deleted while parked.
    fn park(&self);

    /// Block the calling task for at least `ms` milliseconds.
    fn delay_ms(&self, ms: u32);

    /// Give the CPU to another ready task.
    fn yield_now(&self);

    /// Milliseconds since boot.
    fn uptime_ms(&self) -> u64;

    /// Stop the device. Used for unrecoverable faults.
    fn halt(&self, reason: &str) -> !;
}
