//! State shared between the scheduler and one application task.

use alloc::boxed::Box;
use alloc::string::String;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use pocket_graphics::{Canvas, Rect};
use pocket_hal::{BoundedQueue, TaskHandle};
use spin::Mutex;

use super::application::{AppConfig, AppState, Application};
use super::flags::AppFlags;
use crate::config::INPUT_QUEUE_DEPTH;
use crate::input::InputEvent;

pub(crate) struct AppSlot {
    pub(crate) name: String,
    pub(crate) bounds: Rect,
    pub(crate) flags: AppFlags,
    state: AtomicU8,
    /// Written by the app under this lock, read by the compositor under it.
    pub(crate) back: Mutex<Canvas>,
    needs_redraw: AtomicBool,
    redraw_requested: AtomicBool,
    frame: AtomicU32,
    pub(crate) inbox: BoundedQueue<InputEvent>,
    pub(crate) task: Mutex<Option<TaskHandle>>,
    /// The application object, handed back by its task after `run` returns.
    pub(crate) retired: Mutex<Option<Box<dyn Application>>>,
}

impl AppSlot {
    pub(crate) fn new(config: &AppConfig) -> Self {
        Self {
            name: config.name.clone(),
            bounds: config.bounds,
            flags: config.flags,
            state: AtomicU8::new(AppState::Created as u8),
            back: Mutex::new(Canvas::new(config.bounds.size())),
            needs_redraw: AtomicBool::new(false),
            redraw_requested: AtomicBool::new(false),
            frame: AtomicU32::new(0),
            inbox: BoundedQueue::new(INPUT_QUEUE_DEPTH),
            task: Mutex::new(None),
            retired: Mutex::new(None),
        }
    }

    pub(crate) fn state(&self) -> AppState {
        AppState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: AppState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Move `from` → `to` only if the app is still in `from`.
    pub(crate) fn transition(&self, from: AppState, to: AppState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn task(&self) -> Option<TaskHandle> {
        *self.task.lock()
    }

    pub(crate) fn mark_dirty(&self) {
        self.needs_redraw.store(true, Ordering::Release);
    }

    pub(crate) fn take_dirty(&self) -> bool {
        self.needs_redraw.swap(false, Ordering::AcqRel)
    }

    /// Ask the app to repaint and the compositor to blit its back buffer.
    pub(crate) fn request_redraw(&self) {
        self.redraw_requested.store(true, Ordering::Release);
        self.mark_dirty();
    }

    pub(crate) fn take_redraw_request(&self) -> bool {
        self.redraw_requested.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn frame(&self) -> u32 {
        self.frame.load(Ordering::Acquire)
    }

    pub(crate) fn next_frame(&self) {
        self.frame.fetch_add(1, Ordering::AcqRel);
    }
}
