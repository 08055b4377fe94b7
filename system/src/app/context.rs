//! Context handed to an application task.

use alloc::sync::Arc;

use pocket_graphics::{Canvas, Size};
use pocket_hal::Rtos;

use super::manager::Launcher;
use super::slot::AppSlot;
use crate::input::InputEvent;

/// The application's view of the system.
///
/// Owns the private front canvas. Nothing the app draws is visible until
/// [`AppContext::present`] copies it into the shared back buffer.
pub struct AppContext {
    slot: Arc<AppSlot>,
    front: Canvas,
    rtos: Arc<dyn Rtos>,
    launcher: Launcher,
}

impl AppContext {
    pub(crate) fn new(slot: Arc<AppSlot>, rtos: Arc<dyn Rtos>, launcher: Launcher) -> Self {
        let front = Canvas::new(slot.bounds.size());
        Self {
            slot,
            front,
            rtos,
            launcher,
        }
    }

    pub fn name(&self) -> &str {
        &self.slot.name
    }

    /// Canvas size (the configured bounds).
    pub fn size(&self) -> Size {
        self.front.size()
    }

    /// The front canvas to draw into.
    pub fn canvas(&mut self) -> &mut Canvas {
        &mut self.front
    }

    /// Publish the front canvas: copy it into the back buffer, mark it
    /// dirty and advance the frame counter.
    pub fn present(&mut self) {
        {
            let mut back = self.slot.back.lock();
            back.copy_from(&self.front);
        }
        self.slot.next_frame();
        self.slot.mark_dirty();
    }

    /// Frames presented so far.
    pub fn frame(&self) -> u32 {
        self.slot.frame()
    }

    /// True once after the screen was overwritten (resume, toast expiry).
    /// The app should repaint everything and present.
    pub fn redraw_requested(&self) -> bool {
        self.slot.take_redraw_request()
    }

    /// Next queued input event, if any.
    pub fn poll_input(&self) -> Option<InputEvent> {
        self.slot.inbox.try_recv()
    }

    /// Producer handle for launching apps and showing toasts.
    pub fn launcher(&self) -> &Launcher {
        &self.launcher
    }

    pub fn delay_ms(&self, ms: u32) {
        self.rtos.delay_ms(ms);
    }

    pub fn yield_now(&self) {
        self.rtos.yield_now();
    }

    pub fn uptime_ms(&self) -> u64 {
        self.rtos.uptime_ms()
    }
}
