//! Compositing and the toast overlay
//!
//! The panel is composited first (unless the foreground app is
//! fullscreen), then the foreground app. For each layer the back buffer is
//! locked, the toast is drawn over it in screen coordinates, and the buffer
//! is blitted if it is dirty.
//!
//! The toast is a single time-windowed banner centred at the bottom of the
//! screen. Its first visible frame forces a blit of every visible layer;
//! when it expires both layers are asked to redraw so it disappears.

use alloc::string::String;

use pocket_graphics::font::text_width;
use pocket_graphics::{Canvas, Color, Field, Point, Rect, Size, GLYPH_HEIGHT};
use pocket_hal::Display;

use super::flags::AppFlags;
use super::slot::AppSlot;
use crate::config::{TOAST_MARGIN_BOTTOM, TOAST_PADDING};

// ── Style ───────────────────────────────────────────────────

/// Toast banner appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToastStyle {
    pub background: Color,
    pub foreground: Color,
    /// Gap between the banner and the bottom edge of the screen.
    pub margin_bottom: u32,
    /// Gap between the text and the banner edge.
    pub padding: u32,
}

impl Default for ToastStyle {
    fn default() -> Self {
        Self {
            background: Color::DARK_GRAY,
            foreground: Color::WHITE,
            margin_bottom: TOAST_MARGIN_BOTTOM,
            padding: TOAST_PADDING,
        }
    }
}

// ── Toast state ─────────────────────────────────────────────

/// Toast state, guarded by the scheduler lock.
#[derive(Debug, Default)]
pub(crate) struct Toast {
    message: String,
    start_ms: u64,
    end_ms: u64,
    /// Set once the banner has been drawn in its window.
    shown: bool,
}

impl Toast {
    pub(crate) fn start(&mut self, message: &str, now: u64, duration_ms: u32) {
        self.message.clear();
        self.message.push_str(message);
        self.start_ms = now;
        self.end_ms = now + duration_ms as u64;
        self.shown = false;
    }

    pub(crate) fn is_active(&self, now: u64) -> bool {
        !self.message.is_empty() && now >= self.start_ms && now < self.end_ms
    }

    pub(crate) fn message(&self) -> Option<&str> {
        if self.message.is_empty() {
            None
        } else {
            Some(&self.message)
        }
    }

    /// Returns true exactly once, on the first call after a shown banner's
    /// window has closed. The message is cleared.
    fn take_expired(&mut self, now: u64) -> bool {
        if self.message.is_empty() || now < self.end_ms {
            return false;
        }
        self.message.clear();
        core::mem::take(&mut self.shown)
    }

    /// Banner rectangle in screen coordinates.
    fn banner(&self, screen: Size, style: &ToastStyle) -> Rect {
        let width = text_width(&self.message) + 2 * style.padding;
        let height = GLYPH_HEIGHT + 2 * style.padding;
        let x = (screen.width as i32 - width as i32) / 2;
        let y = screen.height as i32 - (style.margin_bottom + height) as i32;
        Rect::new(x, y, width, height)
    }

    /// Draw the banner onto a canvas whose top-left corner sits at `origin`
    /// on screen.
    fn draw(&self, canvas: &mut Canvas, origin: Point, screen: Size, style: &ToastStyle) {
        let banner = self.banner(screen, style).translate(-origin.x, -origin.y);
        if !banner.intersects(&canvas.bounds()) {
            return;
        }
        canvas.fill_rect(banner, style.background);
        let text_at = Point::new(
            banner.x + style.padding as i32,
            banner.y + style.padding as i32,
        );
        canvas.draw_text(text_at, &self.message, style.foreground);
    }
}

// ── Compositing ─────────────────────────────────────────────

/// Composite one frame.
pub(crate) fn composite(
    display: &mut dyn Display,
    panel: Option<&AppSlot>,
    foreground: Option<&AppSlot>,
    toast: &mut Toast,
    style: &ToastStyle,
    now: u64,
) {
    let panel = visible_panel(panel, foreground);

    if toast.take_expired(now) {
        log::trace!("[Compositor] toast expired");
        panel.iter().chain(foreground.iter()).for_each(|s| s.request_redraw());
    }

    let active = toast.is_active(now);
    let first_frame = active && !toast.shown;
    let screen = display.size();

    for layer in panel.into_iter().chain(foreground) {
        let overlay = active && !layer.flags.contains(AppFlags::NO_TOAST);
        let mut back = layer.back.lock();
        if overlay {
            toast.draw(&mut back, layer.bounds.origin(), screen, style);
        }
        let dirty = layer.take_dirty();
        if dirty || (first_frame && overlay) {
            let origin = layer.bounds.origin();
            if layer.flags.contains(AppFlags::INTERLACED) {
                display.blit_field(origin, &back, Field::from_frame(layer.frame()));
            } else {
                display.blit(origin, &back);
            }
        }
    }

    if active {
        toast.shown = true;
    }
}

/// Draw panel and foreground into `target` as they appear on screen.
pub(crate) fn render(
    target: &mut Canvas,
    screen: Size,
    panel: Option<&AppSlot>,
    foreground: Option<&AppSlot>,
    toast: &Toast,
    style: &ToastStyle,
    now: u64,
) {
    let panel = visible_panel(panel, foreground);
    for layer in panel.into_iter().chain(foreground) {
        let back = layer.back.lock();
        target.draw_canvas(&back, layer.bounds.origin());
    }
    if toast.is_active(now) {
        toast.draw(target, Point::ORIGIN, screen, style);
    }
}

fn visible_panel<'a>(panel: Option<&'a AppSlot>, foreground: Option<&AppSlot>) -> Option<&'a AppSlot> {
    let fullscreen = foreground.is_some_and(|f| f.flags.contains(AppFlags::FULLSCREEN));
    if fullscreen {
        None
    } else {
        panel
    }
}
