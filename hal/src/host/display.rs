//! In-memory display panel

use alloc::sync::Arc;

use pocket_graphics::{Canvas, Field, Point, Size};
use spin::Mutex;

use crate::display::Display;

struct PanelState {
    frame: Canvas,
    blits: u32,
    field_blits: u32,
    last_field: Option<Field>,
}

/// Panel whose framebuffer lives in RAM.
///
/// Clones share the same framebuffer, so a test can keep one handle while
/// the compositor owns another.
#[derive(Clone)]
pub struct MemoryDisplay {
    state: Arc<Mutex<PanelState>>,
}

impl MemoryDisplay {
    pub fn new(size: Size) -> Self {
        Self {
            state: Arc::new(Mutex::new(PanelState {
                frame: Canvas::new(size),
                blits: 0,
                field_blits: 0,
                last_field: None,
            })),
        }
    }

    /// Snapshot of the framebuffer.
    pub fn frame(&self) -> Canvas {
        self.state.lock().frame.clone()
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<u16> {
        self.state.lock().frame.pixel(x, y)
    }

    /// Full-frame blits received.
    pub fn blit_count(&self) -> u32 {
        self.state.lock().blits
    }

    /// Half-frame blits received.
    pub fn field_blit_count(&self) -> u32 {
        self.state.lock().field_blits
    }

    /// Total writes of either kind.
    pub fn total_blits(&self) -> u32 {
        let st = self.state.lock();
        st.blits + st.field_blits
    }

    pub fn last_field(&self) -> Option<Field> {
        self.state.lock().last_field
    }
}

impl Display for MemoryDisplay {
    fn size(&self) -> Size {
        self.state.lock().frame.size()
    }

    fn blit(&mut self, origin: Point, canvas: &Canvas) {
        let mut st = self.state.lock();
        st.frame.draw_canvas(canvas, origin);
        st.blits += 1;
    }

    fn blit_field(&mut self, origin: Point, canvas: &Canvas, field: Field) {
        let mut st = self.state.lock();
        st.frame.draw_canvas_field(canvas, origin, field);
        st.field_blits += 1;
        st.last_field = Some(field);
    }
}
