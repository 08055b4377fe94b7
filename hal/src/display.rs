//! Display panel
//!
//! The physical display is owned by the compositor. Nothing else writes to
//! it; applications only ever touch their own canvases.

use pocket_graphics::{Canvas, Field, Point, Size};

/// Physical display collaborator.
pub trait Display: Send {
    /// Panel resolution.
    fn size(&self) -> Size;

    /// Copy a whole canvas to the panel with its top-left corner at `origin`.
    fn blit(&mut self, origin: Point, canvas: &Canvas);

    /// Copy only the rows of `canvas` belonging to `field`.
    fn blit_field(&mut self, origin: Point, canvas: &Canvas, field: Field);
}
