//! Canvas - RGB565 pixel surface
//!
//! A `Canvas` is a heap-allocated rectangle of RGB565 pixels. It is the
//! unit of exchange between applications, the compositor and the display:
//! applications draw into one, the compositor copies it, the display
//! collaborator receives it.
//!
//! All drawing is clipped to the canvas bounds; out-of-range writes are
//! silently dropped.

use alloc::vec;
use alloc::vec::Vec;

use crate::color::Color;
use crate::font::{self, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};
use crate::geometry::{Point, Rect, Size};

/// One half of an interlaced frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Rows 0, 2, 4, ...
    Even,
    /// Rows 1, 3, 5, ...
    Odd,
}

impl Field {
    /// Pick the half-frame by parity of a frame counter.
    pub const fn from_frame(frame: u32) -> Self {
        if frame % 2 == 0 {
            Field::Even
        } else {
            Field::Odd
        }
    }

    /// Whether `row` belongs to this field.
    pub const fn contains_row(self, row: u32) -> bool {
        match self {
            Field::Even => row % 2 == 0,
            Field::Odd => row % 2 == 1,
        }
    }

    pub const fn first_row(self) -> u32 {
        match self {
            Field::Even => 0,
            Field::Odd => 1,
        }
    }
}

/// An RGB565 pixel surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    size: Size,
    pixels: Vec<u16>,
}

impl Canvas {
    /// Create a black canvas.
    pub fn new(size: Size) -> Self {
        Self {
            size,
            pixels: vec![0u16; size.area()],
        }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    /// Bounds in local coordinates.
    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.size)
    }

    /// Raw pixels, row-major.
    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    /// One row of pixels.
    pub fn row(&self, y: u32) -> Option<&[u16]> {
        if y >= self.size.height {
            return None;
        }
        let w = self.size.width as usize;
        let start = y as usize * w;
        Some(&self.pixels[start..start + w])
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.size.width || y as u32 >= self.size.height {
            return None;
        }
        Some(y as usize * self.size.width as usize + x as usize)
    }

    /// Get pixel at coordinates (checked)
    pub fn pixel(&self, x: i32, y: i32) -> Option<u16> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Set pixel at coordinates (checked)
    #[inline]
    pub fn set_pixel(&mut self, x: i32, y: i32, color: u16) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    /// Fill entire canvas with a color
    pub fn fill(&mut self, color: Color) {
        let px = color.to_rgb565();
        self.pixels.iter_mut().for_each(|p| *p = px);
    }

    /// Fill a rectangle with a color
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let Some(clip) = rect.intersection(&self.bounds()) else {
            return;
        };
        let px = color.to_rgb565();
        let w = self.size.width as usize;
        for y in clip.y..clip.bottom() {
            let start = y as usize * w + clip.x as usize;
            self.pixels[start..start + clip.width as usize].fill(px);
        }
    }

    /// Overwrite this canvas with `src`. Sizes must match; a mismatched
    /// source is drawn clipped at the origin instead.
    pub fn copy_from(&mut self, src: &Canvas) {
        if src.size == self.size {
            self.pixels.copy_from_slice(&src.pixels);
        } else {
            self.draw_canvas(src, Point::ORIGIN);
        }
    }

    /// Draw `src` with its top-left corner at `at`, clipped.
    pub fn draw_canvas(&mut self, src: &Canvas, at: Point) {
        self.draw_rows(src, at, None);
    }

    /// Draw only the rows of `src` belonging to `field`. Row parity is taken
    /// in the source's coordinates.
    pub fn draw_canvas_field(&mut self, src: &Canvas, at: Point, field: Field) {
        self.draw_rows(src, at, Some(field));
    }

    fn draw_rows(&mut self, src: &Canvas, at: Point, field: Option<Field>) {
        let dst_rect = Rect::new(at.x, at.y, src.width(), src.height());
        let Some(clip) = dst_rect.intersection(&self.bounds()) else {
            return;
        };

        let src_x = (clip.x - at.x) as usize;
        let row_len = clip.width as usize;
        let dst_w = self.size.width as usize;
        let src_w = src.size.width as usize;

        for y in clip.y..clip.bottom() {
            let src_y = (y - at.y) as u32;
            if let Some(f) = field {
                if !f.contains_row(src_y) {
                    continue;
                }
            }
            let s = src_y as usize * src_w + src_x;
            let d = y as usize * dst_w + clip.x as usize;
            self.pixels[d..d + row_len].copy_from_slice(&src.pixels[s..s + row_len]);
        }
    }

    /// Draw a single character, returns the advance in pixels.
    pub fn draw_char(&mut self, at: Point, ch: char, color: Color) -> u32 {
        let px = color.to_rgb565();
        let rows = font::glyph(ch);
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 1 {
                    self.set_pixel(at.x + col as i32, at.y + row as i32, px);
                }
            }
        }
        GLYPH_ADVANCE
    }

    /// Draw a line of text, returns the width drawn.
    pub fn draw_text(&mut self, at: Point, text: &str, color: Color) -> u32 {
        let mut x = at.x;
        for ch in text.chars() {
            x += self.draw_char(Point::new(x, at.y), ch, color) as i32;
        }
        font::text_width(text)
    }

    /// Height of one line of text.
    pub const fn line_height() -> u32 {
        GLYPH_HEIGHT
    }
}
