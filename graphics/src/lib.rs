//! Pocket OS Graphics
//!
//! Software rendering primitives shared by the compositor, the display
//! collaborator and every application.
//!
//! # Modules
//!
//! - `geometry`: `Point`, `Size`, `Rect`
//! - `color`: 24-bit colours packed to the RGB565 panel format
//! - `canvas`: RGB565 pixel surfaces with clipped blits and interlaced fields
//! - `font`: built-in 5x7 bitmap glyphs used for overlays
//!
//! Every surface in the system is a `Canvas`. Applications draw into their
//! private front canvas, hand it to the compositor through a locked back
//! canvas, and the compositor copies back canvases to the physical display.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod canvas;
pub mod color;
pub mod font;
pub mod geometry;

pub use canvas::{Canvas, Field};
pub use color::Color;
pub use font::{GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};
pub use geometry::{Point, Rect, Size};
