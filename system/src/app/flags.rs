//! Application flags.

use bitflags::bitflags;

bitflags! {
    /// Per-application compositing options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AppFlags: u8 {
        /// Covers the whole screen; the panel is not composited.
        const FULLSCREEN = 1 << 0;
        /// Blit only every other row, alternating by frame parity.
        const INTERLACED = 1 << 1;
        /// Never overlay the toast on this application.
        const NO_TOAST   = 1 << 2;
    }
}
