//! Read-only cursor over a sound's bytes.

use alloc::sync::Arc;

use super::sound::Sound;

pub struct BufferSource {
    sound: Arc<Sound>,
    pos: usize,
}

impl BufferSource {
    pub fn new(sound: Arc<Sound>) -> Self {
        Self { sound, pos: 0 }
    }

    /// All bytes, independent of the cursor.
    pub fn data(&self) -> &[u8] {
        self.sound.data()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.sound.size() - self.pos
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.sound.size()
    }

    /// Move the cursor, clamped to the end.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.sound.size());
    }

    /// Copy up to `buf.len()` bytes and advance.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.remaining());
        buf[..n].copy_from_slice(&self.sound.data()[self.pos..self.pos + n]);
        self.pos += n;
        n
    }

    /// Borrow the next `n` bytes and advance, or `None` if fewer remain.
    pub fn take(&mut self, n: usize) -> Option<&[u8]> {
        if self.remaining() < n {
            return None;
        }
        let start = self.pos;
        self.pos += n;
        Some(&self.sound.data()[start..start + n])
    }
}
