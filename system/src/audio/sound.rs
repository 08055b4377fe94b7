//! Sounds
//!
//! A `Sound` owns an immutable byte buffer and a container tag. The player
//! shares it read-only with the playback task through an `Arc`.

use alloc::vec::Vec;
use core::fmt;

/// Container format of a sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundKind {
    Wav,
    Mp3,
    Aac,
    Flac,
    Mod,
    Midi,
    Rtttl,
}

impl SoundKind {
    /// Parse a short tag or file extension, case-insensitively.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let kinds = [
            ("wav", SoundKind::Wav),
            ("mp3", SoundKind::Mp3),
            ("aac", SoundKind::Aac),
            ("m4a", SoundKind::Aac),
            ("flac", SoundKind::Flac),
            ("mod", SoundKind::Mod),
            ("mid", SoundKind::Midi),
            ("midi", SoundKind::Midi),
            ("rtttl", SoundKind::Rtttl),
            ("rtx", SoundKind::Rtttl),
        ];
        kinds
            .iter()
            .find(|(t, _)| t.eq_ignore_ascii_case(tag))
            .map(|&(_, k)| k)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SoundKind::Wav => "wav",
            SoundKind::Mp3 => "mp3",
            SoundKind::Aac => "aac",
            SoundKind::Flac => "flac",
            SoundKind::Mod => "mod",
            SoundKind::Midi => "midi",
            SoundKind::Rtttl => "rtttl",
        }
    }
}

impl fmt::Display for SoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An owned, read-only sound buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sound {
    data: Vec<u8>,
    kind: SoundKind,
}

impl Sound {
    pub fn new(data: Vec<u8>, kind: SoundKind) -> Self {
        Self { data, kind }
    }

    /// Build from a tag such as a file extension.
    pub fn with_tag(data: Vec<u8>, tag: &str) -> Option<Self> {
        SoundKind::from_tag(tag).map(|kind| Self::new(data, kind))
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn kind(&self) -> SoundKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_case_insensitive() {
        assert_eq!(SoundKind::from_tag("WAV"), Some(SoundKind::Wav));
        assert_eq!(SoundKind::from_tag("mid"), Some(SoundKind::Midi));
        assert_eq!(SoundKind::from_tag("ogg"), None);
    }

    #[test]
    fn sound_keeps_its_bytes() {
        let s = Sound::with_tag(vec![1, 2, 3], "rtttl").unwrap();
        assert_eq!(s.size(), 3);
        assert_eq!(s.kind(), SoundKind::Rtttl);
        assert_eq!(s.data(), &[1, 2, 3]);
    }
}
