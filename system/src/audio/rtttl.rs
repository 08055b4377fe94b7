//! RTTTL ring tones
//!
//! `name:d=4,o=5,b=120:8c6,8d#,4p,2g.` is parsed into notes and rendered
//! as a square wave, mono, duplicated to both channels.

use alloc::vec::Vec;

use pocket_hal::{AudioFormat, AudioOutput};

use super::generator::{Generator, Step};
use super::source::BufferSource;
use crate::error::AudioError;

/// Output sample rate.
pub const SAMPLE_RATE: u32 = 22_050;

/// Square wave amplitude.
const AMPLITUDE: i16 = 8_000;

/// Frames rendered per step.
const FRAMES_PER_STEP: u32 = 128;

/// Octave 4 frequencies in Hz, C through B.
const OCTAVE_4: [u32; 12] = [262, 277, 294, 311, 330, 349, 370, 392, 415, 440, 466, 494];

/// One note; `freq == 0` is a rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    pub freq: u32,
    pub duration_ms: u32,
}

struct Defaults {
    duration: u32,
    octave: u32,
    bpm: u32,
}

fn number(s: &str) -> Option<u32> {
    if s.is_empty() {
        None
    } else {
        s.parse().ok()
    }
}

fn frequency(semitone: usize, octave: u32) -> u32 {
    let base = OCTAVE_4[semitone];
    if octave >= 4 {
        base << (octave - 4).min(4)
    } else {
        base >> (4 - octave).min(4)
    }
}

fn parse_defaults(section: &str) -> Result<Defaults, AudioError> {
    let mut d = Defaults {
        duration: 4,
        octave: 6,
        bpm: 63,
    };
    for item in section.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (key, value) = item
            .split_once('=')
            .ok_or(AudioError::InvalidData("bad RTTTL default"))?;
        let value = number(value.trim()).ok_or(AudioError::InvalidData("bad RTTTL default"))?;
        match key.trim() {
            "d" => d.duration = value,
            "o" => d.octave = value,
            "b" => d.bpm = value,
            _ => {}
        }
    }
    if d.duration == 0 || d.bpm == 0 {
        return Err(AudioError::InvalidData("zero RTTTL duration or tempo"));
    }
    Ok(d)
}

fn parse_note(token: &str, d: &Defaults) -> Result<Note, AudioError> {
    let bad = AudioError::InvalidData("bad RTTTL note");
    let bytes = token.as_bytes();
    let mut i = 0;

    let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
    let duration = number(&token[..digits]).unwrap_or(d.duration);
    i += digits;

    let letter = *bytes.get(i).ok_or(bad.clone())?;
    i += 1;
    let mut semitone = match letter.to_ascii_lowercase() {
        b'c' => Some(0),
        b'd' => Some(2),
        b'e' => Some(4),
        b'f' => Some(5),
        b'g' => Some(7),
        b'a' => Some(9),
        b'b' | b'h' => Some(11),
        b'p' => None,
        _ => return Err(bad),
    };

    if bytes.get(i) == Some(&b'#') {
        semitone = semitone.map(|s| (s + 1) % 12);
        i += 1;
    }

    let mut dotted = false;
    if bytes.get(i) == Some(&b'.') {
        dotted = true;
        i += 1;
    }
    let oct_digits = bytes[i..].iter().take_while(|b| b.is_ascii_digit()).count();
    let octave = number(&token[i..i + oct_digits]).unwrap_or(d.octave);
    i += oct_digits;
    if bytes.get(i) == Some(&b'.') {
        dotted = true;
    }

    if duration == 0 {
        return Err(bad);
    }
    // a whole note lasts four beats
    let mut duration_ms = 240_000 / d.bpm.checked_mul(duration).ok_or(bad)?;
    if dotted {
        duration_ms += duration_ms / 2;
    }

    Ok(Note {
        freq: semitone.map(|s| frequency(s, octave)).unwrap_or(0),
        duration_ms,
    })
}

/// Parse a complete RTTTL string.
pub fn parse(text: &str) -> Result<Vec<Note>, AudioError> {
    let mut sections = text.splitn(3, ':');
    let _name = sections.next();
    let defaults = sections
        .next()
        .ok_or(AudioError::InvalidData("missing RTTTL defaults"))?;
    let notes = sections
        .next()
        .ok_or(AudioError::InvalidData("missing RTTTL notes"))?;

    let d = parse_defaults(defaults)?;
    notes
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|tok| parse_note(tok, &d))
        .collect()
}

/// Square-wave RTTTL generator.
#[derive(Default)]
pub struct RtttlGenerator {
    notes: Vec<Note>,
    index: usize,
    /// Frames already rendered of the current note.
    done: u32,
    pending: Option<[i16; 2]>,
}

impl RtttlGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn frames_for(note: &Note) -> u32 {
        (note.duration_ms as u64 * SAMPLE_RATE as u64 / 1000) as u32
    }

    fn sample(note: &Note, n: u32) -> i16 {
        if note.freq == 0 {
            return 0;
        }
        let half_period = (SAMPLE_RATE / (2 * note.freq)).max(1);
        if (n / half_period) % 2 == 0 {
            AMPLITUDE
        } else {
            -AMPLITUDE
        }
    }
}

impl Generator for RtttlGenerator {
    fn begin(&mut self, source: &mut BufferSource, output: &mut dyn AudioOutput) -> Result<(), AudioError> {
        let text = core::str::from_utf8(source.data())
            .map_err(|_| AudioError::InvalidData("RTTTL is not text"))?;
        self.notes = parse(text)?;
        self.index = 0;
        self.done = 0;
        self.pending = None;
        log::debug!("[Audio] RTTTL with {} notes", self.notes.len());
        if !output.begin(AudioFormat::new(SAMPLE_RATE, 1, 16)) {
            return Err(AudioError::OutputRejected);
        }
        Ok(())
    }

    fn step(&mut self, _source: &mut BufferSource, output: &mut dyn AudioOutput) -> Step {
        if let Some(frame) = self.pending {
            if !output.consume(frame) {
                return Step::Blocked;
            }
            self.pending = None;
        }

        let mut budget = FRAMES_PER_STEP;
        while budget > 0 {
            let Some(note) = self.notes.get(self.index).copied() else {
                return Step::Done;
            };
            if self.done >= Self::frames_for(&note) {
                self.index += 1;
                self.done = 0;
                continue;
            }
            let s = Self::sample(&note, self.done);
            self.done += 1;
            budget -= 1;
            if !output.consume([s, s]) {
                self.pending = Some([s, s]);
                return Step::Blocked;
            }
        }
        Step::Continue
    }

    fn stop(&mut self, output: &mut dyn AudioOutput) {
        self.notes.clear();
        self.pending = None;
        output.stop();
    }
}
