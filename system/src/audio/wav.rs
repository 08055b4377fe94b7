//! WAV decoder
//!
//! RIFF/WAVE with PCM samples, 8-bit unsigned or 16-bit signed
//! little-endian, mono or stereo. Mono is duplicated to both channels.

use pocket_hal::{AudioFormat, AudioOutput};

use super::generator::{Generator, Step};
use super::source::BufferSource;
use crate::error::AudioError;

/// Frames decoded per step.
const FRAMES_PER_STEP: usize = 128;

const WAVE_FORMAT_PCM: u16 = 1;

fn u16_le(b: &[u8]) -> u16 {
    u16::from_le_bytes([b[0], b[1]])
}

fn u32_le(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

/// Parsed `fmt ` chunk and data extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    format: AudioFormat,
    data_start: usize,
    data_end: usize,
}

/// End of a chunk body and start of the next chunk (chunks are word
/// aligned). Lengths come from the file and may be anything.
fn chunk_extent(body: usize, len: usize) -> Result<(usize, usize), AudioError> {
    let out_of_range = AudioError::InvalidData("chunk length out of range");
    let end = body.checked_add(len).ok_or(out_of_range.clone())?;
    let next = end.checked_add(len & 1).ok_or(out_of_range)?;
    Ok((end, next))
}

fn parse_header(bytes: &[u8]) -> Result<Header, AudioError> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(AudioError::InvalidData("not a RIFF/WAVE file"));
    }

    let mut format = None;
    let mut pos = 12;
    while bytes.len().saturating_sub(pos) >= 8 {
        let id = &bytes[pos..pos + 4];
        let len = u32_le(&bytes[pos + 4..pos + 8]) as usize;
        let body = pos + 8;
        let (end, next) = chunk_extent(body, len)?;

        if id == b"fmt " {
            if len < 16 || body + 16 > bytes.len() {
                return Err(AudioError::InvalidData("short fmt chunk"));
            }
            let f = &bytes[body..body + 16];
            if u16_le(&f[0..2]) != WAVE_FORMAT_PCM {
                return Err(AudioError::InvalidData("not PCM"));
            }
            let channels = u16_le(&f[2..4]);
            let sample_rate = u32_le(&f[4..8]);
            let bits = u16_le(&f[14..16]);
            if !(1..=2).contains(&channels) || !(bits == 8 || bits == 16) || sample_rate == 0 {
                return Err(AudioError::InvalidData("unsupported PCM layout"));
            }
            format = Some(AudioFormat::new(sample_rate, channels as u8, bits as u8));
        } else if id == b"data" {
            let format = format.ok_or(AudioError::InvalidData("data before fmt"))?;
            return Ok(Header {
                format,
                data_start: body,
                data_end: end.min(bytes.len()),
            });
        }
        pos = next;
    }
    Err(AudioError::InvalidData("no data chunk"))
}

/// PCM WAV generator.
#[derive(Default)]
pub struct WavGenerator {
    header: Option<Header>,
    /// Frame the sink refused last step.
    pending: Option<[i16; 2]>,
}

impl WavGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn frame_bytes(format: &AudioFormat) -> usize {
        format.channels as usize * (format.bits_per_sample as usize / 8)
    }

    fn decode(format: &AudioFormat, raw: &[u8]) -> [i16; 2] {
        let sample = |i: usize| -> i16 {
            if format.bits_per_sample == 8 {
                ((raw[i] as i16) - 128) << 8
            } else {
                i16::from_le_bytes([raw[2 * i], raw[2 * i + 1]])
            }
        };
        let left = sample(0);
        let right = if format.channels == 2 { sample(1) } else { left };
        [left, right]
    }
}

impl Generator for WavGenerator {
    fn begin(&mut self, source: &mut BufferSource, output: &mut dyn AudioOutput) -> Result<(), AudioError> {
        let header = parse_header(source.data())?;
        log::debug!(
            "[Audio] WAV {} Hz, {} ch, {} bit, {} bytes",
            header.format.sample_rate,
            header.format.channels,
            header.format.bits_per_sample,
            header.data_end - header.data_start
        );
        if !output.begin(header.format) {
            return Err(AudioError::OutputRejected);
        }
        source.seek(header.data_start);
        self.header = Some(header);
        self.pending = None;
        Ok(())
    }

    fn step(&mut self, source: &mut BufferSource, output: &mut dyn AudioOutput) -> Step {
        let Some(header) = self.header else {
            return Step::Done;
        };

        if let Some(frame) = self.pending {
            if !output.consume(frame) {
                return Step::Blocked;
            }
            self.pending = None;
        }

        let frame_len = Self::frame_bytes(&header.format);
        for _ in 0..FRAMES_PER_STEP {
            if source.position() + frame_len > header.data_end {
                return Step::Done;
            }
            let Some(raw) = source.take(frame_len) else {
                return Step::Done;
            };
            let frame = Self::decode(&header.format, raw);
            if !output.consume(frame) {
                self.pending = Some(frame);
                return Step::Blocked;
            }
        }
        Step::Continue
    }

    fn stop(&mut self, output: &mut dyn AudioOutput) {
        self.header = None;
        self.pending = None;
        output.stop();
    }
}

/// Build a PCM WAV file in memory.
pub fn encode_pcm16(sample_rate: u32, channels: u16, samples: &[i16]) -> alloc::vec::Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let block_align = channels * 2;
    let mut out = alloc::vec::Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&WAVE_FORMAT_PCM.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}
