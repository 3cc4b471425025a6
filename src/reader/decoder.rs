use crate::{
    foundation::error::{ClipError, ClipResult},
    reader::config::SampleWidth,
};

/// Metadata reported by a decoder backend before streaming.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceInfo {
    /// Length of the source in seconds.
    pub duration: f64,
    /// Native sample rate, when known.
    pub sample_rate: Option<u32>,
    /// Native channel count, when known.
    pub channels: Option<u16>,
}

/// Sample layout the decoder is asked to produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PcmFormat {
    /// Output rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
    /// Bytes per sample on the pipe.
    pub sample_width: SampleWidth,
}

impl PcmFormat {
    /// Bytes per interleaved sample frame.
    pub fn frame_bytes(&self) -> usize {
        usize::from(self.channels) * self.sample_width.bytes()
    }
}

/// A source that can describe itself and start one-directional PCM streams.
pub trait DecoderBackend: Send {
    /// Label used in logs and errors.
    fn name(&self) -> &str;

    /// Read source metadata.
    fn probe(&mut self) -> ClipResult<SourceInfo>;

    /// Start a stream positioned at `start_sec`.
    fn open(&mut self, start_sec: f64, format: PcmFormat) -> ClipResult<Box<dyn PcmStream>>;
}

/// Forward-only stream of interleaved `f32` samples.
pub trait PcmStream: Send {
    /// Read up to `frames` sample frames. Returning fewer means the stream ended.
    fn read_frames(&mut self, frames: usize) -> ClipResult<Vec<f32>>;

    /// Discard up to `frames` sample frames, returning how many were actually skipped.
    fn skip_frames(&mut self, frames: usize) -> ClipResult<usize>;

    /// Release the stream. Must be safe to call more than once.
    fn close(&mut self) -> ClipResult<()>;
}

/// Convert signed little-endian PCM bytes into `f32` samples in `[-1, 1)`.
pub fn decode_pcm_le(bytes: &[u8], width: SampleWidth) -> ClipResult<Vec<f32>> {
    let w = width.bytes();
    if !bytes.len().is_multiple_of(w) {
        return Err(ClipError::io(format!(
            "pcm byte length {} is not aligned to {w}-byte samples",
            bytes.len()
        )));
    }
    let out = match width {
        SampleWidth::One => bytes
            .iter()
            .map(|&b| f32::from(b as i8) / 128.0)
            .collect(),
        SampleWidth::Two => bytes
            .chunks_exact(2)
            .map(|c| f32::from(i16::from_le_bytes([c[0], c[1]])) / 32_768.0)
            .collect(),
        SampleWidth::Four => bytes
            .chunks_exact(4)
            .map(|c| (f64::from(i32::from_le_bytes([c[0], c[1], c[2], c[3]])) / 2_147_483_648.0) as f32)
            .collect(),
    };
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/reader/decoder.rs"]
mod tests;
