use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use crate::{
    clip::model::{Clip, ClipKind},
    clip::source::FrameSource,
    clip::window::ClipWindow,
    foundation::error::{ClipError, ClipResult},
    foundation::frame::Frame,
    reader::buffered::AudioFileReader,
    reader::config::ReaderConfig,
    reader::ffmpeg::FfmpegDecoder,
};

impl Clip {
    /// Unbounded audio clip whose samples are computed for a batch of times at once.
    ///
    /// `make_samples` receives the query times and must return a `ts.len() x channels` buffer.
    pub fn audio_from_fn<F>(channels: u16, make_samples: F) -> ClipResult<Self>
    where
        F: Fn(&[f64]) -> ClipResult<Frame> + Send + Sync + 'static,
    {
        if channels == 0 {
            return Err(ClipError::shape("audio clips need at least one channel"));
        }
        Ok(Self::from_source(
            ClipKind::Audio { channels },
            ClipWindow::unbounded(),
            FrameSource::Sampled(Arc::new(make_samples)),
        ))
    }

    /// Audio clip playing an in-memory `len x channels` buffer at `sample_rate`.
    ///
    /// The duration is `len / sample_rate`; times outside the buffer read as silence.
    pub fn audio_array(samples: Frame, sample_rate: u32) -> ClipResult<Self> {
        let len = samples
            .sample_len()
            .ok_or_else(|| ClipError::shape("audio_array needs a sample buffer, got an image"))?;
        if sample_rate == 0 {
            return Err(ClipError::range("sample rate must be non-zero"));
        }
        let channels = u16::try_from(samples.channels())
            .ok()
            .filter(|&c| c > 0)
            .ok_or_else(|| {
                ClipError::shape(format!("unsupported channel count {}", samples.channels()))
            })?;
        let window = ClipWindow::with_length(len as f64 / f64::from(sample_rate))?;
        Self::from_source(
            ClipKind::Audio { channels },
            window,
            FrameSource::SampleArray {
                samples: Arc::new(samples),
                sample_rate,
            },
        )
        .with_fps(f64::from(sample_rate))
    }

    /// Audio clip streaming from an opened reader.
    ///
    /// Duration and default fps come from the reader.
    pub fn from_reader(reader: AudioFileReader) -> ClipResult<Self> {
        let format = reader.format();
        let window = ClipWindow::with_length(reader.duration())?;
        Self::from_source(
            ClipKind::Audio {
                channels: format.channels,
            },
            window,
            FrameSource::Stream(Arc::new(Mutex::new(reader))),
        )
        .with_fps(f64::from(format.sample_rate))
    }

    /// Audio clip decoding `path` through the ffmpeg backend.
    pub fn audio_file(path: impl AsRef<Path>, config: &ReaderConfig) -> ClipResult<Self> {
        let backend = FfmpegDecoder::new(path.as_ref(), config);
        let reader = AudioFileReader::open(Box::new(backend), config)?;
        Self::from_reader(reader)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/clip/audio.rs"]
mod tests;
