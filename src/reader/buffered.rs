use std::ops::Range;

use crate::{
    foundation::core::time_to_index,
    foundation::error::{ClipError, ClipResult},
    foundation::frame::{Frame, FrameShape},
    reader::config::ReaderConfig,
    reader::decoder::{DecoderBackend, PcmFormat, PcmStream, SourceInfo},
};

/// Counters describing how a reader has used its decoder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReaderStats {
    /// Decoder processes started (including the initial one).
    pub spawns: u64,
    /// Window recenters triggered by reads.
    pub recenters: u64,
    /// Recenters served by keeping the overlapping tail of the previous window.
    pub partial_reuses: u64,
    /// Sample frames read and dropped to move forward.
    pub skipped_frames: u64,
    /// Sample frames read into the window.
    pub frames_read: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReaderState {
    Open,
    Closed,
    Desynced,
}

/// Random-access view over a forward-only decoder, backed by a sliding window of samples.
///
/// Sequential reads cost one decoder read per window shift; backward or far-forward jumps
/// restart the decoder at the target time.
pub struct AudioFileReader {
    backend: Box<dyn DecoderBackend>,
    name: String,
    info: SourceInfo,
    format: PcmFormat,
    frame_count: usize,
    window_size: usize,
    max_forward_skip: usize,
    stream: Option<Box<dyn PcmStream>>,
    cursor: usize,
    window_start: usize,
    window: Vec<f32>,
    eof_at: Option<usize>,
    state: ReaderState,
    stats: ReaderStats,
}

impl std::fmt::Debug for AudioFileReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioFileReader")
            .field("name", &self.name)
            .field("format", &self.format)
            .field("frame_count", &self.frame_count)
            .field("window", &self.window_range())
            .field("cursor", &self.cursor)
            .field("eof_at", &self.eof_at)
            .field("state", &self.state)
            .finish()
    }
}

impl AudioFileReader {
    /// Probe the source, start a decoder at 0 and fill the first window.
    ///
    /// On failure any decoder that was started is closed before returning.
    #[tracing::instrument(skip_all, fields(source = backend.name()))]
    pub fn open(mut backend: Box<dyn DecoderBackend>, config: &ReaderConfig) -> ClipResult<Self> {
        config.validate()?;
        let name = backend.name().to_string();
        let info = backend.probe()?;
        if !(info.duration.is_finite() && info.duration >= 0.0) {
            return Err(ClipError::io(format!(
                "source '{name}' reported an invalid duration {}",
                info.duration
            )));
        }
        let format = PcmFormat {
            sample_rate: config.sample_rate,
            channels: config.channels,
            sample_width: config.sample_width,
        };
        let frame_count = (f64::from(format.sample_rate) * info.duration).floor() as usize;
        let window_size = config.window_size.min(frame_count + 1);

        let mut reader = Self {
            backend,
            name,
            info,
            format,
            frame_count,
            window_size,
            max_forward_skip: config.max_forward_skip,
            stream: None,
            cursor: 0,
            window_start: 0,
            window: Vec::new(),
            eof_at: None,
            state: ReaderState::Open,
            stats: ReaderStats::default(),
        };
        let started = reader
            .initialize(0)
            .and_then(|()| reader.buffer_around(1));
        if let Err(e) = started {
            if let Err(close_err) = reader.close() {
                tracing::warn!(source = %reader.name, error = %close_err, "teardown after failed open");
            }
            return Err(e);
        }
        tracing::debug!(
            source = %reader.name,
            frame_count,
            window_size,
            "audio reader ready"
        );
        Ok(reader)
    }

    /// Source label.
    pub fn source_name(&self) -> &str {
        &self.name
    }

    /// Probed source metadata.
    pub fn source_info(&self) -> &SourceInfo {
        &self.info
    }

    /// Source duration in seconds.
    pub fn duration(&self) -> f64 {
        self.info.duration
    }

    /// Output sample layout.
    pub fn format(&self) -> PcmFormat {
        self.format
    }

    /// Number of addressable sample frames, `floor(sample_rate * duration)`.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Effective window size in sample frames.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Sample indices currently held in memory.
    pub fn window_range(&self) -> Range<usize> {
        self.window_start..self.window_end()
    }

    /// Next index the decoder will yield.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// First index the decoder failed to produce, once a short read was seen.
    pub fn eof_at(&self) -> Option<usize> {
        self.eof_at
    }

    /// Usage counters.
    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    /// Whether reads are rejected (closed or desynchronized).
    pub fn is_closed(&self) -> bool {
        self.state != ReaderState::Open
    }

    /// One sample frame (`1 x channels`) at `index`; silence outside the source.
    pub fn sample_at(&mut self, index: i64) -> ClipResult<Frame> {
        self.ensure_open()?;
        let channels = self.channels();
        let mut out = Frame::silence(1, channels);
        let Some(idx) = self.valid_index(index) else {
            return Ok(out);
        };
        if !self.in_window(idx) {
            self.recenter(idx)?;
        }
        match self.valid_index(index) {
            Some(idx) if self.in_window(idx) => {
                out.data_mut().copy_from_slice(self.row(idx));
                Ok(out)
            }
            Some(_) => Err(self.desync(index, index)),
            None => Ok(out),
        }
    }

    /// [`Self::sample_at`] for a time in seconds.
    pub fn sample_at_time(&mut self, t: f64) -> ClipResult<Frame> {
        self.sample_at(time_to_index(t, self.format.sample_rate))
    }

    /// Sample frames at each of `indices` as one `len x channels` buffer.
    ///
    /// The batch is served in runs of half a window. A run that does not fit after a single
    /// recenter closes the reader and fails with [`ClipError::Desync`].
    pub fn samples_at(&mut self, indices: &[i64]) -> ClipResult<Frame> {
        self.ensure_open()?;
        let channels = self.channels();
        let mut data = vec![0.0; indices.len() * channels];
        let run = (self.window_size / 2).max(1);
        for (n, batch) in indices.chunks(run).enumerate() {
            let base = n * run;
            self.fill_batch(batch, &mut data[base * channels..(base + batch.len()) * channels])?;
        }
        Ok(Frame::from_vec(
            FrameShape::Samples {
                len: indices.len(),
                channels,
            },
            data,
        )?)
    }

    /// [`Self::samples_at`] for times in seconds.
    pub fn samples_at_times(&mut self, ts: &[f64]) -> ClipResult<Frame> {
        let rate = self.format.sample_rate;
        let indices: Vec<i64> = ts.iter().map(|&t| time_to_index(t, rate)).collect();
        self.samples_at(&indices)
    }

    /// Stop the decoder. Later reads fail with an IO error. Safe to call repeatedly.
    pub fn close(&mut self) -> ClipResult<()> {
        if self.state == ReaderState::Open {
            self.state = ReaderState::Closed;
        }
        self.window.clear();
        match self.stream.take() {
            Some(mut stream) => stream.close(),
            None => Ok(()),
        }
    }

    fn fill_batch(&mut self, batch: &[i64], out: &mut [f32]) -> ClipResult<()> {
        let valid: Vec<usize> = batch.iter().filter_map(|&i| self.valid_index(i)).collect();
        let (Some(&lo), Some(&hi)) = (valid.iter().min(), valid.iter().max()) else {
            return Ok(());
        };
        if !self.in_window(lo) {
            self.recenter(lo)?;
        } else if !self.in_window(hi) {
            self.recenter(hi)?;
        }

        let channels = self.channels();
        for (k, &index) in batch.iter().enumerate() {
            let Some(idx) = self.valid_index(index) else {
                continue;
            };
            if !self.in_window(idx) {
                return Err(self.desync(lo as i64, hi as i64));
            }
            out[k * channels..(k + 1) * channels].copy_from_slice(self.row(idx));
        }
        Ok(())
    }

    /// Shift the window to `center`. A decoder failure closes the reader.
    fn recenter(&mut self, center: usize) -> ClipResult<()> {
        self.stats.recenters += 1;
        let moved = self.buffer_around(center);
        if moved.is_err()
            && let Err(e) = self.close()
        {
            tracing::warn!(source = %self.name, error = %e, "teardown after failed read");
        }
        moved
    }

    /// Move the window so it starts half a window before `center`.
    ///
    /// Keeps the overlapping tail of the current window when the decoder sits exactly at its
    /// end and the new window extends it forward; otherwise seeks and reads a full window.
    #[tracing::instrument(level = "trace", skip(self), fields(source = %self.name))]
    fn buffer_around(&mut self, center: usize) -> ClipResult<()> {
        let new_start = center.saturating_sub(self.window_size / 2);
        let current_end = self.window_end();
        let reusable = !self.window.is_empty()
            && self.window_start <= new_start
            && new_start < current_end
            && current_end < new_start + self.window_size
            && self.cursor == current_end;

        if reusable {
            let overlap = current_end - new_start;
            let channels = self.channels();
            self.window.drain(..(new_start - self.window_start) * channels);
            let chunk = self.read_chunk(self.window_size - overlap)?;
            self.window.extend_from_slice(&chunk);
            self.window_start = new_start;
            self.stats.partial_reuses += 1;
            tracing::debug!(new_start, overlap, "window shifted with partial reuse");
            return Ok(());
        }

        self.seek(new_start)?;
        self.window = self.read_chunk(self.window_size)?;
        self.window_start = self.cursor - self.window.len() / self.channels();
        Ok(())
    }

    /// Position the decoder at `pos`, skipping forward when close and respawning otherwise.
    fn seek(&mut self, pos: usize) -> ClipResult<()> {
        if self.stream.is_none()
            || pos < self.cursor
            || pos > self.cursor.saturating_add(self.max_forward_skip)
        {
            return self.initialize(pos);
        }
        if pos > self.cursor {
            let gap = pos - self.cursor;
            let stream = self.stream_mut()?;
            let skipped = stream.skip_frames(gap)?;
            self.cursor += skipped;
            self.stats.skipped_frames += skipped as u64;
            if skipped < gap {
                self.mark_eof();
            }
            tracing::debug!(source = %self.name, gap, skipped, "skipped forward");
        }
        Ok(())
    }

    /// (Re)start the decoder at sample `start`.
    fn initialize(&mut self, start: usize) -> ClipResult<()> {
        if let Some(mut old) = self.stream.take()
            && let Err(e) = old.close()
        {
            tracing::warn!(source = %self.name, error = %e, "failed to close previous decoder");
        }
        let start_sec = start as f64 / f64::from(self.format.sample_rate);
        self.stream = Some(self.backend.open(start_sec, self.format)?);
        self.cursor = start;
        self.stats.spawns += 1;
        tracing::debug!(source = %self.name, start, start_sec, "decoder (re)spawned");
        Ok(())
    }

    fn read_chunk(&mut self, frames: usize) -> ClipResult<Vec<f32>> {
        let channels = self.channels();
        let stream = self.stream_mut()?;
        let mut chunk = stream.read_frames(frames)?;
        let got = chunk.len() / channels;
        chunk.truncate(got * channels);
        self.cursor += got;
        self.stats.frames_read += got as u64;
        if got < frames {
            self.mark_eof();
        }
        Ok(chunk)
    }

    fn mark_eof(&mut self) {
        let at = self.cursor;
        self.eof_at = Some(self.eof_at.map_or(at, |e| e.min(at)));
        tracing::debug!(source = %self.name, eof_at = at, "decoder reached end of stream");
    }

    fn stream_mut(&mut self) -> ClipResult<&mut Box<dyn PcmStream>> {
        let name = &self.name;
        self.stream
            .as_mut()
            .ok_or_else(|| ClipError::io(format!("no decoder running for '{name}'")))
    }

    fn ensure_open(&self) -> ClipResult<()> {
        match self.state {
            ReaderState::Open => Ok(()),
            ReaderState::Closed => Err(ClipError::io(format!(
                "reader for '{}' is closed",
                self.name
            ))),
            ReaderState::Desynced => Err(ClipError::io(format!(
                "reader for '{}' lost sync with its decoder; reopen it",
                self.name
            ))),
        }
    }

    fn desync(&mut self, wanted_min: i64, wanted_max: i64) -> ClipError {
        let err = ClipError::Desync {
            source_name: self.name.clone(),
            wanted_min,
            wanted_max,
            window_start: self.window_start,
            window_end: self.window_end(),
        };
        if let Err(e) = self.close() {
            tracing::warn!(source = %self.name, error = %e, "teardown after desync failed");
        }
        self.state = ReaderState::Desynced;
        err
    }

    fn valid_index(&self, index: i64) -> Option<usize> {
        let idx = usize::try_from(index).ok()?;
        (idx < self.frame_count && self.eof_at.is_none_or(|e| idx < e)).then_some(idx)
    }

    fn in_window(&self, idx: usize) -> bool {
        self.window_start <= idx && idx < self.window_end()
    }

    fn window_end(&self) -> usize {
        self.window_start + self.window.len() / self.channels()
    }

    fn row(&self, idx: usize) -> &[f32] {
        let channels = self.channels();
        let off = (idx - self.window_start) * channels;
        &self.window[off..off + channels]
    }

    fn channels(&self) -> usize {
        usize::from(self.format.channels)
    }
}

impl Drop for AudioFileReader {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(source = %self.name, error = %e, "decoder teardown failed");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/reader/buffered.rs"]
mod tests;
