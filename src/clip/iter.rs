use crate::{
    clip::model::Clip,
    foundation::core::frame_count,
    foundation::error::{ClipError, ClipResult},
    foundation::frame::Frame,
};

/// Forward-only iterator over `(t, frame)` pairs at `i / fps` for `t < duration`.
///
/// Created by [`Clip::iter_frames`]. Frames are computed as the iterator advances.
pub struct FrameIter<'a> {
    clip: &'a Clip,
    fps: f64,
    next: usize,
    count: usize,
}

impl Iterator for FrameIter<'_> {
    type Item = ClipResult<(f64, Frame)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.count {
            return None;
        }
        let t = self.next as f64 / self.fps;
        self.next += 1;
        Some(self.clip.get_frame(t).map(|frame| (t, frame)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.count - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for FrameIter<'_> {}

/// Forward-only iterator over consecutive audio chunks of at most `chunk_size` samples.
///
/// Created by [`Clip::iter_chunks`].
pub struct ChunkIter<'a> {
    clip: &'a Clip,
    fps: f64,
    next: usize,
    total: usize,
    chunk_size: usize,
}

impl Iterator for ChunkIter<'_> {
    type Item = ClipResult<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.total {
            return None;
        }
        let end = (self.next + self.chunk_size).min(self.total);
        let ts: Vec<f64> = (self.next..end).map(|i| i as f64 / self.fps).collect();
        self.next = end;
        Some(self.clip.get_frames(&ts))
    }
}

impl Clip {
    fn resolve_timing(&self, fps: Option<f64>) -> ClipResult<(f64, usize)> {
        let duration = self.duration().ok_or_else(|| {
            ClipError::state("iterating frames requires a clip with a known duration")
        })?;
        let fps = fps.or(self.fps()).ok_or_else(|| {
            ClipError::state("no fps given and the clip has no default fps")
        })?;
        let count = frame_count(duration, fps)?;
        Ok((fps, count))
    }

    /// Lazily produce frames at `0, 1/fps, 2/fps, ...` below the clip's duration.
    ///
    /// `fps` falls back to the clip's own default rate.
    pub fn iter_frames(&self, fps: Option<f64>) -> ClipResult<FrameIter<'_>> {
        let (fps, count) = self.resolve_timing(fps)?;
        Ok(FrameIter {
            clip: self,
            fps,
            next: 0,
            count,
        })
    }

    /// Lazily produce audio sample buffers of `chunk_size` samples taken at rate `fps`.
    pub fn iter_chunks(&self, fps: Option<f64>, chunk_size: usize) -> ClipResult<ChunkIter<'_>> {
        if chunk_size == 0 {
            return Err(ClipError::range("chunk size must be non-zero"));
        }
        let (fps, total) = self.resolve_timing(fps)?;
        Ok(ChunkIter {
            clip: self,
            fps,
            next: 0,
            total,
            chunk_size,
        })
    }

    /// The whole clip as one `len x channels` sample buffer at rate `fps`.
    pub fn to_sound_array(&self, fps: Option<f64>, chunk_size: usize) -> ClipResult<Frame> {
        let channels = self
            .channels()
            .ok_or_else(|| ClipError::shape("to_sound_array requires an audio clip"))?;
        let chunks = self
            .iter_chunks(fps, chunk_size)?
            .collect::<ClipResult<Vec<_>>>()?;
        if chunks.is_empty() {
            return Ok(Frame::silence(0, usize::from(channels)));
        }
        Frame::concat_samples(&chunks)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/clip/iter.rs"]
mod tests;
