//! In-memory decoder producing `value(i) = i` on every channel of sample frame `i`.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use crate::{
    foundation::error::{ClipError, ClipResult},
    reader::decoder::{DecoderBackend, PcmFormat, PcmStream, SourceInfo},
};

/// Shared counters so tests can observe a backend after handing it to a reader.
#[derive(Clone, Debug, Default)]
pub(crate) struct RampCounters {
    pub(crate) spawns: Arc<AtomicUsize>,
    pub(crate) closes: Arc<AtomicUsize>,
}

impl RampCounters {
    pub(crate) fn spawns(&self) -> usize {
        self.spawns.load(Ordering::SeqCst)
    }

    pub(crate) fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

pub(crate) struct RampDecoder {
    duration: f64,
    /// Frames the stream really yields; may be shorter than `duration` implies.
    available: Option<usize>,
    fail_open: bool,
    /// Reads reaching this frame index fail.
    fail_read_at: Option<usize>,
    counters: RampCounters,
}

impl RampDecoder {
    pub(crate) fn new(duration: f64) -> (Self, RampCounters) {
        let counters = RampCounters::default();
        (
            Self {
                duration,
                available: None,
                fail_open: false,
                fail_read_at: None,
                counters: counters.clone(),
            },
            counters,
        )
    }

    pub(crate) fn truncated(mut self, frames: usize) -> Self {
        self.available = Some(frames);
        self
    }

    pub(crate) fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub(crate) fn failing_read_at(mut self, frame: usize) -> Self {
        self.fail_read_at = Some(frame);
        self
    }
}

impl DecoderBackend for RampDecoder {
    fn name(&self) -> &str {
        "ramp"
    }

    fn probe(&mut self) -> ClipResult<SourceInfo> {
        Ok(SourceInfo {
            duration: self.duration,
            sample_rate: Some(44_100),
            channels: Some(2),
        })
    }

    fn open(&mut self, start_sec: f64, format: PcmFormat) -> ClipResult<Box<dyn PcmStream>> {
        if self.fail_open {
            return Err(ClipError::io("ramp refused to start"));
        }
        self.counters.spawns.fetch_add(1, Ordering::SeqCst);
        let total = self
            .available
            .unwrap_or((self.duration * f64::from(format.sample_rate)).floor() as usize);
        Ok(Box::new(RampStream {
            pos: (start_sec * f64::from(format.sample_rate)).round() as usize,
            total,
            channels: usize::from(format.channels),
            fail_read_at: self.fail_read_at,
            closes: Arc::clone(&self.counters.closes),
            closed: false,
        }))
    }
}

struct RampStream {
    pos: usize,
    total: usize,
    channels: usize,
    fail_read_at: Option<usize>,
    closes: Arc<AtomicUsize>,
    closed: bool,
}

impl PcmStream for RampStream {
    fn read_frames(&mut self, frames: usize) -> ClipResult<Vec<f32>> {
        let end = (self.pos + frames).min(self.total).max(self.pos);
        if let Some(at) = self.fail_read_at
            && end > at
        {
            return Err(ClipError::io(format!("ramp read failed at frame {at}")));
        }
        let mut out = Vec::with_capacity((end - self.pos) * self.channels);
        for i in self.pos..end {
            out.extend(std::iter::repeat_n(i as f32, self.channels));
        }
        self.pos = end;
        Ok(out)
    }

    fn skip_frames(&mut self, frames: usize) -> ClipResult<usize> {
        let end = (self.pos + frames).min(self.total).max(self.pos);
        let skipped = end - self.pos;
        self.pos = end;
        Ok(skipped)
    }

    fn close(&mut self) -> ClipResult<()> {
        if !self.closed {
            self.closed = true;
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

impl Drop for RampStream {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
