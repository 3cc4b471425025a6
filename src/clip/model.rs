use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use crate::{
    clip::source::{FrameFilter, FrameGetter, FrameSource, SamplesFilter, SourceGraph, TimeMapFn},
    clip::window::ClipWindow,
    foundation::core::{Canvas, Rgb},
    foundation::error::{ClipError, ClipResult},
    foundation::frame::Frame,
};

/// What a clip's frames represent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ClipKind {
    /// `height x width x 3` RGB images.
    Video,
    /// `height x width x 1` opacity images with values in `[0, 1]`.
    Mask,
    /// `len x channels` sample buffers.
    Audio {
        /// Channel count of every frame.
        channels: u16,
    },
}

/// Which attached sub-clips a transform should also be applied to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ApplyTo {
    /// Also transform the mask.
    pub mask: bool,
    /// Also transform the audio.
    pub audio: bool,
}

impl ApplyTo {
    /// Only the clip itself.
    pub const NONE: Self = Self {
        mask: false,
        audio: false,
    };
    /// Clip and mask.
    pub const MASK: Self = Self {
        mask: true,
        audio: false,
    };
    /// Clip and audio.
    pub const AUDIO: Self = Self {
        mask: false,
        audio: true,
    };
    /// Clip, mask and audio.
    pub const ALL: Self = Self {
        mask: true,
        audio: true,
    };
}

/// Single-entry frame cache. Cloning yields an empty cell so copies never share it.
#[derive(Default)]
struct MemoCell(Mutex<Option<(f64, Frame)>>);

impl Clone for MemoCell {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl MemoCell {
    fn lookup(&self, t: f64) -> Option<Frame> {
        let slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some((mt, frame)) if *mt == t => Some(frame.clone()),
            _ => None,
        }
    }

    fn store(&self, t: f64, frame: Frame) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some((t, frame));
    }
}

/// A time-windowed, lazily-evaluated producer of frames.
///
/// Clips are immutable values: every operator returns a new clip. Copies share evaluation
/// nodes but get independent copies of their mask and audio sub-clips and an empty memo.
#[derive(Clone)]
pub struct Clip {
    window: ClipWindow,
    kind: ClipKind,
    source: Arc<FrameSource>,
    mask: Option<Box<Clip>>,
    audio: Option<Box<Clip>>,
    fps: Option<f64>,
    memoize: bool,
    memo: MemoCell,
}

impl fmt::Debug for Clip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clip")
            .field("window", &self.window)
            .field("kind", &self.kind)
            .field("source", &self.source.graph().node)
            .field("mask", &self.mask)
            .field("audio", &self.audio)
            .field("fps", &self.fps)
            .field("memoize", &self.memoize)
            .finish()
    }
}

impl Clip {
    pub(crate) fn from_source(kind: ClipKind, window: ClipWindow, source: FrameSource) -> Self {
        Self {
            window,
            kind,
            source: Arc::new(source),
            mask: None,
            audio: None,
            fps: None,
            memoize: false,
            memo: MemoCell::default(),
        }
    }

    /// Unbounded video clip computing each frame with `make_frame`.
    pub fn video<F>(make_frame: F) -> Self
    where
        F: Fn(f64) -> ClipResult<Frame> + Send + Sync + 'static,
    {
        Self::from_source(
            ClipKind::Video,
            ClipWindow::unbounded(),
            FrameSource::Procedural(Arc::new(make_frame)),
        )
    }

    /// Unbounded mask clip computing each frame with `make_frame`.
    pub fn mask_fn<F>(make_frame: F) -> Self
    where
        F: Fn(f64) -> ClipResult<Frame> + Send + Sync + 'static,
    {
        Self::from_source(
            ClipKind::Mask,
            ClipWindow::unbounded(),
            FrameSource::Procedural(Arc::new(make_frame)),
        )
    }

    /// Unbounded clip showing the same image at every time.
    ///
    /// Single-channel images become mask clips.
    pub fn still(frame: Frame) -> ClipResult<Self> {
        let kind = match frame.image_dims() {
            Some((_, _, 1)) => ClipKind::Mask,
            Some((_, _, 3)) => ClipKind::Video,
            Some((_, _, c)) => {
                return Err(ClipError::shape(format!(
                    "still frames need 1 or 3 channels, got {c}"
                )));
            }
            None => return Err(ClipError::shape("still clips need an image frame")),
        };
        Ok(Self::from_source(
            kind,
            ClipWindow::unbounded(),
            FrameSource::Still(Arc::new(frame)),
        ))
    }

    /// Unbounded single-color video clip.
    pub fn color(canvas: Canvas, color: Rgb) -> Self {
        Self::from_source(
            ClipKind::Video,
            ClipWindow::unbounded(),
            FrameSource::Still(Arc::new(Frame::filled_image(
                canvas.height as usize,
                canvas.width as usize,
                &color,
            ))),
        )
    }

    /// Time window.
    pub fn window(&self) -> ClipWindow {
        self.window
    }

    /// Offset within a containing composition.
    pub fn start(&self) -> f64 {
        self.window.start()
    }

    /// Absolute end, `None` when unbounded.
    pub fn end(&self) -> Option<f64> {
        self.window.end()
    }

    /// Duration, `None` when unknown.
    pub fn duration(&self) -> Option<f64> {
        self.window.duration()
    }

    /// Frame kind.
    pub fn kind(&self) -> ClipKind {
        self.kind
    }

    /// Channel count for audio clips.
    pub fn channels(&self) -> Option<u16> {
        match self.kind {
            ClipKind::Audio { channels } => Some(channels),
            ClipKind::Video | ClipKind::Mask => None,
        }
    }

    /// Attached opacity mask.
    pub fn mask(&self) -> Option<&Clip> {
        self.mask.as_deref()
    }

    /// Attached audio.
    pub fn audio(&self) -> Option<&Clip> {
        self.audio.as_deref()
    }

    /// Default frame rate used by [`Clip::iter_frames`] when none is passed.
    pub fn fps(&self) -> Option<f64> {
        self.fps
    }

    /// Whether [`Clip::get_frame`] keeps the last frame.
    pub fn is_memoized(&self) -> bool {
        self.memoize
    }

    /// Description of the evaluation graph behind this clip.
    pub fn graph(&self) -> SourceGraph {
        self.source.graph()
    }

    pub(crate) fn with_window(&self, window: ClipWindow) -> Self {
        let mut out = self.clone();
        out.window = window;
        out
    }

    fn with_source(&self, source: FrameSource) -> Self {
        let mut out = self.clone();
        out.source = Arc::new(source);
        out
    }

    /// Copy with `mask` attached.
    pub fn with_mask(&self, mask: Clip) -> ClipResult<Self> {
        if mask.kind != ClipKind::Mask {
            return Err(ClipError::shape(format!(
                "mask must be a mask clip, got {:?}",
                mask.kind
            )));
        }
        let mut out = self.clone();
        out.mask = Some(Box::new(mask));
        Ok(out)
    }

    /// Copy without a mask.
    pub fn without_mask(&self) -> Self {
        let mut out = self.clone();
        out.mask = None;
        out
    }

    /// Copy with `audio` attached.
    pub fn with_audio(&self, audio: Clip) -> ClipResult<Self> {
        if !matches!(audio.kind, ClipKind::Audio { .. }) {
            return Err(ClipError::shape(format!(
                "audio must be an audio clip, got {:?}",
                audio.kind
            )));
        }
        let mut out = self.clone();
        out.audio = Some(Box::new(audio));
        Ok(out)
    }

    /// Copy without audio.
    pub fn without_audio(&self) -> Self {
        let mut out = self.clone();
        out.audio = None;
        out
    }

    /// Copy with a fully opaque mask when none is attached.
    pub fn add_mask(&self) -> Self {
        if self.mask.is_some() {
            return self.clone();
        }
        let ones: FrameFilter = Arc::new(opaque_mask);
        let mask = Clip {
            window: self.window,
            kind: ClipKind::Mask,
            source: Arc::new(FrameSource::Filter {
                input: Arc::clone(&self.source),
                filter: ones,
            }),
            mask: None,
            audio: None,
            fps: self.fps,
            memoize: false,
            memo: MemoCell::default(),
        };
        let mut out = self.clone();
        out.mask = Some(Box::new(mask));
        out
    }

    /// Copy that keeps (or stops keeping) the last requested frame.
    pub fn with_memoize(&self, memoize: bool) -> Self {
        let mut out = self.clone();
        out.memoize = memoize;
        out
    }

    /// Copy with a default frame rate.
    pub fn with_fps(&self, fps: f64) -> ClipResult<Self> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(ClipError::range(format!("fps must be positive, got {fps}")));
        }
        let mut out = self.clone();
        out.fps = Some(fps);
        Ok(out)
    }

    /// Frame at time `t` (seconds, clip-local).
    ///
    /// With memoization on, a request repeating the immediately preceding `t` is served from
    /// the cache.
    pub fn get_frame(&self, t: f64) -> ClipResult<Frame> {
        if !self.memoize {
            return self.source.frame_at(t);
        }
        if let Some(frame) = self.memo.lookup(t) {
            return Ok(frame);
        }
        let frame = self.source.frame_at(t)?;
        self.memo.store(t, frame.clone());
        Ok(frame)
    }

    /// Samples at each time in `ts`, as one `len x channels` buffer. Never memoized.
    pub fn get_frames(&self, ts: &[f64]) -> ClipResult<Frame> {
        if ts.is_empty()
            && let Some(channels) = self.channels()
        {
            return Ok(Frame::silence(0, usize::from(channels)));
        }
        self.source.frames_at(ts)
    }

    /// `start <= t < end`.
    pub fn is_playing(&self, t: f64) -> bool {
        self.window.is_playing(t)
    }

    /// Vectorized [`Clip::is_playing`].
    pub fn is_playing_many(&self, ts: &[f64]) -> Vec<bool> {
        self.window.is_playing_many(ts)
    }

    /// New clip whose frames are `filter(input, t)`.
    ///
    /// The filter receives a getter for this clip's frames so it can sample other times.
    /// Without `keep_duration` the result has no end or duration.
    pub fn fl<F>(&self, filter: F, apply_to: ApplyTo, keep_duration: bool) -> Self
    where
        F: Fn(&FrameGetter<'_>, f64) -> ClipResult<Frame> + Send + Sync + 'static,
    {
        self.fl_shared(Arc::new(filter), apply_to, keep_duration)
    }

    fn fl_shared(&self, filter: FrameFilter, apply_to: ApplyTo, keep_duration: bool) -> Self {
        let mut out = self.with_source(FrameSource::Filter {
            input: Arc::clone(&self.source),
            filter: Arc::clone(&filter),
        });
        if !keep_duration {
            out.window = out.window.cleared();
        }
        if apply_to.mask
            && let Some(mask) = &self.mask
        {
            out.mask = Some(Box::new(mask.fl_shared(
                Arc::clone(&filter),
                ApplyTo::NONE,
                keep_duration,
            )));
        }
        if apply_to.audio
            && let Some(audio) = &self.audio
        {
            out.audio = Some(Box::new(audio.fl_shared(filter, ApplyTo::NONE, keep_duration)));
        }
        out
    }

    /// New clip whose samples are `filter(input, ts)` for a whole batch of times.
    ///
    /// The batch counterpart of [`Clip::fl`] for audio: chunked reads reach the filter as one
    /// call instead of one call per sample. Single-time requests pass a one-element batch.
    pub fn fl_batch<F>(&self, filter: F, apply_to: ApplyTo, keep_duration: bool) -> Self
    where
        F: Fn(&FrameGetter<'_>, &[f64]) -> ClipResult<Frame> + Send + Sync + 'static,
    {
        self.fl_batch_shared(Arc::new(filter), apply_to, keep_duration)
    }

    fn fl_batch_shared(
        &self,
        filter: SamplesFilter,
        apply_to: ApplyTo,
        keep_duration: bool,
    ) -> Self {
        let mut out = self.with_source(FrameSource::BatchFilter {
            input: Arc::clone(&self.source),
            filter: Arc::clone(&filter),
        });
        if !keep_duration {
            out.window = out.window.cleared();
        }
        if apply_to.mask
            && let Some(mask) = &self.mask
        {
            out.mask = Some(Box::new(mask.fl_batch_shared(
                Arc::clone(&filter),
                ApplyTo::NONE,
                keep_duration,
            )));
        }
        if apply_to.audio
            && let Some(audio) = &self.audio
        {
            out.audio = Some(Box::new(audio.fl_batch_shared(
                filter,
                ApplyTo::NONE,
                keep_duration,
            )));
        }
        out
    }

    /// New clip playing this one with time `t` replaced by `map(t)`.
    pub fn fl_time<M>(&self, map: M, apply_to: ApplyTo, keep_duration: bool) -> Self
    where
        M: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        self.fl_time_shared(Arc::new(map), apply_to, keep_duration)
    }

    pub(crate) fn fl_time_shared(
        &self,
        map: TimeMapFn,
        apply_to: ApplyTo,
        keep_duration: bool,
    ) -> Self {
        let mut out = self.with_source(FrameSource::TimeMap {
            input: Arc::clone(&self.source),
            map: Arc::clone(&map),
        });
        if !keep_duration {
            out.window = out.window.cleared();
        }
        if apply_to.mask
            && let Some(mask) = &self.mask
        {
            out.mask = Some(Box::new(mask.fl_time_shared(
                Arc::clone(&map),
                ApplyTo::NONE,
                keep_duration,
            )));
        }
        if apply_to.audio
            && let Some(audio) = &self.audio
        {
            out.audio = Some(Box::new(audio.fl_time_shared(
                map,
                ApplyTo::NONE,
                keep_duration,
            )));
        }
        out
    }

    /// Content between `t_start` and `t_end`.
    ///
    /// An omitted `t_end` means the clip's duration (an unbounded result when unknown); a
    /// negative one counts back from the duration. Mask and audio are cut the same way.
    pub fn subclip(&self, t_start: f64, t_end: Option<f64>) -> ClipResult<Self> {
        if !(t_start.is_finite() && t_start >= 0.0) {
            return Err(ClipError::range(format!(
                "subclip start must be finite and non-negative, got {t_start}"
            )));
        }
        let duration = self.duration();
        if let Some(d) = duration
            && t_start > d
        {
            return Err(ClipError::range(format!(
                "subclip start ({t_start:.2}) should be smaller than the clip's duration ({d:.2})"
            )));
        }

        let resolved_end = match t_end {
            None => duration,
            Some(e) if e < 0.0 => {
                let d = duration.ok_or_else(|| {
                    ClipError::range(format!(
                        "subclip with negative end ({e}) needs a clip with a known duration"
                    ))
                })?;
                Some(d + e)
            }
            Some(e) => Some(e),
        };
        if let Some(e) = resolved_end {
            if e < t_start {
                return Err(ClipError::range(format!(
                    "subclip end ({e:.2}) comes before its start ({t_start:.2})"
                )));
            }
            if let Some(d) = duration
                && e > d
            {
                return Err(ClipError::range(format!(
                    "subclip end ({e:.2}) exceeds the clip's duration ({d:.2})"
                )));
            }
        }

        let mut out = self.fl_time_shared(Arc::new(move |t| t + t_start), ApplyTo::NONE, false);
        if let Some(e) = resolved_end {
            out.window = out.window.with_duration(e - t_start, true)?;
        }
        out.mask = self.cascade_mask(|m| m.subclip(t_start, t_end))?;
        out.audio = self.cascade_audio(|a| a.subclip(t_start, t_end))?;
        Ok(out)
    }

    /// Content with `[ta, tb)` removed.
    pub fn cutout(&self, ta: f64, tb: f64) -> ClipResult<Self> {
        if !(ta.is_finite() && tb.is_finite() && 0.0 <= ta && ta <= tb) {
            return Err(ClipError::range(format!(
                "cutout needs 0 <= ta <= tb, got ta={ta}, tb={tb}"
            )));
        }
        let gap = tb - ta;
        let mut out = self.fl_time_shared(
            Arc::new(move |t| if t >= ta { t + gap } else { t }),
            ApplyTo::NONE,
            false,
        );
        if let Some(d) = self.duration() {
            out.window = out.window.with_duration(d - gap, true)?;
        }
        out.mask = self.cascade_mask(|m| m.cutout(ta, tb))?;
        out.audio = self.cascade_audio(|a| a.cutout(ta, tb))?;
        Ok(out)
    }

    /// Copy starting at `t` in a composition (see [`ClipWindow::with_start`]).
    pub fn set_start(&self, t: f64, change_end: bool) -> ClipResult<Self> {
        let mut out = self.clone();
        out.window = self.window.with_start(t, change_end)?;
        out.mask = self.cascade_mask(|m| m.set_start(t, change_end))?;
        out.audio = self.cascade_audio(|a| a.set_start(t, change_end))?;
        Ok(out)
    }

    /// Copy ending at `t` (see [`ClipWindow::with_end`]).
    pub fn set_end(&self, t: f64) -> ClipResult<Self> {
        let mut out = self.clone();
        out.window = self.window.with_end(t)?;
        out.mask = self.cascade_mask(|m| m.set_end(t))?;
        out.audio = self.cascade_audio(|a| a.set_end(t))?;
        Ok(out)
    }

    /// Copy lasting `d` seconds (see [`ClipWindow::with_duration`]).
    pub fn set_duration(&self, d: f64, change_end: bool) -> ClipResult<Self> {
        let mut out = self.clone();
        out.window = self.window.with_duration(d, change_end)?;
        out.mask = self.cascade_mask(|m| m.set_duration(d, change_end))?;
        out.audio = self.cascade_audio(|a| a.set_duration(d, change_end))?;
        Ok(out)
    }

    fn cascade_mask<F>(&self, edit: F) -> ClipResult<Option<Box<Clip>>>
    where
        F: FnOnce(&Clip) -> ClipResult<Clip>,
    {
        self.mask
            .as_deref()
            .map(|m| edit(m).map(Box::new))
            .transpose()
    }

    fn cascade_audio<F>(&self, edit: F) -> ClipResult<Option<Box<Clip>>>
    where
        F: FnOnce(&Clip) -> ClipResult<Clip>,
    {
        self.audio
            .as_deref()
            .map(|a| edit(a).map(Box::new))
            .transpose()
    }
}

fn opaque_mask(gf: &FrameGetter<'_>, t: f64) -> ClipResult<Frame> {
    gf.frame(t)?.opaque_mask_like()
}

#[cfg(test)]
#[path = "../../tests/unit/clip/model.rs"]
mod tests;
