use std::sync::Arc;

use crate::{
    clip::model::{ApplyTo, Clip},
    foundation::error::{ClipError, ClipResult},
};

impl Clip {
    /// Repeat the clip forever, `n` times, or until `duration` seconds have elapsed.
    ///
    /// Needs a known duration. Mask and audio loop along.
    pub fn looped(&self, n: Option<u32>, duration: Option<f64>) -> ClipResult<Self> {
        let period = self
            .duration()
            .ok_or_else(|| ClipError::state("looping requires a clip with a known duration"))?;
        if period <= 0.0 {
            return Err(ClipError::range("cannot loop a zero-length clip"));
        }
        let out = self.fl_time_shared(Arc::new(move |t| t.rem_euclid(period)), ApplyTo::ALL, false);
        match (n, duration) {
            (Some(n), _) => out.set_duration(f64::from(n) * period, true),
            (None, Some(d)) => out.set_duration(d, true),
            (None, None) => Ok(out),
        }
    }

    /// Play `factor` times faster (`factor < 1` slows down).
    pub fn speedx(&self, factor: f64) -> ClipResult<Self> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(ClipError::range(format!(
                "speed factor must be positive, got {factor}"
            )));
        }
        let out = self.fl_time_shared(Arc::new(move |t| t * factor), ApplyTo::ALL, false);
        match self.duration() {
            Some(d) => out.set_duration(d / factor, true),
            None => Ok(out),
        }
    }

    /// Play backwards. Needs a known duration.
    pub fn time_mirror(&self) -> ClipResult<Self> {
        let d = self
            .duration()
            .ok_or_else(|| ClipError::state("time_mirror requires a clip with a known duration"))?;
        Ok(self.fl_time_shared(Arc::new(move |t| d - t), ApplyTo::ALL, true))
    }

    /// Freeze the frame at `t` into a still clip with this clip's window and a frozen mask.
    pub fn to_still(&self, t: f64) -> ClipResult<Self> {
        let mut out = Clip::still(self.get_frame(t)?)?.with_window(self.window());
        if let Some(fps) = self.fps() {
            out = out.with_fps(fps)?;
        }
        if let Some(mask) = self.mask() {
            out = out.with_mask(mask.to_still(t)?)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/clip/timefx.rs"]
mod tests;
