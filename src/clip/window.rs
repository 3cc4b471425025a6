use crate::foundation::error::{ClipError, ClipResult};

/// Half-open time window `[start, end)` of a clip inside a composition, in seconds.
///
/// `duration == end - start` whenever all three are known. Every edit returns a new window.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClipWindow {
    start: f64,
    end: Option<f64>,
    duration: Option<f64>,
}

impl Default for ClipWindow {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl ClipWindow {
    /// Window starting at 0 with no end.
    pub fn unbounded() -> Self {
        Self {
            start: 0.0,
            end: None,
            duration: None,
        }
    }

    /// Window starting at 0 lasting `duration` seconds.
    pub fn with_length(duration: f64) -> ClipResult<Self> {
        check_duration(duration)?;
        Ok(Self {
            start: 0.0,
            end: Some(duration),
            duration: Some(duration),
        })
    }

    /// Offset within the containing composition.
    pub fn start(&self) -> f64 {
        self.start
    }

    /// Absolute end, `None` when unbounded.
    pub fn end(&self) -> Option<f64> {
        self.end
    }

    /// Length in seconds, `None` when unknown.
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Same start, end and duration forgotten.
    pub fn cleared(self) -> Self {
        Self {
            start: self.start,
            end: None,
            duration: None,
        }
    }

    /// Move the start to `t`.
    ///
    /// With `change_end` and a known duration the end follows; otherwise a known end is kept
    /// and the duration is recomputed.
    pub fn with_start(self, t: f64, change_end: bool) -> ClipResult<Self> {
        check_time("start", t)?;
        let mut out = self;
        out.start = t;
        match (self.duration, self.end) {
            (Some(d), _) if change_end => out.end = Some(t + d),
            (_, Some(end)) => {
                if end < t {
                    return Err(ClipError::range(format!(
                        "start {t} would come after end {end}"
                    )));
                }
                out.duration = Some(end - t);
            }
            _ => {}
        }
        Ok(out)
    }

    /// Set the end to `t`, recomputing the duration from the start.
    pub fn with_end(self, t: f64) -> ClipResult<Self> {
        check_time("end", t)?;
        if t < self.start {
            return Err(ClipError::range(format!(
                "end {t} comes before start {}",
                self.start
            )));
        }
        Ok(Self {
            start: self.start,
            end: Some(t),
            duration: Some(t - self.start),
        })
    }

    /// Set the duration to `d`.
    ///
    /// With `change_end` the end becomes `start + d`; otherwise the end is kept and the start
    /// moves to `end - d`, which needs a known end.
    pub fn with_duration(self, d: f64, change_end: bool) -> ClipResult<Self> {
        check_duration(d)?;
        if change_end {
            return Ok(Self {
                start: self.start,
                end: Some(self.start + d),
                duration: Some(d),
            });
        }
        let end = self
            .end
            .ok_or_else(|| ClipError::state("cannot move start from an unknown end"))?;
        Ok(Self {
            start: end - d,
            end: Some(end),
            duration: Some(d),
        })
    }

    /// `start <= t < end` (an unset end never excludes).
    pub fn is_playing(&self, t: f64) -> bool {
        t >= self.start && self.end.is_none_or(|end| t < end)
    }

    /// Vectorized [`Self::is_playing`].
    ///
    /// Returns all-false without comparing each entry when `[min(ts), max(ts)]` lies outside
    /// the window.
    pub fn is_playing_many(&self, ts: &[f64]) -> Vec<bool> {
        if ts.is_empty() {
            return Vec::new();
        }
        let (tmin, tmax) = ts
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &t| {
                (lo.min(t), hi.max(t))
            });
        let outside_after = self.end.is_some_and(|end| tmin >= end);
        if outside_after || tmax < self.start {
            return vec![false; ts.len()];
        }
        ts.iter().map(|&t| self.is_playing(t)).collect()
    }
}

fn check_time(name: &str, t: f64) -> ClipResult<()> {
    if !t.is_finite() {
        return Err(ClipError::range(format!("{name} must be finite, got {t}")));
    }
    Ok(())
}

fn check_duration(d: f64) -> ClipResult<()> {
    if !(d.is_finite() && d >= 0.0) {
        return Err(ClipError::range(format!(
            "duration must be finite and non-negative, got {d}"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/clip/window.rs"]
mod tests;
