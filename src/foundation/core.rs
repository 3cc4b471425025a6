use crate::foundation::error::{ClipError, ClipResult};

pub use kurbo::{Point, Vec2};

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Create a validated canvas with non-zero dimensions.
    pub fn new(width: u32, height: u32) -> ClipResult<Self> {
        if width == 0 || height == 0 {
            return Err(ClipError::shape(format!(
                "canvas dimensions must be non-zero, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }
}

/// RGB color with channel values on the `0..=255` scale used by video frames.
pub type Rgb = [f32; 3];

/// Convert a time in seconds to the nearest sample index at `rate`.
///
/// Both the single-time and batch read paths go through this function.
pub fn time_to_index(t: f64, rate: u32) -> i64 {
    (t * f64::from(rate)).round() as i64
}

/// Sample times `0, 1/fps, 2/fps, ...` strictly below `duration`.
pub fn sample_times(duration: f64, fps: f64) -> ClipResult<Vec<f64>> {
    let count = frame_count(duration, fps)?;
    Ok((0..count).map(|i| i as f64 / fps).collect())
}

/// Number of `1/fps`-spaced instants in `[0, duration)`.
pub fn frame_count(duration: f64, fps: f64) -> ClipResult<usize> {
    if !(fps.is_finite() && fps > 0.0) {
        return Err(ClipError::range(format!("fps must be positive, got {fps}")));
    }
    if !(duration.is_finite() && duration >= 0.0) {
        return Err(ClipError::range(format!(
            "duration must be finite and non-negative, got {duration}"
        )));
    }
    // `i / fps < duration` for every emitted index.
    let mut n = (duration * fps).ceil() as usize;
    while n > 0 && (n - 1) as f64 / fps >= duration {
        n -= 1;
    }
    Ok(n)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
