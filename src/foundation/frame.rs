use crate::foundation::error::{ClipError, ClipResult};

/// Layout of a [`Frame`] buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FrameShape {
    /// Row-major image, `height x width x channels`.
    Image {
        /// Rows.
        height: usize,
        /// Columns.
        width: usize,
        /// Channels per pixel (1 for masks, 3 for RGB).
        channels: usize,
    },
    /// Interleaved audio, `len x channels`.
    Samples {
        /// Number of sample frames.
        len: usize,
        /// Channels per sample frame.
        channels: usize,
    },
}

impl FrameShape {
    /// Channel count for either layout.
    pub fn channels(self) -> usize {
        match self {
            Self::Image { channels, .. } | Self::Samples { channels, .. } => channels,
        }
    }

    /// Total number of scalar elements.
    pub fn element_count(self) -> usize {
        match self {
            Self::Image {
                height,
                width,
                channels,
            } => height * width * channels,
            Self::Samples { len, channels } => len * channels,
        }
    }
}

/// Owned numeric buffer holding one instant of video (an image) or a run of audio samples.
///
/// Video channel values use the `0..=255` scale, mask values `0..=1`, audio samples `[-1, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    shape: FrameShape,
    data: Vec<f32>,
}

impl Frame {
    /// Wrap `data`, checking that its length matches `shape`.
    pub fn from_vec(shape: FrameShape, data: Vec<f32>) -> ClipResult<Self> {
        if data.len() != shape.element_count() {
            return Err(ClipError::shape(format!(
                "buffer of {} elements does not match {shape:?}",
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// Image of `height x width` pixels where every pixel equals `color`.
    pub fn filled_image(height: usize, width: usize, color: &[f32]) -> Self {
        let channels = color.len();
        let mut data = Vec::with_capacity(height * width * channels);
        for _ in 0..height * width {
            data.extend_from_slice(color);
        }
        Self {
            shape: FrameShape::Image {
                height,
                width,
                channels,
            },
            data,
        }
    }

    /// Zeroed audio buffer with `len` sample frames.
    pub fn silence(len: usize, channels: usize) -> Self {
        Self {
            shape: FrameShape::Samples { len, channels },
            data: vec![0.0; len * channels],
        }
    }

    /// One audio sample frame holding `values` (one per channel).
    pub fn sample(values: &[f32]) -> Self {
        Self {
            shape: FrameShape::Samples {
                len: 1,
                channels: values.len(),
            },
            data: values.to_vec(),
        }
    }

    /// Buffer layout.
    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    /// Channel count.
    pub fn channels(&self) -> usize {
        self.shape.channels()
    }

    /// `(height, width, channels)` for image frames.
    pub fn image_dims(&self) -> Option<(usize, usize, usize)> {
        match self.shape {
            FrameShape::Image {
                height,
                width,
                channels,
            } => Some((height, width, channels)),
            FrameShape::Samples { .. } => None,
        }
    }

    /// Number of sample frames for audio buffers.
    pub fn sample_len(&self) -> Option<usize> {
        match self.shape {
            FrameShape::Samples { len, .. } => Some(len),
            FrameShape::Image { .. } => None,
        }
    }

    /// Raw row-major elements.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutable raw row-major elements.
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consume the frame and return its elements.
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Channel values of the pixel at `(y, x)`.
    pub fn pixel(&self, y: usize, x: usize) -> Option<&[f32]> {
        let (h, w, c) = self.image_dims()?;
        if y >= h || x >= w {
            return None;
        }
        let off = (y * w + x) * c;
        Some(&self.data[off..off + c])
    }

    /// Channel values of sample frame `i`.
    pub fn sample_row(&self, i: usize) -> Option<&[f32]> {
        let len = self.sample_len()?;
        if i >= len {
            return None;
        }
        let c = self.channels();
        Some(&self.data[i * c..(i + 1) * c])
    }

    /// Multiply every element by `k`.
    pub fn scale(&mut self, k: f32) {
        for v in &mut self.data {
            *v *= k;
        }
    }

    /// Elementwise `self += other`.
    pub fn add_assign(&mut self, other: &Frame) -> ClipResult<()> {
        if self.shape != other.shape {
            return Err(ClipError::shape(format!(
                "cannot add {:?} to {:?}",
                other.shape, self.shape
            )));
        }
        for (d, s) in self.data.iter_mut().zip(&other.data) {
            *d += *s;
        }
        Ok(())
    }

    /// Stack audio buffers along the sample axis.
    pub fn concat_samples(frames: &[Frame]) -> ClipResult<Frame> {
        let Some(first) = frames.first() else {
            return Err(ClipError::shape("cannot concatenate zero sample buffers"));
        };
        let channels = first.channels();
        let mut len = 0usize;
        let mut data = Vec::new();
        for f in frames {
            let Some(n) = f.sample_len() else {
                return Err(ClipError::shape(
                    "batch evaluation requires audio sample frames, got an image",
                ));
            };
            if f.channels() != channels {
                return Err(ClipError::shape(format!(
                    "cannot concatenate {}-channel samples after {channels}-channel samples",
                    f.channels()
                )));
            }
            len += n;
            data.extend_from_slice(&f.data);
        }
        Ok(Frame {
            shape: FrameShape::Samples { len, channels },
            data,
        })
    }

    /// Fully opaque single-channel mask with the same pixel dimensions as this image.
    pub fn opaque_mask_like(&self) -> ClipResult<Frame> {
        let (h, w, _) = self
            .image_dims()
            .ok_or_else(|| ClipError::shape("opaque mask requires an image frame"))?;
        Ok(Frame::filled_image(h, w, &[1.0]))
    }

    /// Convert an 8-bit RGB image into a 3-channel frame.
    pub fn from_rgb8(img: &image::RgbImage) -> Self {
        let (w, h) = img.dimensions();
        Self {
            shape: FrameShape::Image {
                height: h as usize,
                width: w as usize,
                channels: 3,
            },
            data: img.as_raw().iter().map(|&v| f32::from(v)).collect(),
        }
    }

    /// Convert an 8-bit grayscale image into a `0..=1` mask frame.
    pub fn mask_from_luma8(img: &image::GrayImage) -> Self {
        let (w, h) = img.dimensions();
        Self {
            shape: FrameShape::Image {
                height: h as usize,
                width: w as usize,
                channels: 1,
            },
            data: img
                .as_raw()
                .iter()
                .map(|&v| f32::from(v) / 255.0)
                .collect(),
        }
    }

    /// Quantize a 3-channel image frame into an 8-bit RGB image.
    pub fn to_rgb8(&self) -> ClipResult<image::RgbImage> {
        let (h, w, c) = self
            .image_dims()
            .ok_or_else(|| ClipError::shape("to_rgb8 requires an image frame"))?;
        if c != 3 {
            return Err(ClipError::shape(format!(
                "to_rgb8 requires 3 channels, got {c}"
            )));
        }
        let bytes = self
            .data
            .iter()
            .map(|&v| v.round().clamp(0.0, 255.0) as u8)
            .collect();
        image::RgbImage::from_raw(w as u32, h as u32, bytes)
            .ok_or_else(|| ClipError::shape("frame buffer does not fit its dimensions"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/frame.rs"]
mod tests;
