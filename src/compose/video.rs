use std::{fmt, sync::Arc};

use crate::{
    clip::model::{Clip, ClipKind},
    clip::source::{FrameSource, SourceGraph},
    clip::window::ClipWindow,
    compose::audio::composite_audio,
    compose::blit::{BlendMode, blit},
    foundation::core::{Canvas, Point, Rgb},
    foundation::error::{ClipError, ClipResult},
    foundation::frame::Frame,
};

/// Placement of a layer's top-left corner on the canvas, in pixels.
#[derive(Clone, Default)]
pub enum Position {
    /// Fixed offset (the default is the origin).
    #[default]
    Origin,
    /// Fixed offset.
    Fixed(Point),
    /// Centered on the canvas.
    Center,
    /// Offset computed from the layer's local time.
    Animated(Arc<dyn Fn(f64) -> Point + Send + Sync>),
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Origin => f.write_str("Origin"),
            Self::Fixed(p) => f.debug_tuple("Fixed").field(p).finish(),
            Self::Center => f.write_str("Center"),
            Self::Animated(_) => f.write_str("Animated(..)"),
        }
    }
}

impl Position {
    /// Integer pixel offset for a `height x width` frame at local time `t`.
    fn resolve(&self, t: f64, canvas: Canvas, height: usize, width: usize) -> (i64, i64) {
        let p = match self {
            Self::Origin => Point::ZERO,
            Self::Fixed(p) => *p,
            Self::Center => Point::new(
                (f64::from(canvas.width) - width as f64) / 2.0,
                (f64::from(canvas.height) - height as f64) / 2.0,
            ),
            Self::Animated(f) => f(t),
        };
        (p.x.floor() as i64, p.y.floor() as i64)
    }
}

/// Background painted before any layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Background {
    /// Solid color.
    Color(Rgb),
    /// Black pixels plus a derived mask that is transparent wherever no layer draws.
    Transparent,
}

impl Default for Background {
    fn default() -> Self {
        Self::Color([0.0; 3])
    }
}

/// One composite child: a clip, where it goes and how opaque it is.
#[derive(Clone, Debug)]
pub struct Layer {
    /// Clip drawn by this layer. Its window places it in composite time.
    pub clip: Clip,
    /// Top-left corner on the canvas.
    pub position: Position,
    /// Fixed opacity multiplied into the mask.
    pub opacity: Option<f32>,
}

impl Layer {
    /// Layer at the origin with no extra opacity.
    pub fn new(clip: Clip) -> Self {
        Self {
            clip,
            position: Position::Origin,
            opacity: None,
        }
    }

    /// Move the layer to a fixed point.
    pub fn at(mut self, p: Point) -> Self {
        self.position = Position::Fixed(p);
        self
    }

    /// Center the layer on the canvas.
    pub fn centered(mut self) -> Self {
        self.position = Position::Center;
        self
    }

    /// Position the layer with a function of local time.
    pub fn animated<F>(mut self, f: F) -> Self
    where
        F: Fn(f64) -> Point + Send + Sync + 'static,
    {
        self.position = Position::Animated(Arc::new(f));
        self
    }

    /// Multiply the layer's alpha by `opacity`.
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CompositeMode {
    Color,
    Mask,
}

/// Evaluation node painting layers in list order onto a fresh canvas.
pub(crate) struct VideoComposite {
    layers: Vec<Layer>,
    canvas: Canvas,
    background: Background,
    mode: CompositeMode,
}

impl VideoComposite {
    pub(crate) fn frame_at(&self, t: f64) -> ClipResult<Frame> {
        let (h, w) = (self.canvas.height as usize, self.canvas.width as usize);
        let mut out = match (self.mode, self.background) {
            (CompositeMode::Mask, _) => Frame::filled_image(h, w, &[0.0]),
            (CompositeMode::Color, Background::Color(c)) => Frame::filled_image(h, w, &c),
            (CompositeMode::Color, Background::Transparent) => Frame::filled_image(h, w, &[0.0; 3]),
        };
        for layer in &self.layers {
            if !layer.clip.is_playing(t) {
                continue;
            }
            let local = t - layer.clip.start();
            let frame = layer.clip.get_frame(local)?;
            let (fh, fw, _) = frame
                .image_dims()
                .ok_or_else(|| ClipError::shape("composite layers must produce images"))?;
            let pos = layer.position.resolve(local, self.canvas, fh, fw);
            let opacity = layer.opacity.unwrap_or(1.0);
            match self.mode {
                CompositeMode::Color => {
                    let alpha = layer
                        .clip
                        .mask()
                        .map(|m| m.get_frame(local))
                        .transpose()?;
                    blit(&mut out, &frame, alpha.as_ref(), opacity, pos, BlendMode::Over)?;
                }
                CompositeMode::Mask => {
                    blit(&mut out, &frame, None, opacity, pos, BlendMode::Union)?;
                }
            }
        }
        Ok(out)
    }

    pub(crate) fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub(crate) fn layer_graphs(&self) -> Vec<SourceGraph> {
        self.layers.iter().map(|l| l.clip.graph()).collect()
    }
}

/// Window covering every layer, unbounded when any layer is.
pub(crate) fn covering_window(clips: impl Iterator<Item = Option<f64>>) -> ClipResult<ClipWindow> {
    let mut end = 0.0f64;
    for e in clips {
        match e {
            Some(e) => end = end.max(e),
            None => return Ok(ClipWindow::unbounded()),
        }
    }
    ClipWindow::with_length(end)
}

/// Overlay `layers` (later ones on top) on a `canvas`-sized background.
///
/// The result lasts until the last layer ends. Layer audio tracks are mixed into the
/// composite's audio, and a [`Background::Transparent`] composite carries a mask built from
/// the union of the layers' masks.
pub fn composite_video(
    layers: Vec<Layer>,
    canvas: Canvas,
    background: Background,
) -> ClipResult<Clip> {
    Canvas::new(canvas.width, canvas.height)?;
    for layer in &layers {
        if layer.clip.kind() != ClipKind::Video {
            return Err(ClipError::shape(format!(
                "composite layers must be video clips, got {:?}",
                layer.clip.kind()
            )));
        }
    }
    let window = covering_window(layers.iter().map(|l| l.clip.end()))?;
    let fps = layers.iter().filter_map(|l| l.clip.fps()).reduce(f64::max);
    let audio = layers
        .iter()
        .filter_map(|l| l.clip.audio().map(|a| a.set_start(l.clip.start(), true)))
        .collect::<ClipResult<Vec<_>>>()?;

    let mask = match background {
        Background::Transparent => {
            let mask_layers = layers
                .iter()
                .map(|l| {
                    let with_mask = l.clip.add_mask();
                    let mask = with_mask
                        .mask()
                        .cloned()
                        .ok_or_else(|| ClipError::state("add_mask produced no mask"))?;
                    Ok(Layer {
                        clip: mask.with_window(l.clip.window()),
                        position: l.position.clone(),
                        opacity: l.opacity,
                    })
                })
                .collect::<ClipResult<Vec<_>>>()?;
            Some(Clip::from_source(
                ClipKind::Mask,
                window,
                FrameSource::Composite(Arc::new(VideoComposite {
                    layers: mask_layers,
                    canvas,
                    background,
                    mode: CompositeMode::Mask,
                })),
            ))
        }
        Background::Color(_) => None,
    };

    let mut out = Clip::from_source(
        ClipKind::Video,
        window,
        FrameSource::Composite(Arc::new(VideoComposite {
            layers,
            canvas,
            background,
            mode: CompositeMode::Color,
        })),
    );
    if let Some(mask) = mask {
        out = out.with_mask(mask)?;
    }
    if !audio.is_empty() {
        out = out.with_audio(composite_audio(audio)?)?;
    }
    if let Some(fps) = fps {
        out = out.with_fps(fps)?;
    }
    tracing::debug!(graph_nodes = out.graph().node_count(), "built video composite");
    Ok(out)
}

/// Place `clip` on a `canvas`-sized color plate lasting until the clip ends.
///
/// With `color_opacity` the plate is translucent and the result carries a mask.
pub fn on_color(
    clip: &Clip,
    canvas: Canvas,
    color: Rgb,
    position: Position,
    color_opacity: Option<f32>,
) -> ClipResult<Clip> {
    let mut plate = Clip::color(canvas, color);
    if let Some(end) = clip.end() {
        plate = plate.set_duration(end, true)?;
    }
    let mut plate = Layer::new(plate);
    plate.opacity = color_opacity;
    let background = match color_opacity {
        Some(_) => Background::Transparent,
        None => Background::default(),
    };
    let top = Layer {
        clip: clip.clone(),
        position,
        opacity: None,
    };
    composite_video(vec![plate, top], canvas, background)
}

#[cfg(test)]
#[path = "../../tests/unit/compose/video.rs"]
mod tests;
