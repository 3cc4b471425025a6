use std::sync::Arc;

use crate::{
    clip::model::{Clip, ClipKind},
    clip::source::{FrameSource, SourceGraph},
    compose::video::covering_window,
    foundation::error::{ClipError, ClipResult},
    foundation::frame::Frame,
};

/// Evaluation node summing the playing children of an audio composite.
pub(crate) struct AudioMix {
    clips: Vec<Clip>,
    channels: usize,
}

impl AudioMix {
    pub(crate) fn frames_at(&self, ts: &[f64]) -> ClipResult<Frame> {
        let mut out = Frame::silence(ts.len(), self.channels);
        for clip in &self.clips {
            let playing = clip.is_playing_many(ts);
            let rows: Vec<usize> = (0..ts.len()).filter(|&i| playing[i]).collect();
            if rows.is_empty() {
                continue;
            }
            let local: Vec<f64> = rows.iter().map(|&i| ts[i] - clip.start()).collect();
            let part = clip.get_frames(&local)?;
            if part.sample_len() != Some(rows.len()) {
                return Err(ClipError::shape(format!(
                    "audio child returned {:?} for {} times",
                    part.shape(),
                    rows.len()
                )));
            }
            let pc = part.channels();
            if pc != self.channels && pc != 1 {
                return Err(ClipError::shape(format!(
                    "cannot mix a {pc}-channel clip into {} channels",
                    self.channels
                )));
            }
            let src = part.data();
            let dst = out.data_mut();
            for (k, &i) in rows.iter().enumerate() {
                for c in 0..self.channels {
                    // Mono children are broadcast to every output channel.
                    let s = if pc == 1 { src[k] } else { src[k * pc + c] };
                    dst[i * self.channels + c] += s;
                }
            }
        }
        Ok(out)
    }

    pub(crate) fn clip_count(&self) -> usize {
        self.clips.len()
    }

    pub(crate) fn clip_graphs(&self) -> Vec<SourceGraph> {
        self.clips.iter().map(Clip::graph).collect()
    }
}

/// Sum `clips`, each placed by its own start, into one audio clip.
///
/// The output has the largest channel count among the children and lasts until the last
/// child ends (unbounded if any child is).
pub fn composite_audio(clips: Vec<Clip>) -> ClipResult<Clip> {
    let mut channels = 0u16;
    for clip in &clips {
        match clip.kind() {
            ClipKind::Audio { channels: c } => channels = channels.max(c),
            other => {
                return Err(ClipError::shape(format!(
                    "audio composites take audio clips, got {other:?}"
                )));
            }
        }
    }
    if channels == 0 {
        return Err(ClipError::shape("audio composite needs at least one clip"));
    }
    let window = covering_window(clips.iter().map(Clip::end))?;
    let fps = clips.iter().filter_map(Clip::fps).reduce(f64::max);
    let mut out = Clip::from_source(
        ClipKind::Audio { channels },
        window,
        FrameSource::Mix(Arc::new(AudioMix {
            clips,
            channels: usize::from(channels),
        })),
    );
    if let Some(fps) = fps {
        out = out.with_fps(fps)?;
    }
    Ok(out)
}

/// Play `clips` back to back. Every clip needs a known duration.
pub fn concatenate_audio(clips: Vec<Clip>) -> ClipResult<Clip> {
    let mut offset = 0.0;
    let mut placed = Vec::with_capacity(clips.len());
    for clip in clips {
        let d = clip.duration().ok_or_else(|| {
            ClipError::state("concatenate_audio needs clips with known durations")
        })?;
        placed.push(clip.set_start(offset, true)?);
        offset += d;
    }
    composite_audio(placed)?.set_duration(offset, true)
}

#[cfg(test)]
#[path = "../../tests/unit/compose/audio.rs"]
mod tests;
