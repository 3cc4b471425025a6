use std::sync::{Arc, Mutex};

use crate::{
    compose::{audio::AudioMix, video::VideoComposite},
    foundation::error::{ClipError, ClipResult},
    foundation::frame::Frame,
    reader::buffered::AudioFileReader,
};

/// Procedural single-time generator.
pub type FrameFn = Arc<dyn Fn(f64) -> ClipResult<Frame> + Send + Sync>;
/// Procedural batch generator for audio: times in, `len x channels` samples out.
pub type SamplesFn = Arc<dyn Fn(&[f64]) -> ClipResult<Frame> + Send + Sync>;
/// Frame filter receiving the input getter (not a precomputed frame) and the query time.
pub type FrameFilter = Arc<dyn Fn(&FrameGetter<'_>, f64) -> ClipResult<Frame> + Send + Sync>;
/// Batch filter receiving the input getter and every query time at once.
pub type SamplesFilter =
    Arc<dyn Fn(&FrameGetter<'_>, &[f64]) -> ClipResult<Frame> + Send + Sync>;
/// Time remapping `t -> t'`.
pub type TimeMapFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// Node of a clip's evaluation graph.
///
/// Nodes are shared between clip copies through `Arc` and never mutated after construction.
/// The only interior state lives in streaming readers, behind a mutex.
pub(crate) enum FrameSource {
    Procedural(FrameFn),
    Sampled(SamplesFn),
    Still(Arc<Frame>),
    SampleArray {
        samples: Arc<Frame>,
        sample_rate: u32,
    },
    Stream(Arc<Mutex<AudioFileReader>>),
    Filter {
        input: Arc<FrameSource>,
        filter: FrameFilter,
    },
    BatchFilter {
        input: Arc<FrameSource>,
        filter: SamplesFilter,
    },
    TimeMap {
        input: Arc<FrameSource>,
        map: TimeMapFn,
    },
    Composite(Arc<VideoComposite>),
    Mix(Arc<AudioMix>),
}

impl FrameSource {
    /// Evaluate at a single time.
    pub(crate) fn frame_at(&self, t: f64) -> ClipResult<Frame> {
        match self {
            Self::Procedural(f) => f(t),
            Self::Still(frame) => Ok(Frame::clone(frame)),
            Self::Filter { input, filter } => filter(&FrameGetter { source: input }, t),
            Self::TimeMap { input, map } => input.frame_at(map(t)),
            Self::BatchFilter { input, filter } => filter(&FrameGetter { source: input }, &[t]),
            Self::Composite(c) => c.frame_at(t),
            Self::Sampled(_) | Self::SampleArray { .. } | Self::Stream(_) | Self::Mix(_) => {
                self.frames_at(&[t])
            }
        }
    }

    /// Evaluate a batch of times into one `len x channels` sample buffer.
    pub(crate) fn frames_at(&self, ts: &[f64]) -> ClipResult<Frame> {
        match self {
            Self::Sampled(f) => f(ts),
            Self::SampleArray {
                samples,
                sample_rate,
            } => Ok(sample_array_at(samples, *sample_rate, ts)),
            Self::Stream(reader) => reader
                .lock()
                .map_err(|_| ClipError::io("audio reader lock poisoned"))?
                .samples_at_times(ts),
            Self::TimeMap { input, map } => {
                let mapped: Vec<f64> = ts.iter().map(|&t| map(t)).collect();
                input.frames_at(&mapped)
            }
            Self::BatchFilter { input, filter } => filter(&FrameGetter { source: input }, ts),
            Self::Mix(m) => m.frames_at(ts),
            Self::Procedural(_) | Self::Still(_) | Self::Filter { .. } | Self::Composite(_) => {
                let frames = ts
                    .iter()
                    .map(|&t| self.frame_at(t))
                    .collect::<ClipResult<Vec<_>>>()?;
                Frame::concat_samples(&frames)
            }
        }
    }

    pub(crate) fn graph(&self) -> SourceGraph {
        match self {
            Self::Procedural(_) => SourceGraph::leaf("procedural", None),
            Self::Sampled(_) => SourceGraph::leaf("sampled", None),
            Self::Still(frame) => {
                SourceGraph::leaf("still", Some(format!("{:?}", frame.shape())))
            }
            Self::SampleArray {
                samples,
                sample_rate,
            } => SourceGraph::leaf(
                "sample_array",
                Some(format!(
                    "{} samples @ {sample_rate} Hz",
                    samples.sample_len().unwrap_or(0)
                )),
            ),
            Self::Stream(reader) => SourceGraph::leaf(
                "stream",
                reader.lock().ok().map(|r| r.source_name().to_string()),
            ),
            Self::Filter { input, .. } => SourceGraph::node("filter", None, vec![input.graph()]),
            Self::BatchFilter { input, .. } => {
                SourceGraph::node("batch_filter", None, vec![input.graph()])
            }
            Self::TimeMap { input, .. } => {
                SourceGraph::node("time_map", None, vec![input.graph()])
            }
            Self::Composite(c) => SourceGraph::node(
                "composite",
                Some(format!("{} layers", c.layer_count())),
                c.layer_graphs(),
            ),
            Self::Mix(m) => SourceGraph::node(
                "mix",
                Some(format!("{} clips", m.clip_count())),
                m.clip_graphs(),
            ),
        }
    }
}

/// Handle passed to [`crate::Clip::fl`] and [`crate::Clip::fl_batch`] filters to sample the
/// input clip lazily.
pub struct FrameGetter<'a> {
    source: &'a FrameSource,
}

impl FrameGetter<'_> {
    /// Input frame at time `t`.
    pub fn frame(&self, t: f64) -> ClipResult<Frame> {
        self.source.frame_at(t)
    }

    /// Input samples at each time in `ts` (audio inputs).
    pub fn frames(&self, ts: &[f64]) -> ClipResult<Frame> {
        self.source.frames_at(ts)
    }
}

/// Serializable description of an evaluation graph, for debugging and tests.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct SourceGraph {
    /// Node kind (`procedural`, `stream`, `filter`, `time_map`, `composite`, ...).
    pub node: String,
    /// Optional human-readable detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Input nodes, in evaluation order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<SourceGraph>,
}

impl SourceGraph {
    fn leaf(node: &str, detail: Option<String>) -> Self {
        Self::node(node, detail, Vec::new())
    }

    fn node(node: &str, detail: Option<String>, inputs: Vec<SourceGraph>) -> Self {
        Self {
            node: node.to_string(),
            detail,
            inputs,
        }
    }

    /// Number of nodes in this subtree.
    pub fn node_count(&self) -> usize {
        1 + self.inputs.iter().map(SourceGraph::node_count).sum::<usize>()
    }
}

fn sample_array_at(samples: &Frame, sample_rate: u32, ts: &[f64]) -> Frame {
    let channels = samples.channels();
    let len = samples.sample_len().unwrap_or(0);
    let mut out = Frame::silence(ts.len(), channels);
    for (i, &t) in ts.iter().enumerate() {
        let idx = (t * f64::from(sample_rate)).floor();
        if idx < 0.0 || idx >= len as f64 {
            continue;
        }
        if let Some(row) = samples.sample_row(idx as usize) {
            out.data_mut()[i * channels..(i + 1) * channels].copy_from_slice(row);
        }
    }
    out
}
