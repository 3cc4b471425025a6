//! clipflow represents video and audio as time-indexed, lazily evaluated clips.
//!
//! A [`Clip`] is a time window plus a frame source. Operators ([`Clip::fl`],
//! [`Clip::fl_time`], [`Clip::subclip`], ...) return new clips sharing the source graph, and
//! nothing is computed until a frame is requested:
//!
//! 1. **Build**: procedural, still, array or file-backed leaves
//! 2. **Transform**: filters, time remaps, window edits
//! 3. **Compose**: [`composite_video`], [`composite_audio`], [`concatenate_audio`]
//! 4. **Pull**: [`Clip::get_frame`], [`Clip::get_frames`], [`Clip::iter_frames`]
//!
//! Audio files are streamed through [`AudioFileReader`], a sliding sample window over a
//! forward-only decoder process (`ffmpeg` behind the `media-ffmpeg` feature).
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod clip;
mod compose;
mod foundation;
mod reader;

pub use crate::clip::iter::{ChunkIter, FrameIter};
pub use crate::clip::model::{ApplyTo, Clip, ClipKind};
pub use crate::clip::source::{
    FrameFilter, FrameFn, FrameGetter, SamplesFilter, SamplesFn, SourceGraph, TimeMapFn,
};
pub use crate::clip::window::ClipWindow;
pub use crate::compose::audio::{composite_audio, concatenate_audio};
pub use crate::compose::video::{Background, Layer, Position, composite_video, on_color};
pub use crate::foundation::core::{
    Canvas, Point, Rgb, Vec2, frame_count, sample_times, time_to_index,
};
pub use crate::foundation::error::{ClipError, ClipResult};
pub use crate::foundation::frame::{Frame, FrameShape};
pub use crate::reader::buffered::{AudioFileReader, ReaderStats};
pub use crate::reader::config::{
    FFMPEG_BINARY_ENV, FFPROBE_BINARY_ENV, ReaderConfig, SampleWidth,
};
pub use crate::reader::decoder::{
    DecoderBackend, PcmFormat, PcmStream, SourceInfo, decode_pcm_le,
};
pub use crate::reader::ffmpeg::{
    FfmpegDecoder, decoder_args, is_ffmpeg_available, parse_probe_json, probe_args,
};
