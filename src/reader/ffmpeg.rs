use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::{
    foundation::error::{ClipError, ClipResult},
    reader::config::{ReaderConfig, SampleWidth},
    reader::decoder::{DecoderBackend, PcmFormat, PcmStream, SourceInfo},
};

/// Decoder backend driving the system `ffmpeg`/`ffprobe` binaries.
#[derive(Clone, Debug)]
#[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
pub struct FfmpegDecoder {
    path: PathBuf,
    label: String,
    ffmpeg_binary: String,
    ffprobe_binary: String,
}

impl FfmpegDecoder {
    /// Backend for the media file at `path`.
    pub fn new(path: &Path, config: &ReaderConfig) -> Self {
        Self {
            path: path.to_path_buf(),
            label: path.display().to_string(),
            ffmpeg_binary: config.ffmpeg_binary.clone(),
            ffprobe_binary: config.ffprobe_binary.clone(),
        }
    }
}

/// Arguments (after the binary) that stream `path` from `start_sec` as raw PCM on stdout.
///
/// A non-zero start seeks coarsely before the input and accurately (at most one second)
/// after it.
pub fn decoder_args(path: &Path, start_sec: f64, format: PcmFormat) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    if start_sec > 0.0 {
        let off = start_sec.min(1.0);
        args.extend(["-ss".into(), format!("{:.5}", start_sec - off).into()]);
        args.extend(["-i".into(), path.as_os_str().to_owned(), "-vn".into()]);
        args.extend(["-ss".into(), format!("{off:.5}").into()]);
    } else {
        args.extend(["-i".into(), path.as_os_str().to_owned(), "-vn".into()]);
    }
    let (fmt, codec) = match format.sample_width {
        SampleWidth::One => ("s8", "pcm_s8"),
        SampleWidth::Two => ("s16le", "pcm_s16le"),
        SampleWidth::Four => ("s32le", "pcm_s32le"),
    };
    for a in [
        "-loglevel",
        "error",
        "-f",
        fmt,
        "-acodec",
        codec,
        "-ar",
        &format.sample_rate.to_string(),
        "-ac",
        &format.channels.to_string(),
        "-",
    ] {
        args.push(a.into());
    }
    args
}

/// Arguments (after the binary) for a JSON `ffprobe` run over `path`.
pub fn probe_args(path: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-v",
        "error",
        "-print_format",
        "json",
        "-show_format",
        "-show_streams",
    ]
    .into_iter()
    .map(OsString::from)
    .collect();
    args.push(path.as_os_str().to_owned());
    args
}

/// Parse `ffprobe` JSON output.
///
/// The duration prefers the first video stream (containers often report a longer audio tail),
/// then the first audio stream, then the container. Rate and channels come from the first
/// audio stream.
pub fn parse_probe_json(bytes: &[u8]) -> ClipResult<SourceInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        duration: Option<String>,
        sample_rate: Option<String>,
        channels: Option<u16>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        #[serde(default)]
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let parsed: ProbeOut = serde_json::from_slice(bytes)
        .map_err(|e| ClipError::io(format!("ffprobe json parse failed: {e}")))?;
    let stream_of = |kind: &str| {
        parsed
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some(kind))
    };
    let audio = stream_of("audio").ok_or_else(|| ClipError::io("no audio stream found"))?;
    let parse_secs = |s: Option<&String>| s.and_then(|v| v.parse::<f64>().ok());

    let duration = parse_secs(stream_of("video").and_then(|s| s.duration.as_ref()))
        .or_else(|| parse_secs(audio.duration.as_ref()))
        .or_else(|| parse_secs(parsed.format.as_ref().and_then(|f| f.duration.as_ref())))
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| ClipError::io("ffprobe reported no usable duration"))?;

    Ok(SourceInfo {
        duration,
        sample_rate: audio.sample_rate.as_deref().and_then(|s| s.parse().ok()),
        channels: audio.channels,
    })
}

#[cfg(feature = "media-ffmpeg")]
mod process {
    use std::{
        io::Read as _,
        process::{Child, ChildStdout, Command, Stdio},
        thread::JoinHandle,
    };

    use super::*;
    use crate::reader::decoder::decode_pcm_le;

    const SKIP_CHUNK_BYTES: usize = 1 << 16;

    impl DecoderBackend for FfmpegDecoder {
        fn name(&self) -> &str {
            &self.label
        }

        fn probe(&mut self) -> ClipResult<SourceInfo> {
            let out = Command::new(&self.ffprobe_binary)
                .args(probe_args(&self.path))
                .stdin(Stdio::null())
                .output()
                .map_err(|e| {
                    ClipError::io(format!(
                        "failed to run {} (is it installed and on PATH?): {e}",
                        self.ffprobe_binary
                    ))
                })?;
            if !out.status.success() {
                return Err(ClipError::io(format!(
                    "ffprobe failed for '{}': {}",
                    self.label,
                    String::from_utf8_lossy(&out.stderr).trim()
                )));
            }
            parse_probe_json(&out.stdout)
        }

        fn open(&mut self, start_sec: f64, format: PcmFormat) -> ClipResult<Box<dyn PcmStream>> {
            let mut child = Command::new(&self.ffmpeg_binary)
                .args(decoder_args(&self.path, start_sec, format))
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()
                .map_err(|e| {
                    ClipError::io(format!(
                        "failed to spawn {} (is it installed and on PATH?): {e}",
                        self.ffmpeg_binary
                    ))
                })?;

            let stdout = child.stdout.take();
            let stderr = child.stderr.take();
            let (Some(stdout), Some(mut stderr)) = (stdout, stderr) else {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ClipError::io("failed to open ffmpeg pipes (unexpected)"));
            };
            let stderr_drain = std::thread::spawn(move || -> std::io::Result<Vec<u8>> {
                let mut stderr_bytes = Vec::new();
                stderr.read_to_end(&mut stderr_bytes)?;
                Ok(stderr_bytes)
            });
            tracing::debug!(source = %self.label, start_sec, "spawned ffmpeg decoder");

            Ok(Box::new(FfmpegPcmStream {
                label: self.label.clone(),
                format,
                child: Some(child),
                stdout: Some(stdout),
                stderr_drain: Some(stderr_drain),
                scratch: Vec::new(),
            }))
        }
    }

    /// Live `ffmpeg` process whose stdout carries raw PCM.
    struct FfmpegPcmStream {
        label: String,
        format: PcmFormat,
        child: Option<Child>,
        stdout: Option<ChildStdout>,
        stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
        scratch: Vec<u8>,
    }

    impl FfmpegPcmStream {
        /// Fill `scratch` with up to `len` bytes, stopping early only at end of stream.
        fn fill(&mut self, len: usize) -> ClipResult<usize> {
            let Some(stdout) = self.stdout.as_mut() else {
                return Err(ClipError::io(format!(
                    "ffmpeg stream for '{}' is closed",
                    self.label
                )));
            };
            self.scratch.resize(len, 0);
            let mut filled = 0;
            while filled < len {
                match stdout.read(&mut self.scratch[filled..]) {
                    Ok(0) => break,
                    Ok(n) => filled += n,
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        return Err(ClipError::io(format!(
                            "failed to read ffmpeg output for '{}': {e}",
                            self.label
                        )));
                    }
                }
            }
            Ok(filled)
        }
    }

    impl PcmStream for FfmpegPcmStream {
        fn read_frames(&mut self, frames: usize) -> ClipResult<Vec<f32>> {
            let frame_bytes = self.format.frame_bytes();
            let filled = self.fill(frames * frame_bytes)?;
            let whole = filled - filled % frame_bytes;
            decode_pcm_le(&self.scratch[..whole], self.format.sample_width)
        }

        fn skip_frames(&mut self, frames: usize) -> ClipResult<usize> {
            let frame_bytes = self.format.frame_bytes();
            let chunk = (SKIP_CHUNK_BYTES / frame_bytes).max(1) * frame_bytes;
            let mut left = frames * frame_bytes;
            let mut skipped = 0;
            while left > 0 {
                let want = left.min(chunk);
                let got = self.fill(want)?;
                skipped += got;
                left -= got;
                if got < want {
                    break;
                }
            }
            Ok(skipped / frame_bytes)
        }

        fn close(&mut self) -> ClipResult<()> {
            drop(self.stdout.take());
            let Some(mut child) = self.child.take() else {
                return Ok(());
            };
            let _ = child.kill();
            child.wait().map_err(|e| {
                ClipError::io(format!("failed to wait for ffmpeg ('{}'): {e}", self.label))
            })?;
            let stderr_bytes = match self.stderr_drain.take() {
                Some(handle) => handle
                    .join()
                    .map_err(|_| ClipError::io("ffmpeg stderr drain thread panicked"))?
                    .map_err(|e| ClipError::io(format!("ffmpeg stderr read failed: {e}")))?,
                None => Vec::new(),
            };
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            if !stderr.trim().is_empty() {
                tracing::warn!(source = %self.label, stderr = %stderr.trim(), "ffmpeg reported errors");
            }
            Ok(())
        }
    }

    impl Drop for FfmpegPcmStream {
        fn drop(&mut self) {
            if let Err(e) = self.close() {
                tracing::warn!(source = %self.label, error = %e, "ffmpeg teardown failed");
            }
        }
    }
}

#[cfg(not(feature = "media-ffmpeg"))]
impl DecoderBackend for FfmpegDecoder {
    fn name(&self) -> &str {
        &self.label
    }

    fn probe(&mut self) -> ClipResult<SourceInfo> {
        Err(ClipError::io(
            "media decoding requires the 'media-ffmpeg' feature",
        ))
    }

    fn open(&mut self, _start_sec: f64, _format: PcmFormat) -> ClipResult<Box<dyn PcmStream>> {
        Err(ClipError::io(
            "media decoding requires the 'media-ffmpeg' feature",
        ))
    }
}

/// Whether the configured `ffmpeg` binary runs.
pub fn is_ffmpeg_available(config: &ReaderConfig) -> bool {
    std::process::Command::new(&config.ffmpeg_binary)
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/reader/ffmpeg.rs"]
mod tests;
