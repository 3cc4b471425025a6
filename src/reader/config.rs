use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{ClipError, ClipResult};

/// Environment variable overriding [`ReaderConfig::ffmpeg_binary`].
pub const FFMPEG_BINARY_ENV: &str = "CLIPFLOW_FFMPEG_BINARY";
/// Environment variable overriding [`ReaderConfig::ffprobe_binary`].
pub const FFPROBE_BINARY_ENV: &str = "CLIPFLOW_FFPROBE_BINARY";

/// Bytes per decoded PCM sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SampleWidth {
    /// Signed 8-bit.
    One,
    /// Signed 16-bit little-endian.
    #[default]
    Two,
    /// Signed 32-bit little-endian.
    Four,
}

impl SampleWidth {
    /// Width in bytes.
    pub fn bytes(self) -> usize {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 4,
        }
    }
}

impl TryFrom<u8> for SampleWidth {
    type Error = ClipError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            4 => Ok(Self::Four),
            other => Err(ClipError::range(format!(
                "sample width must be 1, 2 or 4 bytes, got {other}"
            ))),
        }
    }
}

impl From<SampleWidth> for u8 {
    fn from(value: SampleWidth) -> Self {
        value.bytes() as u8
    }
}

/// Settings for streaming readers, passed explicitly wherever a decoder is spawned.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Decoder executable.
    pub ffmpeg_binary: String,
    /// Probe executable.
    pub ffprobe_binary: String,
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Output channel count.
    pub channels: u16,
    /// Bytes per sample on the decoder pipe.
    pub sample_width: SampleWidth,
    /// Maximum number of sample frames held in memory.
    pub window_size: usize,
    /// Largest forward gap (in sample frames) skipped by reading instead of respawning.
    pub max_forward_skip: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_binary: "ffmpeg".to_string(),
            ffprobe_binary: "ffprobe".to_string(),
            sample_rate: 44_100,
            channels: 2,
            sample_width: SampleWidth::Two,
            window_size: 200_000,
            max_forward_skip: 1_000_000,
        }
    }
}

impl ReaderConfig {
    /// Defaults with binaries overridden from `CLIPFLOW_FFMPEG_BINARY` / `CLIPFLOW_FFPROBE_BINARY`.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply binary overrides from `lookup` (an environment accessor).
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(bin) = lookup(FFMPEG_BINARY_ENV).filter(|s| !s.trim().is_empty()) {
            self.ffmpeg_binary = bin;
        }
        if let Some(bin) = lookup(FFPROBE_BINARY_ENV).filter(|s| !s.trim().is_empty()) {
            self.ffprobe_binary = bin;
        }
        self
    }

    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json(s: &str) -> ClipResult<Self> {
        let cfg: Self = serde_json::from_str(s).context("failed to parse reader config JSON")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> ClipResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read reader config '{}'", path.display()))?;
        Self::from_json(&text)
    }

    /// Reject zero rates, channel counts and window sizes.
    pub fn validate(&self) -> ClipResult<()> {
        if self.sample_rate == 0 {
            return Err(ClipError::range("reader sample_rate must be non-zero"));
        }
        if self.channels == 0 {
            return Err(ClipError::range("reader channels must be non-zero"));
        }
        if self.window_size == 0 {
            return Err(ClipError::range("reader window_size must be non-zero"));
        }
        if self.ffmpeg_binary.trim().is_empty() || self.ffprobe_binary.trim().is_empty() {
            return Err(ClipError::range("decoder binaries must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/reader/config.rs"]
mod tests;
