/// Convenience result type used across clipflow.
pub type ClipResult<T> = Result<T, ClipError>;

/// Top-level error taxonomy used by clip, compositing and reader APIs.
#[derive(thiserror::Error, Debug)]
pub enum ClipError {
    /// Invalid time window arguments (negative or contradictory start/end/duration).
    #[error("range error: {0}")]
    Range(String),

    /// Mismatched frame dimensions during compositing or masking.
    #[error("shape error: {0}")]
    Shape(String),

    /// The operation needs state the clip does not have (usually a known duration).
    #[error("state error: {0}")]
    State(String),

    /// Decoder process failures: spawn, pipe reads, unexpected exit, closed reader.
    #[error("io error: {0}")]
    Io(String),

    /// A batch read could not be served from the sample window after recentering.
    #[error(
        "decoder desync in '{source_name}': wanted samples {wanted_min}..={wanted_max}, \
         window holds {window_start}..{window_end}"
    )]
    Desync {
        /// Human-readable source label (usually the file path).
        source_name: String,
        /// Smallest requested sample index.
        wanted_min: i64,
        /// Largest requested sample index.
        wanted_max: i64,
        /// First sample index held by the window.
        window_start: usize,
        /// One past the last sample index held by the window.
        window_end: usize,
    },

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ClipError {
    /// Build a [`ClipError::Range`] value.
    pub fn range(msg: impl Into<String>) -> Self {
        Self::Range(msg.into())
    }

    /// Build a [`ClipError::Shape`] value.
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }

    /// Build a [`ClipError::State`] value.
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Build a [`ClipError::Io`] value.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Return `true` for errors raised by the decoder side (`Io` and `Desync`).
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Desync { .. })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
