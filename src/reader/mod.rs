pub(crate) mod buffered;
pub(crate) mod config;
pub(crate) mod decoder;
pub(crate) mod ffmpeg;

#[cfg(test)]
#[path = "../../tests/unit/support/ramp.rs"]
pub(crate) mod ramp;
