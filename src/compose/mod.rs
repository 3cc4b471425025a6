pub(crate) mod audio;
pub(crate) mod blit;
pub(crate) mod video;
