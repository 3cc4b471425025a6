pub(crate) mod audio;
pub(crate) mod iter;
pub(crate) mod model;
pub(crate) mod source;
pub(crate) mod timefx;
pub(crate) mod window;
