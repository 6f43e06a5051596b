/// Downsampling and synchronous readback onto a small analysis surface.
pub mod sampler;
/// Salient-point selection and temporal smoothing.
pub mod tracker;
