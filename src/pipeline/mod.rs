/// Capture of the composited scene without the calling stage's own output.
pub mod compositor;
/// Host handles lent to the core for one frame.
pub mod context;
/// Temporal feedback protocol and blend transforms.
pub mod feedback;
