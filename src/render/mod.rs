/// `vello_cpu`-backed reference renderer.
pub mod cpu;
/// Ping-pong surface pair for temporal feedback.
pub mod feedback_pair;
/// Renderer contract and active-target stack.
pub mod renderer;
/// Minimal scene and camera model drawn by the CPU renderer.
pub mod scene;
/// Offscreen surfaces.
pub mod surface;
