use crate::foundation::error::{FxError, FxResult};
use crate::render::scene::{Camera, Scene};
use crate::render::surface::{RenderSurface, SurfaceId};

/// The renderer handle a host lends to the core each frame.
///
/// The active-target register is process-wide state shared by every stage; the core only
/// touches it through [`TargetStack`].
pub trait Renderer {
    /// Surface that draw calls currently land in. `None` means the host's default output.
    fn active_target(&self) -> Option<SurfaceId>;

    /// Point the active-target register at `target`.
    fn set_active_target(&mut self, target: Option<SurfaceId>);

    /// Draw `scene` through `camera` into `target`.
    ///
    /// Callers make `target` the active target first. On error, `target` must be left as it
    /// was before the call.
    fn render(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        target: &mut RenderSurface,
    ) -> FxResult<()>;

    /// Synchronously read `surface` back into `out` as RGBA8 bytes.
    ///
    /// This flushes pending GPU work up to this point, so callers keep `surface` small.
    fn read_pixels(&mut self, surface: &RenderSurface, out: &mut Vec<u8>) -> FxResult<()> {
        if surface.is_disposed() {
            return Err(FxError::readback(format!(
                "surface {} is disposed",
                surface.id().get()
            )));
        }
        out.clear();
        out.extend_from_slice(surface.pixels());
        Ok(())
    }
}

/// Save/restore discipline for the renderer's active-target register.
///
/// Every `push` records the register's current value before overwriting it and every `pop`
/// restores the most recent record, so nested captures unwind in last-set/first-restored order.
#[derive(Debug, Default)]
pub struct TargetStack {
    saved: Vec<Option<SurfaceId>>,
}

impl TargetStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Save the renderer's active target and replace it with `next`.
    pub fn push(&mut self, renderer: &mut dyn Renderer, next: Option<SurfaceId>) {
        self.saved.push(renderer.active_target());
        renderer.set_active_target(next);
    }

    /// Restore the most recently saved target. Returns `false` when the stack was empty.
    pub fn pop(&mut self, renderer: &mut dyn Renderer) -> bool {
        match self.saved.pop() {
            Some(prev) => {
                renderer.set_active_target(prev);
                true
            }
            None => {
                tracing::error!("target stack popped while empty");
                false
            }
        }
    }

    /// Number of outstanding saves.
    pub fn depth(&self) -> usize {
        self.saved.len()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/renderer.rs"]
mod tests;
